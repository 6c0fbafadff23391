//! Live page controls
//!
//! A [`Page`] owns its [`Region`]s and each region owns its [`Window`]s.
//! Controls receive a process-unique id the first time the id is read.

use crate::model::{PageInfo, RegionInfo, WindowInfo};
use clouber_core::{ControlId, LazyControlId};
use clouber_producer::{MarkupContext, PortletMode, WindowState};
use std::time::{Duration, Instant};

/// Markup fragment held by a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMarkup {
    /// Markup text
    pub fragment: String,
    /// Mime type of the fragment
    pub mime_type: String,
    /// Whether `wsrp_rewrite_` tokens still have to be replaced
    pub requires_rewriting: bool,
    /// When the fragment was fetched
    pub fetched_at: Instant,
    /// How long the fragment stays valid; `None` never expires
    pub expires: Option<Duration>,
}

impl CachedMarkup {
    /// Cache entry for a producer response. Fragments without cache
    /// directives are valid for the current aggregation only.
    pub fn from_context(context: &MarkupContext, fetched_at: Instant) -> Self {
        let expires = match &context.cache_control {
            Some(cache_control) => cache_control.expiry(),
            None => Some(Duration::ZERO),
        };
        Self {
            fragment: context.markup.clone(),
            mime_type: context.mime_type.clone(),
            requires_rewriting: context.requires_rewriting,
            fetched_at,
            expires,
        }
    }

    /// Error fragment standing in for markup that could not be fetched
    pub fn substitute(fragment: String, fetched_at: Instant) -> Self {
        Self {
            fragment,
            mime_type: "text/html".to_string(),
            requires_rewriting: false,
            fetched_at,
            expires: Some(Duration::ZERO),
        }
    }

    /// Whether the fragment may still be served at `now`
    pub fn is_fresh(&self, now: Instant) -> bool {
        match self.expires {
            None => true,
            Some(ttl) => now.saturating_duration_since(self.fetched_at) < ttl,
        }
    }
}

/// Live instance of a portlet placed in a region
#[derive(Debug)]
pub struct Window {
    id: LazyControlId,
    info: WindowInfo,
    mode: PortletMode,
    window_state: WindowState,
    navigational_state: Option<String>,
    markup: Option<CachedMarkup>,
    preferred_title: Option<String>,
    show_title: bool,
    show_border: bool,
    show_thumbnail: bool,
    failed: bool,
}

impl Window {
    /// Build a window from its description
    pub fn new(info: WindowInfo) -> Self {
        Self {
            id: LazyControlId::new(),
            mode: info.mode.clone(),
            window_state: info.window_state.clone(),
            navigational_state: None,
            markup: None,
            preferred_title: None,
            show_title: info.show_title,
            show_border: info.show_border,
            show_thumbnail: info.show_thumbnail,
            failed: false,
            info,
        }
    }

    /// Control id
    pub fn id(&self) -> ControlId {
        self.id.get()
    }

    /// Description the window was built from
    pub fn info(&self) -> &WindowInfo {
        &self.info
    }

    /// Namespace prefix
    pub fn namespace(&self) -> &str {
        &self.info.namespace
    }

    /// Producer id
    pub fn producer_id(&self) -> &str {
        &self.info.producer
    }

    /// Portlet handle
    pub fn portlet_handle(&self) -> &str {
        &self.info.portlet
    }

    /// Title shown in the title bar
    pub fn title(&self) -> &str {
        self.info
            .title
            .as_deref()
            .or(self.preferred_title.as_deref())
            .unwrap_or(&self.info.portlet)
    }

    /// Remember the title the portlet asked for
    pub fn set_preferred_title(&mut self, title: Option<String>) {
        self.preferred_title = title;
    }

    /// Current mode
    pub fn mode(&self) -> &PortletMode {
        &self.mode
    }

    /// Switch mode
    pub fn set_mode(&mut self, mode: PortletMode) {
        self.mode = mode;
    }

    /// Current window state
    pub fn window_state(&self) -> &WindowState {
        &self.window_state
    }

    /// Switch window state
    pub fn set_window_state(&mut self, window_state: WindowState) {
        self.window_state = window_state;
    }

    /// Navigational state returned by the last interaction or event
    pub fn navigational_state(&self) -> Option<&str> {
        self.navigational_state.as_deref()
    }

    /// Replace the navigational state
    pub fn set_navigational_state(&mut self, state: Option<String>) {
        self.navigational_state = state;
    }

    /// Cached markup, if any
    pub fn markup(&self) -> Option<&CachedMarkup> {
        self.markup.as_ref()
    }

    /// Store a fetched fragment
    pub fn set_markup(&mut self, markup: CachedMarkup) {
        self.markup = Some(markup);
        self.failed = false;
    }

    /// Store an error substitute in place of the fragment
    pub fn set_failed(&mut self, substitute: CachedMarkup) {
        self.markup = Some(substitute);
        self.failed = true;
    }

    /// Drop the cached fragment so the next aggregation fetches it again
    pub fn invalidate(&mut self) {
        self.markup = None;
    }

    /// Whether the cached fragment is an error substitute
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Whether markup must be fetched before rendering at `now`
    pub fn needs_markup(&self, now: Instant) -> bool {
        self.markup.as_ref().map_or(true, |m| !m.is_fresh(now))
    }

    /// Whether the title bar is shown
    pub fn shows_title(&self) -> bool {
        self.show_title
    }

    /// Whether the border is drawn
    pub fn shows_border(&self) -> bool {
        self.show_border
    }

    /// Whether the window is a thumbnail
    pub fn shows_thumbnail(&self) -> bool {
        self.show_thumbnail
    }

    /// Flip the title bar, returning the new setting
    pub fn toggle_title(&mut self) -> bool {
        self.show_title = !self.show_title;
        self.show_title
    }

    /// Flip the border, returning the new setting
    pub fn toggle_border(&mut self) -> bool {
        self.show_border = !self.show_border;
        self.show_border
    }

    /// Flip thumbnail display, returning the new setting
    pub fn toggle_thumbnail(&mut self) -> bool {
        self.show_thumbnail = !self.show_thumbnail;
        self.show_thumbnail
    }
}

/// Live layout slot hosting windows
#[derive(Debug)]
pub struct Region {
    id: LazyControlId,
    info: RegionInfo,
    windows: Vec<Window>,
}

impl Region {
    /// Build a region and its windows from a description
    pub fn new(info: &RegionInfo) -> Self {
        Self {
            id: LazyControlId::new(),
            windows: info.windows.iter().cloned().map(Window::new).collect(),
            info: info.clone(),
        }
    }

    /// Control id
    pub fn id(&self) -> ControlId {
        self.id.get()
    }

    /// Description the region was built from
    pub fn info(&self) -> &RegionInfo {
        &self.info
    }

    /// Namespace identifying the region
    pub fn namespace(&self) -> &str {
        &self.info.namespace
    }

    /// Display name
    pub fn name(&self) -> Option<&str> {
        self.info.name.as_deref()
    }

    /// Windows in display order
    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Mutable windows in display order
    pub fn windows_mut(&mut self) -> &mut [Window] {
        &mut self.windows
    }
}

/// Live page: the root of the control tree
#[derive(Debug)]
pub struct Page {
    id: LazyControlId,
    info: PageInfo,
    title: String,
    regions: Vec<Region>,
}

impl Page {
    /// Build every region of the page from scratch
    pub fn new(info: PageInfo) -> Self {
        let regions = info.regions.iter().map(Region::new).collect();
        Self {
            id: LazyControlId::new(),
            title: info.title.clone(),
            info,
            regions,
        }
    }

    /// Control id
    pub fn id(&self) -> ControlId {
        self.id.get()
    }

    /// Description the page currently shows
    pub fn info(&self) -> &PageInfo {
        &self.info
    }

    /// Replace the description without touching the live regions. The
    /// stored region list always mirrors the live regions, so a reused
    /// region keeps describing the windows it actually hosts.
    pub(crate) fn set_info(&mut self, mut info: PageInfo) {
        info.regions = self.regions.iter().map(|region| region.info.clone()).collect();
        self.info = info;
    }

    /// Page id
    pub fn page_id(&self) -> &str {
        &self.info.id
    }

    /// Template id
    pub fn template(&self) -> &str {
        &self.info.template
    }

    /// Composed title
    pub fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    /// Regions in layout order
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub(crate) fn regions_mut(&mut self) -> &mut Vec<Region> {
        &mut self.regions
    }

    /// Window at a position
    pub fn window(&self, region: usize, window: usize) -> Option<&Window> {
        self.regions.get(region)?.windows.get(window)
    }

    /// Mutable window at a position
    pub fn window_mut(&mut self, region: usize, window: usize) -> Option<&mut Window> {
        self.regions.get_mut(region)?.windows.get_mut(window)
    }

    /// Every window with its position, in page order
    pub fn windows(&self) -> impl Iterator<Item = (usize, usize, &Window)> {
        self.regions.iter().enumerate().flat_map(|(r, region)| {
            region
                .windows
                .iter()
                .enumerate()
                .map(move |(w, window)| (r, w, window))
        })
    }
}
