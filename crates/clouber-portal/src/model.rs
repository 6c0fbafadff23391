//! Page descriptions
//!
//! A page is described as an ordered list of regions, each holding an
//! ordered list of windows. Descriptions are plain data read from the
//! portal configuration; live instances are built from them in
//! [`crate::controls`].

use clouber_producer::{PortletMode, WindowState};
use serde::{Deserialize, Serialize};

fn enabled() -> bool {
    true
}

/// Description of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Page id used for navigation
    pub id: String,
    /// Configured page title
    #[serde(default)]
    pub title: String,
    /// Theme template the page is laid out with
    pub template: String,
    /// Regions in layout order
    #[serde(default)]
    pub regions: Vec<RegionInfo>,
}

impl PageInfo {
    /// Page without regions
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            template: template.into(),
            regions: Vec::new(),
        }
    }

    /// Append a region
    pub fn with_region(mut self, region: RegionInfo) -> Self {
        self.regions.push(region);
        self
    }

    /// Every window description in page order
    pub fn windows(&self) -> impl Iterator<Item = &WindowInfo> {
        self.regions.iter().flat_map(|region| region.windows.iter())
    }
}

/// Description of a region (layout slot) on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    /// Namespace identifying the region across navigations
    pub namespace: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Windows in display order
    #[serde(default)]
    pub windows: Vec<WindowInfo>,
}

impl RegionInfo {
    /// Region without windows
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: None,
            windows: Vec::new(),
        }
    }

    /// Append a window
    pub fn with_window(mut self, window: WindowInfo) -> Self {
        self.windows.push(window);
        self
    }
}

/// Description of a window placing one portlet into a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Namespace prefix handed to the producer
    pub namespace: String,
    /// Id of the producer hosting the portlet
    pub producer: String,
    /// Portlet handle at the producer
    pub portlet: String,
    /// Title shown instead of the portlet's own
    #[serde(default)]
    pub title: Option<String>,
    /// Initial mode
    #[serde(default)]
    pub mode: PortletMode,
    /// Initial window state
    #[serde(default)]
    pub window_state: WindowState,
    /// Whether the title bar is shown
    #[serde(default = "enabled")]
    pub show_title: bool,
    /// Whether the window is drawn with a border
    #[serde(default = "enabled")]
    pub show_border: bool,
    /// Whether the window is shown as a thumbnail
    #[serde(default)]
    pub show_thumbnail: bool,
}

impl WindowInfo {
    /// Window with default presentation
    pub fn new(
        namespace: impl Into<String>,
        producer: impl Into<String>,
        portlet: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            producer: producer.into(),
            portlet: portlet.into(),
            title: None,
            mode: PortletMode::View,
            window_state: WindowState::Normal,
            show_title: true,
            show_border: true,
            show_thumbnail: false,
        }
    }
}
