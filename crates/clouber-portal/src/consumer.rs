//! Consumer-side aggregation
//!
//! [`Portal`] owns the producer connections and the live page. It drives
//! navigation, markup fetching, partial refresh and blocking interactions
//! with event fan-out. Every failed producer or theme call is reported to
//! the [`ErrorReporter`]. Fetch failures never abort aggregation: the window
//! shows an error fragment instead.

use crate::compose::{reconcile, requires_theme_reload, NavigationOutcome};
use crate::config::{ConsumerSettings, PortalConfig};
use crate::controls::{CachedMarkup, Page, Window};
use crate::model::PageInfo;
use crate::registry::{ControlPath, ControlRegistry, RefreshTarget, WindowPath};
use crate::render::{escape_html, HtmlRenderer, PageRenderer};
use crate::theme::{StaticThemeLoader, Theme, ThemeLoader};
use clouber_core::{ClouberError, ControlId, ErrorCode, ErrorReporter, Result};
use clouber_producer::{
    BlockingInteractionResponse, Event, EventParams, InteractionParams, MarkupParams,
    PortletInfo, ProducerConnection, RuntimeContext, ServiceDescription, UpdateResponse,
    UserContext,
};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a blocking interaction
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The producer asked the client to go elsewhere; nothing was updated
    Redirect(String),
    /// The window was updated
    Updated {
        /// Events the interaction published
        published: Vec<Event>,
        /// Windows the events were delivered to, in delivery order
        delivered_to: Vec<ControlId>,
        /// Windows whose markup was fetched again
        refreshed: usize,
    },
}

/// The portal: producers, pages and the page currently shown
pub struct Portal {
    settings: ConsumerSettings,
    user: UserContext,
    session_id: String,
    pages: Vec<PageInfo>,
    producers: BTreeMap<String, ProducerConnection>,
    descriptions: HashMap<String, Vec<PortletInfo>>,
    theme_loader: Arc<dyn ThemeLoader>,
    theme: Option<Theme>,
    reporter: ErrorReporter,
    renderer: HtmlRenderer,
    page: Option<Page>,
    registry: ControlRegistry,
}

impl Portal {
    /// Portal without producers
    pub fn new(
        settings: ConsumerSettings,
        pages: Vec<PageInfo>,
        theme_loader: Arc<dyn ThemeLoader>,
        reporter: ErrorReporter,
    ) -> Self {
        Self {
            settings,
            user: UserContext::anonymous(),
            session_id: Uuid::new_v4().to_string(),
            pages,
            producers: BTreeMap::new(),
            descriptions: HashMap::new(),
            theme_loader,
            theme: None,
            reporter,
            renderer: HtmlRenderer,
            page: None,
            registry: ControlRegistry::new(),
        }
    }

    /// Portal wired from configuration, with one local producer per
    /// configured producer. Relative catalog files resolve against `base_dir`.
    pub fn from_config(config: &PortalConfig, base_dir: Option<&Path>) -> Result<Self> {
        let mut portal = Self::new(
            config.consumer.clone(),
            config.pages.clone(),
            Arc::new(StaticThemeLoader::new(config.themes.iter().cloned())),
            ErrorReporter::from_config(&config.logging),
        );
        for producer in &config.producers {
            let local = producer.build_local(base_dir)?;
            portal.add_producer(ProducerConnection::new(
                producer.id.clone(),
                producer.url(),
                Arc::new(local),
            ));
        }
        Ok(portal)
    }

    /// Act on behalf of a specific user
    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = user;
        self
    }

    /// Add or replace a producer connection
    pub fn add_producer(&mut self, connection: ProducerConnection) {
        let id = connection.id().to_string();
        self.descriptions.remove(&id);
        if self.producers.insert(id.clone(), connection).is_some() {
            warn!(producer = %id, "replaced producer connection");
        }
    }

    /// Connection to a producer
    pub fn producer(&self, id: &str) -> Option<&ProducerConnection> {
        self.producers.get(id)
    }

    /// Ids of every producer, sorted
    pub fn producer_ids(&self) -> impl Iterator<Item = &str> {
        self.producers.keys().map(String::as_str)
    }

    /// Consumer settings
    pub fn settings(&self) -> &ConsumerSettings {
        &self.settings
    }

    /// Central error log
    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Page currently shown
    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// Controls of the current page
    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    /// Composed title of the current page
    pub fn title(&self) -> Option<&str> {
        self.page.as_ref().map(Page::title)
    }

    /// Register with every producer concurrently. Refusals are reported and
    /// leave that producer unregistered. Returns how many producers hold a
    /// registration afterwards.
    pub async fn register_all(&self) -> usize {
        let data = self.settings.registration_data();
        let user = &self.user;
        let attempts = self.producers.values().map(|connection| {
            let data = data.clone();
            async move { connection.register(data, None, user).await }
        });

        let mut registered = 0;
        for result in join_all(attempts).await {
            match result {
                Ok(_) => registered += 1,
                Err(err) => self.reporter.report(&err),
            }
        }
        info!(registered, producers = self.producers.len(), "registered with producers");
        registered
    }

    /// Service description of one producer. Offered portlets are remembered
    /// for event fan-out.
    pub async fn describe(&mut self, producer_id: &str) -> Result<ServiceDescription> {
        let result = match self.connection("Portal::describe", producer_id) {
            Ok(connection) => {
                let locales = vec![self.settings.locale.clone()];
                connection
                    .get_service_description(&locales, None, &self.user)
                    .await
            }
            Err(err) => Err(err),
        };
        let description = self.reported(result)?;
        self.descriptions
            .insert(producer_id.to_string(), description.offered_portlets.clone());
        Ok(description)
    }

    /// Navigate to a page, reconciling the control tree and fetching markup
    /// for every window without fresh markup.
    pub async fn navigate(
        &mut self,
        page_id: &str,
        title_override: Option<&str>,
    ) -> Result<NavigationOutcome> {
        let next = self
            .pages
            .iter()
            .find(|page| page.id == page_id)
            .cloned()
            .ok_or_else(|| ClouberError::page_not_found("Portal::navigate", page_id))?;

        if requires_theme_reload(self.page.as_ref(), &next) {
            let theme = self.theme_loader.load(&next.template).await;
            self.theme = Some(self.reported(theme)?);
        }

        let mut outcome = reconcile(&mut self.page, next, title_override);
        self.rebuild_registry();

        let now = Instant::now();
        let stale: Vec<WindowPath> = self
            .page
            .iter()
            .flat_map(|page| page.windows())
            .filter(|(_, _, window)| window.needs_markup(now))
            .map(|(region, window, _)| WindowPath { region, window })
            .collect();

        for path in stale {
            outcome.fetched += 1;
            if !self.fetch_markup(path).await {
                outcome.failed += 1;
            }
        }

        info!(
            page = %outcome.page_id,
            title = %outcome.title,
            fetched = outcome.fetched,
            failed = outcome.failed,
            "navigated"
        );
        Ok(outcome)
    }

    /// Fetch markup again for the windows `target` resolves to. Returns how
    /// many windows were refreshed.
    pub async fn refresh(&mut self, target: &RefreshTarget) -> Result<usize> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| ClouberError::page_not_found("Portal::refresh", "<none>"))?;
        let paths = self.registry.resolve(target, page)?;
        debug!(%target, windows = paths.len(), "refresh");

        for path in &paths {
            self.fetch_markup(*path).await;
        }
        Ok(paths.len())
    }

    /// Run a blocking interaction on a window, apply its update and deliver
    /// published events to every window whose portlet handles them.
    pub async fn perform_action(
        &mut self,
        window_id: ControlId,
        interaction: &InteractionParams,
    ) -> Result<ActionOutcome> {
        const CALL: &str = "Portal::perform_action";
        let origin = self.window_path(CALL, window_id)?;
        let (producer_id, handle, runtime, params) = self.request_for(origin)?;

        let result = match self.connection(CALL, &producer_id) {
            Ok(connection) => {
                connection
                    .perform_blocking_interaction(&handle, &runtime, &self.user, &params, interaction)
                    .await
            }
            Err(err) => Err(err),
        };
        let response = self.reported(result)?;

        let update = match response {
            BlockingInteractionResponse::Redirect(url) => {
                info!(window = %window_id, %url, "interaction redirected");
                return Ok(ActionOutcome::Redirect(url));
            }
            BlockingInteractionResponse::Update(update) => update,
        };

        let published = update.events.clone();
        let mut touched = Vec::new();
        if !self.apply_update(origin, update) {
            touched.push(origin);
        }

        let delivered_to = self.fan_out(&published, &mut touched).await;

        let now = Instant::now();
        let mut refreshed = 0;
        for path in touched {
            let needs_markup = self
                .page
                .as_ref()
                .and_then(|page| page.window(path.region, path.window))
                .is_some_and(|window| window.needs_markup(now));
            if needs_markup {
                self.fetch_markup(path).await;
                refreshed += 1;
            }
        }

        info!(
            window = %window_id,
            published = published.len(),
            delivered = delivered_to.len(),
            refreshed,
            "interaction complete"
        );
        Ok(ActionOutcome::Updated {
            published,
            delivered_to,
            refreshed,
        })
    }

    /// Aggregated HTML of the current page
    pub fn render(&self) -> Result<String> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| ClouberError::page_not_found("Portal::render", "<none>"))?;
        let theme = self.theme.as_ref().ok_or_else(|| {
            ClouberError::new(ErrorCode::ThemeLoadError, "Portal::render", "no theme loaded")
        })?;
        Ok(self.renderer.render_page(page, theme))
    }

    fn reported<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.reporter.report(err);
        }
        result
    }

    fn rebuild_registry(&mut self) {
        match &self.page {
            Some(page) => self.registry.rebuild(page),
            None => self.registry.clear(),
        }
    }

    fn connection(&self, call: &str, producer_id: &str) -> Result<&ProducerConnection> {
        self.producers.get(producer_id).ok_or_else(|| {
            ClouberError::new(
                ErrorCode::ProducerNotConfigured,
                call,
                format!("no producer '{producer_id}' is configured"),
            )
            .with_context("producer", producer_id)
        })
    }

    fn window_path(&self, call: &str, id: ControlId) -> Result<WindowPath> {
        match self.registry.lookup(id) {
            Some(ControlPath::Window(path)) => Ok(path),
            Some(_) => Err(ClouberError::parameter(call, format!("control {id} is not a window"))
                .with_context("control", id.to_string())),
            None => Err(ClouberError::control_not_found(call, id)),
        }
    }

    fn window(&self, path: WindowPath) -> Option<&Window> {
        self.page.as_ref()?.window(path.region, path.window)
    }

    fn window_mut(&mut self, path: WindowPath) -> Option<&mut Window> {
        self.page.as_mut()?.window_mut(path.region, path.window)
    }

    /// Producer id, portlet handle and call parameters for a window
    fn request_for(
        &self,
        path: WindowPath,
    ) -> Result<(String, String, RuntimeContext, MarkupParams)> {
        let window = self.window(path).ok_or_else(|| {
            ClouberError::control_not_found(
                "Portal::request_for",
                format!("{}/{}", path.region, path.window),
            )
        })?;

        let runtime = RuntimeContext {
            namespace_prefix: window.namespace().to_string(),
            portlet_instance_key: Some(window.namespace().to_string()),
            session_id: Some(self.session_id.clone()),
            user_authentication: "none".to_string(),
        };
        let params = MarkupParams {
            locales: vec![self.settings.locale.clone()],
            mime_types: self.settings.mime_types.clone(),
            mode: window.mode().clone(),
            window_state: window.window_state().clone(),
            navigational_state: window.navigational_state().map(str::to_string),
            secure_client_communication: self.settings.secure,
            valid_new_modes: self.settings.modes.clone(),
            valid_new_window_states: self.settings.window_states.clone(),
        };
        Ok((
            window.producer_id().to_string(),
            window.portlet_handle().to_string(),
            runtime,
            params,
        ))
    }

    /// Fetch markup for one window. Failures are reported and replaced by an
    /// error fragment. Returns whether real markup was stored.
    async fn fetch_markup(&mut self, path: WindowPath) -> bool {
        const CALL: &str = "Portal::fetch_markup";
        let result = match self.request_for(path) {
            Ok((producer_id, handle, runtime, params)) => match self.connection(CALL, &producer_id) {
                Ok(connection) => {
                    connection
                        .get_markup(&handle, &runtime, &self.user, &params)
                        .await
                }
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        let now = Instant::now();
        match result {
            Ok(context) => {
                if let Some(window) = self.window_mut(path) {
                    window.set_markup(CachedMarkup::from_context(&context, now));
                    if context.preferred_title.is_some() {
                        window.set_preferred_title(context.preferred_title);
                    }
                }
                true
            }
            Err(err) => {
                self.reporter.report(&err);
                let fragment = format!(
                    "<div class=\"clouber-error\" data-code=\"{}\">{}</div>",
                    err.code().code(),
                    escape_html(&err.localized(self.settings.locale()))
                );
                if let Some(window) = self.window_mut(path) {
                    warn!(
                        window = %window.id(),
                        portlet = window.portlet_handle(),
                        code = %err.code(),
                        "substituted error fragment"
                    );
                    window.set_failed(CachedMarkup::substitute(fragment, now));
                }
                false
            }
        }
    }

    /// Apply an interaction or event update to a window. Returns whether
    /// the update carried markup, which then serves the current aggregation.
    fn apply_update(&mut self, path: WindowPath, update: UpdateResponse) -> bool {
        let now = Instant::now();
        let Some(window) = self.window_mut(path) else {
            return false;
        };
        if update.navigational_state.is_some() {
            window.set_navigational_state(update.navigational_state);
        }
        if let Some(mode) = update.new_mode {
            window.set_mode(mode);
        }
        if let Some(state) = update.new_window_state {
            window.set_window_state(state);
        }
        match update.markup_context {
            Some(context) => {
                window.set_markup(CachedMarkup::from_context(&context, now));
                true
            }
            None => {
                window.invalidate();
                false
            }
        }
    }

    /// Make sure the portlet descriptions of a producer are known. A failed
    /// describe is not remembered, so the next fan-out asks again.
    async fn ensure_described(&mut self, producer_id: &str) -> bool {
        self.descriptions.contains_key(producer_id) || self.describe(producer_id).await.is_ok()
    }

    fn portlet_info(&self, producer_id: &str, handle: &str) -> Option<&PortletInfo> {
        self.descriptions
            .get(producer_id)?
            .iter()
            .find(|portlet| portlet.portlet_id() == handle)
    }

    /// Deliver `events` to every window declaring them, in page order.
    /// Windows whose update carried no markup are added to `touched`.
    async fn fan_out(&mut self, events: &[Event], touched: &mut Vec<WindowPath>) -> Vec<ControlId> {
        const CALL: &str = "Portal::fan_out";
        if events.is_empty() {
            return Vec::new();
        }

        let targets: Vec<(WindowPath, String, String)> = self
            .page
            .iter()
            .flat_map(|page| page.windows())
            .map(|(region, window, w)| {
                (
                    WindowPath { region, window },
                    w.producer_id().to_string(),
                    w.portlet_handle().to_string(),
                )
            })
            .collect();

        let producers: BTreeSet<&str> = targets
            .iter()
            .map(|(_, producer, _)| producer.as_str())
            .collect();
        for producer_id in producers {
            self.ensure_described(producer_id).await;
        }

        let mut delivered_to = Vec::new();
        for (path, producer_id, handle) in &targets {
            let (path, producer_id, handle) = (*path, producer_id.as_str(), handle.as_str());
            let handled: Vec<Event> = self
                .portlet_info(producer_id, handle)
                .map(|info| {
                    events
                        .iter()
                        .filter(|event| info.handles_event(&event.name))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if handled.is_empty() {
                continue;
            }

            let (_, _, runtime, params) = match self.request_for(path) {
                Ok(request) => request,
                Err(err) => {
                    self.reporter.report(&err);
                    continue;
                }
            };
            let result = match self.connection(CALL, producer_id) {
                Ok(connection) => {
                    connection
                        .handle_events(
                            handle,
                            &runtime,
                            &self.user,
                            &params,
                            &EventParams { events: handled },
                        )
                        .await
                }
                Err(err) => Err(err),
            };

            match result {
                Ok(response) => {
                    for failure in &response.failed_events {
                        self.reporter.report(
                            &ClouberError::new(
                                ErrorCode::EventHandlingFailed,
                                CALL,
                                failure.reason.clone(),
                            )
                            .with_context("event", failure.name.clone())
                            .with_context("portlet", handle),
                        );
                    }
                    if let Some(window) = self.window(path) {
                        delivered_to.push(window.id());
                    }
                    if !self.apply_update(path, response.update) && !touched.contains(&path) {
                        touched.push(path);
                    }
                }
                Err(err) => self.reporter.report(&err),
            }
        }
        delivered_to
    }
}
