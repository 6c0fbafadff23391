//! Request and response types of the producer protocol

use crate::portlet_info::PortletInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

fn strip_wsrp_prefix(raw: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    match lowered.strip_prefix("wsrp:") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Portlet mode requested for rendering or interaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PortletMode {
    /// Normal display
    #[default]
    View,
    /// Personalization
    Edit,
    /// Help content
    Help,
    /// Producer-specific mode
    Custom(String),
}

impl PortletMode {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Help => "help",
            Self::Custom(name) => name,
        }
    }
}

impl FromStr for PortletMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = strip_wsrp_prefix(s);
        Ok(match name.as_str() {
            "view" => Self::View,
            "edit" => Self::Edit,
            "help" => Self::Help,
            _ => Self::Custom(name),
        })
    }
}

impl From<String> for PortletMode {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        }
    }
}

impl From<PortletMode> for String {
    fn from(value: PortletMode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PortletMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Window state requested for rendering
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WindowState {
    /// Shares the region with other windows
    #[default]
    Normal,
    /// Only the title bar is shown
    Minimized,
    /// Takes most of the page
    Maximized,
    /// The only window on the page
    Solo,
    /// Producer-specific state
    Custom(String),
}

impl WindowState {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &str {
        match self {
            Self::Normal => "normal",
            Self::Minimized => "minimized",
            Self::Maximized => "maximized",
            Self::Solo => "solo",
            Self::Custom(name) => name,
        }
    }
}

impl FromStr for WindowState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = strip_wsrp_prefix(s);
        Ok(match name.as_str() {
            "normal" => Self::Normal,
            "minimized" => Self::Minimized,
            "maximized" => Self::Maximized,
            "solo" => Self::Solo,
            _ => Self::Custom(name),
        })
    }
}

impl From<String> for WindowState {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(state) => state,
            Err(never) => match never {},
        }
    }
}

impl From<WindowState> for String {
    fn from(value: WindowState) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumer capabilities sent with a registration request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistrationData {
    /// Name identifying the consumer
    pub consumer_name: String,
    /// Consumer software and version
    pub consumer_agent: String,
    /// Whether the consumer can issue GET requests for interactions
    pub method_get_supported: bool,
    /// Modes the consumer knows how to render
    pub consumer_modes: Vec<PortletMode>,
    /// Window states the consumer knows how to render
    pub consumer_window_states: Vec<WindowState>,
    /// Cache user scopes the consumer honors
    pub consumer_user_scopes: Vec<String>,
    /// Free-form registration properties
    pub registration_properties: BTreeMap<String, String>,
}

impl RegistrationData {
    /// Registration data with the standard modes and window states
    pub fn new(consumer_name: impl Into<String>, consumer_agent: impl Into<String>) -> Self {
        Self {
            consumer_name: consumer_name.into(),
            consumer_agent: consumer_agent.into(),
            method_get_supported: true,
            consumer_modes: vec![PortletMode::View, PortletMode::Edit, PortletMode::Help],
            consumer_window_states: vec![
                WindowState::Normal,
                WindowState::Minimized,
                WindowState::Maximized,
            ],
            consumer_user_scopes: Vec::new(),
            registration_properties: BTreeMap::new(),
        }
    }
}

/// Requested or granted registration lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    /// Time until the registration is destroyed
    pub termination_after: Duration,
    /// Interval after which a fresh context is issued
    pub refresh_duration: Option<Duration>,
}

/// Opaque handle identifying a registration at a producer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistrationHandle(pub String);

impl RegistrationHandle {
    /// Borrow the handle text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque session between one consumer and one producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationContext {
    /// Handle required by every subsequent call
    pub registration_handle: RegistrationHandle,
    /// Opaque producer state echoed back on each call
    pub registration_state: Option<Vec<u8>>,
    /// Lifetime granted by the producer
    pub scheduled_destruction: Option<Lifetime>,
}

/// Identity of the end user on whose behalf a call is made
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserContext {
    /// Stable key for the user
    pub user_context_key: String,
    /// Categories the consumer assigned to the user
    pub user_categories: Vec<String>,
    /// Profile attributes
    pub profile: BTreeMap<String, String>,
}

impl UserContext {
    /// Anonymous user
    pub fn anonymous() -> Self {
        Self {
            user_context_key: "anonymous".to_string(),
            ..Self::default()
        }
    }
}

/// Per-window runtime information
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeContext {
    /// Prefix the producer uses to namespace markup tokens
    pub namespace_prefix: String,
    /// Key of the portlet instance rendered in the window
    pub portlet_instance_key: Option<String>,
    /// Consumer session id
    pub session_id: Option<String>,
    /// How the user authenticated with the consumer
    pub user_authentication: String,
}

impl RuntimeContext {
    /// Runtime context for a window namespace
    pub fn for_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace_prefix: namespace.into(),
            user_authentication: "none".to_string(),
            ..Self::default()
        }
    }
}

/// Markup-related parameters of a call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarkupParams {
    /// Locales in order of preference
    pub locales: Vec<String>,
    /// Mime types in order of preference
    pub mime_types: Vec<String>,
    /// Current mode
    pub mode: PortletMode,
    /// Current window state
    pub window_state: WindowState,
    /// Opaque navigational state from the previous interaction
    pub navigational_state: Option<String>,
    /// Whether the client talks to the consumer over a secure channel
    pub secure_client_communication: bool,
    /// Modes the portlet may switch to
    pub valid_new_modes: Vec<PortletMode>,
    /// Window states the portlet may switch to
    pub valid_new_window_states: Vec<WindowState>,
}

/// Parameters of a blocking interaction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InteractionParams {
    /// Opaque state encoded in the interaction URL
    pub interaction_state: Option<String>,
    /// Submitted form parameters
    pub form_parameters: Vec<(String, String)>,
}

/// Portlet event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Qualified event name
    pub name: String,
    /// Event payload
    pub payload: Option<serde_json::Value>,
}

impl Event {
    /// Event without payload
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    /// Event with a payload
    pub fn with_payload(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload),
        }
    }
}

/// Parameters of an event delivery
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventParams {
    /// Events to deliver, in order
    pub events: Vec<Event>,
}

/// Cache directives attached to a markup fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    /// Seconds the fragment stays valid; `-1` never expires
    pub expires: i64,
    /// Scope the fragment may be shared in
    pub user_scope: String,
    /// Tag used to revalidate the fragment
    pub validate_tag: Option<String>,
}

impl CacheControl {
    /// Expiry as a duration, `None` when the fragment never expires
    pub fn expiry(&self) -> Option<Duration> {
        if self.expires < 0 {
            None
        } else {
            Some(Duration::from_secs(self.expires.unsigned_abs()))
        }
    }
}

/// Rendered markup fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupContext {
    /// Markup text
    pub markup: String,
    /// Mime type of the markup
    pub mime_type: String,
    /// Locale the markup was rendered in
    pub locale: Option<String>,
    /// Title the portlet would like the window to show
    pub preferred_title: Option<String>,
    /// Cache directives; absent means do not cache
    pub cache_control: Option<CacheControl>,
    /// Whether `wsrp_rewrite_` tokens must be replaced by the consumer
    pub requires_rewriting: bool,
}

/// State changes produced by an interaction or event delivery
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// Navigational state for subsequent renders
    pub navigational_state: Option<String>,
    /// Mode the portlet switched to
    pub new_mode: Option<PortletMode>,
    /// Window state the portlet switched to
    pub new_window_state: Option<WindowState>,
    /// Events published for other portlets
    pub events: Vec<Event>,
    /// Markup rendered as part of the update
    pub markup_context: Option<MarkupContext>,
}

/// Result of a blocking interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockingInteractionResponse {
    /// The portlet updated its state
    Update(UpdateResponse),
    /// The consumer should redirect the client
    Redirect(String),
}

/// Event the portlet could not process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFailure {
    /// Name of the event
    pub name: String,
    /// Why the event was rejected
    pub reason: String,
}

/// Result of an event delivery
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandleEventsResponse {
    /// Accumulated state change
    pub update: UpdateResponse,
    /// Events that were not processed
    pub failed_events: Vec<EventFailure>,
}

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceDescription {
    /// Portlets the producer offers
    pub offered_portlets: Vec<PortletInfo>,
    /// Whether calls require a registration
    pub requires_registration: bool,
    /// Locales the producer supports
    pub locales: Vec<String>,
    /// Fresh registration context, when the producer issued one
    pub registration_context: Option<RegistrationContext>,
}
