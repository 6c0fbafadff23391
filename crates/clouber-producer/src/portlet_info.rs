//! Portlet metadata
//!
//! Fields are validated on assignment. Only the portlet id is strict: an
//! empty id is rejected with an error. Every other invalid assignment is
//! logged and the previous value is kept, so a partially bad description
//! still yields a usable portlet.

use crate::types::{PortletMode, WindowState};
use clouber_core::{ClouberError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One mime type a portlet can render, with the modes available for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupType {
    /// Mime type of the markup
    pub mime_type: String,
    /// Modes supported for this mime type
    pub modes: Vec<PortletMode>,
    /// Window states supported for this mime type
    pub window_states: Vec<WindowState>,
    /// Locales the markup is available in
    pub locales: Vec<String>,
}

impl MarkupType {
    /// Markup type with the given modes and the standard window states
    pub fn new(mime_type: impl Into<String>, modes: Vec<PortletMode>) -> Self {
        Self {
            mime_type: mime_type.into(),
            modes,
            window_states: vec![WindowState::Normal, WindowState::Minimized, WindowState::Maximized],
            locales: Vec::new(),
        }
    }

    fn matches_mime(&self, mime_type: &str) -> bool {
        self.mime_type == "*" || self.mime_type.eq_ignore_ascii_case(mime_type)
    }
}

/// Boolean behavior and security flags of a portlet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortletFlag {
    /// Markup must only be served over secure channels
    OnlySecure,
    /// The producer keeps user context in its session
    UserContextStoredInSession,
    /// The producer keeps URL templates in its session
    TemplatesStoredInSession,
    /// The portlet stores per-user state
    HasUserSpecificState,
    /// The portlet writes URLs from consumer templates
    DoesUrlTemplateProcessing,
    /// Interactions may be sent with GET
    UsesMethodGet,
}

impl PortletFlag {
    /// Every flag
    pub const ALL: [PortletFlag; 6] = [
        Self::OnlySecure,
        Self::UserContextStoredInSession,
        Self::TemplatesStoredInSession,
        Self::HasUserSpecificState,
        Self::DoesUrlTemplateProcessing,
        Self::UsesMethodGet,
    ];

    /// Catalog key of the flag
    pub fn key(self) -> &'static str {
        match self {
            Self::OnlySecure => "onlySecure",
            Self::UserContextStoredInSession => "userContextStoredInSession",
            Self::TemplatesStoredInSession => "templatesStoredInSession",
            Self::HasUserSpecificState => "hasUserSpecificState",
            Self::DoesUrlTemplateProcessing => "doesUrlTemplateProcessing",
            Self::UsesMethodGet => "usesMethodGet",
        }
    }

    /// Look up a flag by catalog key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|flag| flag.key() == key)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Metadata describing one portlet offered by a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortletInfo {
    portlet_id: String,
    display_name: Option<String>,
    title: Option<String>,
    short_title: Option<String>,
    description: Option<String>,
    keywords: Vec<String>,
    group_id: Option<String>,
    markup_types: Vec<MarkupType>,
    init_params: Vec<(String, String)>,
    handled_events: Vec<String>,
    published_events: Vec<String>,
    flags: [bool; 6],
}

impl PortletInfo {
    /// Create a description for a portlet id
    pub fn new(portlet_id: impl Into<String>) -> Result<Self> {
        let mut info = Self {
            portlet_id: String::new(),
            display_name: None,
            title: None,
            short_title: None,
            description: None,
            keywords: Vec::new(),
            group_id: None,
            markup_types: Vec::new(),
            init_params: Vec::new(),
            handled_events: Vec::new(),
            published_events: Vec::new(),
            flags: [false; 6],
        };
        info.set_portlet_id(portlet_id)?;
        Ok(info)
    }

    /// Portlet handle
    pub fn portlet_id(&self) -> &str {
        &self.portlet_id
    }

    /// Assign the portlet handle. Blank ids are rejected.
    pub fn set_portlet_id(&mut self, portlet_id: impl Into<String>) -> Result<()> {
        let portlet_id = portlet_id.into();
        if portlet_id.trim().is_empty() {
            return Err(ClouberError::parameter(
                "PortletInfo::set_portlet_id",
                "portlet id must not be empty",
            ));
        }
        self.portlet_id = portlet_id;
        Ok(())
    }

    /// Display name, if one was assigned
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Assign the display name; blank names are rejected
    pub fn set_display_name(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.trim().is_empty() {
            self.reject("displayName", &name, "display name must not be empty");
            return false;
        }
        self.display_name = Some(name);
        true
    }

    /// Title for window decorations, falling back to display name and id
    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.display_name.as_deref())
            .unwrap_or(&self.portlet_id)
    }

    /// Assign the title; blank titles are rejected
    pub fn set_title(&mut self, title: impl Into<String>) -> bool {
        let title = title.into();
        if title.trim().is_empty() {
            self.reject("title", &title, "title must not be empty");
            return false;
        }
        self.title = Some(title);
        true
    }

    /// Short title
    pub fn short_title(&self) -> Option<&str> {
        self.short_title.as_deref()
    }

    /// Assign the short title
    pub fn set_short_title(&mut self, short_title: impl Into<String>) -> bool {
        self.short_title = Some(short_title.into());
        true
    }

    /// Description
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Assign the description
    pub fn set_description(&mut self, description: impl Into<String>) -> bool {
        self.description = Some(description.into());
        true
    }

    /// Search keywords
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Add a keyword; blank keywords are rejected
    pub fn add_keyword(&mut self, keyword: impl Into<String>) -> bool {
        let keyword = keyword.into();
        if keyword.trim().is_empty() {
            self.reject("keyword", &keyword, "keyword must not be empty");
            return false;
        }
        if !self.keywords.contains(&keyword) {
            self.keywords.push(keyword);
        }
        true
    }

    /// Group (namespace) the portlet belongs to
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// Assign the group; blank groups and groups containing whitespace are rejected
    pub fn set_group_id(&mut self, group_id: impl Into<String>) -> bool {
        let group_id = group_id.into();
        if group_id.is_empty() || group_id.chars().any(char::is_whitespace) {
            self.reject("groupID", &group_id, "group id must be a non-empty token");
            return false;
        }
        self.group_id = Some(group_id);
        true
    }

    /// Supported markup types
    pub fn markup_types(&self) -> &[MarkupType] {
        &self.markup_types
    }

    /// Replace the markup types; an empty list or a blank mime type is rejected
    pub fn set_markup_types(&mut self, markup_types: Vec<MarkupType>) -> bool {
        if markup_types.is_empty() {
            self.reject("markupTypes", "[]", "at least one markup type is required");
            return false;
        }
        if let Some(bad) = markup_types.iter().find(|m| m.mime_type.trim().is_empty()) {
            self.reject("markupTypes", &bad.mime_type, "mime type must not be empty");
            return false;
        }
        self.markup_types = markup_types;
        true
    }

    /// Append a markup type; a blank mime type is rejected
    pub fn add_markup_type(&mut self, markup_type: MarkupType) -> bool {
        if markup_type.mime_type.trim().is_empty() {
            self.reject("markupType", "", "mime type must not be empty");
            return false;
        }
        self.markup_types.push(markup_type);
        true
    }

    /// Init parameters, in declaration order
    pub fn init_params(&self) -> &[(String, String)] {
        &self.init_params
    }

    /// Look up an init parameter
    pub fn init_param(&self, name: &str) -> Option<&str> {
        self.init_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an init parameter, replacing an existing value; blank names are rejected
    pub fn set_init_param(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if name.trim().is_empty() {
            self.reject("initParam", &name, "init parameter name must not be empty");
            return false;
        }
        let value = value.into();
        match self.init_params.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.init_params.push((name, value)),
        }
        true
    }

    /// Events the portlet processes
    pub fn handled_events(&self) -> &[String] {
        &self.handled_events
    }

    /// Declare a handled event; blank names are rejected
    pub fn add_handled_event(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.trim().is_empty() {
            self.reject("handledEvent", &name, "event name must not be empty");
            return false;
        }
        if !self.handled_events.contains(&name) {
            self.handled_events.push(name);
        }
        true
    }

    /// Whether the portlet declares the event as handled
    pub fn handles_event(&self, name: &str) -> bool {
        self.handled_events.iter().any(|event| event == name)
    }

    /// Events the portlet publishes
    pub fn published_events(&self) -> &[String] {
        &self.published_events
    }

    /// Declare a published event; blank names are rejected
    pub fn add_published_event(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.trim().is_empty() {
            self.reject("publishedEvent", &name, "event name must not be empty");
            return false;
        }
        if !self.published_events.contains(&name) {
            self.published_events.push(name);
        }
        true
    }

    /// Current value of a flag
    pub fn flag(&self, flag: PortletFlag) -> bool {
        self.flags[flag.index()]
    }

    /// Assign a flag
    pub fn set_flag(&mut self, flag: PortletFlag, value: bool) {
        self.flags[flag.index()] = value;
    }

    /// Assign a flag from its textual form; anything but `true`/`false` is rejected
    pub fn set_flag_str(&mut self, flag: PortletFlag, raw: &str) -> bool {
        match raw.trim() {
            "true" => {
                self.set_flag(flag, true);
                true
            }
            "false" => {
                self.set_flag(flag, false);
                true
            }
            other => {
                self.reject(flag.key(), other, "flag must be 'true' or 'false'");
                false
            }
        }
    }

    /// Whether markup is only served over secure channels
    pub fn only_secure(&self) -> bool {
        self.flag(PortletFlag::OnlySecure)
    }

    /// Modes supported by any markup type, in declaration order
    pub fn supported_modes(&self) -> Vec<PortletMode> {
        let mut modes: Vec<PortletMode> = Vec::new();
        for mode in self.markup_types.iter().flat_map(|m| m.modes.iter()) {
            if !modes.contains(mode) {
                modes.push(mode.clone());
            }
        }
        modes
    }

    /// First markup type matching one of the requested mime types.
    ///
    /// A portlet without markup types accepts any mime type.
    pub fn negotiate<'a>(&'a self, mime_types: &'a [String]) -> Option<&'a str> {
        if self.markup_types.is_empty() {
            return Some(mime_types.first().map(String::as_str).unwrap_or("text/html"));
        }
        if mime_types.is_empty() {
            return self.markup_types.first().map(|m| m.mime_type.as_str());
        }
        mime_types.iter().find_map(|wanted| {
            self.markup_types
                .iter()
                .find(|m| m.matches_mime(wanted))
                .map(|_| wanted.as_str())
        })
    }

    /// Whether the portlet renders `mode` for `mime_type`
    pub fn supports(&self, mime_type: &str, mode: &PortletMode) -> bool {
        if self.markup_types.is_empty() {
            return true;
        }
        self.markup_types
            .iter()
            .filter(|m| m.matches_mime(mime_type))
            .any(|m| m.modes.is_empty() || m.modes.contains(mode))
    }

    fn reject(&self, field: &str, value: &str, reason: &str) {
        warn!(
            portlet = %self.portlet_id,
            field,
            value,
            reason,
            "rejected portlet field assignment, keeping previous value"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clouber_core::ErrorCode;

    fn html(modes: &[PortletMode]) -> MarkupType {
        MarkupType::new("text/html", modes.to_vec())
    }

    #[test]
    fn test_empty_portlet_id_raises() {
        let err = PortletInfo::new("  ").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParameterError);

        let mut info = PortletInfo::new("weather").unwrap();
        assert!(info.set_portlet_id("").is_err());
        assert_eq!(info.portlet_id(), "weather");
    }

    #[test]
    fn test_invalid_assignments_keep_previous_value() {
        let mut info = PortletInfo::new("weather").unwrap();
        assert!(info.set_display_name("Weather"));
        assert!(!info.set_display_name(" "));
        assert_eq!(info.display_name(), Some("Weather"));

        assert!(info.set_group_id("news"));
        assert!(!info.set_group_id("two words"));
        assert_eq!(info.group_id(), Some("news"));

        assert!(info.set_markup_types(vec![html(&[PortletMode::View])]));
        assert!(!info.set_markup_types(Vec::new()));
        assert_eq!(info.markup_types().len(), 1);
    }

    #[test]
    fn test_non_boolean_flags_are_rejected() {
        let mut info = PortletInfo::new("weather").unwrap();
        assert!(info.set_flag_str(PortletFlag::OnlySecure, "true"));
        assert!(!info.set_flag_str(PortletFlag::OnlySecure, "yes"));
        assert!(info.only_secure());
    }

    #[test]
    fn test_title_fallbacks() {
        let mut info = PortletInfo::new("weather").unwrap();
        assert_eq!(info.title(), "weather");
        info.set_display_name("Weather");
        assert_eq!(info.title(), "Weather");
        info.set_title("Weather Now");
        assert_eq!(info.title(), "Weather Now");
    }

    #[test]
    fn test_mode_support_and_negotiation() {
        let mut info = PortletInfo::new("weather").unwrap();
        info.add_markup_type(html(&[PortletMode::View, PortletMode::Edit]));
        info.add_markup_type(MarkupType::new("text/plain", vec![PortletMode::View]));

        assert!(info.supports("text/html", &PortletMode::Edit));
        assert!(!info.supports("text/plain", &PortletMode::Edit));
        assert!(!info.supports("application/json", &PortletMode::View));
        assert_eq!(info.supported_modes(), vec![PortletMode::View, PortletMode::Edit]);

        let wanted = vec!["application/json".to_string(), "text/plain".to_string()];
        assert_eq!(info.negotiate(&wanted), Some("text/plain"));
        assert_eq!(info.negotiate(&["image/png".to_string()]), None);
    }

    #[test]
    fn test_init_params_replace_in_place() {
        let mut info = PortletInfo::new("weather").unwrap();
        info.set_init_param("city", "Shanghai");
        info.set_init_param("units", "metric");
        info.set_init_param("city", "Beijing");
        assert_eq!(info.init_params().len(), 2);
        assert_eq!(info.init_param("city"), Some("Beijing"));
        assert!(!info.set_init_param("", "x"));
    }
}
