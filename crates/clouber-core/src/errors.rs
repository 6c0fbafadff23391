//! Unified error handling for Clouber
//!
//! Every failure in the portal is represented by a single [`ClouberError`]
//! carrying a machine-readable [`ErrorCode`] (numeric value plus symbolic
//! name), a human-readable message and the tag of the call that produced it.
//!
//! ## Code ranges
//!
//! ```text
//! 1000-1999  Parameter and configuration errors
//! 2000-2999  Registration errors
//! 3000-3999  Producer operation errors
//! 4000-4999  Page composition errors
//! 9999       Unknown
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use clouber_core::errors::{ClouberError, ErrorCode, Result};
//!
//! fn lookup(handle: &str) -> Result<()> {
//!     Err(ClouberError::portlet_not_found("LocalProducer::get_markup", handle)
//!         .with_context("producer", "local"))
//! }
//!
//! let err = lookup("weather").unwrap_err();
//! assert_eq!(err.code(), ErrorCode::PortletNotFound);
//! assert_eq!(err.code().name(), "PortletNotFound");
//! ```

use crate::i18n::{self, Locale};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error severity classification used to pick the log level of reported errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Debug information, no user-visible impact
    Low,
    /// Affects a single operation, the user can retry
    Medium,
    /// Affects a whole producer or page
    High,
    /// The portal cannot continue
    Critical,
}

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorCode {
    // Parameter and configuration (1000-1999)
    /// A parameter failed validation
    ParameterError = 1001,
    /// A configuration source could not be read
    ConfigLoadError = 1002,
    /// A configuration source could not be parsed
    ConfigParseError = 1003,

    // Registration (2000-2999)
    /// The producer refused to register the consumer
    RegistrationRefused = 2001,
    /// An operation was attempted without a registration context
    NotRegistered = 2002,
    /// The producer does not recognize the registration handle
    InvalidRegistration = 2003,

    // Producer operations (3000-3999)
    /// The producer could not be reached
    ProducerUnreachable = 3001,
    /// The producer does not offer the requested portlet
    PortletNotFound = 3002,
    /// An interaction is already running for the same window
    InteractionInProgress = 3003,
    /// A blocking interaction failed
    InteractionFailed = 3004,
    /// Event delivery failed
    EventHandlingFailed = 3005,
    /// Markup generation failed
    MarkupFailed = 3006,
    /// The portlet does not support the requested mode
    UnsupportedMode = 3007,
    /// The portlet does not support any of the requested mime types
    UnsupportedMimeType = 3008,

    // Page composition (4000-4999)
    /// No page with the requested id is configured
    PageNotFound = 4001,
    /// No control with the requested id exists on the current page
    ControlNotFound = 4002,
    /// A page template theme could not be loaded
    ThemeLoadError = 4003,
    /// A window references a producer that is not configured
    ProducerNotConfigured = 4004,

    /// Unknown or unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// All known codes, in numeric order
    pub const ALL: [ErrorCode; 19] = [
        Self::ParameterError,
        Self::ConfigLoadError,
        Self::ConfigParseError,
        Self::RegistrationRefused,
        Self::NotRegistered,
        Self::InvalidRegistration,
        Self::ProducerUnreachable,
        Self::PortletNotFound,
        Self::InteractionInProgress,
        Self::InteractionFailed,
        Self::EventHandlingFailed,
        Self::MarkupFailed,
        Self::UnsupportedMode,
        Self::UnsupportedMimeType,
        Self::PageNotFound,
        Self::ControlNotFound,
        Self::ThemeLoadError,
        Self::ProducerNotConfigured,
        Self::Unknown,
    ];

    /// Numeric value of the code
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Symbolic name of the code
    pub fn name(self) -> &'static str {
        match self {
            Self::ParameterError => "ParameterError",
            Self::ConfigLoadError => "ConfigLoadError",
            Self::ConfigParseError => "ConfigParseError",
            Self::RegistrationRefused => "RegistrationRefused",
            Self::NotRegistered => "NotRegistered",
            Self::InvalidRegistration => "InvalidRegistration",
            Self::ProducerUnreachable => "ProducerUnreachable",
            Self::PortletNotFound => "PortletNotFound",
            Self::InteractionInProgress => "InteractionInProgress",
            Self::InteractionFailed => "InteractionFailed",
            Self::EventHandlingFailed => "EventHandlingFailed",
            Self::MarkupFailed => "MarkupFailed",
            Self::UnsupportedMode => "UnsupportedMode",
            Self::UnsupportedMimeType => "UnsupportedMimeType",
            Self::PageNotFound => "PageNotFound",
            Self::ControlNotFound => "ControlNotFound",
            Self::ThemeLoadError => "ThemeLoadError",
            Self::ProducerNotConfigured => "ProducerNotConfigured",
            Self::Unknown => "Unknown",
        }
    }

    /// Look up a code by its numeric value
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Look up a code by its symbolic name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// Get the default severity for this error code
    pub fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::ConfigLoadError | Self::ConfigParseError => ErrorSeverity::Critical,

            Self::RegistrationRefused
            | Self::ProducerUnreachable
            | Self::InvalidRegistration
            | Self::ThemeLoadError
            | Self::ProducerNotConfigured => ErrorSeverity::High,

            Self::InteractionInProgress | Self::ControlNotFound => ErrorSeverity::Low,

            _ => ErrorSeverity::Medium,
        }
    }

    /// Localized description of the code
    pub fn describe(self, locale: Locale) -> &'static str {
        i18n::message(self, locale)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

/// Unified error type for all Clouber operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code} in {call}: {message}")]
pub struct ClouberError {
    code: ErrorCode,
    message: String,
    call: String,
    context: BTreeMap<String, String>,
}

impl ClouberError {
    /// Create an error with an explicit code
    pub fn new(code: ErrorCode, call: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            call: call.into(),
            context: BTreeMap::new(),
        }
    }

    /// Add a context key-value pair
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Replace the originating-call tag
    pub fn with_call(mut self, call: impl Into<String>) -> Self {
        self.call = call.into();
        self
    }

    /// Machine-readable code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Symbolic name of the code
    pub fn name(&self) -> &'static str {
        self.code.name()
    }

    /// Detail message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Tag of the call that produced the error
    pub fn call(&self) -> &str {
        &self.call
    }

    /// Context attached with [`with_context`](Self::with_context)
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Severity derived from the code
    pub fn severity(&self) -> ErrorSeverity {
        self.code.default_severity()
    }

    /// Render the localized code description followed by the detail message
    pub fn localized(&self, locale: Locale) -> String {
        let description = self.code.describe(locale);
        if self.message.is_empty() {
            description.to_string()
        } else {
            format!("{description}: {}", self.message)
        }
    }

    /// Create a parameter validation error
    pub fn parameter(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParameterError, call, message)
    }

    /// Create a configuration load error
    pub fn config_load(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigLoadError, call, message)
    }

    /// Create a configuration parse error
    pub fn config_parse(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigParseError, call, message)
    }

    /// Create a registration refused error
    pub fn registration_refused(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RegistrationRefused, call, message)
    }

    /// Create a not registered error for a producer
    pub fn not_registered(call: impl Into<String>, producer: impl Into<String>) -> Self {
        let producer = producer.into();
        Self::new(
            ErrorCode::NotRegistered,
            call,
            format!("no registration context for producer '{producer}'"),
        )
        .with_context("producer", producer)
    }

    /// Create an invalid registration error
    pub fn invalid_registration(call: impl Into<String>, handle: impl Into<String>) -> Self {
        let handle = handle.into();
        Self::new(
            ErrorCode::InvalidRegistration,
            call,
            format!("unknown registration handle '{handle}'"),
        )
    }

    /// Create a producer unreachable error
    pub fn producer_unreachable(call: impl Into<String>, producer: impl Into<String>) -> Self {
        let producer = producer.into();
        Self::new(
            ErrorCode::ProducerUnreachable,
            call,
            format!("producer '{producer}' is unreachable"),
        )
        .with_context("producer", producer)
    }

    /// Create a portlet not found error
    pub fn portlet_not_found(call: impl Into<String>, handle: impl Into<String>) -> Self {
        let handle = handle.into();
        Self::new(
            ErrorCode::PortletNotFound,
            call,
            format!("portlet '{handle}' is not offered"),
        )
        .with_context("portlet", handle)
    }

    /// Create a page not found error
    pub fn page_not_found(call: impl Into<String>, page: impl Into<String>) -> Self {
        let page = page.into();
        Self::new(
            ErrorCode::PageNotFound,
            call,
            format!("page '{page}' is not configured"),
        )
    }

    /// Create a control not found error
    pub fn control_not_found(call: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ControlNotFound,
            call,
            format!("no control with id {id} on the current page"),
        )
    }

    /// Create an internal error with the unknown code
    pub fn unknown(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, call, message)
    }
}

/// Standard Result type for Clouber operations
pub type Result<T> = std::result::Result<T, ClouberError>;

impl From<std::io::Error> for ClouberError {
    fn from(err: std::io::Error) -> Self {
        Self::config_load("io", err.to_string())
    }
}

impl From<toml::de::Error> for ClouberError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_parse("toml", err.to_string())
    }
}

impl From<serde_json::Error> for ClouberError {
    fn from(err: serde_json::Error) -> Self {
        Self::config_parse("json", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_error_display_carries_code_and_call() {
        let err = ClouberError::parameter("PortletInfo::set_portlet_id", "portlet id is empty");
        assert_eq!(
            err.to_string(),
            "ParameterError(1001) in PortletInfo::set_portlet_id: portlet id is empty"
        );
    }

    #[test]
    fn test_code_lookup_round_trips() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
            assert_eq!(ErrorCode::from_name(code.name()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(42), None);
        assert_eq!(ErrorCode::from_name("NoSuchError"), None);
    }

    #[test]
    fn test_codes_fall_in_their_ranges() {
        assert_eq!(ErrorCode::ConfigLoadError.code() / 1000, 1);
        assert_eq!(ErrorCode::NotRegistered.code() / 1000, 2);
        assert_eq!(ErrorCode::MarkupFailed.code() / 1000, 3);
        assert_eq!(ErrorCode::PageNotFound.code() / 1000, 4);
    }

    #[test]
    fn test_context_is_kept() {
        let err = ClouberError::not_registered("ProducerConnection::get_markup", "local");
        assert_eq!(err.context().get("producer").map(String::as_str), Some("local"));
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_localized_message() {
        let err = ClouberError::page_not_found("Portal::navigate", "home");
        assert!(err.localized(Locale::En).ends_with("page 'home' is not configured"));
        assert!(err.localized(Locale::Zh).starts_with(ErrorCode::PageNotFound.describe(Locale::Zh)));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ClouberError::from(io_err);
        assert_matches!(err.code(), ErrorCode::ConfigLoadError);
    }
}
