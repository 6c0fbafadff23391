//! Producer errors using the unified error system
//!
//! Producer errors are `ClouberError`s with producer-specific codes. This
//! module only adds constructors so call sites read as the failure they
//! describe.

pub use clouber_core::{ClouberError, ErrorCode, ErrorSeverity, Result};

/// Builder providing producer-specific error constructors
pub struct ProducerErrorBuilder;

impl ProducerErrorBuilder {
    /// Producer refused the registration
    pub fn registration_refused(call: &str, reason: impl Into<String>) -> ClouberError {
        ClouberError::registration_refused(call, reason)
    }

    /// Call made without a registration context
    pub fn not_registered(call: &str, producer: &str) -> ClouberError {
        ClouberError::not_registered(call, producer)
    }

    /// Producer does not know the registration handle
    pub fn invalid_registration(call: &str, handle: &str) -> ClouberError {
        ClouberError::invalid_registration(call, handle)
    }

    /// Producer is down
    pub fn unreachable(call: &str, producer: &str) -> ClouberError {
        ClouberError::producer_unreachable(call, producer)
    }

    /// Portlet handle is not offered
    pub fn portlet_not_found(call: &str, handle: &str) -> ClouberError {
        ClouberError::portlet_not_found(call, handle)
    }

    /// Another interaction is running for the same window
    pub fn interaction_in_progress(call: &str, namespace: &str) -> ClouberError {
        ClouberError::new(
            ErrorCode::InteractionInProgress,
            call,
            format!("an interaction is already running for window '{namespace}'"),
        )
        .with_context("namespace", namespace)
    }

    /// Portlet failed to process an interaction
    pub fn interaction_failed(call: &str, handle: &str, reason: impl Into<String>) -> ClouberError {
        ClouberError::new(ErrorCode::InteractionFailed, call, reason).with_context("portlet", handle)
    }

    /// Portlet failed to process events
    pub fn event_handling_failed(
        call: &str,
        handle: &str,
        reason: impl Into<String>,
    ) -> ClouberError {
        ClouberError::new(ErrorCode::EventHandlingFailed, call, reason)
            .with_context("portlet", handle)
    }

    /// Portlet failed to render
    pub fn markup_failed(call: &str, handle: &str, reason: impl Into<String>) -> ClouberError {
        ClouberError::new(ErrorCode::MarkupFailed, call, reason).with_context("portlet", handle)
    }

    /// Portlet cannot render the requested mode
    pub fn unsupported_mode(call: &str, handle: &str, mode: &str) -> ClouberError {
        ClouberError::new(
            ErrorCode::UnsupportedMode,
            call,
            format!("portlet '{handle}' does not support mode '{mode}'"),
        )
        .with_context("portlet", handle)
    }

    /// Portlet cannot render any requested mime type
    pub fn unsupported_mime_type(call: &str, handle: &str, requested: &[String]) -> ClouberError {
        ClouberError::new(
            ErrorCode::UnsupportedMimeType,
            call,
            format!(
                "portlet '{handle}' renders none of [{}]",
                requested.join(", ")
            ),
        )
        .with_context("portlet", handle)
    }
}
