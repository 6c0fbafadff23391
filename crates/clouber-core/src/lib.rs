//! Core shared types for the Clouber portal
//!
//! This crate holds the pieces every other Clouber crate builds on:
//!
//! - `errors`: the unified [`ClouberError`] with numeric codes and symbolic names
//! - `i18n`: the English/Chinese message table used to localize errors
//! - `identifiers`: process-unique [`ControlId`]s for pages, regions and windows
//! - `config`: configuration traits, validation and source-tracking loader
//! - `reporting`: the central error log that swallowed failures are routed to

pub mod config;
pub mod errors;
pub mod i18n;
pub mod identifiers;
pub mod reporting;

pub use errors::{ClouberError, ErrorCode, ErrorSeverity, Result};
pub use i18n::Locale;
pub use identifiers::{ControlId, LazyControlId};
pub use reporting::{ErrorReporter, LoggingConfig};
