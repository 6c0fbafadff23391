//! Core configuration traits

use crate::ClouberError;

/// Configuration validation trait
pub trait ConfigValidation {
    /// Validate the configuration
    fn validate(&self) -> Result<(), ClouberError>;
}

/// Configuration merging trait
///
/// Values in `other` take precedence over values already in `self`.
pub trait ConfigMerge<T> {
    /// Merge another configuration into this one
    fn merge_with(&mut self, other: &T) -> Result<(), ClouberError>;
}

/// Configuration defaults trait
pub trait ConfigDefaults {
    /// Create configuration with default values
    fn defaults() -> Self;
}
