//! Configuration traits, validation and loading

pub mod loader;
pub mod traits;
pub mod validation;

pub use loader::{ConfigLoader, ConfigPriority, ConfigSource};
pub use traits::{ConfigDefaults, ConfigMerge, ConfigValidation};
pub use validation::{ConfigValidator, ValidationError};
