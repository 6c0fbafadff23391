//! Configuration validation utilities and rules

use crate::ClouberError;
use std::collections::HashSet;
use std::fmt;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value is required but missing or empty
    Required { field: String },
    /// Value is out of acceptable range
    OutOfRange {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
        actual: f64,
    },
    /// Value appears more than once where it must be unique
    Duplicate { field: String, value: String },
    /// Custom validation failed
    Custom { field: String, message: String },
}

impl ValidationError {
    /// Fully qualified name of the offending field
    pub fn field(&self) -> &str {
        match self {
            Self::Required { field }
            | Self::OutOfRange { field, .. }
            | Self::Duplicate { field, .. }
            | Self::Custom { field, .. } => field,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required { field } => {
                write!(f, "Field '{field}' is required but missing")
            }
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                let range_desc = match (min, max) {
                    (Some(min), Some(max)) => format!("between {min} and {max}"),
                    (Some(min), None) => format!("at least {min}"),
                    (None, Some(max)) => format!("at most {max}"),
                    (None, None) => "in valid range".to_string(),
                };
                write!(f, "Field '{field}' must be {range_desc} (got {actual})")
            }
            ValidationError::Duplicate { field, value } => {
                write!(f, "Field '{field}' contains duplicate value '{value}'")
            }
            ValidationError::Custom { field, message } => {
                write!(f, "Field '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ClouberError {
    fn from(err: ValidationError) -> Self {
        ClouberError::parameter("ConfigValidator", err.to_string())
            .with_context("field", err.field().to_string())
    }
}

/// Configuration validator that accumulates validation rules
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
    field_prefix: String,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator for a nested field
    pub fn for_field(&self, field_name: &str) -> Self {
        Self {
            errors: Vec::new(),
            field_prefix: self.full_field_name(field_name),
        }
    }

    /// Validate that a string is not blank
    pub fn not_empty(&mut self, field_name: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(ValidationError::Required {
                field: self.full_field_name(field_name),
            });
        }
        self
    }

    /// Validate that a number is within range
    pub fn range<T>(
        &mut self,
        field_name: &str,
        value: T,
        min: Option<T>,
        max: Option<T>,
    ) -> &mut Self
    where
        T: PartialOrd + Copy + Into<f64>,
    {
        let below = min.is_some_and(|min| value < min);
        let above = max.is_some_and(|max| value > max);

        if below || above {
            self.errors.push(ValidationError::OutOfRange {
                field: self.full_field_name(field_name),
                min: min.map(Into::into),
                max: max.map(Into::into),
                actual: value.into(),
            });
        }

        self
    }

    /// Validate that every value in the iterator is distinct
    pub fn unique<'a, I>(&mut self, field_name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        for value in values {
            if !seen.insert(value) {
                self.errors.push(ValidationError::Duplicate {
                    field: self.full_field_name(field_name),
                    value: value.to_string(),
                });
            }
        }
        self
    }

    /// Validate using a custom predicate
    pub fn custom<T, F>(
        &mut self,
        field_name: &str,
        value: &T,
        predicate: F,
        message: &str,
    ) -> &mut Self
    where
        T: ?Sized,
        F: FnOnce(&T) -> bool,
    {
        if !predicate(value) {
            self.errors.push(ValidationError::Custom {
                field: self.full_field_name(field_name),
                message: message.to_string(),
            });
        }
        self
    }

    /// Validate a collection of items
    pub fn each<T, F>(&mut self, field_name: &str, items: &[T], mut validator: F) -> &mut Self
    where
        F: FnMut(&mut ConfigValidator, usize, &T),
    {
        for (index, item) in items.iter().enumerate() {
            let mut item_validator = self.for_field(&format!("{field_name}[{index}]"));
            validator(&mut item_validator, index, item);
            self.merge(item_validator);
        }
        self
    }

    /// Merge errors from another validator
    pub fn merge(&mut self, other: ConfigValidator) {
        self.errors.extend(other.errors);
    }

    /// Get all validation errors in the order the rules ran
    pub fn all_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    fn full_field_name(&self, field_name: &str) -> String {
        if self.field_prefix.is_empty() {
            field_name.to_string()
        } else {
            format!("{}.{}", self.field_prefix, field_name)
        }
    }
}
