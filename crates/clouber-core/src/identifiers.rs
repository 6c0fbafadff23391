//! Identifier types for page controls
//!
//! Pages, regions and windows are addressed by a process-unique integer
//! allocated from a single monotonic counter. Ids are never reused.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

static NEXT_CONTROL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a page, region or window control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlId(u64);

impl ControlId {
    /// Allocate the next id from the global counter
    pub fn next() -> Self {
        Self(NEXT_CONTROL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw integer value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ControlId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// A control id that is allocated on first access
#[derive(Debug, Default)]
pub struct LazyControlId(OnceLock<ControlId>);

impl LazyControlId {
    /// Create an unallocated id slot
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Get the id, allocating it if this is the first access
    pub fn get(&self) -> ControlId {
        *self.0.get_or_init(ControlId::next)
    }

    /// Whether the id has been allocated yet
    pub fn is_allocated(&self) -> bool {
        self.0.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lazy_id_is_stable_once_allocated() {
        let lazy = LazyControlId::new();
        assert!(!lazy.is_allocated());
        let first = lazy.get();
        assert!(lazy.is_allocated());
        assert_eq!(lazy.get(), first);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let a = ControlId::next();
        let b = ControlId::next();
        assert!(b > a);
    }

    proptest! {
        #[test]
        fn prop_control_id_parses_from_display(value in 0u64..u64::MAX) {
            let id = ControlId(value);
            prop_assert_eq!(id.to_string().parse::<ControlId>().ok(), Some(id));
        }
    }
}
