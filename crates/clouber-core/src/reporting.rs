//! Central error log
//!
//! Failures the portal swallows (markup substitution, refused registrations,
//! rejected events) are routed through an [`ErrorReporter`]. Each report
//! emits one structured `tracing` event and is retained in a bounded buffer
//! so callers can inspect what went wrong after the fact.

use crate::errors::{ClouberError, ErrorSeverity};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration for the logging system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Maximum number of reported errors to retain in memory
    pub max_retained_errors: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            max_retained_errors: 256,
        }
    }
}

#[derive(Debug)]
struct ReporterState {
    retained: VecDeque<ClouberError>,
    total: u64,
}

/// Shared sink for swallowed errors. Cloning shares the same buffer.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    capacity: usize,
    state: Arc<Mutex<ReporterState>>,
}

impl ErrorReporter {
    /// Create a reporter retaining at most `capacity` errors
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Arc::new(Mutex::new(ReporterState {
                retained: VecDeque::with_capacity(capacity.min(1024)),
                total: 0,
            })),
        }
    }

    /// Create a reporter sized from logging configuration
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new(config.max_retained_errors)
    }

    /// Log and retain an error
    pub fn report(&self, err: &ClouberError) {
        let code = err.code().code();
        let name = err.name();
        let call = err.call();
        let message = err.message();
        match err.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => {
                error!(code, name, call, detail = message, "portal error")
            }
            ErrorSeverity::Medium => warn!(code, name, call, detail = message, "portal error"),
            ErrorSeverity::Low => info!(code, name, call, detail = message, "portal error"),
        }

        let mut state = self.state.lock();
        if state.retained.len() == self.capacity {
            state.retained.pop_front();
        }
        state.retained.push_back(err.clone());
        state.total += 1;
    }

    /// Retained errors, oldest first
    pub fn recent(&self) -> Vec<ClouberError> {
        self.state.lock().retained.iter().cloned().collect()
    }

    /// Most recently reported error
    pub fn last(&self) -> Option<ClouberError> {
        self.state.lock().retained.back().cloned()
    }

    /// Number of errors reported since creation, including evicted ones
    pub fn total_reported(&self) -> u64 {
        self.state.lock().total
    }

    /// Drop retained errors
    pub fn clear(&self) {
        let mut state = self.state.lock();
        debug!(dropped = state.retained.len(), "clearing retained errors");
        state.retained.clear();
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::from_config(&LoggingConfig::default())
    }
}
