//! Unified error type for Slotgate.
//!
//! Store backends map their native errors into [`GateError`] so the limiter
//! can tell a recoverable type mismatch apart from a transport failure.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the limiter, the maintenance operations, and the stores.
#[derive(Debug, Error)]
pub enum GateError {
    /// No slot was obtained within the configured wait time.
    #[error(
        "Exceeded the concurrency limit of {limit} executions. Waited for {} seconds.",
        .timeout.as_secs_f64()
    )]
    LimitExceeded {
        /// Maximum number of concurrent holders for the group.
        limit: u32,
        /// How long the caller waited before giving up.
        timeout: Duration,
    },

    /// The bookkeeping key holds a value of an incompatible type.
    #[error("Key '{key}' holds a value of the wrong type")]
    WrongType {
        /// The offending key.
        key: String,
    },

    /// The store could not be reached or rejected a command.
    #[error("Store error: {message}")]
    Store {
        /// A human-readable error message.
        message: String,
        /// Optional underlying cause.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A limit descriptor or argument failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Create a limit-exceeded error.
    pub fn limit_exceeded(limit: u32, timeout: Duration) -> Self {
        Self::LimitExceeded { limit, timeout }
    }

    /// Create a wrong-type error for the given key.
    pub fn wrong_type(key: impl Into<String>) -> Self {
        Self::WrongType { key: key.into() }
    }

    /// Create a store error without an underlying cause.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error with an underlying cause.
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error reports an incompatible value type on a key.
    pub fn is_wrong_type(&self) -> bool {
        matches!(self, Self::WrongType { .. })
    }

    /// Whether this error reports an exhausted wait for a slot.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, Self::LimitExceeded { .. })
    }
}

impl From<config::ConfigError> for GateError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
