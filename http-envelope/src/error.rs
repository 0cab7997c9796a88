//! Crate error types
//!
//! These are failures of the envelope layer itself (loading configuration,
//! building renderers). Failures produced by business handlers are modelled
//! separately by [`HandlerError`](crate::registry::HandlerError), which is
//! rendered into the response body instead of being propagated.

use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or extracted
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// A configuration value was syntactically valid but unusable
    #[error("Invalid configuration value for `{field}`: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending key (e.g. `envelope.version`)
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Tracing subscriber could not be installed
    #[error("Tracing initialization failed: {0}")]
    Tracing(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

// Manual From implementation for the boxed error
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
