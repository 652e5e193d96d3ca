//! Core error model.

use thiserror::Error;

/// Result type used across the core value types.
pub type CoreResult<T> = Result<T, CoreError>;

/// Core-level error.
///
/// Keep this focused on deterministic failures while constructing values.
/// Transport and dispatch failures belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A locale tag or one of its parts could not be understood.
    #[error("invalid locale: {0}")]
    InvalidLocale(String),
}

impl CoreError {
    pub fn invalid_locale(msg: impl Into<String>) -> Self {
        Self::InvalidLocale(msg.into())
    }
}
