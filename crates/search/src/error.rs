//! Dispatch-level error taxonomy.

use thiserror::Error;

use crate::backend::BackendError;
use crate::tool::ToolId;

/// Errors surfaced by a search session.
///
/// None of these escape the dispatcher as panics: they are recorded on the
/// session view and returned inside a [`crate::DispatchOutcome`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    /// The requested tool id is not in the registry (configuration problem).
    #[error("unknown tool id: {0:?}")]
    UnknownTool(String),

    /// The permission gate refused; nothing was sent.
    #[error("permission required for {tool}")]
    PermissionDenied { tool: ToolId },

    /// The request failed local validation before any I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport failure (connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The response could not be mapped onto the expected shape.
    #[error("malformed response from {origin}: {detail}")]
    MalformedResponse { origin: String, detail: String },
}

impl SearchError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn malformed(origin: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            origin: origin.into(),
            detail: detail.into(),
        }
    }

    /// Whether the user can reasonably retry (possibly after granting access).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SearchError::UnknownTool(_))
    }

    /// Stable machine-readable kind for the host UI.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::UnknownTool(_) => "unknown_tool",
            SearchError::PermissionDenied { .. } => "permission_denied",
            SearchError::InvalidRequest(_) => "invalid_request",
            SearchError::Network(_) => "network",
            SearchError::Backend { .. } => "backend",
            SearchError::MalformedResponse { .. } => "malformed_response",
        }
    }

    /// Map a transport-level failure for a call made on behalf of `origin`.
    pub fn from_backend(origin: impl Into<String>, err: BackendError) -> Self {
        match err {
            BackendError::Network(msg) => SearchError::Network(msg),
            BackendError::Status { status, body } => SearchError::Backend {
                status,
                message: body,
            },
            BackendError::Decode(detail) => SearchError::malformed(origin, detail),
        }
    }
}
