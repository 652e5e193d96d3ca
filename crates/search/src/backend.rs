//! Backend capability contract.
//!
//! The search backend owns the request/response shapes; this side only knows
//! which endpoint to call and that bodies are JSON.

use async_trait::async_trait;
use serde_json::Value;

/// REST endpoints of the search service, relative to the API base URL.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    QuickSearch,
    DeepSearch,
    ImageRead,
    QrScan,
    BarcodeScan,
    VoiceInput,
    AnalyzeIntent,
    UserPreferences,
    Analytics,
    Health,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::QuickSearch => "search/quick-search",
            Endpoint::DeepSearch => "search/deep-search",
            Endpoint::ImageRead => "search/image-read",
            Endpoint::QrScan => "search/qr-scan",
            Endpoint::BarcodeScan => "search/barcode-scan",
            Endpoint::VoiceInput => "search/voice-input",
            Endpoint::AnalyzeIntent => "search/analyze-intent",
            Endpoint::UserPreferences => "search/user-preferences",
            Endpoint::Analytics => "search/analytics",
            Endpoint::Health => "search/health",
        }
    }
}

impl core::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.path())
    }
}

/// Transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response body is not valid JSON: {0}")]
    Decode(String),
}

/// A backend able to execute tool calls.
///
/// Implementations must not retry on their own: the dispatcher decides what a
/// failure means for the session.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// POST `body` to `endpoint` and return the decoded JSON response.
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Value, BackendError>;
}
