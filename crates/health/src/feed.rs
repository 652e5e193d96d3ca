//! Telemetry source for the FX data feed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cumulative counters as reported by the feed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    pub ok_count: u64,
    pub fail_count: u64,
    /// Current failure streak, when the feed tracks it.
    #[serde(default)]
    pub consecutive_failures: Option<u32>,
    /// Last successful refresh of the FX data.
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("telemetry feed unreachable: {0}")]
    Network(String),
    #[error("telemetry feed returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("telemetry payload invalid: {0}")]
    Decode(String),
}

#[async_trait]
pub trait TelemetryFeed: Send + Sync {
    async fn read(&self) -> Result<TelemetryReading, FeedError>;
}

/// `GET {url}` returning a [`TelemetryReading`] as JSON.
#[derive(Debug, Clone)]
pub struct HttpTelemetryFeed {
    client: Client,
    url: String,
    auth_token: Option<String>,
}

impl HttpTelemetryFeed {
    pub fn new(
        url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            auth_token,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TelemetryFeed for HttpTelemetryFeed {
    async fn read(&self) -> Result<TelemetryReading, FeedError> {
        let mut req = self.client.get(&self.url);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FeedError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| FeedError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reading_parses_camel_case_with_optional_fields() {
        let r: TelemetryReading = serde_json::from_value(json!({
            "okCount": 120,
            "failCount": 3,
            "lastUpdatedAt": "2026-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(r.ok_count, 120);
        assert_eq!(r.consecutive_failures, None);
        assert_eq!(r.last_updated_at.unwrap().to_rfc3339(), "2026-03-01T10:00:00+00:00");

        let r: TelemetryReading =
            serde_json::from_value(json!({"okCount": 0, "failCount": 0})).unwrap();
        assert_eq!(r.last_updated_at, None);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let err = serde_json::from_value::<TelemetryReading>(json!({"okCount": -1, "failCount": 0}));
        assert!(err.is_err());
    }
}
