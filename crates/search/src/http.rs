//! reqwest-backed search service client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use tradeflow_core::{Locale, RequestId};

use crate::backend::{BackendError, Endpoint, SearchBackend};
use crate::result::Entity;
use crate::tool::ToolId;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Connection settings for [`SearchApi`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Intent classification for a free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentAnalysis {
    pub intent: String,
    pub confidence: f64,
    #[serde(default)]
    pub suggested_tool: Option<ToolId>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// Server-side search preferences of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tool: Option<ToolId>,
    /// Fields this client does not model; preserved on save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Health of the search service itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime_secs: Option<u64>,
}

impl ServiceHealth {
    pub fn is_ok(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "healthy" | "up")
    }
}

/// HTTP client for the search service.
///
/// One POST per tool call, no retries; timeouts surface as `BackendError::Network`.
#[derive(Debug, Clone)]
pub struct SearchApi {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl SearchApi {
    pub fn new(config: ApiConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    async fn send(&self, endpoint: Endpoint, req: RequestBuilder) -> Result<Value, BackendError> {
        let req = match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(%endpoint, error = %e, "search service unreachable");
            BackendError::Network(e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%endpoint, status = status.as_u16(), "search service returned an error");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn get_json(&self, endpoint: Endpoint) -> Result<Value, BackendError> {
        self.send(endpoint, self.client.get(self.url(endpoint))).await
    }

    pub async fn analyze_intent(
        &self,
        query: &str,
        locale: &Locale,
    ) -> Result<IntentAnalysis, BackendError> {
        let body = json!({
            "requestId": RequestId::new(),
            "q": query.trim(),
            "language": locale.language,
            "country": locale.country,
            "currency": locale.currency,
        });
        let raw = self.post(Endpoint::AnalyzeIntent, body).await?;
        decode(raw)
    }

    pub async fn user_preferences(&self) -> Result<UserPreferences, BackendError> {
        decode(self.get_json(Endpoint::UserPreferences).await?)
    }

    pub async fn save_user_preferences(&self, prefs: &UserPreferences) -> Result<(), BackendError> {
        let req = self.client.post(self.url(Endpoint::UserPreferences)).json(prefs);
        self.send(Endpoint::UserPreferences, req).await.map(|_| ())
    }

    /// Usage analytics; the shape is owned by the service.
    pub async fn analytics(&self) -> Result<Value, BackendError> {
        self.get_json(Endpoint::Analytics).await
    }

    pub async fn service_health(&self) -> Result<ServiceHealth, BackendError> {
        decode(self.get_json(Endpoint::Health).await?)
    }
}

fn decode<T: serde::de::DeserializeOwned>(raw: Value) -> Result<T, BackendError> {
    serde_json::from_value(raw).map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl SearchBackend for SearchApi {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Value, BackendError> {
        let req = self.client.post(self.url(endpoint)).json(&body);
        self.send(endpoint, req).await
    }
}
