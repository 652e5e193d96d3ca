//! Per-search request model and wire bodies.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tradeflow_core::{Locale, RequestId};

use crate::error::SearchError;
use crate::tool::ToolId;

/// Scalar filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Flag(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Flag(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Integer(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

/// Filter name → scalar value. Ordered so request bodies are stable.
pub type Filters = BTreeMap<String, FilterValue>;

/// Raw media captured on the device.
#[derive(Clone, PartialEq, Eq)]
pub enum Capture {
    Image(Vec<u8>),
    Audio(Vec<u8>),
}

impl Capture {
    fn encoded(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }
}

impl core::fmt::Debug for Capture {
    // Never dump media bytes into logs.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Capture::Image(b) => write!(f, "Image({} bytes)", b.len()),
            Capture::Audio(b) => write!(f, "Audio({} bytes)", b.len()),
        }
    }
}

/// What the host hands to `execute`: everything except tool and locale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchInput {
    pub query: String,
    pub filters: Filters,
    pub capture: Option<Capture>,
}

impl SearchInput {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.capture = Some(Capture::Image(bytes));
        self
    }

    pub fn with_audio(mut self, bytes: Vec<u8>) -> Self {
        self.capture = Some(Capture::Audio(bytes));
        self
    }

    fn image(&self) -> Option<&[u8]> {
        match &self.capture {
            Some(Capture::Image(b)) if !b.is_empty() => Some(b),
            _ => None,
        }
    }

    fn audio(&self) -> Option<&[u8]> {
        match &self.capture {
            Some(Capture::Audio(b)) if !b.is_empty() => Some(b),
            _ => None,
        }
    }

    fn trimmed_query(&self) -> Option<&str> {
        let q = self.query.trim();
        (!q.is_empty()).then_some(q)
    }

    /// Local checks that must pass before the session leaves `Idle`.
    pub fn validate_for(&self, tool: ToolId) -> Result<(), SearchError> {
        if self.trimmed_query().is_none() && !tool.is_scan() {
            return Err(SearchError::invalid_request(format!(
                "{tool} needs a non-empty query"
            )));
        }

        match tool {
            ToolId::QuickSearch | ToolId::DeepSearch => {
                if self.capture.is_some() {
                    return Err(SearchError::invalid_request(format!(
                        "{tool} does not take a capture"
                    )));
                }
            }
            ToolId::ImageRead => {
                if self.image().is_none() {
                    return Err(SearchError::invalid_request("image_read needs an image capture"));
                }
            }
            ToolId::QrScan | ToolId::BarcodeScan => {
                if self.image().is_none() && self.trimmed_query().is_none() {
                    return Err(SearchError::invalid_request(format!(
                        "{tool} needs an image capture or a scanned code"
                    )));
                }
                if self.audio().is_some() {
                    return Err(SearchError::invalid_request(format!(
                        "{tool} does not take audio"
                    )));
                }
            }
            ToolId::VoiceInput => {
                if self.audio().is_none() {
                    return Err(SearchError::invalid_request("voice_input needs an audio capture"));
                }
            }
        }
        Ok(())
    }
}

/// A fully-resolved request for one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub request_id: RequestId,
    pub tool: ToolId,
    pub input: SearchInput,
    pub locale: Locale,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireBody<'a> {
    request_id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<&'a Filters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    language: &'a str,
    country: &'a str,
    currency: &'a str,
}

impl SearchRequest {
    pub fn new(tool: ToolId, input: SearchInput, locale: Locale) -> Self {
        Self {
            request_id: RequestId::new(),
            tool,
            input,
            locale,
        }
    }

    /// Follow-up text search built from a voice transcript.
    pub fn chained_quick_search(voice: &SearchRequest, transcript: &str) -> Self {
        Self::new(
            ToolId::QuickSearch,
            SearchInput {
                query: transcript.to_string(),
                filters: voice.input.filters.clone(),
                capture: None,
            },
            voice.locale.clone(),
        )
    }

    /// JSON body for this tool's endpoint. Every body carries the locale.
    pub fn body(&self) -> Value {
        let input = &self.input;
        let query = input.trimmed_query();
        let mut body = WireBody {
            request_id: self.request_id,
            q: None,
            filters: None,
            image: None,
            audio: None,
            code: None,
            language: &self.locale.language,
            country: &self.locale.country,
            currency: &self.locale.currency,
        };

        match self.tool {
            ToolId::QuickSearch | ToolId::DeepSearch => {
                body.q = query;
                body.filters = Some(&input.filters);
            }
            ToolId::ImageRead => {
                body.q = query;
                body.image = input.image().map(Capture::encoded);
            }
            ToolId::QrScan | ToolId::BarcodeScan => {
                body.code = query;
                body.image = input.image().map(Capture::encoded);
            }
            ToolId::VoiceInput => {
                body.q = query;
                body.audio = input.audio().map(Capture::encoded);
            }
        }

        // Serializing plain strings and maps cannot fail.
        serde_json::to_value(body).unwrap_or(Value::Null)
    }
}
