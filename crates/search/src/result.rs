//! Render model: one variant per tool.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::request::Filters;
use crate::tool::ToolId;

/// Normalized outcome of a completed dispatch.
///
/// The variant is always the one belonging to the tool that produced it;
/// hosts render by matching on it, never by probing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum SearchResult {
    QuickSearch(QuickSearchResult),
    DeepSearch(DeepSearchResult),
    ImageRead(ImageReadResult),
    QrScan(QrScanResult),
    BarcodeScan(BarcodeScanResult),
    VoiceInput(VoiceInputResult),
}

impl SearchResult {
    pub fn tool(&self) -> ToolId {
        match self {
            SearchResult::QuickSearch(_) => ToolId::QuickSearch,
            SearchResult::DeepSearch(_) => ToolId::DeepSearch,
            SearchResult::ImageRead(_) => ToolId::ImageRead,
            SearchResult::QrScan(_) => ToolId::QrScan,
            SearchResult::BarcodeScan(_) => ToolId::BarcodeScan,
            SearchResult::VoiceInput(_) => ToolId::VoiceInput,
        }
    }
}

/// Catalog product as returned by the search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickSearchResult {
    pub results: Vec<Product>,
    #[serde(default)]
    pub applied_filters: Filters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepSearchResult {
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub sources: Vec<String>,
    /// In \[0, 1\].
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReadResult {
    pub text_blocks: Vec<TextBlock>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// Target language → translated text, when the backend translated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrScanResult {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_guess: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeScanResult {
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    pub symbology: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInputResult {
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// In \[0, 1\].
    pub confidence: f64,
    /// Follow-up text search; absent when it failed or was not attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chained_search: Option<QuickSearchResult>,
}

/// Accept ids/codes that some backends send as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
    })
}
