//! Raw backend payload → [`SearchResult`].
//!
//! One branch per tool. Required fields must be present with the right shape;
//! nothing is defaulted into something that could pass for a real (empty) result.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SearchError;
use crate::result::{
    BarcodeScanResult, DeepSearchResult, ImageReadResult, QrScanResult, QuickSearchResult,
    SearchResult, VoiceInputResult,
};
use crate::tool::ToolId;

/// Map `raw` onto the render model for `tool`.
pub fn normalize(tool: ToolId, raw: &Value) -> Result<SearchResult, SearchError> {
    if !raw.is_object() {
        return Err(SearchError::malformed(
            tool.as_str(),
            format!("expected a JSON object, got {}", json_kind(raw)),
        ));
    }

    let result = match tool {
        ToolId::QuickSearch => SearchResult::QuickSearch(quick_search(raw)?),
        ToolId::DeepSearch => {
            let r: DeepSearchResult = decode(tool, raw)?;
            check_unit_interval(tool, "confidence", r.confidence)?;
            SearchResult::DeepSearch(r)
        }
        ToolId::ImageRead => SearchResult::ImageRead(decode::<ImageReadResult>(tool, raw)?),
        ToolId::QrScan => {
            let r: QrScanResult = decode(tool, raw)?;
            check_non_empty(tool, "value", &r.value)?;
            SearchResult::QrScan(r)
        }
        ToolId::BarcodeScan => {
            let r: BarcodeScanResult = decode(tool, raw)?;
            check_non_empty(tool, "value", &r.value)?;
            check_non_empty(tool, "symbology", &r.symbology)?;
            SearchResult::BarcodeScan(r)
        }
        ToolId::VoiceInput => {
            let mut r: VoiceInputResult = decode(tool, raw)?;
            check_unit_interval(tool, "confidence", r.confidence)?;
            // Chaining is the dispatcher's job; ignore anything the backend put here.
            r.chained_search = None;
            SearchResult::VoiceInput(r)
        }
    };

    Ok(result)
}

/// Quick-search branch, also used for the chained search of voice input.
pub fn quick_search(raw: &Value) -> Result<QuickSearchResult, SearchError> {
    match raw.get("results") {
        None => Err(SearchError::malformed(
            ToolId::QuickSearch.as_str(),
            "missing field `results`",
        )),
        Some(v) if !v.is_array() => Err(SearchError::malformed(
            ToolId::QuickSearch.as_str(),
            format!("`results` must be an array, got {}", json_kind(v)),
        )),
        Some(_) => decode(ToolId::QuickSearch, raw),
    }
}

fn decode<T: DeserializeOwned>(tool: ToolId, raw: &Value) -> Result<T, SearchError> {
    T::deserialize(raw).map_err(|e| SearchError::malformed(tool.as_str(), e.to_string()))
}

fn check_unit_interval(tool: ToolId, field: &str, v: f64) -> Result<(), SearchError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(SearchError::malformed(
            tool.as_str(),
            format!("`{field}` must be within [0, 1], got {v}"),
        ))
    }
}

fn check_non_empty(tool: ToolId, field: &str, v: &str) -> Result<(), SearchError> {
    if v.trim().is_empty() {
        Err(SearchError::malformed(tool.as_str(), format!("`{field}` is empty")))
    } else {
        Ok(())
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_malformed(r: Result<SearchResult, SearchError>, needle: &str) {
        match r {
            Err(SearchError::MalformedResponse { detail, .. }) => {
                assert!(detail.contains(needle), "{detail:?} does not mention {needle:?}")
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn quick_search_without_results_is_rejected_not_emptied() {
        let raw = json!({"appliedFilters": {}, "latencyMs": 12});
        assert_malformed(normalize(ToolId::QuickSearch, &raw), "results");
    }

    #[test]
    fn quick_search_results_must_be_an_array() {
        let raw = json!({"results": {"id": "1"}});
        assert_malformed(normalize(ToolId::QuickSearch, &raw), "must be an array");
        let raw = json!({"results": null});
        assert_malformed(normalize(ToolId::QuickSearch, &raw), "must be an array");
    }

    #[test]
    fn quick_search_empty_array_is_a_real_empty_result() {
        let raw = json!({"results": []});
        match normalize(ToolId::QuickSearch, &raw).unwrap() {
            SearchResult::QuickSearch(r) => {
                assert!(r.results.is_empty());
                assert!(r.applied_filters.is_empty());
                assert_eq!(r.latency_ms, None);
            }
            other => panic!("wrong variant {other:?}"),
        }
    }

    #[test]
    fn quick_search_maps_products() {
        let raw = json!({
            "results": [
                {"id": "p-1", "name": "Blue jacket", "price": 59.9, "currency": "USD", "imageUrl": "https://cdn/x.jpg"},
                {"id": 7, "name": "Navy parka"}
            ],
            "appliedFilters": {"inStock": true},
            "latencyMs": 84
        });
        let SearchResult::QuickSearch(r) = normalize(ToolId::QuickSearch, &raw).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(r.results.len(), 2);
        assert_eq!(r.results[0].image_url.as_deref(), Some("https://cdn/x.jpg"));
        assert_eq!(r.results[1].id, "7");
        assert_eq!(r.latency_ms, Some(84));
    }

    #[test]
    fn product_without_name_is_malformed() {
        let raw = json!({"results": [{"id": "p-1"}]});
        assert_malformed(normalize(ToolId::QuickSearch, &raw), "name");
    }

    #[test]
    fn non_object_payload_is_malformed() {
        assert_malformed(normalize(ToolId::DeepSearch, &json!([1, 2])), "an array");
        assert_malformed(normalize(ToolId::QrScan, &json!("ok")), "a string");
    }

    #[test]
    fn deep_search_requires_insights_and_confidence_in_range() {
        let ok = json!({"insights": [{"title": "Duty is 12%"}], "sources": ["wco.org"], "confidence": 0.7});
        assert_eq!(normalize(ToolId::DeepSearch, &ok).unwrap().tool(), ToolId::DeepSearch);

        assert_malformed(
            normalize(ToolId::DeepSearch, &json!({"confidence": 0.7})),
            "insights",
        );
        assert_malformed(
            normalize(ToolId::DeepSearch, &json!({"insights": [], "confidence": 1.5})),
            "confidence",
        );
    }

    #[test]
    fn image_read_maps_blocks_entities_and_translations() {
        let raw = json!({
            "textBlocks": [{"text": "Made in Italy", "language": "en"}],
            "entities": [{"type": "origin", "value": "IT"}],
            "translations": {"fr": "Fabriqué en Italie"}
        });
        let SearchResult::ImageRead(r) = normalize(ToolId::ImageRead, &raw).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(r.text_blocks[0].text, "Made in Italy");
        assert_eq!(r.entities[0].kind, "origin");
        assert_eq!(r.translations.unwrap()["fr"], "Fabriqué en Italie");

        assert_malformed(normalize(ToolId::ImageRead, &json!({"entities": []})), "textBlocks");
    }

    #[test]
    fn scans_require_a_value() {
        assert_malformed(normalize(ToolId::QrScan, &json!({"value": "  "})), "value");
        assert_malformed(
            normalize(ToolId::BarcodeScan, &json!({"value": "123"})),
            "symbology",
        );

        let raw = json!({"value": 5901234123457u64, "symbology": "ean13", "lookupKey": "gtin:5901234123457"});
        let SearchResult::BarcodeScan(r) = normalize(ToolId::BarcodeScan, &raw).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(r.value, "5901234123457");
        assert_eq!(r.lookup_key.as_deref(), Some("gtin:5901234123457"));
    }

    #[test]
    fn voice_ignores_backend_supplied_chain() {
        let raw = json!({
            "transcript": "blue jacket",
            "language": "en",
            "confidence": 0.93,
            "chainedSearch": {"results": []}
        });
        let SearchResult::VoiceInput(r) = normalize(ToolId::VoiceInput, &raw).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(r.transcript, "blue jacket");
        assert!(r.chained_search.is_none());
    }

    #[test]
    fn voice_requires_transcript() {
        assert_malformed(
            normalize(ToolId::VoiceInput, &json!({"confidence": 0.9})),
            "transcript",
        );
    }
}
