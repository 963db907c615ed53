//! Model output parsing
//!
//! Inference backends are asked for JSON but routinely wrap it in
//! markdown fences or prose. Extraction is lenient; callers decide how to
//! degrade when no JSON can be recovered.

use serde::de::DeserializeOwned;

/// Extract and deserialize the first JSON object in a model response.
///
/// Handles raw JSON, ```json fences, and JSON embedded in surrounding
/// prose, in that order of preference.
pub fn parse_model_json<T: DeserializeOwned>(content: &str) -> Option<T> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(fenced) = extract_fenced(trimmed) {
        if let Ok(value) = serde_json::from_str(fenced) {
            return Some(value);
        }
    }

    // Last resort: widest brace-delimited span
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end > start {
        serde_json::from_str(&trimmed[start..=end]).ok()
    } else {
        None
    }
}

fn extract_fenced(content: &str) -> Option<&str> {
    let after_open = content
        .split_once("```json")
        .or_else(|| content.split_once("```"))?
        .1;
    Some(after_open.split_once("```").map_or(after_open, |(inner, _)| inner))
}
