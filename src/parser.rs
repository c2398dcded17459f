//! Turns raw model text into an [`AnalysisResult`].
//!
//! Models are told not to fence their JSON but often do anyway, so every
//! "```json" and "```" marker is removed before parsing. Both patterns are
//! exact, case-sensitive matches.

use crate::error::{AnalysisError, Result};
use crate::models::AnalysisResult;

const FENCE_JSON: &str = "```json";
const FENCE: &str = "```";

pub fn strip_fences(raw: &str) -> String {
    raw.replace(FENCE_JSON, "").replace(FENCE, "").trim().to_string()
}

pub fn parse(raw: &str) -> Result<AnalysisResult> {
    let json_str = strip_fences(raw);

    let value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| AnalysisError::Parse(format!("{} — content: {}", e, preview(raw))))?;

    if !value.is_object() {
        return Err(AnalysisError::Parse(format!(
            "expected a JSON object — content: {}",
            preview(raw)
        )));
    }

    serde_json::from_value(value).map_err(|e| AnalysisError::Parse(e.to_string()))
}

fn preview(raw: &str) -> &str {
    match raw.char_indices().nth(200) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}
