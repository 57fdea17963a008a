use serde_json::Value;

use super::AnalysisError;
use crate::domain::order::RawTagReading;

/// Parse the service's `{"items": [{"code", "price", "tagColor"}, ...]}` answer.
///
/// A payload without an `items` array means "no tags found". Null entries are
/// skipped; an entry with the wrong shape fails the whole response so that a
/// half-understood photo never adds a partial list.
pub fn parse_analysis_response(payload: &str) -> Result<Vec<RawTagReading>, AnalysisError> {
    let root: Value = serde_json::from_str(payload.trim())
        .map_err(|e| AnalysisError::Parse(e.to_string()))?;

    let entries = match root.get("items") {
        Some(Value::Array(entries)) => entries,
        _ => {
            tracing::debug!("Analysis response has no items array");
            return Ok(Vec::new());
        }
    };

    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| !entry.is_null())
        .map(|(index, entry)| {
            serde_json::from_value::<RawTagReading>(entry.clone())
                .map_err(|e| AnalysisError::Parse(format!("item {}: {}", index, e)))
        })
        .collect()
}
