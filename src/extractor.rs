use serde_json::Value;

/// Pulls the answer text out of a generation-service payload.
///
/// Walks `candidates[0].content.parts[0].text`. Every step is optional: a missing key,
/// an empty array or a value of the wrong type yields `None` instead of an error.
/// Whitespace-only text also counts as absent.
pub fn extract_text(payload: &Value) -> Option<String> {
    let text = payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()?
        .trim();

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
