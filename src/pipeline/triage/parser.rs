use super::TriageError;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Strip optional Markdown code-fence markers around a model response.
///
/// Removes a leading ```` ```json ```` (or bare ```` ``` ````) and a trailing
/// ```` ``` ````, each independently, plus surrounding whitespace.
pub fn strip_code_fence(response: &str) -> &str {
    let mut text = response.trim();
    if let Some(rest) = text.strip_prefix(JSON_FENCE) {
        text = rest;
    } else if let Some(rest) = text.strip_prefix(FENCE) {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// Strip fences and parse the remaining text as JSON.
pub fn parse_model_output(response: &str) -> Result<serde_json::Value, TriageError> {
    let body = strip_code_fence(response);
    serde_json::from_str(body).map_err(|e| TriageError::OutputUnparseable(e.to_string()))
}
