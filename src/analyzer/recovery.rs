//! Recovery of the JSON analysis from free-form model output.
//!
//! Steps, in order:
//! 1. trim the response
//! 2. take the interior of a ```` ```json ```` fence, else of any fence, else the raw text
//! 3. strict JSON parse
//! 4. parse the largest `{...}` substring of the raw text
//! 5. give up: the attempt failed

use log::debug;

use super::types::ModelAnalysis;
use super::AttemptError;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Interior of the first fenced block, preferring a block tagged `json`.
///
/// Text without any fence is returned unchanged. An unterminated fence
/// extends to the end of the text.
pub fn strip_code_fence(text: &str) -> &str {
    let interior = if let Some(start) = text.find(JSON_FENCE) {
        &text[start + JSON_FENCE.len()..]
    } else if let Some(start) = text.find(FENCE) {
        &text[start + FENCE.len()..]
    } else {
        return text;
    };

    interior.split(FENCE).next().unwrap_or(interior).trim()
}

/// Substring from the first `{` to the last `}`, if any
pub fn largest_brace_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Applies the recovery steps to a raw model response
pub fn parse_model_response(response: &str) -> Result<ModelAnalysis, AttemptError> {
    let raw = response.trim();
    let candidate = strip_code_fence(raw);

    let strict_error = match serde_json::from_str::<ModelAnalysis>(candidate) {
        Ok(analysis) => return Ok(analysis),
        Err(e) => e,
    };

    debug!("Strict JSON parse failed ({}), trying brace extraction", strict_error);

    let block = largest_brace_block(raw).ok_or_else(|| {
        AttemptError::Parse(format!("no JSON object in response ({})", strict_error))
    })?;

    serde_json::from_str::<ModelAnalysis>(block)
        .map_err(|e| AttemptError::Parse(format!("could not extract valid JSON from response ({})", e)))
}
