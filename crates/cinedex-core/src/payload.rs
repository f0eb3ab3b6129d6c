//! Extraction of the JSON payload embedded in oracle responses.
//!
//! Oracle answers are free-form text: the object may be wrapped in a
//! Markdown fence, preceded by a sentence, or followed by citations. The
//! extractor takes the span from the first `{` to the last `}` and decodes
//! it. Anything else in the text is ignored.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::AppError;

/// Keys accepted as the category field, in priority order.
pub const CATEGORY_KEYS: &[&str] = &["category", "genre"];

const SNIPPET_CHARS: usize = 200;

/// Returns the slice between the first `{` and the last `}` inclusive.
pub fn locate_payload(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decodes the embedded payload into `T`.
///
/// # Errors
///
/// Returns `ParseError` when no delimited span exists or it does not
/// decode into `T`. The message carries the head of the raw text.
pub fn decode_payload<T: DeserializeOwned>(text: &str) -> Result<T, AppError> {
    let span = locate_payload(text).ok_or_else(|| {
        AppError::ParseError(format!("no JSON object found in: {}", snippet(text)))
    })?;

    serde_json::from_str(span)
        .map_err(|e| AppError::ParseError(format!("{} in: {}", e, snippet(text))))
}

/// Decodes the embedded payload as a JSON object.
pub fn extract_payload(text: &str) -> Result<Map<String, Value>, AppError> {
    decode_payload(text)
}

/// Extracts the category label from an oracle response.
///
/// The payload must be an object carrying a non-empty string under one of
/// [`CATEGORY_KEYS`].
///
/// # Examples
///
/// ```
/// use cinedex_core::payload::extract_category;
///
/// let text = "Sure!\n```json\n{\"title\": \"Film A\", \"url\": \"url1\", \"genre\": \"Drama\"}\n```";
/// assert_eq!(extract_category(text).unwrap(), "Drama");
/// assert!(extract_category("I could not find that film.").is_err());
/// ```
pub fn extract_category(text: &str) -> Result<String, AppError> {
    let payload = extract_payload(text)?;

    CATEGORY_KEYS
        .iter()
        .filter_map(|key| payload.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::ParseError(format!("payload has no category field: {}", snippet(text)))
        })
}

fn snippet(text: &str) -> String {
    let head: String = text.chars().take(SNIPPET_CHARS).collect();
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head
    }
}
