//! Pulls structured payloads out of free-form model responses.
//!
//! Models wrap their JSON in prose, code fences and apologies. The extractor
//! scans for the first `[` or `{` that starts a complete JSON value of the
//! requested kind and returns it, or a typed [`ExtractionError`] carrying the
//! raw text. Complete values of the other kind are skipped whole. It never
//! coerces: a response holding only an object fails an array request.

use crate::error::{ExtractionError, PayloadKind};
use serde_json::{Deserializer, Map, Value};
use tracing::error;

/// Extracts the first complete JSON array from `raw`.
pub fn extract_array(raw: &str) -> Result<Vec<Value>, ExtractionError> {
    match extract(raw, PayloadKind::Array)? {
        Value::Array(items) => Ok(items),
        other => Err(unexpected_shape(raw, PayloadKind::Array, &other)),
    }
}

/// Extracts the first complete JSON object from `raw`.
pub fn extract_object(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
    match extract(raw, PayloadKind::Object)? {
        Value::Object(map) => Ok(map),
        other => Err(unexpected_shape(raw, PayloadKind::Object, &other)),
    }
}

fn extract(raw: &str, expected: PayloadKind) -> Result<Value, ExtractionError> {
    let mut last_syntax_error: Option<String> = None;
    let mut wrong_shape: Option<Value> = None;
    let mut resume_at = 0;

    for (start, ch) in raw.char_indices() {
        if start < resume_at || (ch != '[' && ch != '{') {
            continue;
        }
        let mut values = Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) if kind_of(&value) == Some(expected) => return Ok(value),
            // A complete value of the other kind, such as a "[1]" citation
            // before an object: skip all of it, nested values included.
            Some(Ok(value)) => {
                resume_at = start + values.byte_offset();
                wrong_shape.get_or_insert(value);
            }
            // The payload started but the response ended first.
            Some(Err(e)) if e.is_eof() => {
                error!(error = %e, raw = %raw, "Response ends inside a JSON payload");
                return Err(ExtractionError::Malformed {
                    expected,
                    message: e.to_string(),
                    raw: raw.to_string(),
                });
            }
            // Prose such as "[see below]": keep scanning.
            Some(Err(e)) => last_syntax_error = Some(e.to_string()),
            None => {}
        }
    }

    let err = match (wrong_shape, last_syntax_error) {
        (Some(value), _) => unexpected_shape(raw, expected, &value),
        (None, Some(message)) => ExtractionError::Malformed {
            expected,
            message,
            raw: raw.to_string(),
        },
        (None, None) => ExtractionError::NoPayload {
            expected,
            raw: raw.to_string(),
        },
    };
    error!(error = %err, raw = %raw, "No usable JSON payload in response");
    Err(err)
}

fn kind_of(value: &Value) -> Option<PayloadKind> {
    match value {
        Value::Array(_) => Some(PayloadKind::Array),
        Value::Object(_) => Some(PayloadKind::Object),
        _ => None,
    }
}

fn unexpected_shape(raw: &str, expected: PayloadKind, found: &Value) -> ExtractionError {
    let found = kind_of(found).unwrap_or(match expected {
        PayloadKind::Array => PayloadKind::Object,
        PayloadKind::Object => PayloadKind::Array,
    });
    ExtractionError::UnexpectedShape {
        expected,
        found,
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_array_wrapped_in_prose() {
        let items = extract_array("Here is the data: [{\"a\":1}] thanks").unwrap();
        assert_eq!(items, vec![json!({"a": 1})]);
    }

    #[test]
    fn test_extracts_object_from_code_fence() {
        let raw = "Sure! ```json\n{\"key_topics\": [], \"note\": \"} tricky {\"}\n```\nEnjoy.";
        let map = extract_object(raw).unwrap();
        assert_eq!(map.get("note"), Some(&json!("} tricky {")));
    }

    #[test]
    fn test_skips_bracketed_prose_before_payload() {
        let raw = "Questions [see below]:\n[{\"q\": \"one\"}, {\"q\": \"two\"}]";
        let items = extract_array(raw).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_no_payload() {
        let err = extract_array("I could not think of any questions today.").unwrap_err();
        assert!(matches!(err, ExtractionError::NoPayload { .. }));
        assert_eq!(err.raw(), "I could not think of any questions today.");
    }

    #[test]
    fn test_object_where_array_expected_is_not_coerced() {
        let err = extract_array("{\"questions\": [{\"text\": \"x\"}]}").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::UnexpectedShape {
                expected: PayloadKind::Array,
                found: PayloadKind::Object,
                ..
            }
        ));
    }

    #[test]
    fn test_array_where_object_expected_is_rejected() {
        let err = extract_object("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ExtractionError::UnexpectedShape { .. }));
    }

    #[test]
    fn test_object_found_after_leading_citation() {
        let raw = "Based on the assessment [1], here is the plan: {\"key_topics\": [\"Numbers\"]}";
        let map = extract_object(raw).unwrap();
        assert_eq!(map.get("key_topics"), Some(&json!(["Numbers"])));
    }

    #[test]
    fn test_array_found_after_leading_object() {
        let raw = "Settings used {\"n\": 10}. Questions: [{\"text\": \"q\"}]";
        let items = extract_array(raw).unwrap();
        assert_eq!(items, vec![json!({"text": "q"})]);
    }

    #[test]
    fn test_array_nested_in_skipped_object_is_not_used() {
        let err = extract_array("Plan {\"items\": [1, 2]} done").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::UnexpectedShape {
                found: PayloadKind::Object,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let err = extract_array("[{\"text\": \"first\"}, {\"text\": \"sec").unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));
    }

    #[test]
    fn test_only_broken_brackets_is_malformed() {
        let err = extract_object("{not json at all}").unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));
    }
}
