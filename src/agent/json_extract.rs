//! Tolerant JSON extraction from unstructured model output.
//!
//! Model answers are not guaranteed to be pure JSON: preambles, markdown
//! fences and trailing commentary are all common. The scanner pulls out the
//! first fully balanced top-level `{...}` span and parses only that.

use serde_json::Value;

use crate::error::ExtractError;

/// Extract the first balanced top-level JSON object from `text`.
///
/// Brace matching is positional, not string-aware; stray closing braces
/// before the object are ignored, an object that never closes (truncated
/// output) is [`ExtractError::NoJsonFound`].
pub fn extract_object(text: &str) -> Result<Value, ExtractError> {
    let mut stack: Vec<usize> = Vec::new();

    for (i, c) in text.char_indices() {
        match c {
            '{' => stack.push(i),
            '}' => {
                let Some(start) = stack.pop() else {
                    // Stray closer with nothing open; not an error by itself.
                    continue;
                };
                if stack.is_empty() {
                    let candidate = &text[start..i + 1];
                    log::debug!("Extracted JSON object from model answer: {}", candidate);
                    return serde_json::from_str(candidate).map_err(ExtractError::MalformedJson);
                }
            }
            _ => {}
        }
    }

    Err(ExtractError::NoJsonFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_with_surrounding_prose() {
        let value = extract_object("blah {\"a\": {\"b\": 1}} trailing").unwrap();
        assert_eq!(value, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_first_top_level_object_wins() {
        let value = extract_object("{\"first\": 1} and then {\"second\": 2}").unwrap();
        assert_eq!(value, json!({"first": 1}));
    }

    #[test]
    fn test_stray_leading_closer_ignored() {
        let value = extract_object("} {\"x\":1}").unwrap();
        assert_eq!(value, json!({"x": 1}));
    }

    #[test]
    fn test_markdown_fence() {
        let text = "```json\n{\"function\": \"llm\", \"parameters\": {}}\n```";
        let value = extract_object(text).unwrap();
        assert_eq!(value["function"], "llm");
    }

    #[test]
    fn test_truncated_output_no_json() {
        let err = extract_object("{\"a\": {\"b\": 1}").unwrap_err();
        assert!(matches!(err, ExtractError::NoJsonFound));
    }

    #[test]
    fn test_no_braces_at_all() {
        let err = extract_object("I cannot answer that.").unwrap_err();
        assert!(matches!(err, ExtractError::NoJsonFound));
    }

    #[test]
    fn test_balanced_but_invalid_json() {
        let err = extract_object("{not valid json}").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedJson(_)));
    }
}
