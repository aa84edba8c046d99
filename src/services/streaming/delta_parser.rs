//! Delta parsing
//!
//! Each `data:` payload is parsed on its own as a JSON object of the form
//! `{"delta": {"content": ..., "function_call": {"name": ..., "arguments": ...}}}`.
//! The server follows each object with a comma and never sends an
//! enclosing array, so a single trailing comma is stripped before parsing.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Presentational marker replacing a blank line in content
pub const PARAGRAPH_BREAK: &str = "<p/>";

/// Presentational marker replacing a single newline in content
pub const LINE_BREAK: &str = "<br/>";

/// One incremental fragment of model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    /// Assistant-visible text, newlines already normalized
    Content { text: String },

    /// Fragment of a function invocation
    FunctionCall {
        name: Option<String>,
        arguments_fragment: String,
    },
}

/// Stream record payload as sent by the server
#[derive(Debug, Clone, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<WireDelta>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireFunctionCall {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Parse one record payload into a [`Delta`].
///
/// Returns `None` for keepalives, unparseable JSON, and objects that carry
/// neither content nor function-call arguments. Content wins when a
/// payload carries both.
#[must_use]
pub fn parse_delta(payload: &str) -> Option<Delta> {
    if !payload.contains('{') {
        return None;
    }

    let json = strip_trailing_comma(payload);
    let choice: StreamChoice = match serde_json::from_str(json) {
        Ok(choice) => choice,
        Err(e) => {
            warn!(error = %e, payload, "Cannot parse JSON in stream record");
            return None;
        }
    };

    let Some(delta) = choice.delta else {
        debug!("Stream record without delta");
        return None;
    };

    if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
        return Some(Delta::Content {
            text: normalize_newlines(&content),
        });
    }

    let call = delta.function_call?;
    let arguments_fragment = call.arguments?;
    Some(Delta::FunctionCall {
        name: call.name,
        arguments_fragment,
    })
}

/// Replace blank lines with [`PARAGRAPH_BREAK`] and remaining newlines with [`LINE_BREAK`]
#[must_use]
pub fn normalize_newlines(text: &str) -> String {
    // Double newlines first, or each would become two line breaks.
    text.replace("\n\n", PARAGRAPH_BREAK).replace('\n', LINE_BREAK)
}

fn strip_trailing_comma(payload: &str) -> &str {
    let trimmed = payload.trim();
    trimmed.strip_suffix(',').map_or(trimmed, str::trim_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn content(text: &str) -> Option<Delta> {
        Some(Delta::Content {
            text: text.to_string(),
        })
    }

    #[test]
    fn test_content_delta() {
        assert_eq!(parse_delta(r#"{"delta":{"content":"Hi"}}"#), content("Hi"));
    }

    #[test]
    fn test_trailing_comma_tolerated() {
        assert_eq!(parse_delta(r#"{"delta":{"content":"Hi"}},"#), content("Hi"));
        assert_eq!(
            parse_delta("{\"delta\":{\"content\":\"Hi\"}},\r"),
            content("Hi")
        );
        // Only one comma is stripped.
        assert_eq!(parse_delta(r#"{"delta":{"content":"Hi"}},,"#), None);
    }

    #[test]
    fn test_content_newlines_normalized() {
        assert_eq!(
            parse_delta(r#"{"delta":{"content":"a\n\nb"}},"#),
            content("a<p/>b")
        );
        assert_eq!(
            parse_delta(r#"{"delta":{"content":"a\nb\n\n\nc"}}"#),
            content("a<br/>b<p/><br/>c")
        );
    }

    #[test]
    fn test_content_without_newline_unchanged() {
        let text = "plain <b>text</b> with \\ and \"quotes\"";
        let payload = serde_json::json!({"delta": {"content": text}}).to_string();
        assert_eq!(parse_delta(&payload), content(text));
    }

    #[test]
    fn test_normalization_is_stable_once_applied() {
        let once = normalize_newlines("x\n\ny\nz");
        assert!(!once.contains('\n'));
        assert_eq!(normalize_newlines(&once), once);
    }

    #[test]
    fn test_function_call_delta() {
        assert_eq!(
            parse_delta(r#"{"delta":{"function_call":{"name":"fn","arguments":"{\"a\":1"}}},"#),
            Some(Delta::FunctionCall {
                name: Some("fn".to_string()),
                arguments_fragment: "{\"a\":1".to_string(),
            })
        );
        assert_eq!(
            parse_delta(r#"{"delta":{"function_call":{"arguments":"}\n"}}}"#),
            Some(Delta::FunctionCall {
                name: None,
                arguments_fragment: "}\n".to_string(),
            })
        );
    }

    #[test]
    fn test_content_takes_priority_over_function_call() {
        assert_eq!(
            parse_delta(r#"{"delta":{"content":"x","function_call":{"name":"f","arguments":"{}"}}}"#),
            content("x")
        );
    }

    #[test]
    fn test_empty_content_falls_through_to_function_call() {
        assert_eq!(
            parse_delta(r#"{"delta":{"content":"","function_call":{"arguments":"{}"}}}"#),
            Some(Delta::FunctionCall {
                name: None,
                arguments_fragment: "{}".to_string(),
            })
        );
    }

    #[test]
    fn test_unusable_payloads() {
        assert_eq!(parse_delta("not-json"), None);
        assert_eq!(parse_delta("[DONE]"), None);
        assert_eq!(parse_delta("{broken"), None);
        assert_eq!(parse_delta("{}"), None);
        assert_eq!(parse_delta(r#"{"delta":{}}"#), None);
        assert_eq!(parse_delta(r#"{"delta":{"content":""}}"#), None);
        assert_eq!(parse_delta(r#"{"delta":{"content":null}}"#), None);
        assert_eq!(parse_delta(r#"{"delta":{"function_call":{"name":"f"}}}"#), None);
    }

    #[test]
    fn test_extra_fields_ignored() {
        assert_eq!(
            parse_delta(r#"{"index":0,"finish_reason":null,"delta":{"role":"assistant","content":"ok"}}"#),
            content("ok")
        );
    }
}
