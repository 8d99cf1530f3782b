use serde_json::Value;

use crate::errors::SourceError;

pub const KIND_CREATED: &str = "created";
pub const KIND_TEXT_DELTA: &str = "text_delta";
pub const KIND_COMPLETED: &str = "completed";
pub const KIND_ERROR: &str = "error";

/// A single event pulled from a response stream.
///
/// Events are decoded once at the source boundary; everything downstream
/// matches on the variant. The vocabulary is open: tags that are not
/// recognized decode to `Unknown` instead of failing.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// The producer opened a response.
    Created { response_id: Option<String> },
    /// Incremental text output.
    TextDelta { fragment: String },
    /// Terminal success.
    Completed { status: Option<String> },
    /// Terminal failure reported by the producer.
    Error { message: String },
    /// Any kind this crate does not know about.
    Unknown { kind: String, payload: Value },
}

impl StreamEvent {
    /// Canonical kind tag for this event.
    pub fn kind(&self) -> &str {
        match self {
            Self::Created { .. } => KIND_CREATED,
            Self::TextDelta { .. } => KIND_TEXT_DELTA,
            Self::Completed { .. } => KIND_COMPLETED,
            Self::Error { .. } => KIND_ERROR,
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// Returns `true` for `Completed` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }

    /// Decodes an event from a JSON record.
    ///
    /// The discriminator is read from `type`, then `kind`. Both OpenAI
    /// Responses tags (`response.output_text.delta`) and the short canonical
    /// tags (`text_delta`) are accepted.
    pub fn from_json(value: &Value) -> Result<Self, SourceError> {
        Self::from_json_with_fallback(value, None)
    }

    /// Decodes an event from a JSON string.
    pub fn from_json_str(data: &str) -> Result<Self, SourceError> {
        let value: Value = serde_json::from_str(data)
            .map_err(|e| SourceError::transport(format!("invalid event JSON: {e}")))?;
        Self::from_json(&value)
    }

    /// Like `from_json`, but uses `fallback_kind` (typically the SSE `event:`
    /// name) when the record carries no discriminator of its own.
    pub fn from_json_with_fallback(
        value: &Value,
        fallback_kind: Option<&str>,
    ) -> Result<Self, SourceError> {
        let kind = value
            .get("type")
            .or_else(|| value.get("kind"))
            .and_then(Value::as_str)
            .or(fallback_kind.filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| SourceError::malformed("<missing>", "event has no kind field"))?;

        match kind {
            "created" | "response.created" => Ok(Self::Created {
                response_id: response_field(value, "id"),
            }),
            "text_delta" | "response.output_text.delta" => match extract_fragment(value) {
                Some(fragment) => Ok(Self::TextDelta { fragment }),
                None => Err(SourceError::malformed(kind, "missing text fragment")),
            },
            "completed" | "response.completed" => Ok(Self::Completed {
                status: response_field(value, "status"),
            }),
            // Output was cut short (token limit, content filter); the producer
            // still ended the response, so it is terminal.
            "response.incomplete" => Ok(Self::Completed {
                status: Some(incomplete_status(value)),
            }),
            "error" | "response.error" | "response.failed" => match extract_message(value) {
                Some(message) => Ok(Self::Error { message }),
                None => Err(SourceError::malformed(kind, "missing error message")),
            },
            other => Ok(Self::Unknown {
                kind: other.to_string(),
                payload: value.clone(),
            }),
        }
    }
}

fn response_field(value: &Value, field: &str) -> Option<String> {
    value
        .get("response")
        .and_then(|r| r.get(field))
        .or_else(|| value.get(field))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn incomplete_status(value: &Value) -> String {
    let reason = value
        .get("response")
        .unwrap_or(value)
        .get("incomplete_details")
        .and_then(|d| d.get("reason"))
        .and_then(Value::as_str);
    match reason {
        Some(reason) => format!("incomplete: {reason}"),
        None => "incomplete".to_string(),
    }
}

fn extract_fragment(value: &Value) -> Option<String> {
    let lookup = |v: &Value| -> Option<String> {
        match v.get("delta") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(delta) => delta
                .get("value")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            None => v
                .get("fragment")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
        }
    };
    lookup(value).or_else(|| value.get("data").and_then(lookup))
}

fn extract_message(value: &Value) -> Option<String> {
    let nested = |v: &Value| -> Option<String> {
        match v.get("error") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(err) => err
                .get("message")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            None => None,
        }
    };
    nested(value)
        .or_else(|| value.get("response").and_then(nested))
        .or_else(|| value.get("message").and_then(Value::as_str).map(ToOwned::to_owned))
        .or_else(|| match value.get("data") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(data) => data
                .get("message")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            None => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_responses_api_tags() {
        let created = StreamEvent::from_json(&json!({
            "type": "response.created",
            "response": {"id": "resp_1", "status": "in_progress"}
        }))
        .expect("created");
        assert_eq!(
            created,
            StreamEvent::Created {
                response_id: Some("resp_1".into())
            }
        );

        let delta = StreamEvent::from_json(&json!({
            "type": "response.output_text.delta",
            "delta": "double "
        }))
        .expect("delta");
        assert_eq!(
            delta,
            StreamEvent::TextDelta {
                fragment: "double ".into()
            }
        );

        let completed = StreamEvent::from_json(&json!({
            "type": "response.completed",
            "response": {"status": "completed", "output": []}
        }))
        .expect("completed");
        assert!(completed.is_terminal());
        assert_eq!(completed.kind(), KIND_COMPLETED);
    }

    #[test]
    fn incomplete_response_is_terminal_with_reason() {
        let event = StreamEvent::from_json(&json!({
            "type": "response.incomplete",
            "response": {
                "status": "incomplete",
                "incomplete_details": {"reason": "max_output_tokens"}
            }
        }))
        .expect("incomplete");
        assert!(event.is_terminal());
        assert_eq!(
            event,
            StreamEvent::Completed {
                status: Some("incomplete: max_output_tokens".into())
            }
        );

        let bare = StreamEvent::from_json(&json!({"type": "response.incomplete"}))
            .expect("incomplete without details");
        assert_eq!(
            bare,
            StreamEvent::Completed {
                status: Some("incomplete".into())
            }
        );
    }

    #[test]
    fn decodes_canonical_kind_tags_and_nested_delta_value() {
        let delta = StreamEvent::from_json(&json!({
            "kind": "text_delta",
            "data": {"delta": {"value": "bath"}}
        }))
        .expect("delta");
        assert_eq!(
            delta,
            StreamEvent::TextDelta {
                fragment: "bath".into()
            }
        );
    }

    #[test]
    fn error_message_is_found_in_common_locations() {
        let top = StreamEvent::from_json(&json!({"type": "error", "message": "rate limited"}))
            .expect("error");
        assert_eq!(
            top,
            StreamEvent::Error {
                message: "rate limited".into()
            }
        );

        let failed = StreamEvent::from_json(&json!({
            "type": "response.failed",
            "response": {"error": {"message": "quota exceeded"}}
        }))
        .expect("failed");
        assert_eq!(
            failed,
            StreamEvent::Error {
                message: "quota exceeded".into()
            }
        );
    }

    #[test]
    fn text_delta_without_fragment_is_malformed() {
        let err = StreamEvent::from_json(&json!({"type": "response.output_text.delta"}))
            .expect_err("should be malformed");
        assert!(
            matches!(err, SourceError::MalformedEvent { ref kind, .. } if kind == "response.output_text.delta")
        );
    }

    #[test]
    fn error_without_message_is_malformed() {
        let err = StreamEvent::from_json(&json!({"type": "error"})).expect_err("malformed");
        assert!(matches!(err, SourceError::MalformedEvent { .. }));
    }

    #[test]
    fn unknown_kind_is_preserved_not_rejected() {
        let value = json!({"type": "response.reasoning_summary.delta", "delta": "hmm"});
        let event = StreamEvent::from_json(&value).expect("unknown is fine");
        assert_eq!(event.kind(), "response.reasoning_summary.delta");
        assert!(!event.is_terminal());
        assert!(matches!(event, StreamEvent::Unknown { payload, .. } if payload == value));
    }

    #[test]
    fn fallback_kind_is_used_only_without_discriminator() {
        let event = StreamEvent::from_json_with_fallback(&json!({"delta": "x"}), Some("text_delta"))
            .expect("fallback");
        assert_eq!(event, StreamEvent::TextDelta { fragment: "x".into() });

        let err = StreamEvent::from_json(&json!({"delta": "x"})).expect_err("no kind");
        assert!(matches!(err, SourceError::MalformedEvent { .. }));
    }

    #[test]
    fn invalid_json_string_is_a_transport_error() {
        let err = StreamEvent::from_json_str("{not json").expect_err("bad json");
        assert!(matches!(err, SourceError::Transport { .. }));
    }
}
