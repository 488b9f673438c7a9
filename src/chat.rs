use crate::error::ChatError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NO_MESSAGES: &str = "No messages provided in the request.";
pub const LATEST_NOT_USER: &str = "The latest message must be from the user.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    /// `null` reads as no messages. Entries stay raw until the latest one is
    /// picked, so earlier turns may carry any content shape.
    #[serde(default)]
    pub messages: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// The only body Flowise's prediction endpoint needs from us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamPayload {
    pub question: String,
}

impl ChatRequest {
    /// Reads a caller body. Anything that is not shaped like a message list
    /// is an unexpected fault rather than a validation failure.
    pub fn from_value(body: Value) -> Result<Self, ChatError> {
        serde_json::from_value(body).map_err(|err| ChatError::Unexpected(err.to_string()))
    }

    pub fn to_payload(&self) -> Result<UpstreamPayload, ChatError> {
        let latest = self
            .messages
            .as_deref()
            .and_then(<[Value]>::last)
            .ok_or_else(|| ChatError::Validation(NO_MESSAGES.to_string()))?;
        let latest = Message::deserialize(latest)
            .map_err(|err| ChatError::Unexpected(err.to_string()))?;
        let role = latest.role.as_deref().unwrap_or_default();
        if role.to_lowercase() != "user" {
            return Err(ChatError::Validation(LATEST_NOT_USER.to_string()));
        }
        Ok(UpstreamPayload {
            question: latest.content.unwrap_or_default(),
        })
    }
}

pub fn normalize(body: Value) -> Result<UpstreamPayload, ChatError> {
    ChatRequest::from_value(body)?.to_payload()
}

#[cfg(test)]
mod tests {
    use super::{ChatRequest, LATEST_NOT_USER, NO_MESSAGES, UpstreamPayload, normalize};
    use crate::error::ChatError;
    use serde_json::json;

    #[test]
    fn latest_user_message_becomes_question() {
        let payload = normalize(json!({
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "what is rust?"}
            ]
        }))
        .expect("payload");
        assert_eq!(
            payload,
            UpstreamPayload {
                question: "what is rust?".to_string()
            }
        );
    }

    #[test]
    fn role_check_ignores_case() {
        let payload = normalize(json!({
            "messages": [{"role": "USER", "content": "hi"}]
        }))
        .expect("payload");
        assert_eq!(payload.question, "hi");
    }

    #[test]
    fn empty_messages_rejected() {
        let err = normalize(json!({ "messages": [] })).unwrap_err();
        assert_eq!(err, ChatError::Validation(NO_MESSAGES.to_string()));
        assert_eq!(err.to_string(), "No messages provided in the request.");
    }

    #[test]
    fn missing_messages_field_treated_as_empty() {
        let err = normalize(json!({})).unwrap_err();
        assert_eq!(err, ChatError::Validation(NO_MESSAGES.to_string()));
    }

    #[test]
    fn null_messages_treated_as_empty() {
        let err = normalize(json!({ "messages": null })).unwrap_err();
        assert_eq!(err, ChatError::Validation(NO_MESSAGES.to_string()));
    }

    #[test]
    fn earlier_turns_may_use_structured_content() {
        let payload = normalize(json!({
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": "a"}]},
                {"role": "assistant", "content": "b"},
                {"role": "user", "content": "c"}
            ]
        }))
        .expect("payload");
        assert_eq!(payload.question, "c");
    }

    #[test]
    fn latest_non_string_content_is_unexpected() {
        let err = normalize(json!({
            "messages": [{"role": "user", "content": [{"type": "text", "text": "a"}]}]
        }))
        .unwrap_err();
        assert!(matches!(err, ChatError::Unexpected(_)));
    }

    #[test]
    fn latest_assistant_message_rejected() {
        let err = normalize(json!({
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), LATEST_NOT_USER);
    }

    #[test]
    fn missing_role_rejected() {
        let err = normalize(json!({ "messages": [{"content": "hi"}] })).unwrap_err();
        assert_eq!(err, ChatError::Validation(LATEST_NOT_USER.to_string()));
    }

    #[test]
    fn missing_content_defaults_to_empty_question() {
        let payload = normalize(json!({ "messages": [{"role": "user"}] })).expect("payload");
        assert_eq!(payload.question, "");
    }

    #[test]
    fn malformed_messages_are_unexpected() {
        let err = normalize(json!({ "messages": "not a list" })).unwrap_err();
        assert!(matches!(err, ChatError::Unexpected(_)));
        assert!(err.to_string().starts_with("Unexpected error: "));
    }

    #[test]
    fn normalizing_twice_yields_same_payload() {
        let req = ChatRequest::from_value(json!({
            "messages": [{"role": "user", "content": "same"}]
        }))
        .expect("request");
        assert_eq!(req.to_payload(), req.to_payload());
    }

    #[test]
    fn payload_serializes_as_question_object() {
        let payload = UpstreamPayload {
            question: "hi".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&payload).expect("json"),
            json!({"question": "hi"})
        );
    }
}
