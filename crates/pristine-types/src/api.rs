//! Request and response bodies for the chat backend.

use crate::Role;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /chat/message`, whose response is streamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub email: String,
    pub visitor_id: String,
}

/// Body of `POST /chat/store-conversation-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMessageRequest {
    pub visitor_id: String,
    pub sender: Role,
    pub message: String,
}

/// Body of `POST /chat/reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub visitor_id: String,
}

/// Response of `POST /chat/reset`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetResponse {
    /// True when the backend closed the conversation.
    #[serde(default)]
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResetResponse {
    /// Value reported when the backend answers with a non-success status.
    pub fn inactive() -> Self {
        Self {
            status: false,
            active: Some(false),
            message: None,
        }
    }
}

/// Response of `GET /chat/status/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub active: bool,
    /// Any additional fields the backend reports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusResponse {
    pub fn inactive() -> Self {
        Self::default()
    }
}

/// Payload of one `data:` record of the chat stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_response_defaults() {
        let resp: ResetResponse = serde_json::from_str(r#"{"message":"still open"}"#).unwrap();
        assert!(!resp.status);
        assert_eq!(resp.message.as_deref(), Some("still open"));
    }

    #[test]
    fn test_status_response_keeps_extra_fields() {
        let resp: StatusResponse =
            serde_json::from_str(r#"{"active":true,"agent":"kim"}"#).unwrap();
        assert!(resp.active);
        assert_eq!(resp.extra["agent"], "kim");
    }

    #[test]
    fn test_store_message_request_shape() {
        let req = StoreMessageRequest {
            visitor_id: "v-9".into(),
            sender: Role::Assistant,
            message: "done".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["visitorId"], "v-9");
        assert_eq!(value["sender"], "assistant");
    }

    #[test]
    fn test_stream_chunk_without_content() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(chunk.content.is_none());
    }
}
