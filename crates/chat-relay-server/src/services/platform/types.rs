use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chat platform user, as returned when the user is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result of `create_user`: the user plus the session key that authenticates it
#[derive(Debug, Clone)]
pub struct CreatedUser {
    pub key: String,
    pub user: PlatformUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Non-text payload fields are relayed untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub conversation_id: String,
    pub user_id: String,
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// One page of a conversation's messages, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub meta: PageMeta,
}

impl MessagePage {
    pub fn sort_chronologically(&mut self) {
        self.messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    }
}

/// Body of `POST /messages`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendMessageBody<'a> {
    pub payload: MessagePayload,
    pub conversation_id: &'a str,
}

// ===== Raw response envelopes =====
// Fields are optional so a missing id surfaces as a malformed-response error
// instead of an opaque decode failure.

#[derive(Debug, Deserialize)]
pub(crate) struct CreateUserResponse {
    pub user: Option<PlatformUser>,
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateConversationResponse {
    pub conversation: Option<RawConversation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawConversation {
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessageResponse {
    pub message: Option<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_keeps_unknown_payload_fields() {
        let raw = json!({
            "id": "msg_1",
            "createdAt": "2026-01-01T10:00:00.000Z",
            "conversationId": "conv_1",
            "userId": "bot_1",
            "payload": {
                "type": "choice",
                "text": "Pick one",
                "options": [{"label": "A", "value": "a"}]
            }
        });

        let message: Message = serde_json::from_value(raw).unwrap();
        assert_eq!(message.payload.kind, "choice");
        assert_eq!(message.payload.text.as_deref(), Some("Pick one"));

        let back = serde_json::to_value(&message).unwrap();
        assert_eq!(back["payload"]["options"][0]["value"], "a");
        assert_eq!(back["conversationId"], "conv_1");
    }

    #[test]
    fn test_page_sorts_oldest_first() {
        let raw = json!({
            "messages": [
                {"id": "b", "createdAt": "2026-01-01T10:00:02Z", "conversationId": "c", "userId": "bot", "payload": {"type": "text", "text": "hi"}},
                {"id": "a", "createdAt": "2026-01-01T10:00:00Z", "conversationId": "c", "userId": "u", "payload": {"type": "text", "text": "hello"}}
            ],
            "meta": {"nextToken": "t1"}
        });

        let mut page: MessagePage = serde_json::from_value(raw).unwrap();
        page.sort_chronologically();

        let ids: Vec<_> = page.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(page.meta.next_token.as_deref(), Some("t1"));
    }
}
