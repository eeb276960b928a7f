use serde::{Deserialize, Serialize};

use crate::services::platform::Message;

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub sent_message: Message,
    pub bot_response: Option<Message>,
    pub conversation: ConversationInfo,
    pub messages: Vec<Message>,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationInfo {
    pub id: String,
    pub is_started: bool,
}

/// Session identity handed back so the widget can continue the conversation
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub key: String,
    pub id: String,
}
