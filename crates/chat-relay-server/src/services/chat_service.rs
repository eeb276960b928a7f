//! Chat orchestration: one inbound widget message, end to end.
//!
//! ValidateInput -> EnsureUser -> EnsureConversation -> SendMessage
//! -> AwaitReply (best-effort) -> ListHistory (best-effort) -> Respond

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::chat::{ChatResponse, ConversationInfo, UserInfo};
use crate::services::conversation::{ConversationGateway, ResponseWaiter};
use crate::services::platform::{Message, UpstreamError};
use crate::utils::error::ApiError;
use crate::utils::mask_secret;

pub const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to create user: {0}")]
    UserCreation(#[source] UpstreamError),

    #[error("failed to create conversation: {0}")]
    ConversationCreation(#[source] UpstreamError),

    #[error("failed to send message: {0}")]
    SendFailed(#[source] UpstreamError),
}

impl ChatError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UserCreation(_) => "USER_CREATION_FAILED",
            Self::ConversationCreation(_) => "CONVERSATION_CREATION_FAILED",
            Self::SendFailed(_) => "MESSAGE_SEND_FAILED",
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let code = err.code();
        match err {
            ChatError::Validation(message) => ApiError::Validation {
                message,
                fields: Default::default(),
            },
            // Logged here with the cause; callers only get a fixed message
            ChatError::UserCreation(e) => {
                tracing::error!("User creation failed: {}", e);
                ApiError::Upstream {
                    code,
                    message: "Failed to create chat user".to_string(),
                }
            }
            ChatError::ConversationCreation(e) => {
                tracing::error!("Conversation creation failed: {}", e);
                ApiError::Upstream {
                    code,
                    message: "Failed to create conversation".to_string(),
                }
            }
            ChatError::SendFailed(e) => {
                tracing::error!("Message send failed: {}", e);
                ApiError::Upstream {
                    code,
                    message: "Failed to send message".to_string(),
                }
            }
        }
    }
}

/// Result of a step whose failure must not fail the request
#[derive(Debug)]
pub enum StepOutcome<T> {
    Completed(T),
    Degraded(UpstreamError),
}

impl<T> StepOutcome<T> {
    fn from_result(result: Result<T, UpstreamError>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(e) => Self::Degraded(e),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    pub fn unwrap_or_else(self, fallback: impl FnOnce() -> T) -> T {
        match self {
            Self::Completed(value) => value,
            Self::Degraded(_) => fallback(),
        }
    }
}

/// Inbound chat message after HTTP extraction
#[derive(Debug, Clone, Default)]
pub struct ChatInput {
    pub message: String,
    pub user_key: Option<String>,
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
}

/// Everything the orchestrator learned while handling one message
#[derive(Debug)]
pub struct ChatOutcome {
    pub user_key: String,
    pub user_id: String,
    pub conversation_id: String,
    pub sent: Message,
    pub reply: StepOutcome<Option<Message>>,
    pub history: StepOutcome<Vec<Message>>,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        ChatResponse {
            sent_message: outcome.sent,
            bot_response: outcome.reply.unwrap_or_else(|| None),
            conversation: ConversationInfo {
                id: outcome.conversation_id,
                is_started: true,
            },
            messages: outcome.history.unwrap_or_else(Vec::new),
            user: UserInfo {
                key: outcome.user_key,
                id: outcome.user_id,
            },
        }
    }
}

pub struct ChatService {
    gateway: Arc<ConversationGateway>,
    waiter: ResponseWaiter,
}

impl ChatService {
    pub fn new(gateway: Arc<ConversationGateway>, waiter: ResponseWaiter) -> Self {
        Self { gateway, waiter }
    }

    pub fn gateway(&self) -> &ConversationGateway {
        &self.gateway
    }

    pub async fn handle_message(&self, input: ChatInput) -> Result<ChatOutcome, ChatError> {
        let start_time = Instant::now();

        // ===== ValidateInput =====
        let text = validate_message(&input.message)?;
        let user_key = non_blank(input.user_key);
        let user_id = non_blank(input.user_id);
        let conversation_id = non_blank(input.conversation_id);

        // ===== EnsureUser =====
        let (user_key, created_user_id) = match user_key {
            Some(key) => (key, None),
            None => {
                let created = self
                    .gateway
                    .create_user()
                    .await
                    .map_err(ChatError::UserCreation)?;
                info!(
                    "Created user {} (key: {})",
                    created.user.id,
                    mask_secret(&created.key)
                );
                (created.key, Some(created.user.id))
            }
        };

        // ===== EnsureConversation =====
        let conversation_id = match conversation_id {
            Some(id) => id,
            None => {
                let conversation = self
                    .gateway
                    .create_conversation(&user_key)
                    .await
                    .map_err(ChatError::ConversationCreation)?;
                info!("Started conversation {}", conversation.id);
                conversation.id
            }
        };

        // ===== SendMessage =====
        let sent = self
            .gateway
            .send_message(&user_key, &conversation_id, text)
            .await
            .map_err(ChatError::SendFailed)?;
        debug!(
            "Sent message {} to conversation {} ({} chars)",
            sent.id,
            conversation_id,
            text.chars().count()
        );

        // ===== AwaitReply (best-effort) =====
        let reply = StepOutcome::from_result(self.waiter.wait_for_reply(&user_key, &sent).await);
        if let StepOutcome::Degraded(e) = &reply {
            warn!(
                "Waiting for reply in conversation {} failed (timeout: {}): {}",
                conversation_id,
                e.is_timeout(),
                e
            );
        }

        // ===== ListHistory (best-effort) =====
        let history =
            StepOutcome::from_result(self.gateway.messages(&user_key, &conversation_id).await);
        if let StepOutcome::Degraded(e) = &history {
            warn!(
                "Listing messages for conversation {} failed, responding with empty history: {}",
                conversation_id, e
            );
        }

        let user_id = created_user_id
            .or(user_id)
            .unwrap_or_else(|| sent.user_id.clone());

        info!(
            "Chat request for conversation {} done in {:?} (reply: {}, history degraded: {})",
            conversation_id,
            start_time.elapsed(),
            matches!(reply, StepOutcome::Completed(Some(_))),
            history.is_degraded()
        );

        Ok(ChatOutcome {
            user_key,
            user_id,
            conversation_id,
            sent,
            reply,
            history,
        })
    }
}

/// Trimmed message text, or a validation error
pub fn validate_message(message: &str) -> Result<&str, ChatError> {
    let text = message.trim();
    if text.is_empty() {
        return Err(ChatError::Validation("Message cannot be empty".to_string()));
    }

    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::Validation(format!(
            "Message cannot exceed {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    Ok(text)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
