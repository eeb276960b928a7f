//! Chat platform access
//!
//! The rest of the service talks to the conversational-AI platform through
//! the [`ChatPlatform`] trait. [`UpstreamClient`] is the HTTP implementation.

mod client;
pub mod types;

pub use client::UpstreamClient;
pub use types::{
    Conversation, CreatedUser, Message, MessagePage, MessagePayload, PageMeta, PlatformUser,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// `body` is truncated and has the caller's key redacted. It is kept out
    /// of `Display`, so logging the error never prints upstream text.
    #[error("{endpoint} returned {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{endpoint} returned a malformed response: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },
}

impl UpstreamError {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Malformed { endpoint, .. } => endpoint,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }
}

/// Operations offered by the chat platform.
/// Each call is a single round trip; retries belong to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn create_user(&self) -> Result<CreatedUser, UpstreamError>;

    async fn create_conversation(&self, user_key: &str) -> Result<Conversation, UpstreamError>;

    async fn send_message(
        &self,
        user_key: &str,
        conversation_id: &str,
        text: &str,
    ) -> Result<Message, UpstreamError>;

    async fn list_messages(
        &self,
        user_key: &str,
        conversation_id: &str,
    ) -> Result<MessagePage, UpstreamError>;
}
