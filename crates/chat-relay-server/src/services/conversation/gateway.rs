use std::sync::Arc;
use tracing::debug;

use crate::services::platform::{
    ChatPlatform, Conversation, CreatedUser, Message, UpstreamError,
};

use super::cache::MessageCache;

/// Chat platform access with the message cache layered on top.
///
/// Reads of a conversation's messages go through the cache; a successful
/// send invalidates that conversation so the next read is upstream-fresh.
pub struct ConversationGateway {
    platform: Arc<dyn ChatPlatform>,
    cache: MessageCache,
}

impl ConversationGateway {
    pub fn new(platform: Arc<dyn ChatPlatform>, cache: MessageCache) -> Self {
        Self { platform, cache }
    }

    pub async fn create_user(&self) -> Result<CreatedUser, UpstreamError> {
        self.platform.create_user().await
    }

    pub async fn create_conversation(&self, user_key: &str) -> Result<Conversation, UpstreamError> {
        self.platform.create_conversation(user_key).await
    }

    pub async fn send_message(
        &self,
        user_key: &str,
        conversation_id: &str,
        text: &str,
    ) -> Result<Message, UpstreamError> {
        let message = self
            .platform
            .send_message(user_key, conversation_id, text)
            .await?;

        self.cache.invalidate(conversation_id);
        Ok(message)
    }

    /// Conversation messages, oldest first. Served from cache when fresh.
    pub async fn messages(
        &self,
        user_key: &str,
        conversation_id: &str,
    ) -> Result<Vec<Message>, UpstreamError> {
        if let Some(messages) = self.cache.get(conversation_id) {
            return Ok(messages);
        }

        debug!("Cache miss for conversation {}, fetching upstream", conversation_id);
        let ticket = self.cache.begin_fill(conversation_id);
        match self.platform.list_messages(user_key, conversation_id).await {
            Ok(page) => {
                self.cache.complete_fill(ticket, page.messages.clone());
                Ok(page.messages)
            }
            Err(e) => {
                self.cache.abandon_fill(ticket);
                Err(e)
            }
        }
    }

    pub fn invalidate(&self, conversation_id: &str) {
        self.cache.invalidate(conversation_id);
    }

    pub fn cache(&self) -> &MessageCache {
        &self.cache
    }
}
