use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::ChatApiConfig;
use crate::utils::redact_secret;

use super::types::{
    Conversation, CreateConversationResponse, CreateUserResponse, CreatedUser, Message,
    MessagePage, MessagePayload, SendMessageBody, SendMessageResponse,
};
use super::{ChatPlatform, UpstreamError};

const USER_KEY_HEADER: &str = "x-user-key";
const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP client bound to one chat platform webhook URL
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(config: &ChatApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode a 2xx JSON body. `user_key` is redacted from error bodies.
    async fn decode<T: DeserializeOwned>(
        endpoint: &'static str,
        user_key: &str,
        response: Result<Response, reqwest::Error>,
    ) -> Result<T, UpstreamError> {
        let response = response.map_err(|source| UpstreamError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let body: String = redact_secret(&raw, user_key)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            debug!("{} error body ({}): {}", endpoint, status, body);
            return Err(UpstreamError::Status {
                endpoint,
                status,
                body,
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                UpstreamError::Malformed {
                    endpoint,
                    reason: e.to_string(),
                }
            } else {
                UpstreamError::Transport { endpoint, source: e }
            }
        })
    }
}

#[async_trait::async_trait]
impl ChatPlatform for UpstreamClient {
    async fn create_user(&self) -> Result<CreatedUser, UpstreamError> {
        const ENDPOINT: &str = "create_user";

        let response = self.client.post(self.url("/users")).json(&json!({})).send().await;
        let body: CreateUserResponse = Self::decode(ENDPOINT, "", response).await?;

        match (body.key, body.user) {
            (Some(key), Some(user)) if !key.is_empty() && !user.id.is_empty() => {
                debug!("Created chat platform user {}", user.id);
                Ok(CreatedUser { key, user })
            }
            _ => Err(UpstreamError::Malformed {
                endpoint: ENDPOINT,
                reason: "missing user id or key".to_string(),
            }),
        }
    }

    async fn create_conversation(&self, user_key: &str) -> Result<Conversation, UpstreamError> {
        const ENDPOINT: &str = "create_conversation";

        let response = self
            .client
            .post(self.url("/conversations"))
            .header(USER_KEY_HEADER, user_key)
            .json(&json!({}))
            .send()
            .await;
        let body: CreateConversationResponse = Self::decode(ENDPOINT, user_key, response).await?;

        let raw = body.conversation.ok_or_else(|| UpstreamError::Malformed {
            endpoint: ENDPOINT,
            reason: "missing conversation".to_string(),
        })?;

        match raw.id {
            Some(id) if !id.is_empty() => {
                debug!("Created conversation {}", id);
                Ok(Conversation {
                    id,
                    created_at: raw.created_at,
                    updated_at: raw.updated_at,
                })
            }
            _ => Err(UpstreamError::Malformed {
                endpoint: ENDPOINT,
                reason: "missing conversation id".to_string(),
            }),
        }
    }

    async fn send_message(
        &self,
        user_key: &str,
        conversation_id: &str,
        text: &str,
    ) -> Result<Message, UpstreamError> {
        const ENDPOINT: &str = "send_message";

        let request = SendMessageBody {
            payload: MessagePayload::text(text),
            conversation_id,
        };
        let response = self
            .client
            .post(self.url("/messages"))
            .header(USER_KEY_HEADER, user_key)
            .json(&request)
            .send()
            .await;
        let body: SendMessageResponse = Self::decode(ENDPOINT, user_key, response).await?;

        body.message.ok_or_else(|| UpstreamError::Malformed {
            endpoint: ENDPOINT,
            reason: "missing message".to_string(),
        })
    }

    async fn list_messages(
        &self,
        user_key: &str,
        conversation_id: &str,
    ) -> Result<MessagePage, UpstreamError> {
        const ENDPOINT: &str = "list_messages";

        let response = self
            .client
            .get(self.url(&format!("/conversations/{}/messages", conversation_id)))
            .header(USER_KEY_HEADER, user_key)
            .send()
            .await;
        let mut page: MessagePage = Self::decode(ENDPOINT, user_key, response).await?;
        page.sort_chronologically();

        debug!(
            "Listed {} messages for conversation {}",
            page.messages.len(),
            conversation_id
        );
        Ok(page)
    }
}
