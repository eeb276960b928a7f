use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ReplyPollingConfig;
use crate::services::platform::{Message, UpstreamError};

use super::gateway::ConversationGateway;

/// Why polling ended without finding a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitExit {
    NoChange,
    AttemptsExhausted,
}

/// Polls a conversation until the bot answers a specific user message.
///
/// The poll loop is bounded by `max_attempts`, by exponential backoff capped
/// at `max_delay_ms`, and by an early exit after `no_change_limit` polls in a
/// row where the conversation's message count did not grow.
pub struct ResponseWaiter {
    gateway: Arc<ConversationGateway>,
    config: ReplyPollingConfig,
}

impl ResponseWaiter {
    pub fn new(gateway: Arc<ConversationGateway>, config: ReplyPollingConfig) -> Self {
        Self { gateway, config }
    }

    /// Backoff before attempt `attempt` (0-indexed), without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = self.config.backoff_multiplier.powi(attempt as i32);
        let millis =
            (self.config.initial_delay_ms as f64 * exp).min(self.config.max_delay_ms as f64);
        Duration::from_secs_f64(millis / 1000.0)
    }

    /// Backoff plus up to `jitter_ratio` of random extra delay; never shorter than the base
    pub fn delay_with_jitter<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = base.mul_f64(self.config.jitter_ratio * rng.random::<f64>());
        base + jitter
    }

    /// Wait for the first message created after `sent`.
    ///
    /// `Ok(None)` means no reply showed up within the polling window.
    /// Upstream failures are returned as errors.
    pub async fn wait_for_reply(
        &self,
        user_key: &str,
        sent: &Message,
    ) -> Result<Option<Message>, UpstreamError> {
        let conversation_id = sent.conversation_id.as_str();
        let started = Instant::now();
        let mut last_count = 0usize;
        let mut unchanged_polls = 0u32;

        for attempt in 0..self.config.max_attempts {
            let delay = self.delay_with_jitter(attempt, &mut rand::rng());
            tokio::time::sleep(delay).await;

            let messages = self.gateway.messages(user_key, conversation_id).await.map_err(|e| {
                warn!(
                    "Polling conversation {} failed on attempt {} after {:?}: {}",
                    conversation_id,
                    attempt + 1,
                    started.elapsed(),
                    e
                );
                e
            })?;

            debug!(
                "Poll attempt {}/{} for conversation {}: {} messages (waited {:?}, elapsed {:?})",
                attempt + 1,
                self.config.max_attempts,
                conversation_id,
                messages.len(),
                delay,
                started.elapsed()
            );

            let Some(anchor) = messages.iter().find(|m| m.id == sent.id) else {
                debug!("Sent message {} not indexed yet", sent.id);
                continue;
            };

            if messages.len() == last_count {
                unchanged_polls += 1;
                if unchanged_polls >= self.config.no_change_limit {
                    self.log_exit(WaitExit::NoChange, conversation_id, attempt + 1, started);
                    return Ok(None);
                }
            } else {
                unchanged_polls = 0;
                last_count = messages.len();
            }

            if let Some(reply) = first_reply_after(&messages, anchor) {
                info!(
                    "Bot reply {} found for conversation {} on attempt {} ({:?})",
                    reply.id,
                    conversation_id,
                    attempt + 1,
                    started.elapsed()
                );
                return Ok(Some(reply.clone()));
            }
        }

        self.log_exit(
            WaitExit::AttemptsExhausted,
            conversation_id,
            self.config.max_attempts,
            started,
        );
        Ok(None)
    }

    fn log_exit(&self, exit: WaitExit, conversation_id: &str, attempts: u32, started: Instant) {
        warn!(
            "No bot reply for conversation {} ({:?} after {} attempts, {:?})",
            conversation_id,
            exit,
            attempts,
            started.elapsed()
        );
    }
}

/// Earliest message, other than `anchor`, created strictly after it
fn first_reply_after<'a>(messages: &'a [Message], anchor: &Message) -> Option<&'a Message> {
    messages
        .iter()
        .filter(|m| m.id != anchor.id && m.created_at > anchor.created_at)
        .min_by_key(|m| m.created_at)
}
