//! Conversation message handling
//!
//! Provides:
//! - Thread-safe message caching with lazy ttl expiry (DashMap); fills that
//!   race an invalidation are dropped
//! - Cache-aware access to the chat platform
//! - Bounded polling for the bot's reply

mod cache;
mod gateway;
mod waiter;

pub use cache::{FillTicket, MessageCache};
pub use gateway::ConversationGateway;
pub use waiter::{ResponseWaiter, WaitExit};

#[cfg(test)]
pub(crate) use gateway::test_support;
