use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::services::platform::Message;

#[derive(Debug, Clone)]
struct CacheEntry {
    messages: Vec<Message>,
    last_updated: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_updated) >= self.ttl
    }
}

/// Permission to store one upstream read, taken before the read starts.
/// An `invalidate` for the same conversation revokes it.
#[derive(Debug)]
pub struct FillTicket {
    conversation_id: String,
    id: u64,
}

/// Thread-safe in-memory message cache, keyed by conversation id.
/// Expired entries are purged lazily on read, never by a background sweep.
#[derive(Clone)]
pub struct MessageCache {
    storage: Arc<DashMap<String, CacheEntry>>,
    // Latest outstanding fill per conversation
    pending_fills: Arc<DashMap<String, u64>>,
    next_ticket: Arc<AtomicU64>,
    ttl: Duration,
}

impl MessageCache {
    pub fn new(ttl: Duration) -> Self {
        debug!("Initializing message cache (ttl: {:?})", ttl);
        Self {
            storage: Arc::new(DashMap::new()),
            pending_fills: Arc::new(DashMap::new()),
            next_ticket: Arc::new(AtomicU64::new(0)),
            ttl,
        }
    }

    /// Cached messages for a conversation, or None if absent or expired
    pub fn get(&self, conversation_id: &str) -> Option<Vec<Message>> {
        let now = Instant::now();
        self.evict_expired(now);

        let entry = self.storage.get(conversation_id)?;
        // An entry can expire between the sweep and this read
        if entry.is_expired(now) {
            return None;
        }

        debug!(
            "Cache hit for conversation {} (age: {:?})",
            conversation_id,
            now.saturating_duration_since(entry.last_updated)
        );
        Some(entry.messages.clone())
    }

    /// Insert or fully replace the entry with a fresh timestamp
    pub fn put(&self, conversation_id: &str, messages: Vec<Message>) {
        let count = messages.len();
        self.storage.insert(
            conversation_id.to_string(),
            CacheEntry {
                messages,
                last_updated: Instant::now(),
                ttl: self.ttl,
            },
        );
        debug!("Cached {} messages for conversation {}", count, conversation_id);
    }

    /// Register an upstream read whose result may be stored with `complete_fill`.
    /// A newer ticket for the same conversation supersedes this one.
    pub fn begin_fill(&self, conversation_id: &str) -> FillTicket {
        let id = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.pending_fills.insert(conversation_id.to_string(), id);
        FillTicket {
            conversation_id: conversation_id.to_string(),
            id,
        }
    }

    /// Store the result of a ticketed read unless the conversation was
    /// invalidated (or re-ticketed) since `begin_fill`. Returns whether it was stored.
    pub fn complete_fill(&self, ticket: FillTicket, messages: Vec<Message>) -> bool {
        // The pending entry stays locked while storing so `invalidate` cannot interleave
        match self.pending_fills.entry(ticket.conversation_id) {
            Entry::Occupied(pending) if *pending.get() == ticket.id => {
                self.put(pending.key(), messages);
                pending.remove();
                true
            }
            Entry::Occupied(pending) => {
                debug!("Dropping superseded fill for conversation {}", pending.key());
                false
            }
            Entry::Vacant(vacant) => {
                debug!("Dropping fill for invalidated conversation {}", vacant.key());
                false
            }
        }
    }

    /// Forget a ticket whose read failed
    pub fn abandon_fill(&self, ticket: FillTicket) {
        self.pending_fills
            .remove_if(&ticket.conversation_id, |_, id| *id == ticket.id);
    }

    /// Drop the entry and revoke any fill still in flight for it
    pub fn invalidate(&self, conversation_id: &str) {
        self.pending_fills.remove(conversation_id);
        if self.storage.remove(conversation_id).is_some() {
            debug!("Invalidated cache for conversation {}", conversation_id);
        }
    }

    pub fn clear(&self) {
        self.pending_fills.clear();
        self.storage.clear();
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn evict_expired(&self, now: Instant) -> usize {
        let start_len = self.storage.len();
        self.storage.retain(|_, entry| !entry.is_expired(now));
        let removed = start_len.saturating_sub(self.storage.len());

        if removed > 0 {
            debug!("Evicted {} expired conversation entries", removed);
        }

        removed
    }
}
