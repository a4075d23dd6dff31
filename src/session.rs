//! Ephemeral session storage.
//!
//! Sessions live in process memory and are lost on restart. Concurrent
//! requests for the same session are not serialized: each one loads, works
//! on its own copy, and saves, so the last save wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::onboarding::ConversationState;

/// How many sessions the store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Never evict. Memory grows with the number of distinct session ids.
    #[default]
    Unbounded,
    /// Keep at most this many sessions, evicting the least recently used.
    MaxEntries(usize),
}

/// Keyed storage for conversation state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the stored state, creating and storing a fresh one on first access.
    async fn load_or_create(&self, session_id: &str) -> ConversationState;

    /// Replace the stored state unconditionally.
    async fn save(&self, session_id: &str, state: ConversationState);

    /// Number of stored sessions.
    async fn len(&self) -> usize;
}

struct Entry {
    state: ConversationState,
    last_used: u64,
}

/// `HashMap`-backed store behind a `tokio` lock.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    policy: EvictionPolicy,
    clock: AtomicU64,
}

impl MemorySessionStore {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            policy,
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Make room for one new session under `MaxEntries`.
    fn evict_for_insert(&self, sessions: &mut HashMap<String, Entry>) {
        let EvictionPolicy::MaxEntries(max) = self.policy else {
            return;
        };
        while sessions.len() >= max {
            // linear scan; fine for the sizes an in-process store is meant for
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::debug!(session_id = %oldest, "Evicted least recently used session");
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load_or_create(&self, session_id: &str) -> ConversationState {
        let now = self.tick();
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_used = now;
            return entry.state.clone();
        }

        self.evict_for_insert(&mut sessions);
        let state = ConversationState::default();
        sessions.insert(
            session_id.to_string(),
            Entry {
                state: state.clone(),
                last_used: now,
            },
        );
        tracing::debug!(session_id, "Created new session");
        state
    }

    async fn save(&self, session_id: &str, state: ConversationState) {
        let now = self.tick();
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.state = state;
            entry.last_used = now;
            return;
        }
        self.evict_for_insert(&mut sessions);
        sessions.insert(
            session_id.to_string(),
            Entry {
                state,
                last_used: now,
            },
        );
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
