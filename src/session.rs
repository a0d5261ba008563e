//! Conversation history and the per-browser session store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants;

/// One question and the explanation that answered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub user: String,
    pub bot: String,
}

/// Ordered, append-only history of a session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversationLog {
    turns: Vec<ChatTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Plain-text history: `You:` / `Bot:` pairs, each followed by `---`.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("You: {}\nBot: {}\n---\n", turn.user, turn.bot))
            .collect()
    }
}

pub type SessionId = Uuid;

/// A session's log, locked for the whole of a turn so turns never interleave.
pub type SharedLog = Arc<Mutex<ConversationLog>>;

struct SessionEntry {
    log: SharedLog,
    last_used: Instant,
}

/// Logs for every open browser session. Nothing is persisted.
///
/// Sessions idle for longer than the store's idle timeout are evicted the
/// next time a session is created. A session whose log is checked out by a
/// running turn is kept regardless of age.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(constants::SESSION_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Start a session with an empty log, evicting idle ones first.
    pub async fn create(&self) -> SessionId {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        Self::evict_idle_locked(&mut sessions, self.idle_timeout);
        sessions.insert(
            id,
            SessionEntry {
                log: Arc::new(Mutex::new(ConversationLog::new())),
                last_used: Instant::now(),
            },
        );
        info!(session_id = %id, open = sessions.len(), "Session started");
        id
    }

    /// Look up a session's log and mark the session as used.
    pub async fn get(&self, id: &SessionId) -> Option<SharedLog> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(entry.log.clone())
    }

    /// End a session, dropping its log. Returns false for unknown ids.
    pub async fn end(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session ended");
        }
        removed
    }

    /// Drop every idle session now. Returns how many were removed.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        Self::evict_idle_locked(&mut sessions, self.idle_timeout)
    }

    fn evict_idle_locked(
        sessions: &mut HashMap<SessionId, SessionEntry>,
        idle_timeout: Duration,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|id, entry| {
            // Another holder of the Arc means a turn is running on this log.
            let keep =
                entry.last_used.elapsed() < idle_timeout || Arc::strong_count(&entry.log) > 1;
            if !keep {
                debug!(session_id = %id, "Evicting idle session");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, open = sessions.len(), "Idle sessions evicted");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(user: &str, bot: &str) -> ChatTurn {
        ChatTurn {
            user: user.to_string(),
            bot: bot.to_string(),
        }
    }

    #[test]
    fn test_log_starts_empty() {
        let log = ConversationLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert_eq!(log.transcript(), "");
        assert!(log.last().is_none());
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let mut log = ConversationLog::new();
        log.append(turn("first", "one"));
        log.append(turn("second", "two"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.turns()[0].user, "first");
        assert_eq!(log.last(), Some(&turn("second", "two")));
    }

    #[test]
    fn test_transcript_format() {
        let mut log = ConversationLog::new();
        log.append(turn("What is a microgrid?", "A local grid."));
        log.append(turn("And VPPs?", "Aggregated resources."));
        assert_eq!(
            log.transcript(),
            "You: What is a microgrid?\nBot: A local grid.\n---\n\
             You: And VPPs?\nBot: Aggregated resources.\n---\n"
        );
    }

    #[tokio::test]
    async fn test_store_create_get_end() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let id = store.create().await;
        let other = store.create().await;
        assert_ne!(id, other);
        assert_eq!(store.len().await, 2);

        let log = store.get(&id).await.unwrap();
        log.lock().await.append(turn("q", "a"));
        assert_eq!(store.get(&id).await.unwrap().lock().await.len(), 1);
        assert!(store.get(&other).await.unwrap().lock().await.is_empty());

        assert!(store.end(&id).await);
        assert!(!store.end(&id).await);
        assert!(store.get(&id).await.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_evicts_idle_sessions() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(60));
        let stale = store.create().await;
        let touched = store.create().await;

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(store.get(&touched).await.is_some());

        tokio::time::advance(Duration::from_secs(40)).await;
        let fresh = store.create().await;

        assert!(store.get(&stale).await.is_none());
        assert!(store.get(&touched).await.is_some());
        assert!(store.get(&fresh).await.is_some());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_in_use_is_not_evicted() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(1));
        let busy = store.create().await;
        let idle = store.create().await;
        let held = store.get(&busy).await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.evict_idle().await, 1);
        assert!(store.get(&idle).await.is_none());
        assert!(store.get(&busy).await.is_some());

        drop(held);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.evict_idle().await, 1);
        assert!(store.is_empty().await);
    }
}
