//! Shared application state injected into every Axum handler.

use std::collections::HashMap;
use std::sync::Arc;

use tactical_core::{CatalogCache, ConversationAssembler, Session};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::Config;

/// A session behind its own lock; holding the lock means owning the turn.
pub type SharedSession = Arc<Mutex<Session>>;

/// In-memory registry of live sessions. Nothing here outlives the process.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.sessions.try_read().map(|s| s.len()).unwrap_or(0);
        write!(f, "SessionRegistry({count} sessions)")
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) -> SharedSession {
        let id = session.id;
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, Arc::clone(&shared));
        shared
    }

    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Drop a session. Returns `true` if it existed.
    pub async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Time-windowed model catalog.
    pub catalog: Arc<CatalogCache>,
    /// Turn driver bound to the remote chat-completion capability.
    pub assembler: ConversationAssembler,
    /// Live chat sessions.
    pub sessions: Arc<SessionRegistry>,
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use tactical_core::Genre;

    #[tokio::test]
    async fn registry_insert_get_remove() {
        let registry = SessionRegistry::new();
        let shared = registry.insert(Session::new(None, Genre::default())).await;
        let id = shared.lock().await.id;

        assert!(registry.get(&id).await.is_some());
        assert_eq!(registry.len().await, 1);
        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(registry.get(&id).await.is_none());
    }
}
