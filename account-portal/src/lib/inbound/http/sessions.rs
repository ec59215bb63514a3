use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::session::AuthSession;

#[derive(Debug)]
struct OpenSession {
    session: AuthSession,
    last_seen: Instant,
}

/// Open client sessions, keyed by the id handed to the page.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, OpenSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a signed-out session.
    pub async fn open(&self) -> AuthSession {
        let session = AuthSession::new();
        self.sessions.write().await.insert(
            session.id(),
            OpenSession {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );

        tracing::info!(session_id = %session.id(), "Session opened");
        session
    }

    /// Look up a session and mark it as seen.
    pub async fn get(&self, id: Uuid) -> Option<AuthSession> {
        let mut sessions = self.sessions.write().await;
        let open = sessions.get_mut(&id)?;
        open.last_seen = Instant::now();
        Some(open.session.clone())
    }

    /// Drop a session. Its event streams end once the last clone is gone.
    pub async fn close(&self, id: Uuid) -> Option<AuthSession> {
        let removed = self.sessions.write().await.remove(&id);
        if removed.is_some() {
            tracing::info!(session_id = %id, "Session closed");
        }
        removed.map(|open| open.session)
    }

    /// Drop every session not seen for `max_idle`. Returns how many went.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, open| open.last_seen.elapsed() < max_idle);

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Sweep idle sessions every `interval` in a background task.
    pub fn spawn_sweeper(&self, interval: Duration, max_idle: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.evict_idle(max_idle).await;
            }
        })
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
