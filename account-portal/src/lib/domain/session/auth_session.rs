use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::account::models::AccountHandle;

/// One client's view of the identity provider: who is signed in, plus a
/// notification stream of every transition.
///
/// Subscribers see the current value immediately, then every sign-in,
/// sign-out or profile change published afterwards.
#[derive(Debug, Clone)]
pub struct AuthSession {
    id: Uuid,
    current: Arc<watch::Sender<Option<AccountHandle>>>,
}

impl AuthSession {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            id: Uuid::new_v4(),
            current: Arc::new(current),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current_user(&self) -> Option<AccountHandle> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AccountHandle>> {
        self.current.subscribe()
    }

    /// Replace the current user and notify subscribers, even if unchanged.
    pub(crate) fn publish(&self, account: Option<AccountHandle>) {
        self.current.send_replace(account);
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}
