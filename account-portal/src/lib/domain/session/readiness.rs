use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::domain::account::ports::IdentityProvider;
use crate::domain::store::KeyValueStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InitializationError {
    #[error("Collaborators not ready after {waited:?}")]
    TimedOut { waited: Duration },
}

/// Resolved once, when the identity provider and the store both answered.
#[derive(Debug)]
pub struct ReadinessGate {
    ready: watch::Sender<bool>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self { ready }
    }

    /// Gate that starts resolved.
    pub fn ready() -> Self {
        let gate = Self::new();
        gate.mark_ready();
        gate
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait for the gate to resolve, for at most `timeout`.
    ///
    /// # Errors
    /// * `TimedOut` - Still unresolved when the timeout elapsed
    pub async fn wait(&self, timeout: Duration) -> Result<(), InitializationError> {
        let mut receiver = self.ready.subscribe();

        let waited = tokio::time::timeout(timeout, receiver.wait_for(|ready| *ready)).await;
        match waited {
            Ok(Ok(_)) => Ok(()),
            // the sender lives in self, so a closed channel cannot happen here
            Ok(Err(_)) | Err(_) => Err(InitializationError::TimedOut { waited: timeout }),
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe both collaborators every `interval` until both answer, then
/// resolve `gate`. Gives up with `TimedOut` after `timeout`.
pub async fn initialize<I, S>(
    gate: &ReadinessGate,
    identity: &I,
    store: &S,
    interval: Duration,
    timeout: Duration,
) -> Result<(), InitializationError>
where
    I: IdentityProvider + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let probe_until_ready = async {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let (identity_probe, store_probe) = tokio::join!(identity.probe(), store.probe());

            match (identity_probe, store_probe) {
                (Ok(()), Ok(())) => {
                    tracing::info!(attempt, "Identity provider and store are ready");
                    return;
                }
                (identity_result, store_result) => {
                    tracing::debug!(
                        attempt,
                        identity_error = ?identity_result.err(),
                        store_error = ?store_result.err(),
                        "Collaborators not ready yet"
                    );
                }
            }

            tokio::time::sleep(interval).await;
        }
    };

    match tokio::time::timeout(timeout, probe_until_ready).await {
        Ok(()) => {
            gate.mark_ready();
            Ok(())
        }
        Err(_) => {
            tracing::error!(timeout_ms = timeout.as_millis() as u64, "Initialization timed out");
            Err(InitializationError::TimedOut { waited: timeout })
        }
    }
}
