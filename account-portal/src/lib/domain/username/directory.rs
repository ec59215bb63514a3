use std::sync::Arc;

use serde_json::Value;

use super::errors::ClaimError;
use super::models::canonicalize;
use super::models::Username;
use crate::domain::account::models::AccountId;
use crate::domain::store::keys;
use crate::domain::store::KeyValueStore;
use crate::domain::store::SetOutcome;
use crate::domain::store::StoreError;

/// Username-to-account mapping over the backing store.
///
/// Holds no state of its own. `is_taken` is advisory and only feeds live
/// feedback; `claim` is the single authority on who owns a username.
pub struct UsernameDirectory<S>
where
    S: KeyValueStore + ?Sized,
{
    store: Arc<S>,
}

impl<S> UsernameDirectory<S>
where
    S: KeyValueStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Whether an entry exists for `candidate`.
    ///
    /// The candidate is canonicalized before building the key but is not
    /// validated, so short candidates are looked up like any other.
    ///
    /// # Errors
    /// * `StoreError` - The store could not answer; availability is unknown
    pub async fn is_taken(&self, candidate: &str) -> Result<bool, StoreError> {
        let key = keys::raw_username_key(&canonicalize(candidate));
        let entry = self.store.get(&key).await?;

        Ok(entry.is_some())
    }

    /// Reserve `username` for `account_id` with a create-if-absent write.
    ///
    /// Any existing entry wins, including one previously written for the
    /// same account.
    ///
    /// # Errors
    /// * `AlreadyTaken` - An entry already exists
    /// * `Store` - The store failed; the reservation state is unknown
    pub async fn claim(&self, username: &Username, account_id: &AccountId) -> Result<(), ClaimError> {
        let key = keys::username_key(username);
        let outcome = self
            .store
            .set_if_absent(&key, Value::String(account_id.as_str().to_string()))
            .await?;

        match outcome {
            SetOutcome::Created => {
                tracing::info!(username = %username, account_id = %account_id, "Username claimed");
                Ok(())
            }
            SetOutcome::AlreadyExists => {
                tracing::info!(username = %username, account_id = %account_id, "Username claim lost");
                Err(ClaimError::AlreadyTaken(username.as_str().to_string()))
            }
        }
    }

    /// Account currently holding `username`, if any.
    pub async fn owner_of(&self, username: &Username) -> Result<Option<AccountId>, StoreError> {
        match self.store.get(&keys::username_key(username)).await? {
            Some(Value::String(id)) => Ok(Some(AccountId::new(id))),
            Some(other) => Err(StoreError::Malformed(format!(
                "username entry is not a string: {}",
                other
            ))),
            None => Ok(None),
        }
    }
}
