use std::sync::Arc;

use super::models::AccountId;
use super::models::AccountRecord;
use crate::domain::store::keys;
use crate::domain::store::KeyValueStore;
use crate::domain::store::StoreError;

/// Account records kept next to the username reservations.
///
/// Plain reads and writes: record writes are not subject to the
/// uniqueness constraint and never go through create-if-absent.
pub struct AccountRecords<S>
where
    S: KeyValueStore + ?Sized,
{
    store: Arc<S>,
}

impl<S> AccountRecords<S>
where
    S: KeyValueStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        self.store
            .get(&keys::account_key(id))
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    pub async fn put(&self, id: &AccountId, record: &AccountRecord) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)?;
        self.store.set(&keys::account_key(id), value).await
    }
}
