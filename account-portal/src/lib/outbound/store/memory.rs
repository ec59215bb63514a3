use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::store::KeyValueStore;
use crate::domain::store::SetOutcome;
use crate::domain::store::StoreError;

/// Process-local store. Used in development and tests.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_if_absent(&self, key: &str, value: Value) -> Result<SetOutcome, StoreError> {
        // check and insert under one write guard
        let mut entries = self.entries.write().await;
        match entries.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(SetOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(SetOutcome::Created)
            }
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn probe(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
