use async_trait::async_trait;
use serde_json::Value;

use super::errors::StoreError;

/// Result of a create-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Created,
    AlreadyExists,
}

/// Single-key access to the backing key-value store.
///
/// No transactions are assumed beyond `set_if_absent`, which must be atomic
/// at the store: of any number of concurrent calls for the same absent key,
/// exactly one observes `Created`.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value at `key`.
    ///
    /// # Returns
    /// The stored value, or None when the key is absent
    ///
    /// # Errors
    /// * `Unavailable` - Store unreachable
    /// * `Rejected` - Store refused the read (e.g. permissions)
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write `value` at `key` only if nothing is stored there yet.
    ///
    /// # Returns
    /// `Created` if this call wrote the value, `AlreadyExists` otherwise
    ///
    /// # Errors
    /// * `Unavailable` - Store unreachable; the write may or may not have happened
    /// * `Rejected` - Store refused the write
    async fn set_if_absent(&self, key: &str, value: Value) -> Result<SetOutcome, StoreError>;

    /// Unconditionally write `value` at `key`.
    ///
    /// # Errors
    /// * `Unavailable` - Store unreachable
    /// * `Rejected` - Store refused the write
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Cheap round trip used by the startup readiness handshake.
    async fn probe(&self) -> Result<(), StoreError>;
}
