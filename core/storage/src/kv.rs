//! Key-value store trait definition.

use async_trait::async_trait;

use pulsetrack_common::Result;

/// Durable client-side key-value persistence.
///
/// The sync engine keeps its queue and conflict documents as JSON values
/// under fixed keys. The only mutation discipline the underlying primitive
/// is assumed to support is read-the-whole-value / write-the-whole-value,
/// so implementations never need partial updates.
///
/// Implementations must not panic on corrupt or inaccessible storage; they
/// return `Error::Storage` so callers can degrade to a session-only queue.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the store name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Read the full value stored under `key`.
    ///
    /// # Postconditions
    /// - Returns `None` when the key has never been written
    ///
    /// # Errors
    /// - Storage read failure
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the full value stored under `key`.
    ///
    /// # Errors
    /// - Storage write failure (corruption, quota)
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Remove the value stored under `key`. Removing a missing key is a no-op.
    async fn remove(&self, key: &str) -> Result<()>;

    /// List all keys currently present in the store.
    async fn keys(&self) -> Result<Vec<String>>;
}
