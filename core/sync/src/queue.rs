//! Durable queue of pending workout records and detected conflicts.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use pulsetrack_common::{Error, Result};
use pulsetrack_storage::KeyValueStore;

use crate::record::{ConflictResolution, OfflineWorkoutRecord, SyncConflict};

/// Store key of the offline workout document.
pub const WORKOUTS_KEY: &str = "pulsetrack.offline_workouts";
/// Store key of the conflict document.
pub const CONFLICTS_KEY: &str = "pulsetrack.sync_conflicts";

/// Version tag written into every persisted document.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct QueueDocument {
    version: u32,
    records: Vec<OfflineWorkoutRecord>,
}

impl Default for QueueDocument {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            records: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ConflictDocument {
    version: u32,
    conflicts: Vec<SyncConflict>,
}

impl Default for ConflictDocument {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            conflicts: Vec::new(),
        }
    }
}

/// Queue store over an injected key-value store.
///
/// Two independently keyed JSON documents hold the offline records and the
/// conflict audit trail. Every mutation is a full read-modify-write of one
/// document; same-process callers serialize through an internal mutex.
/// Two processes racing on the same underlying store are NOT protected
/// against; that is an accepted limitation of the storage primitive.
pub struct QueueStore<S: KeyValueStore> {
    store: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> QueueStore<S> {
    /// Create a queue store over the given key-value store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn load_records(&self) -> Result<QueueDocument> {
        match self.store.get(WORKOUTS_KEY).await? {
            None => Ok(QueueDocument::default()),
            Some(raw) => {
                let doc: QueueDocument = serde_json::from_str(&raw).map_err(|e| {
                    Error::Storage(format!("offline workout document is malformed: {}", e))
                })?;
                if doc.version != SCHEMA_VERSION {
                    return Err(Error::Storage(format!(
                        "unsupported offline workout document version: {}",
                        doc.version
                    )));
                }
                Ok(doc)
            }
        }
    }

    async fn save_records(&self, doc: &QueueDocument) -> Result<()> {
        let json = serde_json::to_string(doc).map_err(|e| Error::Serialization(e.to_string()))?;
        self.store.set(WORKOUTS_KEY, json).await
    }

    async fn load_conflicts(&self) -> Result<ConflictDocument> {
        match self.store.get(CONFLICTS_KEY).await? {
            None => Ok(ConflictDocument::default()),
            Some(raw) => {
                let doc: ConflictDocument = serde_json::from_str(&raw).map_err(|e| {
                    Error::Storage(format!("conflict document is malformed: {}", e))
                })?;
                if doc.version != SCHEMA_VERSION {
                    return Err(Error::Storage(format!(
                        "unsupported conflict document version: {}",
                        doc.version
                    )));
                }
                Ok(doc)
            }
        }
    }

    async fn save_conflicts(&self, doc: &ConflictDocument) -> Result<()> {
        let json = serde_json::to_string(doc).map_err(|e| Error::Serialization(e.to_string()))?;
        self.store.set(CONFLICTS_KEY, json).await
    }

    /// Add a record to the offline queue.
    pub async fn enqueue(&self, record: OfflineWorkoutRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_records().await?;

        if doc.records.iter().any(|r| r.id == record.id) {
            return Err(Error::InvalidInput(format!(
                "record already queued: {}",
                record.id
            )));
        }

        debug!(record_id = %record.id, "enqueueing offline workout");
        doc.records.push(record);
        self.save_records(&doc).await
    }

    /// All records still in the queue, synced or not.
    pub async fn all_records(&self) -> Result<Vec<OfflineWorkoutRecord>> {
        Ok(self.load_records().await?.records)
    }

    /// Records not yet confirmed persisted remotely.
    pub async fn pending(&self) -> Result<Vec<OfflineWorkoutRecord>> {
        let doc = self.load_records().await?;
        Ok(doc.records.into_iter().filter(|r| !r.synced).collect())
    }

    /// Pending records that have automatic retries left.
    pub async fn retryable(&self, max_attempts: u32) -> Result<Vec<OfflineWorkoutRecord>> {
        let doc = self.load_records().await?;
        Ok(doc
            .records
            .into_iter()
            .filter(|r| !r.synced && !r.is_exhausted(max_attempts))
            .collect())
    }

    /// Look up a single record.
    pub async fn get(&self, record_id: &str) -> Result<Option<OfflineWorkoutRecord>> {
        let doc = self.load_records().await?;
        Ok(doc.records.into_iter().find(|r| r.id == record_id))
    }

    /// Record a failed sync try against a queued record.
    pub async fn record_attempt(&self, record_id: &str, error: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_records().await?;
        let record = doc
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::NotFound(format!("queued record not found: {}", record_id)))?;

        record.record_failure(error);
        self.save_records(&doc).await
    }

    /// Mark a queued record as confirmed persisted remotely.
    pub async fn mark_synced(&self, record_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_records().await?;
        let record = doc
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::NotFound(format!("queued record not found: {}", record_id)))?;

        record.mark_synced();
        self.save_records(&doc).await
    }

    /// Re-arm an exhausted record for automatic retries.
    pub async fn reset_attempts(&self, record_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_records().await?;
        let record = doc
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::NotFound(format!("queued record not found: {}", record_id)))?;

        record.reset_attempts();
        self.save_records(&doc).await
    }

    /// Remove a record from the queue entirely.
    pub async fn remove(&self, record_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_records().await?;
        let before = doc.records.len();
        doc.records.retain(|r| r.id != record_id);

        if doc.records.len() == before {
            return Err(Error::NotFound(format!(
                "queued record not found: {}",
                record_id
            )));
        }

        self.save_records(&doc).await
    }

    /// Persist a detected conflict.
    ///
    /// A record has at most one open conflict at a time: when one already
    /// exists for the same local record, it is returned instead of
    /// inserting a duplicate.
    pub async fn insert_conflict(&self, conflict: SyncConflict) -> Result<SyncConflict> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_conflicts().await?;

        if let Some(existing) = doc
            .conflicts
            .iter()
            .find(|c| !c.resolved && c.local.id == conflict.local.id)
        {
            warn!(
                record_id = %conflict.local.id,
                conflict_id = %existing.id,
                "record already has an open conflict"
            );
            return Ok(existing.clone());
        }

        debug!(conflict_id = %conflict.id, record_id = %conflict.local.id, "recording conflict");
        doc.conflicts.push(conflict.clone());
        self.save_conflicts(&doc).await?;
        Ok(conflict)
    }

    /// All conflicts ever detected, resolved ones included (audit trail).
    pub async fn conflicts(&self) -> Result<Vec<SyncConflict>> {
        Ok(self.load_conflicts().await?.conflicts)
    }

    /// Conflicts still awaiting a resolution.
    pub async fn open_conflicts(&self) -> Result<Vec<SyncConflict>> {
        let doc = self.load_conflicts().await?;
        Ok(doc.conflicts.into_iter().filter(|c| !c.resolved).collect())
    }

    /// The open conflict for a queued record, if any.
    pub async fn open_conflict_for(&self, record_id: &str) -> Result<Option<SyncConflict>> {
        let doc = self.load_conflicts().await?;
        Ok(doc
            .conflicts
            .into_iter()
            .find(|c| !c.resolved && c.local.id == record_id))
    }

    /// Look up a single conflict.
    pub async fn get_conflict(&self, conflict_id: &str) -> Result<Option<SyncConflict>> {
        let doc = self.load_conflicts().await?;
        Ok(doc.conflicts.into_iter().find(|c| c.id == conflict_id))
    }

    /// Mark a conflict resolved with the chosen resolution.
    ///
    /// Returns the resolved conflict so callers can apply the downstream
    /// writes. Resolution is terminal: resolving twice is an error.
    pub async fn mark_resolved(
        &self,
        conflict_id: &str,
        resolution: ConflictResolution,
    ) -> Result<SyncConflict> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_conflicts().await?;
        let conflict = doc
            .conflicts
            .iter_mut()
            .find(|c| c.id == conflict_id)
            .ok_or_else(|| Error::NotFound(format!("conflict not found: {}", conflict_id)))?;

        if conflict.resolved {
            return Err(Error::Conflict(format!(
                "conflict already resolved: {}",
                conflict_id
            )));
        }

        conflict.mark_resolved(resolution);
        let resolved = conflict.clone();
        self.save_conflicts(&doc).await?;
        Ok(resolved)
    }
}
