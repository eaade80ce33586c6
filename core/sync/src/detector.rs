//! Duplicate detection against the remote store.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};

use pulsetrack_common::Result;
use pulsetrack_storage::{KeyValueStore, WorkoutBackend};

use crate::queue::QueueStore;
use crate::record::{OfflineWorkoutRecord, SyncConflict};

/// Configuration for conflict matching.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Half-width of the symmetric completion-time window used to match a
    /// queued record against remote logs. There is no shared transaction id
    /// between the offline path and the remote store, so this window is a
    /// heuristic, not a proof of identity.
    pub match_window: Duration,
}

impl DetectorConfig {
    /// Set the match window.
    pub fn with_match_window(mut self, window: Duration) -> Self {
        self.match_window = window;
        self
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            match_window: Duration::hours(1),
        }
    }
}

/// Checks whether a semantically equivalent record already exists remotely.
pub struct ConflictDetector<B, S>
where
    B: WorkoutBackend,
    S: KeyValueStore,
{
    backend: Arc<B>,
    queue: Arc<QueueStore<S>>,
    config: DetectorConfig,
}

impl<B, S> ConflictDetector<B, S>
where
    B: WorkoutBackend,
    S: KeyValueStore,
{
    /// Create a new detector.
    pub fn new(backend: Arc<B>, queue: Arc<QueueStore<S>>, config: DetectorConfig) -> Self {
        Self {
            backend,
            queue,
            config,
        }
    }

    /// Check a queued record for a remote counterpart.
    ///
    /// Returns `Ok(Some(conflict))` when a remote log for the same user and
    /// plan completed within the match window exists; the conflict is
    /// persisted before it is returned. Returns `Ok(None)` when the record
    /// is safe to write. A failed remote query propagates as an error so
    /// callers treat it as a transient sync failure rather than a false
    /// "no conflict".
    pub async fn check(&self, record: &OfflineWorkoutRecord) -> Result<Option<SyncConflict>> {
        // An open conflict already routes this record to the resolver.
        if let Some(existing) = self.queue.open_conflict_for(&record.id).await? {
            debug!(record_id = %record.id, conflict_id = %existing.id, "conflict already open");
            return Ok(Some(existing));
        }

        let from = record.completed_at - self.config.match_window;
        let to = record.completed_at + self.config.match_window;

        let matches = self
            .backend
            .query_workout_logs(&record.user_id, &record.workout_plan_id, from, to)
            .await?;

        let Some(counterpart) = matches.into_iter().next() else {
            return Ok(None);
        };

        info!(
            record_id = %record.id,
            server_log_id = %counterpart.id,
            "remote counterpart found within match window"
        );

        let conflict = self
            .queue
            .insert_conflict(SyncConflict::new(record.clone(), counterpart))
            .await?;

        Ok(Some(conflict))
    }
}
