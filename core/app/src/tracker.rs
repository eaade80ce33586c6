//! The public tracking facade.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pulsetrack_common::{Error, Result};
use pulsetrack_storage::{KeyValueStore, WorkoutBackend};
use pulsetrack_sync::{
    CompletedWorkout, ConflictDetector, ConflictResolution, ConflictResolver,
    ConnectivityObserver, DetectorConfig, OfflineWorkoutRecord, QueueStore, SyncConfig,
    SyncConflict, SyncOrchestrator, SyncReport,
};

/// Where a logged workout ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    /// Written straight to the remote store; carries the remote log id.
    Remote(String),
    /// Persisted to the offline queue; carries the local record id.
    Queued(String),
}

/// Public surface for logging and syncing workout completions.
///
/// Logging a workout never appears to fail to the caller: when the direct
/// remote write is impossible (offline) or fails, the record is queued; if
/// even local persistence fails, the record is held in a session-only
/// overflow list and drained back into the queue on the next sync trigger.
/// Only validation problems are surfaced immediately.
pub struct WorkoutTracker<B, S, C>
where
    B: WorkoutBackend,
    S: KeyValueStore,
    C: ConnectivityObserver,
{
    backend: Arc<B>,
    queue: Arc<QueueStore<S>>,
    orchestrator: SyncOrchestrator<B, S>,
    resolver: ConflictResolver<B, S>,
    connectivity: Arc<C>,
    /// Session-only fallback for records that could not be persisted.
    session_overflow: Mutex<Vec<OfflineWorkoutRecord>>,
}

impl<B, S, C> WorkoutTracker<B, S, C>
where
    B: WorkoutBackend + 'static,
    S: KeyValueStore + 'static,
    C: ConnectivityObserver + 'static,
{
    /// Create a tracker over the given backend, store, and connectivity
    /// source.
    pub fn new(
        backend: Arc<B>,
        store: Arc<S>,
        connectivity: Arc<C>,
        sync_config: SyncConfig,
        detector_config: DetectorConfig,
    ) -> Self {
        let queue = Arc::new(QueueStore::new(store));
        let detector = ConflictDetector::new(backend.clone(), queue.clone(), detector_config);
        let orchestrator =
            SyncOrchestrator::new(backend.clone(), queue.clone(), detector, sync_config);
        let resolver = ConflictResolver::new(backend.clone(), queue.clone());

        Self {
            backend,
            queue,
            orchestrator,
            resolver,
            connectivity,
            session_overflow: Mutex::new(Vec::new()),
        }
    }

    /// Log a completed workout.
    ///
    /// Attempts a direct remote write when connectivity is present; any
    /// failure falls back to enqueueing. Returns where the record ended up.
    pub async fn log_workout(&self, workout: CompletedWorkout) -> Result<LogOutcome> {
        let record = OfflineWorkoutRecord::new(workout);

        if self.connectivity.is_online() {
            match self
                .backend
                .log_workout_with_exercises(&record.to_log_entry())
                .await
            {
                Ok(log_id) => {
                    debug!(%log_id, "workout logged directly");
                    return Ok(LogOutcome::Remote(log_id));
                }
                Err(e) => {
                    warn!(error = %e, "direct write failed, queueing workout");
                }
            }
        }

        let record_id = record.id.clone();
        match self.queue.enqueue(record.clone()).await {
            Ok(()) => Ok(LogOutcome::Queued(record_id)),
            Err(e) => {
                warn!(error = %e, "queue persistence failed, holding record in session memory");
                self.session_overflow.lock().await.push(record);
                Ok(LogOutcome::Queued(record_id))
            }
        }
    }

    /// Run a sync pass over the offline queue.
    ///
    /// Returns the zero report when offline. Session-overflow records are
    /// drained back into the durable queue first.
    pub async fn sync_workouts(&self) -> Result<SyncReport> {
        if !self.connectivity.is_online() {
            debug!("offline, skipping sync pass");
            return Ok(SyncReport::default());
        }

        self.drain_overflow().await;
        self.orchestrator.sync_all().await
    }

    /// All workout completions not yet confirmed persisted remotely,
    /// exhausted ones included.
    pub async fn offline_workouts(&self) -> Result<Vec<OfflineWorkoutRecord>> {
        let mut records = match self.queue.pending().await {
            Ok(records) => records,
            // Degrade to the session view when durable storage is unreadable.
            Err(Error::Storage(e)) => {
                warn!(error = %e, "queue unreadable, listing session records only");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        records.extend(self.session_overflow.lock().await.iter().cloned());
        Ok(records)
    }

    /// Number of records waiting to sync.
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.offline_workouts().await?.len())
    }

    /// True when any queued record has already failed at least one sync try.
    pub async fn has_failed_syncs(&self) -> Result<bool> {
        Ok(self
            .offline_workouts()
            .await?
            .iter()
            .any(|r| r.sync_attempts > 0))
    }

    /// Conflicts awaiting a resolution.
    pub async fn open_conflicts(&self) -> Result<Vec<SyncConflict>> {
        self.queue.open_conflicts().await
    }

    /// Apply a resolution to an open conflict.
    pub async fn resolve_conflict(
        &self,
        conflict_id: &str,
        resolution: ConflictResolution,
    ) -> Result<()> {
        self.resolver.resolve(conflict_id, resolution).await
    }

    /// Re-arm a record whose automatic retries are used up.
    pub async fn reset_record(&self, record_id: &str) -> Result<()> {
        self.queue.reset_attempts(record_id).await
    }

    /// Spawn a task that triggers a sync pass on every offline-to-online
    /// transition. The task ends when the connectivity source is dropped.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = self.clone();
        let mut rx = tracker.connectivity.subscribe();

        tokio::spawn(async move {
            let mut was_online = *rx.borrow();
            while rx.changed().await.is_ok() {
                let online = *rx.borrow();
                if online && !was_online {
                    info!("connectivity restored, starting sync pass");
                    match tracker.sync_workouts().await {
                        Ok(report) => info!(
                            synced = report.synced,
                            failed = report.failed,
                            conflicts = report.conflicts.len(),
                            "automatic sync pass finished"
                        ),
                        Err(e) => warn!(error = %e, "automatic sync pass failed"),
                    }
                }
                was_online = online;
            }
        })
    }

    /// Move session-overflow records into the durable queue where possible.
    async fn drain_overflow(&self) {
        let mut overflow = self.session_overflow.lock().await;
        if overflow.is_empty() {
            return;
        }

        let mut kept = Vec::new();
        for record in overflow.drain(..) {
            let record_id = record.id.clone();
            match self.queue.enqueue(record.clone()).await {
                Ok(()) => debug!(%record_id, "overflow record persisted to queue"),
                Err(Error::InvalidInput(_)) => {
                    // Already queued on an earlier drain.
                    debug!(%record_id, "overflow record already queued");
                }
                Err(e) => {
                    warn!(%record_id, error = %e, "overflow record still cannot be persisted");
                    kept.push(record);
                }
            }
        }
        *overflow = kept;
    }
}
