//! Batch-wise replay of the offline queue against the remote store.

use futures::future::join_all;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use pulsetrack_common::Result;
use pulsetrack_storage::{KeyValueStore, WorkoutBackend};

use crate::detector::ConflictDetector;
use crate::queue::QueueStore;
use crate::record::{OfflineWorkoutRecord, SyncConflict};
use crate::retry::RetryPolicy;

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of queue items dispatched concurrently per batch.
    pub batch_size: usize,
    /// Retry cap and inter-batch pacing.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry: RetryPolicy::default(),
        }
    }
}

/// Aggregate outcome of one sync pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Records confirmed persisted remotely during this pass.
    pub synced: usize,
    /// Records whose dispatch failed during this pass.
    pub failed: usize,
    /// Conflicts detected during this pass, for the caller to surface.
    pub conflicts: Vec<SyncConflict>,
    /// Per-item error descriptions, for diagnostics.
    pub errors: Vec<String>,
}

/// Outcome of dispatching a single queue item.
enum ItemOutcome {
    Synced { record_id: String },
    Conflicted { conflict: SyncConflict },
    Failed { record_id: String, error: String },
}

/// Drains the offline queue in rate-limited batches.
///
/// Within a batch every item is dispatched concurrently and settles
/// independently; one item's failure never aborts the others. Batches are
/// strictly sequential with the policy's delay between them. There is no
/// mid-batch cancellation.
pub struct SyncOrchestrator<B, S>
where
    B: WorkoutBackend,
    S: KeyValueStore,
{
    backend: Arc<B>,
    queue: Arc<QueueStore<S>>,
    detector: ConflictDetector<B, S>,
    config: SyncConfig,
}

impl<B, S> SyncOrchestrator<B, S>
where
    B: WorkoutBackend,
    S: KeyValueStore,
{
    /// Create a new orchestrator.
    pub fn new(
        backend: Arc<B>,
        queue: Arc<QueueStore<S>>,
        detector: ConflictDetector<B, S>,
        config: SyncConfig,
    ) -> Self {
        Self {
            backend,
            queue,
            detector,
            config,
        }
    }

    /// Replay every retryable queued record.
    ///
    /// Records whose attempts are exhausted are skipped entirely: they are
    /// neither retried nor re-errored until reset or resolved. An empty
    /// queue returns the zero report with no remote calls.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        let pending = self.queue.retryable(self.config.retry.max_attempts).await?;

        if pending.is_empty() {
            debug!("offline queue empty, nothing to sync");
            return Ok(SyncReport::default());
        }

        info!(
            pending = pending.len(),
            batch_size = self.config.batch_size,
            "starting sync pass"
        );

        let mut report = SyncReport::default();

        for (index, batch) in pending.chunks(self.config.batch_size).enumerate() {
            if index > 0 {
                sleep(self.config.retry.inter_batch_delay).await;
            }

            debug!(batch = index, items = batch.len(), "dispatching batch");

            let outcomes = join_all(batch.iter().map(|record| self.dispatch(record))).await;

            for outcome in outcomes {
                self.settle(outcome, &mut report).await;
            }
        }

        info!(
            synced = report.synced,
            failed = report.failed,
            conflicts = report.conflicts.len(),
            "sync pass finished"
        );

        Ok(report)
    }

    /// Run write-or-detect-conflict for one record.
    ///
    /// Every failure mode is folded into an [`ItemOutcome`] so the batch
    /// loop never needs error handling at the fan-out level.
    async fn dispatch(&self, record: &OfflineWorkoutRecord) -> ItemOutcome {
        match self.detector.check(record).await {
            Ok(Some(conflict)) => ItemOutcome::Conflicted { conflict },
            Ok(None) => match self
                .backend
                .log_workout_with_exercises(&record.to_log_entry())
                .await
            {
                Ok(log_id) => {
                    debug!(record_id = %record.id, %log_id, "record persisted remotely");
                    ItemOutcome::Synced {
                        record_id: record.id.clone(),
                    }
                }
                Err(e) => ItemOutcome::Failed {
                    record_id: record.id.clone(),
                    error: e.to_string(),
                },
            },
            // Detector errors (failed remote query) are transient sync
            // failures, never a false "no conflict".
            Err(e) => ItemOutcome::Failed {
                record_id: record.id.clone(),
                error: e.to_string(),
            },
        }
    }

    /// Persist a settled item's state and fold it into the report.
    async fn settle(&self, outcome: ItemOutcome, report: &mut SyncReport) {
        match outcome {
            ItemOutcome::Synced { record_id } => {
                match self.queue.mark_synced(&record_id).await {
                    Ok(()) => report.synced += 1,
                    Err(e) => {
                        warn!(%record_id, error = %e, "failed to persist synced state");
                        report.failed += 1;
                        report.errors.push(format!("{}: {}", record_id, e));
                    }
                }
            }
            ItemOutcome::Conflicted { conflict } => {
                let record_id = conflict.local.id.clone();
                if let Err(e) = self
                    .queue
                    .record_attempt(&record_id, "conflict detected; resolution required")
                    .await
                {
                    warn!(%record_id, error = %e, "failed to persist conflict attempt");
                    report.errors.push(format!("{}: {}", record_id, e));
                }
                report.conflicts.push(conflict);
            }
            ItemOutcome::Failed { record_id, error } => {
                warn!(%record_id, %error, "record failed to sync");
                if let Err(e) = self.queue.record_attempt(&record_id, &error).await {
                    warn!(%record_id, error = %e, "failed to persist failure state");
                    report.errors.push(format!("{}: {}", record_id, e));
                }
                report.failed += 1;
                report.errors.push(format!("{}: {}", record_id, error));
            }
        }
    }
}
