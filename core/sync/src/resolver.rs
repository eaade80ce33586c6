//! Applying a chosen resolution to a detected conflict.

use std::sync::Arc;
use tracing::{info, warn};

use chrono::Utc;
use pulsetrack_common::Result;
use pulsetrack_storage::{KeyValueStore, WorkoutBackend, WorkoutLogPatch};

use crate::queue::QueueStore;
use crate::record::ConflictResolution;

/// Applies a user- or policy-selected resolution to an open conflict.
///
/// The conflict is marked resolved with the chosen resolution BEFORE any
/// downstream write, so a resolution is never left half-applied from the
/// conflict-tracking perspective. A downstream write failure is reported to
/// the caller but does not re-open the conflict; the queue item keeps its
/// pending state and the failure is recorded against it.
pub struct ConflictResolver<B, S>
where
    B: WorkoutBackend,
    S: KeyValueStore,
{
    backend: Arc<B>,
    queue: Arc<QueueStore<S>>,
}

impl<B, S> ConflictResolver<B, S>
where
    B: WorkoutBackend,
    S: KeyValueStore,
{
    /// Create a new resolver.
    pub fn new(backend: Arc<B>, queue: Arc<QueueStore<S>>) -> Self {
        Self { backend, queue }
    }

    /// Resolve an open conflict.
    ///
    /// - `KeepLocal`: resubmit the queued record's remote write, ignoring
    ///   the existing remote log; on success the queue item is synced.
    /// - `KeepServer`: the remote log is authoritative; the queue item is
    ///   discarded with zero remote writes.
    /// - `Merge`: append the queued exercises to the existing remote log,
    ///   annotate its notes, then discard the queue item. Exactly one
    ///   remote log row remains.
    pub async fn resolve(&self, conflict_id: &str, resolution: ConflictResolution) -> Result<()> {
        let conflict = self.queue.mark_resolved(conflict_id, resolution).await?;

        info!(
            %conflict_id,
            record_id = %conflict.local.id,
            %resolution,
            "resolving conflict"
        );

        match resolution {
            ConflictResolution::KeepLocal => {
                match self
                    .backend
                    .log_workout_with_exercises(&conflict.local.to_log_entry())
                    .await
                {
                    Ok(log_id) => {
                        info!(record_id = %conflict.local.id, %log_id, "local record resubmitted");
                        self.queue.mark_synced(&conflict.local.id).await
                    }
                    Err(e) => {
                        warn!(record_id = %conflict.local.id, error = %e, "resubmit failed");
                        self.queue
                            .record_attempt(&conflict.local.id, &e.to_string())
                            .await?;
                        Err(e)
                    }
                }
            }
            ConflictResolution::KeepServer => self.queue.remove(&conflict.local.id).await,
            ConflictResolution::Merge => {
                for exercise in &conflict.local.exercises {
                    if let Err(e) = self
                        .backend
                        .insert_exercise_log(&conflict.server.id, exercise)
                        .await
                    {
                        warn!(
                            record_id = %conflict.local.id,
                            server_log_id = %conflict.server.id,
                            error = %e,
                            "merge write failed"
                        );
                        self.queue
                            .record_attempt(&conflict.local.id, &e.to_string())
                            .await?;
                        return Err(e);
                    }
                }

                let annotation = format!(
                    "Merged offline session {} on {}",
                    conflict.local.id,
                    Utc::now().format("%Y-%m-%d %H:%M UTC")
                );
                let notes = match &conflict.server.notes {
                    Some(existing) => format!("{}\n{}", existing, annotation),
                    None => annotation,
                };

                self.backend
                    .update_workout_log(&conflict.server.id, &WorkoutLogPatch { notes: Some(notes) })
                    .await?;

                self.queue.remove(&conflict.local.id).await
            }
        }
    }
}
