//! Queued workout records and conflict bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pulsetrack_common::{UserId, WorkoutPlanId};
use pulsetrack_storage::{CompletedExercise, WorkoutLog, WorkoutLogEntry};

/// A workout session as handed to the tracker by the caller.
#[derive(Debug, Clone)]
pub struct CompletedWorkout {
    pub user_id: UserId,
    pub workout_plan_id: WorkoutPlanId,
    pub duration_minutes: u32,
    pub calories_burned: u32,
    pub exercises: Vec<CompletedExercise>,
    pub title: String,
    pub description: Option<String>,
    /// Completion time; defaults to now when omitted.
    pub completed_at: Option<DateTime<Utc>>,
}

/// A workout completion waiting in the offline queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineWorkoutRecord {
    /// Locally generated identifier, unique within the queue.
    pub id: String,
    /// User the session belongs to.
    pub user_id: UserId,
    /// Plan the session was completed against.
    pub workout_plan_id: WorkoutPlanId,
    /// Session duration in minutes.
    pub duration_minutes: u32,
    /// Estimated calories burned.
    pub calories_burned: u32,
    /// Exercises completed during the session, in order.
    pub exercises: Vec<CompletedExercise>,
    /// Display title carried through to the remote write.
    pub title: String,
    /// Display description carried through to the remote write.
    pub description: Option<String>,
    /// True once the record is confirmed persisted remotely.
    pub synced: bool,
    /// Completion time; the conflict-matching anchor.
    pub completed_at: DateTime<Utc>,
    /// Number of sync tries so far.
    pub sync_attempts: u32,
    /// Last sync failure, cleared on success.
    pub sync_error: Option<String>,
    /// When the last sync try happened, cleared on success.
    pub last_sync_attempt: Option<DateTime<Utc>>,
}

impl OfflineWorkoutRecord {
    /// Create a fresh queue record from a completed session.
    pub fn new(workout: CompletedWorkout) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: workout.user_id,
            workout_plan_id: workout.workout_plan_id,
            duration_minutes: workout.duration_minutes,
            calories_burned: workout.calories_burned,
            exercises: workout.exercises,
            title: workout.title,
            description: workout.description,
            synced: false,
            completed_at: workout.completed_at.unwrap_or_else(Utc::now),
            sync_attempts: 0,
            sync_error: None,
            last_sync_attempt: None,
        }
    }

    /// Build the transactional remote write payload for this record.
    pub fn to_log_entry(&self) -> WorkoutLogEntry {
        WorkoutLogEntry {
            user_id: self.user_id.clone(),
            workout_plan_id: self.workout_plan_id.clone(),
            duration_minutes: self.duration_minutes,
            calories_burned: self.calories_burned,
            title: self.title.clone(),
            notes: self.description.clone(),
            completed_at: self.completed_at,
            exercises: self.exercises.clone(),
        }
    }

    /// Mark as confirmed persisted remotely, clearing diagnostics.
    pub fn mark_synced(&mut self) {
        self.synced = true;
        self.sync_error = None;
        self.last_sync_attempt = None;
    }

    /// Record a failed sync try.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.sync_attempts += 1;
        self.sync_error = Some(error.into());
        self.last_sync_attempt = Some(Utc::now());
    }

    /// Re-arm an exhausted record for automatic retries.
    pub fn reset_attempts(&mut self) {
        self.sync_attempts = 0;
        self.sync_error = None;
        self.last_sync_attempt = None;
    }

    /// Whether automatic retries are used up.
    ///
    /// An exhausted record stays in the queue but is skipped by sync passes
    /// until it is reset or resolved.
    pub fn is_exhausted(&self, max_attempts: u32) -> bool {
        self.sync_attempts >= max_attempts
    }
}

/// The chosen strategy for discarding or reconciling a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
    /// The queued record wins; resubmit it, ignoring the remote one.
    #[serde(rename = "local")]
    KeepLocal,
    /// The remote record is authoritative; discard the queued one.
    #[serde(rename = "server")]
    KeepServer,
    /// Append the queued exercises onto the remote record.
    #[serde(rename = "merged")]
    Merge,
}

impl std::fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepLocal => write!(f, "local"),
            Self::KeepServer => write!(f, "server"),
            Self::Merge => write!(f, "merged"),
        }
    }
}

/// A detected possible duplicate between a queued record and a remote log.
///
/// Conflicts are kept as an audit trail: `resolved = true` is terminal and
/// they are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Unique conflict identifier.
    pub id: String,
    /// The offending queued record.
    pub local: OfflineWorkoutRecord,
    /// The matching remote log, snapshotted at detection time.
    pub server: WorkoutLog,
    /// Whether a resolution has been applied.
    pub resolved: bool,
    /// The chosen resolution, set exactly once.
    pub resolution: Option<ConflictResolution>,
    /// Detection time.
    pub detected_at: DateTime<Utc>,
}

impl SyncConflict {
    /// Create a new open conflict.
    pub fn new(local: OfflineWorkoutRecord, server: WorkoutLog) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            local,
            server,
            resolved: false,
            resolution: None,
            detected_at: Utc::now(),
        }
    }

    /// Apply a terminal resolution.
    pub fn mark_resolved(&mut self, resolution: ConflictResolution) {
        self.resolved = true;
        self.resolution = Some(resolution);
    }
}
