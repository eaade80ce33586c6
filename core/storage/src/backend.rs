//! Remote workout backend trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulsetrack_common::{Result, UserId, WorkoutPlanId};

/// One exercise completed during a workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedExercise {
    /// Reference to the remote exercise entity.
    pub exercise_id: String,
    /// Number of sets completed.
    pub sets_completed: u32,
    /// Number of reps completed.
    pub reps_completed: u32,
    /// Weight used, if the exercise was weighted.
    pub weight_used: Option<f64>,
    /// Free-form notes for this exercise.
    pub notes: Option<String>,
}

/// Snapshot of a workout log as it exists in the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutLog {
    /// Remote log identifier.
    pub id: String,
    /// User the log belongs to.
    pub user_id: UserId,
    /// Workout plan the session was completed against.
    pub workout_plan_id: WorkoutPlanId,
    /// Session duration in minutes.
    pub duration_minutes: u32,
    /// Estimated calories burned.
    pub calories_burned: u32,
    /// Display title.
    pub title: String,
    /// Free-form notes on the log.
    pub notes: Option<String>,
    /// When the session was completed.
    pub completed_at: DateTime<Utc>,
    /// Exercise rows attached to the log.
    pub exercises: Vec<CompletedExercise>,
}

/// Payload for the single transactional "log workout + exercises" write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutLogEntry {
    pub user_id: UserId,
    pub workout_plan_id: WorkoutPlanId,
    pub duration_minutes: u32,
    pub calories_burned: u32,
    pub title: String,
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub exercises: Vec<CompletedExercise>,
}

/// Partial update applied to an existing workout log.
///
/// Only fields set to `Some` are touched. Used by the merge resolution path
/// to annotate the surviving remote log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkoutLogPatch {
    pub notes: Option<String>,
}

/// Remote service boundary that owns workout logs.
///
/// The sync engine treats this as opaque: there is no shared transaction id
/// between a queued offline record and a log the backend already holds, so
/// duplicate detection happens via `query_workout_logs` time windows.
#[async_trait]
pub trait WorkoutBackend: Send + Sync {
    /// Get the backend name (e.g., "memory", "rest").
    fn name(&self) -> &str;

    /// Persist a workout header and all of its exercise rows atomically.
    ///
    /// # Postconditions
    /// - Either the full log (header + exercises) exists remotely, or
    ///   nothing was written
    ///
    /// # Errors
    /// - Network failure or backend rejection
    async fn log_workout_with_exercises(&self, entry: &WorkoutLogEntry) -> Result<String>;

    /// Query logs for a user and plan whose completion time falls within
    /// `[from, to]`.
    ///
    /// # Errors
    /// - Network failure or backend rejection; callers must treat this as a
    ///   transient failure, not as "no matching logs"
    async fn query_workout_logs(
        &self,
        user_id: &UserId,
        workout_plan_id: &WorkoutPlanId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkoutLog>>;

    /// Apply a partial update to an existing log.
    ///
    /// # Errors
    /// - Log not found
    /// - Network failure or backend rejection
    async fn update_workout_log(&self, log_id: &str, patch: &WorkoutLogPatch) -> Result<()>;

    /// Append a single exercise row to an existing log.
    ///
    /// # Errors
    /// - Log not found
    /// - Network failure or backend rejection
    async fn insert_exercise_log(&self, log_id: &str, entry: &CompletedExercise) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workout_log_serialization() {
        let log = WorkoutLog {
            id: "log-1".to_string(),
            user_id: UserId::new("user-1").unwrap(),
            workout_plan_id: WorkoutPlanId::new("plan-1").unwrap(),
            duration_minutes: 45,
            calories_burned: 320,
            title: "Upper body".to_string(),
            notes: None,
            completed_at: Utc::now(),
            exercises: vec![CompletedExercise {
                exercise_id: "bench-press".to_string(),
                sets_completed: 3,
                reps_completed: 10,
                weight_used: Some(60.0),
                notes: None,
            }],
        };

        let json = serde_json::to_string(&log).unwrap();
        let restored: WorkoutLog = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id, log.id);
        assert_eq!(restored.exercises.len(), 1);
        assert_eq!(restored.exercises[0].exercise_id, "bench-press");
    }

    #[test]
    fn test_patch_default_touches_nothing() {
        let patch = WorkoutLogPatch::default();
        assert!(patch.notes.is_none());
    }
}
