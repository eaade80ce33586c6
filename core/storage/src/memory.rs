//! In-memory store and backend for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::backend::{
    CompletedExercise, WorkoutBackend, WorkoutLog, WorkoutLogEntry, WorkoutLogPatch,
};
use crate::kv::KeyValueStore;
use pulsetrack_common::{Error, Result, UserId, WorkoutPlanId};

/// In-memory key-value store.
///
/// Useful for testing and as the session-only fallback queue when durable
/// storage is unavailable. All data is lost on drop.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.keys().cloned().collect())
    }
}

/// In-memory workout backend.
///
/// Stores logs in a map and can simulate an outage via [`set_available`].
/// Every successful transactional write is timestamped so tests can verify
/// batch pacing.
///
/// [`set_available`]: MemoryBackend::set_available
#[derive(Default)]
pub struct MemoryBackend {
    logs: Mutex<HashMap<String, WorkoutLog>>,
    available: Mutex<bool>,
    write_instants: Mutex<Vec<tokio::time::Instant>>,
}

impl MemoryBackend {
    /// Create a new backend that starts available.
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(HashMap::new()),
            available: Mutex::new(true),
            write_instants: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the backend going down (`false`) or recovering (`true`).
    pub fn set_available(&self, available: bool) {
        *self.available.lock().unwrap() = available;
    }

    /// Seed an existing remote log, bypassing availability.
    pub fn seed_log(&self, log: WorkoutLog) {
        self.logs.lock().unwrap().insert(log.id.clone(), log);
    }

    /// Fetch a log by id, if present.
    pub fn log(&self, log_id: &str) -> Option<WorkoutLog> {
        self.logs.lock().unwrap().get(log_id).cloned()
    }

    /// Number of logs currently stored.
    pub fn log_count(&self) -> usize {
        self.logs.lock().unwrap().len()
    }

    /// Timestamps of all successful transactional writes, in call order.
    pub fn write_instants(&self) -> Vec<tokio::time::Instant> {
        self.write_instants.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<()> {
        if *self.available.lock().unwrap() {
            Ok(())
        } else {
            Err(Error::Sync("backend unreachable".to_string()))
        }
    }
}

#[async_trait]
impl WorkoutBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn log_workout_with_exercises(&self, entry: &WorkoutLogEntry) -> Result<String> {
        self.check_available()?;

        let id = Uuid::new_v4().to_string();
        let log = WorkoutLog {
            id: id.clone(),
            user_id: entry.user_id.clone(),
            workout_plan_id: entry.workout_plan_id.clone(),
            duration_minutes: entry.duration_minutes,
            calories_burned: entry.calories_burned,
            title: entry.title.clone(),
            notes: entry.notes.clone(),
            completed_at: entry.completed_at,
            exercises: entry.exercises.clone(),
        };

        self.logs.lock().unwrap().insert(id.clone(), log);
        self.write_instants
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());

        Ok(id)
    }

    async fn query_workout_logs(
        &self,
        user_id: &UserId,
        workout_plan_id: &WorkoutPlanId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkoutLog>> {
        self.check_available()?;

        let logs = self.logs.lock().unwrap();
        let mut matches: Vec<WorkoutLog> = logs
            .values()
            .filter(|log| {
                log.user_id == *user_id
                    && log.workout_plan_id == *workout_plan_id
                    && log.completed_at >= from
                    && log.completed_at <= to
            })
            .cloned()
            .collect();
        matches.sort_by_key(|log| log.completed_at);

        Ok(matches)
    }

    async fn update_workout_log(&self, log_id: &str, patch: &WorkoutLogPatch) -> Result<()> {
        self.check_available()?;

        let mut logs = self.logs.lock().unwrap();
        let log = logs
            .get_mut(log_id)
            .ok_or_else(|| Error::NotFound(format!("Workout log not found: {}", log_id)))?;

        if let Some(notes) = &patch.notes {
            log.notes = Some(notes.clone());
        }

        Ok(())
    }

    async fn insert_exercise_log(&self, log_id: &str, entry: &CompletedExercise) -> Result<()> {
        self.check_available()?;

        let mut logs = self.logs.lock().unwrap();
        let log = logs
            .get_mut(log_id)
            .ok_or_else(|| Error::NotFound(format!("Workout log not found: {}", log_id)))?;

        log.exercises.push(entry.clone());

        Ok(())
    }
}
