//! End-to-end offline sync behavior over real (temp-dir) persistence.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pulsetrack_common::{UserId, WorkoutPlanId};
use pulsetrack_storage::{CompletedExercise, FileStore, MemoryBackend, WorkoutBackend, WorkoutLogEntry};
use pulsetrack_sync::{
    CompletedWorkout, ConflictDetector, ConflictResolution, ConflictResolver, DetectorConfig,
    OfflineWorkoutRecord, QueueStore, RetryPolicy, SyncConfig, SyncOrchestrator,
};
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn workout(title: &str) -> CompletedWorkout {
    CompletedWorkout {
        user_id: UserId::new("runner-7").unwrap(),
        workout_plan_id: WorkoutPlanId::new("plan-strength").unwrap(),
        duration_minutes: 45,
        calories_burned: 380,
        exercises: vec![CompletedExercise {
            exercise_id: "overhead-press".to_string(),
            sets_completed: 4,
            reps_completed: 6,
            weight_used: Some(40.0),
            notes: None,
        }],
        title: title.to_string(),
        description: None,
        completed_at: None,
    }
}

fn engine(
    backend: Arc<MemoryBackend>,
    queue: Arc<QueueStore<FileStore>>,
    config: SyncConfig,
) -> SyncOrchestrator<MemoryBackend, FileStore> {
    let detector = ConflictDetector::new(backend.clone(), queue.clone(), DetectorConfig::default());
    SyncOrchestrator::new(backend, queue, detector, config)
}

#[tokio::test]
async fn queued_records_survive_restart_until_synced() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());

    let record = OfflineWorkoutRecord::new(workout("Morning session"));
    let record_id = record.id.clone();

    // First "process": enqueue while the backend is down.
    {
        let store = Arc::new(FileStore::new(temp.path()).unwrap());
        let queue = Arc::new(QueueStore::new(store));
        queue.enqueue(record).await.unwrap();

        backend.set_available(false);
        let report = engine(backend.clone(), queue.clone(), SyncConfig::default())
            .sync_all()
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(queue.pending().await.unwrap().len(), 1);
    }

    // Second "process": the record is still there, and now syncs.
    backend.set_available(true);
    let store = Arc::new(FileStore::new(temp.path()).unwrap());
    let queue = Arc::new(QueueStore::new(store));

    let pending = queue.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, record_id);
    assert_eq!(pending[0].sync_attempts, 1);

    let report = engine(backend.clone(), queue.clone(), SyncConfig::default())
        .sync_all()
        .await
        .unwrap();
    assert_eq!(report.synced, 1);
    assert!(queue.pending().await.unwrap().is_empty());
    assert_eq!(backend.log_count(), 1);
}

#[tokio::test]
async fn conflict_takes_precedence_over_the_write() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let queue = Arc::new(QueueStore::new(Arc::new(FileStore::new(temp.path()).unwrap())));

    let record = OfflineWorkoutRecord::new(workout("Evening session"));

    // Same user and plan, completed 30 minutes later: inside the +/-1h window.
    backend
        .log_workout_with_exercises(&WorkoutLogEntry {
            completed_at: record.completed_at + chrono::Duration::minutes(30),
            ..record.to_log_entry()
        })
        .await
        .unwrap();

    queue.enqueue(record.clone()).await.unwrap();

    let report = engine(backend.clone(), queue.clone(), SyncConfig::default())
        .sync_all()
        .await
        .unwrap();

    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.synced, 0);
    assert_eq!(backend.log_count(), 1);

    // A second pass does not pile up more conflicts for the same record.
    let report = engine(backend.clone(), queue.clone(), SyncConfig::default())
        .sync_all()
        .await
        .unwrap();
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(queue.open_conflicts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn merge_resolution_keeps_a_single_remote_row() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let queue = Arc::new(QueueStore::new(Arc::new(FileStore::new(temp.path()).unwrap())));

    let record = OfflineWorkoutRecord::new(workout("Lunch session"));
    let server_log_id = backend
        .log_workout_with_exercises(&record.to_log_entry())
        .await
        .unwrap();

    queue.enqueue(record.clone()).await.unwrap();

    let report = engine(backend.clone(), queue.clone(), SyncConfig::default())
        .sync_all()
        .await
        .unwrap();
    let conflict_id = report.conflicts[0].id.clone();

    let resolver = ConflictResolver::new(backend.clone(), queue.clone());
    resolver
        .resolve(&conflict_id, ConflictResolution::Merge)
        .await
        .unwrap();

    assert_eq!(backend.log_count(), 1);
    let log = backend.log(&server_log_id).unwrap();
    assert_eq!(log.exercises.len(), 2);
    assert!(log.notes.unwrap().contains("Merged offline session"));

    // The local item is gone; the next pass has nothing to do.
    assert!(queue.pending().await.unwrap().is_empty());
    let report = engine(backend.clone(), queue, SyncConfig::default())
        .sync_all()
        .await
        .unwrap();
    assert_eq!(report.synced + report.failed + report.conflicts.len(), 0);
}

#[tokio::test]
async fn server_wins_discards_cleanly() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let queue = Arc::new(QueueStore::new(Arc::new(FileStore::new(temp.path()).unwrap())));

    let record = OfflineWorkoutRecord::new(workout("Night session"));
    backend
        .log_workout_with_exercises(&record.to_log_entry())
        .await
        .unwrap();
    queue.enqueue(record.clone()).await.unwrap();

    let report = engine(backend.clone(), queue.clone(), SyncConfig::default())
        .sync_all()
        .await
        .unwrap();
    let conflict_id = report.conflicts[0].id.clone();

    let writes_before = backend.write_instants().len();
    let exercises_before = backend.log_count();

    ConflictResolver::new(backend.clone(), queue.clone())
        .resolve(&conflict_id, ConflictResolution::KeepServer)
        .await
        .unwrap();

    assert_eq!(backend.write_instants().len(), writes_before);
    assert_eq!(backend.log_count(), exercises_before);
    assert!(queue.get(&record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn retry_cap_parks_the_record_but_keeps_it_visible() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    backend.set_available(false);
    let queue = Arc::new(QueueStore::new(Arc::new(FileStore::new(temp.path()).unwrap())));

    let record = OfflineWorkoutRecord::new(workout("Doomed session"));
    queue.enqueue(record.clone()).await.unwrap();

    let max_attempts = 3;
    let config = SyncConfig::default().with_retry(
        RetryPolicy::new(max_attempts).with_inter_batch_delay(Duration::from_millis(1)),
    );
    let orchestrator = engine(backend.clone(), queue.clone(), config);

    for _ in 0..max_attempts {
        let report = orchestrator.sync_all().await.unwrap();
        assert_eq!(report.failed, 1);
    }

    // Exhausted: skipped by further passes, still listed as pending.
    let report = orchestrator.sync_all().await.unwrap();
    assert_eq!(report.failed, 0);

    let pending = queue.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].sync_attempts, max_attempts);

    // Reset re-arms the record and the backend has recovered.
    backend.set_available(true);
    queue.reset_attempts(&record.id).await.unwrap();
    let report = orchestrator.sync_all().await.unwrap();
    assert_eq!(report.synced, 1);
}

#[tokio::test]
async fn empty_sync_is_idempotent() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let queue = Arc::new(QueueStore::new(Arc::new(FileStore::new(temp.path()).unwrap())));

    let orchestrator = engine(backend.clone(), queue.clone(), SyncConfig::default());
    for _ in 0..2 {
        let report = orchestrator.sync_all().await.unwrap();
        assert_eq!(report.synced, 0);
        assert_eq!(report.failed, 0);
        assert!(report.conflicts.is_empty());
        assert!(report.errors.is_empty());
    }
    assert_eq!(backend.log_count(), 0);
    assert!(queue.all_records().await.unwrap().is_empty());
}
