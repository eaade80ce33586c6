//! PulseTrack Sync Engine
//!
//! Offline-first replay of completed workouts, including:
//! - Durable offline queue with a conflict audit trail
//! - Time-window duplicate detection against the remote store
//! - Rate-limited, batch-concurrent sync passes with per-item retry caps
//! - Explicit conflict resolution (keep local, keep server, merge)
//! - Connectivity observation for automatic sync triggers

pub mod connectivity;
pub mod detector;
pub mod orchestrator;
pub mod queue;
pub mod record;
pub mod resolver;
pub mod retry;

// Re-export main types
pub use connectivity::{ChannelConnectivity, ConnectivityObserver};
pub use detector::{ConflictDetector, DetectorConfig};
pub use orchestrator::{SyncConfig, SyncOrchestrator, SyncReport};
pub use queue::{QueueStore, CONFLICTS_KEY, SCHEMA_VERSION, WORKOUTS_KEY};
pub use record::{
    CompletedWorkout, ConflictResolution, OfflineWorkoutRecord, SyncConflict,
};
pub use resolver::ConflictResolver;
pub use retry::RetryPolicy;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        // Verify all main config types are accessible with sane defaults
        let config = SyncConfig::default();
        assert_eq!(config.batch_size, 10);
        let retry = RetryPolicy::default();
        assert_eq!(retry.max_attempts, 3);
        let detector = DetectorConfig::default();
        assert_eq!(detector.match_window, chrono::Duration::hours(1));
    }
}
