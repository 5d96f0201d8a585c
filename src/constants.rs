//! # System Constants
//!
//! Defaults and notification event names that define the operational
//! boundaries of the relocation orchestrator.

// Re-export the status type for convenience
pub use crate::models::status::WorkItemStatus;

/// Notification events emitted on work item state transitions
pub mod events {
    pub const MIGRATION_STARTED: &str = "migration.started";
    pub const MIGRATION_SUCCEEDED: &str = "migration.succeeded";
    pub const MIGRATION_FAILED: &str = "migration.failed";
    pub const MIGRATION_REJECTED: &str = "migration.rejected";
}

/// System-wide defaults
pub mod defaults {
    /// Reserved-capacity margin a target datastore must retain after a
    /// migration, in percent of total capacity
    pub const FREE_BUFFER_PERCENT: f64 = 20.0;

    /// Maximum number of concurrently in-flight relocation tasks
    pub const MAX_CONCURRENT: usize = 2;

    /// Fixed wait between polls of in-flight tasks
    pub const POLL_INTERVAL_SECONDS: u64 = 5;
}

/// Status groupings for validation and logic
pub mod status_groups {
    use super::WorkItemStatus;

    /// Statuses a work item may end the run in
    pub const TERMINAL_STATES: &[WorkItemStatus] = &[
        WorkItemStatus::Rejected,
        WorkItemStatus::Succeeded,
        WorkItemStatus::Failed,
    ];

    /// Statuses that degrade the run's exit code
    pub const ERROR_STATES: &[WorkItemStatus] =
        &[WorkItemStatus::Rejected, WorkItemStatus::Failed];
}
