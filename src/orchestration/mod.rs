//! # Orchestration Core
//!
//! The migration run engine: a single controlling loop that pulls work items
//! through validation and placement, submits relocations to the
//! Infrastructure Provider under a concurrency bound, and reconciles task
//! completions by polling.
//!
//! ## Core Components
//!
//! - **ValidationPipeline**: Ordered, short-circuiting precondition checks
//! - **PlacementResolver**: Datastore/host selection under the capacity buffer
//! - **MigrationScheduler**: Bounded-concurrency submit/poll/drain loop
//! - **NotificationSink**: Fire-and-forget transition events

pub mod notification;
pub mod placement;
pub mod scheduler;
pub mod validation;

// Re-export core types and components for easy access
pub use notification::{
    LoggingNotificationSink, Notification, NotificationSink, NullNotificationSink,
};
pub use placement::PlacementResolver;
pub use scheduler::{probe_endpoints, MigrationScheduler};
pub use validation::{
    EntityKind, ResolvedPlacement, ValidationFailure, ValidationOutcome, ValidationPipeline,
};
