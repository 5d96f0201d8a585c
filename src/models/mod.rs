pub mod report;
pub mod status;
pub mod work_item;

// Re-export core models for easy access
pub use report::{RunReport, RunReportRow};
pub use status::WorkItemStatus;
pub use work_item::{MigrationRequest, SwitchType, WorkItem};
