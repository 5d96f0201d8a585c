//! Final run report: one row per original request, in input order, regardless
//! of the order completions were observed in.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::status::WorkItemStatus;
use crate::models::work_item::WorkItem;

#[derive(Debug, Clone, Serialize)]
pub struct RunReportRow {
    pub vm_name: String,
    pub application: String,
    pub target_cluster: String,
    pub status: WorkItemStatus,
    pub notes: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub used_space_gb: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub rows: Vec<RunReportRow>,
}

impl RunReport {
    /// Build the report from the run's work items, preserving input order.
    pub fn from_items(items: &[WorkItem]) -> Self {
        let rows = items
            .iter()
            .map(|item| RunReportRow {
                vm_name: item.request.vm_name.clone(),
                application: item.request.application.clone(),
                target_cluster: item.request.target_cluster.clone(),
                status: item.status,
                notes: item.notes.clone(),
                start_time: item.start_time,
                end_time: item.end_time,
                duration_minutes: item.duration_minutes,
                used_space_gb: item.used_space_gb,
            })
            .collect();
        Self { rows }
    }

    pub fn succeeded_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.status == WorkItemStatus::Succeeded)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.rows.iter().filter(|r| r.status.is_error()).count()
    }

    /// Process exit code for the run: non-zero if any row failed or was
    /// rejected.
    pub fn exit_code(&self) -> i32 {
        if self.error_count() > 0 {
            1
        } else {
            0
        }
    }
}
