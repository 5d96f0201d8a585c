//! # Notification Sink
//!
//! Fire-and-forget side effects on work item state transitions: one event on
//! entering `Running`, one on reaching any terminal state. Sink failures are
//! logged and never feed back into scheduling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::constants::events;
use crate::models::{WorkItem, WorkItemStatus};

/// Structured payload carried by every notification.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub event: &'static str,
    pub vm_name: String,
    pub application: String,
    pub target_cluster: String,
    pub target_switch: String,
    pub target_port_groups: Vec<String>,
    pub status: WorkItemStatus,
    pub notes: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub used_space_gb: Option<f64>,
    /// GB per minute; absent for sub-minute runs (division-by-zero guard)
    pub throughput_gb_per_minute: Option<f64>,
}

impl Notification {
    pub fn for_item(item: &WorkItem) -> Self {
        let event = match item.status {
            WorkItemStatus::Running => events::MIGRATION_STARTED,
            WorkItemStatus::Succeeded => events::MIGRATION_SUCCEEDED,
            WorkItemStatus::Failed => events::MIGRATION_FAILED,
            _ => events::MIGRATION_REJECTED,
        };
        Self {
            event,
            vm_name: item.request.vm_name.clone(),
            application: item.request.application.clone(),
            target_cluster: item.request.target_cluster.clone(),
            target_switch: item.request.target_switch.clone(),
            target_port_groups: item.request.target_port_groups.clone(),
            status: item.status,
            notes: item.notes.clone(),
            start_time: item.start_time,
            end_time: item.end_time,
            duration_minutes: item.duration_minutes,
            used_space_gb: item.used_space_gb,
            throughput_gb_per_minute: item.throughput_gb_per_minute(),
        }
    }
}

/// Destination for state transition notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Default sink: emits the notification as a structured log line.
#[derive(Debug, Default)]
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify(&self, notification: Notification) {
        info!(
            event = notification.event,
            vm_name = %notification.vm_name,
            application = %notification.application,
            target_cluster = %notification.target_cluster,
            status = %notification.status,
            notes = notification.notes.as_deref(),
            duration_minutes = notification.duration_minutes,
            used_space_gb = notification.used_space_gb,
            throughput_gb_per_minute = notification.throughput_gb_per_minute,
            "MIGRATION_NOTIFICATION"
        );
    }
}

/// Sink that drops everything; used when notifications are disabled.
#[derive(Debug, Default)]
pub struct NullNotificationSink;

#[async_trait]
impl NotificationSink for NullNotificationSink {
    async fn notify(&self, _notification: Notification) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MigrationRequest, SwitchType};
    use crate::provider::TaskHandle;

    fn running_item() -> WorkItem {
        let mut item = WorkItem::new(MigrationRequest {
            vm_name: "vm-7".to_string(),
            application: "erp".to_string(),
            source_vc: "vc-old".to_string(),
            target_vc: "vc-new".to_string(),
            target_folder: None,
            target_cluster: "prod".to_string(),
            target_datastore: "pod-a".to_string(),
            target_switch: "dvs".to_string(),
            target_port_groups: vec!["pg".to_string()],
            switch_type: SwitchType::Vds,
        });
        item.begin_validation().unwrap();
        item.schedule(120.0, true).unwrap();
        item.start(TaskHandle::new(), Utc::now()).unwrap();
        item
    }

    #[test]
    fn event_name_tracks_status() {
        let mut item = running_item();
        assert_eq!(Notification::for_item(&item).event, events::MIGRATION_STARTED);

        let start = item.start_time.unwrap();
        item.succeed(start + chrono::Duration::minutes(4)).unwrap();
        let done = Notification::for_item(&item);
        assert_eq!(done.event, events::MIGRATION_SUCCEEDED);
        assert_eq!(done.duration_minutes, Some(4));
        assert_eq!(done.throughput_gb_per_minute, Some(30.0));
    }

    #[test]
    fn sub_minute_run_has_no_throughput() {
        let mut item = running_item();
        let start = item.start_time.unwrap();
        item.succeed(start + chrono::Duration::seconds(5)).unwrap();
        assert_eq!(Notification::for_item(&item).throughput_gb_per_minute, None);
    }
}
