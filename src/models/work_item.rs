//! # Work Item Model
//!
//! One `WorkItem` per requested migration. The struct is a fixed-schema record
//! with an explicit status enum; all lifecycle changes go through guarded
//! transition methods so that two invariants hold after every mutation:
//!
//! - `task_id` is set if and only if `status == Running`
//! - `end_time` is set if and only if `status` is terminal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{RelocatorError, Result};
use crate::models::status::WorkItemStatus;
use crate::provider::TaskHandle;

/// Virtual switch flavor the target port groups live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchType {
    /// Distributed virtual switch
    Vds,
    /// Standard (host-local) virtual switch
    Standard,
}

impl fmt::Display for SwitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vds => write!(f, "vds"),
            Self::Standard => write!(f, "standard"),
        }
    }
}

impl std::str::FromStr for SwitchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "vds" => Ok(Self::Vds),
            "standard" => Ok(Self::Standard),
            _ => Err(format!("Invalid switch type: {s}")),
        }
    }
}

/// Accept port groups either as a list or as the comma-separated string form
/// that CSV-derived inputs carry. Order is significant: entry *i* maps to the
/// VM's *i*-th network adapter.
fn deserialize_port_groups<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortGroups {
        List(Vec<String>),
        Csv(String),
    }

    match PortGroups::deserialize(deserializer)? {
        PortGroups::List(list) => Ok(list),
        PortGroups::Csv(raw) => Ok(raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()),
    }
}

/// One input row: a requested migration, before any status tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub vm_name: String,
    #[serde(default)]
    pub application: String,
    pub source_vc: String,
    pub target_vc: String,
    #[serde(default)]
    pub target_folder: Option<String>,
    pub target_cluster: String,
    /// May name a single datastore or a datastore cluster; ambiguous until
    /// the placement resolver runs.
    pub target_datastore: String,
    pub target_switch: String,
    #[serde(deserialize_with = "deserialize_port_groups")]
    pub target_port_groups: Vec<String>,
    pub switch_type: SwitchType,
}

/// One requested migration and its tracked outcome.
#[derive(Debug, Clone, Serialize)]
pub struct WorkItem {
    pub request: MigrationRequest,
    pub status: WorkItemStatus,
    /// Human-readable failure explanation, populated on `Rejected`/`Failed`
    pub notes: Option<String>,
    /// Provider task handle, present only while `status == Running`
    pub task_id: Option<TaskHandle>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration rounded to whole minutes, derived at completion
    pub duration_minutes: Option<i64>,
    /// Source VM used space captured at validation time
    pub used_space_gb: Option<f64>,
    /// Source VM power state captured at validation time, drives the
    /// best-effort power-on post action
    pub source_powered_on: Option<bool>,
}

impl WorkItem {
    pub fn new(request: MigrationRequest) -> Self {
        Self {
            request,
            status: WorkItemStatus::Pending,
            notes: None,
            task_id: None,
            start_time: None,
            end_time: None,
            duration_minutes: None,
            used_space_gb: None,
            source_powered_on: None,
        }
    }

    pub fn vm_name(&self) -> &str {
        &self.request.vm_name
    }

    fn transition(&mut self, next: WorkItemStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(RelocatorError::StateTransition(format!(
                "work item '{}': illegal transition {} -> {}",
                self.request.vm_name, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// `Pending -> Validating`
    pub fn begin_validation(&mut self) -> Result<()> {
        self.transition(WorkItemStatus::Validating)
    }

    /// `Validating -> Rejected`: validation failed, the item is never submitted.
    pub fn reject(&mut self, notes: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(WorkItemStatus::Rejected)?;
        self.notes = Some(notes.into());
        self.end_time = Some(now);
        Ok(())
    }

    /// `Validating -> Scheduled`: all checks passed, placement resolved.
    pub fn schedule(&mut self, used_space_gb: f64, source_powered_on: bool) -> Result<()> {
        self.transition(WorkItemStatus::Scheduled)?;
        self.used_space_gb = Some(used_space_gb);
        self.source_powered_on = Some(source_powered_on);
        Ok(())
    }

    /// `Scheduled -> Running`: a provider task was accepted.
    pub fn start(&mut self, task_id: TaskHandle, now: DateTime<Utc>) -> Result<()> {
        self.transition(WorkItemStatus::Running)?;
        self.task_id = Some(task_id);
        self.start_time = Some(now);
        Ok(())
    }

    /// `Running -> Succeeded`
    pub fn succeed(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(WorkItemStatus::Succeeded)?;
        self.task_id = None;
        self.finish(now);
        Ok(())
    }

    /// `Running | Scheduled -> Failed`: provider-reported error, verbatim in notes.
    pub fn fail(&mut self, notes: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(WorkItemStatus::Failed)?;
        self.task_id = None;
        self.notes = Some(notes.into());
        self.finish(now);
        Ok(())
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.end_time = Some(now);
        if let Some(start) = self.start_time {
            let seconds = (now - start).num_seconds();
            self.duration_minutes = Some((seconds as f64 / 60.0).round() as i64);
        }
    }

    /// Throughput in GB per minute, `None` when the run was sub-minute or the
    /// size was never captured.
    pub fn throughput_gb_per_minute(&self) -> Option<f64> {
        match (self.used_space_gb, self.duration_minutes) {
            (Some(gb), Some(minutes)) if minutes > 0 => Some(gb / minutes as f64),
            _ => None,
        }
    }

    /// Assert the task-handle and end-time invariants; used by tests after
    /// every observed transition.
    pub fn invariants_hold(&self) -> bool {
        let task_ok = self.task_id.is_some() == (self.status == WorkItemStatus::Running);
        let end_ok = self.end_time.is_some() == self.status.is_terminal();
        task_ok && end_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TaskHandle;

    fn request(vm: &str) -> MigrationRequest {
        MigrationRequest {
            vm_name: vm.to_string(),
            application: "payroll".to_string(),
            source_vc: "vc-old".to_string(),
            target_vc: "vc-new".to_string(),
            target_folder: None,
            target_cluster: "prod-cluster".to_string(),
            target_datastore: "prod-pod".to_string(),
            target_switch: "dvs-prod".to_string(),
            target_port_groups: vec!["pg-app".to_string()],
            switch_type: SwitchType::Vds,
        }
    }

    #[test]
    fn full_success_path_preserves_invariants() {
        let mut item = WorkItem::new(request("vm-1"));
        assert!(item.invariants_hold());

        item.begin_validation().unwrap();
        assert!(item.invariants_hold());

        item.schedule(120.0, true).unwrap();
        assert!(item.invariants_hold());

        let start = Utc::now();
        item.start(TaskHandle::new(), start).unwrap();
        assert!(item.invariants_hold());
        assert!(item.task_id.is_some());

        let end = start + chrono::Duration::seconds(150);
        item.succeed(end).unwrap();
        assert!(item.invariants_hold());
        assert_eq!(item.status, WorkItemStatus::Succeeded);
        assert_eq!(item.duration_minutes, Some(3)); // 150s rounds to 3 minutes
        assert!(item.task_id.is_none());
    }

    #[test]
    fn rejection_sets_notes_and_end_time() {
        let mut item = WorkItem::new(request("vm-2"));
        item.begin_validation().unwrap();
        item.reject("vm 'vm-2' not found at vc-old", Utc::now()).unwrap();

        assert_eq!(item.status, WorkItemStatus::Rejected);
        assert!(item.notes.as_deref().unwrap().contains("not found"));
        assert!(item.invariants_hold());
    }

    #[test]
    fn provider_failure_captures_message_verbatim() {
        let mut item = WorkItem::new(request("vm-3"));
        item.begin_validation().unwrap();
        item.schedule(50.0, true).unwrap();
        item.start(TaskHandle::new(), Utc::now()).unwrap();
        item.fail("A specified parameter was not correct: spec.pool", Utc::now())
            .unwrap();

        assert_eq!(item.status, WorkItemStatus::Failed);
        assert_eq!(
            item.notes.as_deref(),
            Some("A specified parameter was not correct: spec.pool")
        );
        assert!(item.invariants_hold());
    }

    #[test]
    fn illegal_transition_is_an_error() {
        let mut item = WorkItem::new(request("vm-4"));
        let err = item.succeed(Utc::now()).unwrap_err();
        assert!(err.to_string().contains("illegal transition"));
        assert_eq!(item.status, WorkItemStatus::Pending);
    }

    #[test]
    fn throughput_guards_against_zero_duration() {
        let mut item = WorkItem::new(request("vm-5"));
        item.begin_validation().unwrap();
        item.schedule(100.0, true).unwrap();
        let start = Utc::now();
        item.start(TaskHandle::new(), start).unwrap();
        item.succeed(start + chrono::Duration::seconds(10)).unwrap();

        assert_eq!(item.duration_minutes, Some(0));
        assert_eq!(item.throughput_gb_per_minute(), None);
    }

    #[test]
    fn port_groups_deserialize_from_csv_string() {
        let json = r#"{
            "vm_name": "vm-6",
            "source_vc": "vc-old",
            "target_vc": "vc-new",
            "target_cluster": "prod",
            "target_datastore": "pod-a",
            "target_switch": "dvs",
            "target_port_groups": "pg-app, pg-backup",
            "switch_type": "vds"
        }"#;
        let req: MigrationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.target_port_groups, vec!["pg-app", "pg-backup"]);
    }
}
