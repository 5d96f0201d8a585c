//! Shared test fixtures: a standard two-endpoint inventory, request builders,
//! and a notification sink that captures events for assertions.

// Not every test binary uses every fixture
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use relocator_core::config::SchedulerConfig;
use relocator_core::models::{MigrationRequest, SwitchType};
use relocator_core::orchestration::{Notification, NotificationSink};
use relocator_core::provider::memory::{HostRecord, InventorySnapshot};

pub const SOURCE_VC: &str = "vc-old";
pub const TARGET_VC: &str = "vc-new";

/// Two healthy hosts, esx-02 less loaded.
pub fn standard_hosts() -> Vec<HostRecord> {
    vec![
        HostRecord {
            name: "esx-01".to_string(),
            connected: true,
            memory_used_gb: 300.0,
            memory_total_gb: 512.0,
        },
        HostRecord {
            name: "esx-02".to_string(),
            connected: true,
            memory_used_gb: 100.0,
            memory_total_gb: 512.0,
        },
    ]
}

/// Inventory where the listed VMs exist at the source and the target has a
/// roomy datastore, a healthy cluster, and the expected network.
pub fn standard_inventory(vm_names: &[&str]) -> InventorySnapshot {
    let mut inventory = InventorySnapshot::default()
        .with_datastore("pod-a-01", TARGET_VC, 2000.0, 1500.0)
        .with_cluster("prod-cluster", TARGET_VC, standard_hosts())
        .with_network(
            "prod-cluster",
            "dvs-prod",
            SwitchType::Vds,
            &["pg-app", "pg-backup"],
        );
    for vm in vm_names {
        inventory = inventory.with_vm(vm, SOURCE_VC, 100.0);
    }
    inventory
}

pub fn request(vm: &str) -> MigrationRequest {
    MigrationRequest {
        vm_name: vm.to_string(),
        application: "billing".to_string(),
        source_vc: SOURCE_VC.to_string(),
        target_vc: TARGET_VC.to_string(),
        target_folder: None,
        target_cluster: "prod-cluster".to_string(),
        target_datastore: "pod-a-01".to_string(),
        target_switch: "dvs-prod".to_string(),
        target_port_groups: vec!["pg-app".to_string()],
        switch_type: SwitchType::Vds,
    }
}

/// Scheduler settings tuned for tests: tight poll interval.
pub fn fast_config(max_concurrent: usize) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrent,
        free_buffer_percent: 20.0,
        poll_interval_seconds: 1,
    }
}

/// Notification sink that records every event for later assertions.
#[derive(Default)]
pub struct CapturingSink {
    events: Mutex<Vec<Notification>>,
}

impl CapturingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, vm: &str) -> Vec<Notification> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.vm_name == vm)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSink for CapturingSink {
    async fn notify(&self, notification: Notification) {
        self.events.lock().unwrap().push(notification);
    }
}
