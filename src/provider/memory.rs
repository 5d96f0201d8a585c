//! # In-Memory Provider
//!
//! Deterministic `InfrastructureProvider` over a fixed inventory snapshot.
//! Used by the CLI's dry-run mode to rehearse a migration plan offline and by
//! the test suite as a scripted double. Tasks complete after a configurable
//! number of polls with a configurable outcome; every call is counted so
//! tests can assert on query short-circuiting and admission bounds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::SwitchType;
use crate::provider::{
    ClusterRef, Datastore, EndpointRef, HostConnectionState, HostSystem, InfrastructureProvider,
    NetworkRef, ProviderError, ProviderResult, ProviderTaskState, RelocationSpec, TaskHandle, Vm,
};

/// Serializable host record for inventory snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    pub name: String,
    #[serde(default = "default_connected")]
    pub connected: bool,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
}

fn default_connected() -> bool {
    true
}

impl HostRecord {
    fn to_host(&self) -> HostSystem {
        HostSystem {
            name: self.name.clone(),
            connection_state: if self.connected {
                HostConnectionState::Connected
            } else {
                HostConnectionState::Disconnected
            },
            memory_used_gb: self.memory_used_gb,
            memory_total_gb: self.memory_total_gb,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmRecord {
    pub name: String,
    pub endpoint: String,
    pub used_space_gb: f64,
    #[serde(default = "default_connected")]
    pub powered_on: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreRecord {
    pub name: String,
    pub endpoint: String,
    pub capacity_gb: f64,
    pub free_space_gb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreClusterRecord {
    pub name: String,
    pub endpoint: String,
    /// Names of member datastores, looked up in `datastores`
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub name: String,
    pub endpoint: String,
    pub hosts: Vec<HostRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub cluster: String,
    pub switch: String,
    pub switch_type: SwitchType,
    pub port_groups: Vec<String>,
}

/// A fixed point-in-time view of both endpoints' inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub vms: Vec<VmRecord>,
    #[serde(default)]
    pub datastores: Vec<DatastoreRecord>,
    #[serde(default)]
    pub datastore_clusters: Vec<DatastoreClusterRecord>,
    #[serde(default)]
    pub clusters: Vec<ClusterRecord>,
    #[serde(default)]
    pub networks: Vec<NetworkRecord>,
}

impl InventorySnapshot {
    pub fn with_vm(mut self, name: &str, endpoint: &str, used_space_gb: f64) -> Self {
        self.vms.push(VmRecord {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            used_space_gb,
            powered_on: true,
        });
        self
    }

    pub fn with_powered_off_vm(mut self, name: &str, endpoint: &str, used_space_gb: f64) -> Self {
        self.vms.push(VmRecord {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            used_space_gb,
            powered_on: false,
        });
        self
    }

    pub fn with_datastore(
        mut self,
        name: &str,
        endpoint: &str,
        capacity_gb: f64,
        free_space_gb: f64,
    ) -> Self {
        self.datastores.push(DatastoreRecord {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            capacity_gb,
            free_space_gb,
        });
        self
    }

    pub fn with_datastore_cluster(mut self, name: &str, endpoint: &str, members: &[&str]) -> Self {
        self.datastore_clusters.push(DatastoreClusterRecord {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            members: members.iter().map(|m| (*m).to_string()).collect(),
        });
        self
    }

    pub fn with_cluster(mut self, name: &str, endpoint: &str, hosts: Vec<HostRecord>) -> Self {
        self.clusters.push(ClusterRecord {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            hosts,
        });
        self
    }

    pub fn with_network(
        mut self,
        cluster: &str,
        switch: &str,
        switch_type: SwitchType,
        port_groups: &[&str],
    ) -> Self {
        self.networks.push(NetworkRecord {
            cluster: cluster.to_string(),
            switch: switch.to_string(),
            switch_type,
            port_groups: port_groups.iter().map(|p| (*p).to_string()).collect(),
        });
        self
    }
}

/// Scripted terminal outcome for a submitted task.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Success,
    Error(String),
}

#[derive(Debug, Clone)]
struct TaskScript {
    /// Polls the task reports `Running` for before going terminal
    running_polls: u32,
    outcome: ScriptedOutcome,
}

#[derive(Debug)]
struct TaskSim {
    remaining_polls: u32,
    outcome: ScriptedOutcome,
}

/// Per-method call counters for assertions on query behavior.
#[derive(Debug, Default)]
pub struct CallCounters {
    pub connect: AtomicUsize,
    pub find_vm: AtomicUsize,
    pub find_datastore: AtomicUsize,
    pub find_datastore_cluster: AtomicUsize,
    pub find_cluster: AtomicUsize,
    pub find_hosts: AtomicUsize,
    pub find_network: AtomicUsize,
    pub submit_relocation: AtomicUsize,
    pub poll_task: AtomicUsize,
}

#[derive(Debug, Default)]
struct SideEffects {
    powered_on: Vec<String>,
    folder_moves: Vec<(String, String)>,
}

pub struct InMemoryProvider {
    inventory: InventorySnapshot,
    scripts: Mutex<HashMap<String, TaskScript>>,
    tasks: Mutex<HashMap<TaskHandle, TaskSim>>,
    side_effects: Mutex<SideEffects>,
    pub calls: CallCounters,
    unavailable_endpoints: Mutex<Vec<String>>,
    forget_tasks: AtomicBool,
    poll_failure: Mutex<Option<String>>,
    running_now: AtomicUsize,
    running_high_water: AtomicUsize,
}

impl InMemoryProvider {
    pub fn new(inventory: InventorySnapshot) -> Self {
        Self {
            inventory,
            scripts: Mutex::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
            side_effects: Mutex::new(SideEffects::default()),
            calls: CallCounters::default(),
            unavailable_endpoints: Mutex::new(Vec::new()),
            forget_tasks: AtomicBool::new(false),
            poll_failure: Mutex::new(None),
            running_now: AtomicUsize::new(0),
            running_high_water: AtomicUsize::new(0),
        }
    }

    /// Script the task outcome for one VM; unscripted VMs succeed after a
    /// single running poll.
    pub fn script_task(&self, vm_name: &str, running_polls: u32, outcome: ScriptedOutcome) {
        self.scripts.lock().expect("provider state poisoned").insert(
            vm_name.to_string(),
            TaskScript {
                running_polls,
                outcome,
            },
        );
    }

    /// Drop task records at submission, so every later poll reports the
    /// handle unknown, simulating a provider that lost track of its tasks.
    pub fn forget_submitted_tasks(&self) {
        self.forget_tasks.store(true, Ordering::SeqCst);
    }

    /// Make every poll fail with a query error, simulating a flaky
    /// management plane that still holds the task.
    pub fn fail_all_polls(&self, message: &str) {
        *self.poll_failure.lock().expect("provider state poisoned") = Some(message.to_string());
    }

    /// Make `connect` fail for an endpoint, simulating a connection-level
    /// outage at startup.
    pub fn mark_unavailable(&self, endpoint: &str) {
        self.unavailable_endpoints
            .lock()
            .expect("provider state poisoned")
            .push(endpoint.to_string());
    }

    /// Highest number of simultaneously running tasks observed.
    pub fn running_high_water(&self) -> usize {
        self.running_high_water.load(Ordering::SeqCst)
    }

    /// VMs powered on via the post action, in observation order.
    pub fn powered_on_vms(&self) -> Vec<String> {
        self.side_effects
            .lock()
            .expect("provider state poisoned")
            .powered_on
            .clone()
    }

    /// `(vm, folder)` pairs moved via the post action.
    pub fn folder_moves(&self) -> Vec<(String, String)> {
        self.side_effects
            .lock()
            .expect("provider state poisoned")
            .folder_moves
            .clone()
    }

    fn datastore_by_name(&self, name: &str, endpoint: &str) -> Option<Datastore> {
        self.inventory
            .datastores
            .iter()
            .find(|d| d.name == name && d.endpoint == endpoint)
            .map(|d| Datastore {
                name: d.name.clone(),
                capacity_gb: d.capacity_gb,
                free_space_gb: d.free_space_gb,
            })
    }
}

#[async_trait]
impl InfrastructureProvider for InMemoryProvider {
    async fn connect(&self, endpoint: &EndpointRef) -> ProviderResult<()> {
        self.calls.connect.fetch_add(1, Ordering::SeqCst);
        if self
            .unavailable_endpoints
            .lock()
            .expect("provider state poisoned")
            .iter()
            .any(|e| e == endpoint.name())
        {
            return Err(ProviderError::Unavailable(format!(
                "no route to endpoint '{endpoint}'"
            )));
        }
        Ok(())
    }

    async fn find_vm(&self, name: &str, endpoint: &EndpointRef) -> ProviderResult<Option<Vm>> {
        self.calls.find_vm.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .inventory
            .vms
            .iter()
            .find(|v| v.name == name && v.endpoint == endpoint.name())
            .map(|v| Vm {
                name: v.name.clone(),
                used_space_gb: v.used_space_gb,
                powered_on: v.powered_on,
            }))
    }

    async fn find_datastore(
        &self,
        name: &str,
        endpoint: &EndpointRef,
    ) -> ProviderResult<Option<Datastore>> {
        self.calls.find_datastore.fetch_add(1, Ordering::SeqCst);
        Ok(self.datastore_by_name(name, endpoint.name()))
    }

    async fn find_datastore_cluster(
        &self,
        name: &str,
        endpoint: &EndpointRef,
    ) -> ProviderResult<Option<Vec<Datastore>>> {
        self.calls
            .find_datastore_cluster
            .fetch_add(1, Ordering::SeqCst);
        let Some(cluster) = self
            .inventory
            .datastore_clusters
            .iter()
            .find(|c| c.name == name && c.endpoint == endpoint.name())
        else {
            return Ok(None);
        };
        Ok(Some(
            cluster
                .members
                .iter()
                .filter_map(|m| self.datastore_by_name(m, endpoint.name()))
                .collect(),
        ))
    }

    async fn find_cluster(
        &self,
        name: &str,
        endpoint: &EndpointRef,
    ) -> ProviderResult<Option<ClusterRef>> {
        self.calls.find_cluster.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .inventory
            .clusters
            .iter()
            .find(|c| c.name == name && c.endpoint == endpoint.name())
            .map(|c| ClusterRef {
                name: c.name.clone(),
                endpoint: endpoint.clone(),
            }))
    }

    async fn find_hosts(&self, cluster: &ClusterRef) -> ProviderResult<Vec<HostSystem>> {
        self.calls.find_hosts.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .inventory
            .clusters
            .iter()
            .find(|c| c.name == cluster.name && c.endpoint == cluster.endpoint.name())
            .map(|c| c.hosts.iter().map(HostRecord::to_host).collect())
            .unwrap_or_default())
    }

    async fn find_network(
        &self,
        switch: &str,
        port_groups: &[String],
        switch_type: SwitchType,
        cluster: &ClusterRef,
    ) -> ProviderResult<Option<NetworkRef>> {
        self.calls.find_network.fetch_add(1, Ordering::SeqCst);
        let matched = self.inventory.networks.iter().find(|n| {
            n.cluster == cluster.name
                && n.switch == switch
                && n.switch_type == switch_type
                && port_groups.iter().all(|pg| n.port_groups.contains(pg))
        });
        Ok(matched.map(|_| NetworkRef {
            switch: switch.to_string(),
            port_groups: port_groups.to_vec(),
            switch_type,
        }))
    }

    async fn submit_relocation(&self, spec: &RelocationSpec) -> ProviderResult<TaskHandle> {
        self.calls.submit_relocation.fetch_add(1, Ordering::SeqCst);

        let script = self
            .scripts
            .lock()
            .expect("provider state poisoned")
            .get(&spec.vm_name)
            .cloned()
            .unwrap_or(TaskScript {
                running_polls: 1,
                outcome: ScriptedOutcome::Success,
            });

        let handle = TaskHandle::new();
        if self.forget_tasks.load(Ordering::SeqCst) {
            return Ok(handle);
        }
        self.tasks.lock().expect("provider state poisoned").insert(
            handle,
            TaskSim {
                remaining_polls: script.running_polls,
                outcome: script.outcome,
            },
        );

        let now = self.running_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.running_high_water.fetch_max(now, Ordering::SeqCst);
        Ok(handle)
    }

    async fn poll_task(&self, handle: &TaskHandle) -> ProviderResult<ProviderTaskState> {
        self.calls.poll_task.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self
            .poll_failure
            .lock()
            .expect("provider state poisoned")
            .clone()
        {
            return Err(ProviderError::Query(message));
        }
        let mut tasks = self.tasks.lock().expect("provider state poisoned");
        let Some(task) = tasks.get_mut(handle) else {
            return Err(ProviderError::UnknownTask(*handle));
        };

        if task.remaining_polls > 0 {
            task.remaining_polls -= 1;
            return Ok(ProviderTaskState::Running);
        }

        let outcome = task.outcome.clone();
        tasks.remove(handle);
        self.running_now.fetch_sub(1, Ordering::SeqCst);
        Ok(match outcome {
            ScriptedOutcome::Success => ProviderTaskState::Success,
            ScriptedOutcome::Error(message) => ProviderTaskState::Error(message),
        })
    }

    async fn power_on(&self, vm_name: &str, _endpoint: &EndpointRef) -> ProviderResult<()> {
        self.side_effects
            .lock()
            .expect("provider state poisoned")
            .powered_on
            .push(vm_name.to_string());
        Ok(())
    }

    async fn move_to_folder(
        &self,
        vm_name: &str,
        folder: &str,
        _endpoint: &EndpointRef,
    ) -> ProviderResult<()> {
        self.side_effects
            .lock()
            .expect("provider state poisoned")
            .folder_moves
            .push((vm_name.to_string(), folder.to_string()));
        Ok(())
    }
}
