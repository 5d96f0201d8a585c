//! # Infrastructure Provider
//!
//! Abstract capability over the virtualization management plane: inventory
//! queries, relocation submission, and asynchronous task polling. The
//! orchestrator never talks to a vendor API directly; it receives an
//! `Arc<dyn InfrastructureProvider>` at construction, which keeps session
//! state explicit and makes deterministic test doubles trivial.
//!
//! Relocation tasks execute asynchronously on the provider side; the
//! orchestrator tracks them by polling the opaque `TaskHandle` returned at
//! submission.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::SwitchType;

/// A provider endpoint identifier (one vCenter of the pair a cross-endpoint
/// relocation spans).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRef(pub String);

impl EndpointRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inventory view of a virtual machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Vm {
    pub name: String,
    pub used_space_gb: f64,
    pub powered_on: bool,
}

/// Inventory view of a datastore, capacity figures in GB.
#[derive(Debug, Clone, PartialEq)]
pub struct Datastore {
    pub name: String,
    pub capacity_gb: f64,
    pub free_space_gb: f64,
}

/// Host connection state as the provider reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostConnectionState {
    Connected,
    Disconnected,
    NotResponding,
}

/// Inventory view of an ESXi host, memory figures in GB.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSystem {
    pub name: String,
    pub connection_state: HostConnectionState,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
}

/// A resolved compute cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRef {
    pub name: String,
    pub endpoint: EndpointRef,
}

/// A resolved network target: the switch plus the ordered port groups the
/// VM's adapters map onto.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkRef {
    pub switch: String,
    pub port_groups: Vec<String>,
    pub switch_type: SwitchType,
}

/// Opaque identifier for an in-flight provider relocation task. Issued at
/// submission, owned by the scheduler until a terminal state is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(Uuid);

impl TaskHandle {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observed state of a submitted relocation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderTaskState {
    Running,
    Success,
    Error(String),
}

/// Everything the provider needs to start one cross-endpoint relocation.
/// Destination credentials/trust material are the provider's concern.
#[derive(Debug, Clone)]
pub struct RelocationSpec {
    pub vm_name: String,
    pub source: EndpointRef,
    pub destination: EndpointRef,
    pub datastore: Datastore,
    pub host: HostSystem,
    pub cluster: ClusterRef,
    pub network: NetworkRef,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Connection-level failure; fatal to the whole run.
    #[error("infrastructure provider unavailable: {0}")]
    Unavailable(String),

    /// A read-only inventory query failed.
    #[error("provider query failed: {0}")]
    Query(String),

    /// The provider refused a relocation submission.
    #[error("relocation submission failed: {0}")]
    Submission(String),

    /// Polled a handle the provider does not recognize.
    #[error("unknown task handle: {0}")]
    UnknownTask(TaskHandle),
}

impl ProviderError {
    /// Connection-level errors abort the run; everything else is converted
    /// into per-item state at the scheduling boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Errors that no retry can clear. A handle the provider does not
    /// recognize will never become known again.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::UnknownTask(_))
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Abstract collaborator for the virtualization management plane.
#[async_trait]
pub trait InfrastructureProvider: Send + Sync {
    /// Startup connectivity probe for an endpoint. A failure here is fatal to
    /// the run before any work item is touched.
    async fn connect(&self, endpoint: &EndpointRef) -> ProviderResult<()>;

    async fn find_vm(&self, name: &str, endpoint: &EndpointRef) -> ProviderResult<Option<Vm>>;

    async fn find_datastore(
        &self,
        name: &str,
        endpoint: &EndpointRef,
    ) -> ProviderResult<Option<Datastore>>;

    /// Look up a datastore cluster by name and return its member datastores.
    async fn find_datastore_cluster(
        &self,
        name: &str,
        endpoint: &EndpointRef,
    ) -> ProviderResult<Option<Vec<Datastore>>>;

    async fn find_cluster(
        &self,
        name: &str,
        endpoint: &EndpointRef,
    ) -> ProviderResult<Option<ClusterRef>>;

    async fn find_hosts(&self, cluster: &ClusterRef) -> ProviderResult<Vec<HostSystem>>;

    /// Resolve the switch and every named port group for the given switch
    /// type within the cluster; `None` if any entry is missing.
    async fn find_network(
        &self,
        switch: &str,
        port_groups: &[String],
        switch_type: SwitchType,
        cluster: &ClusterRef,
    ) -> ProviderResult<Option<NetworkRef>>;

    /// Submit a cross-endpoint relocation; returns the opaque task handle the
    /// scheduler polls until terminal.
    async fn submit_relocation(&self, spec: &RelocationSpec) -> ProviderResult<TaskHandle>;

    async fn poll_task(&self, handle: &TaskHandle) -> ProviderResult<ProviderTaskState>;

    /// Best-effort post action; failures are logged by the caller, never
    /// escalated.
    async fn power_on(&self, vm_name: &str, endpoint: &EndpointRef) -> ProviderResult<()>;

    /// Best-effort post action.
    async fn move_to_folder(
        &self,
        vm_name: &str,
        folder: &str,
        endpoint: &EndpointRef,
    ) -> ProviderResult<()>;
}
