//! # Validation Pipeline
//!
//! Sequential precondition checks that gate whether a migration may be
//! submitted. Checks run in a fixed order and short-circuit on the first
//! failure; only read-only provider queries are issued. A failure rejects the
//! single work item and is never retried within a run.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::models::MigrationRequest;
use crate::orchestration::placement::PlacementResolver;
use crate::provider::{
    ClusterRef, Datastore, EndpointRef, HostSystem, InfrastructureProvider, NetworkRef,
    ProviderResult, Vm,
};

/// Inventory entity classes a lookup can fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Vm,
    DatastoreOrCluster,
    Cluster,
    Host,
    Network,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vm => write!(f, "vm"),
            Self::DatastoreOrCluster => write!(f, "datastore or datastore cluster"),
            Self::Cluster => write!(f, "cluster"),
            Self::Host => write!(f, "usable host"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Why a work item was rejected before submission.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("{kind} '{name}' not found at {endpoint}")]
    NotFound {
        kind: EntityKind,
        name: String,
        endpoint: String,
    },

    #[error(
        "insufficient capacity on datastore '{datastore}': buffered free {buffered_free_gb:.1} GB, required {required_gb:.1} GB"
    )]
    InsufficientCapacity {
        datastore: String,
        buffered_free_gb: f64,
        required_gb: f64,
    },
}

/// Everything submission needs, resolved once and carried forward.
#[derive(Debug, Clone)]
pub struct ResolvedPlacement {
    pub vm: Vm,
    pub datastore: Datastore,
    pub host: HostSystem,
    pub cluster: ClusterRef,
    pub network: NetworkRef,
}

/// Outcome of running a request through the pipeline. Provider transport
/// errors are not an outcome; they propagate to the scheduling boundary.
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Passed(Box<ResolvedPlacement>),
    Rejected(ValidationFailure),
}

pub struct ValidationPipeline {
    provider: Arc<dyn InfrastructureProvider>,
    placement: PlacementResolver,
    free_buffer_percent: f64,
}

impl ValidationPipeline {
    pub fn new(provider: Arc<dyn InfrastructureProvider>, free_buffer_percent: f64) -> Self {
        let placement = PlacementResolver::new(provider.clone());
        Self {
            provider,
            placement,
            free_buffer_percent,
        }
    }

    /// Evaluate the checks in fixed order, stopping at the first failure.
    pub async fn validate(&self, request: &MigrationRequest) -> ProviderResult<ValidationOutcome> {
        let source = EndpointRef::new(&request.source_vc);
        let target = EndpointRef::new(&request.target_vc);

        // 1. Source VM exists
        let Some(vm) = self.provider.find_vm(&request.vm_name, &source).await? else {
            return Ok(ValidationOutcome::Rejected(ValidationFailure::NotFound {
                kind: EntityKind::Vm,
                name: request.vm_name.clone(),
                endpoint: source.to_string(),
            }));
        };

        // 2. Target datastore resolves (single datastore or cluster member)
        let Some(datastore) = self
            .placement
            .resolve_datastore(&request.target_datastore, &target)
            .await?
        else {
            return Ok(ValidationOutcome::Rejected(ValidationFailure::NotFound {
                kind: EntityKind::DatastoreOrCluster,
                name: request.target_datastore.clone(),
                endpoint: target.to_string(),
            }));
        };

        // 3. Capacity against the resolved individual datastore
        let buffered_free =
            datastore.free_space_gb - datastore.capacity_gb * self.free_buffer_percent / 100.0;
        if buffered_free < vm.used_space_gb {
            return Ok(ValidationOutcome::Rejected(
                ValidationFailure::InsufficientCapacity {
                    datastore: datastore.name.clone(),
                    buffered_free_gb: buffered_free,
                    required_gb: vm.used_space_gb,
                },
            ));
        }

        // 4. Target host cluster exists
        let Some(cluster) = self
            .provider
            .find_cluster(&request.target_cluster, &target)
            .await?
        else {
            return Ok(ValidationOutcome::Rejected(ValidationFailure::NotFound {
                kind: EntityKind::Cluster,
                name: request.target_cluster.clone(),
                endpoint: target.to_string(),
            }));
        };

        // Host selection inside the cluster; no usable host rejects the item
        let Some(host) = self.placement.resolve_host(&cluster).await? else {
            return Ok(ValidationOutcome::Rejected(ValidationFailure::NotFound {
                kind: EntityKind::Host,
                name: request.target_cluster.clone(),
                endpoint: target.to_string(),
            }));
        };

        // 5. Switch and every port group resolve for the switch type
        let Some(network) = self
            .provider
            .find_network(
                &request.target_switch,
                &request.target_port_groups,
                request.switch_type,
                &cluster,
            )
            .await?
        else {
            return Ok(ValidationOutcome::Rejected(ValidationFailure::NotFound {
                kind: EntityKind::Network,
                name: format!(
                    "{}/{}",
                    request.target_switch,
                    request.target_port_groups.join(",")
                ),
                endpoint: target.to_string(),
            }));
        };

        debug!(
            vm = %request.vm_name,
            datastore = %datastore.name,
            host = %host.name,
            "Validation passed"
        );

        Ok(ValidationOutcome::Passed(Box::new(ResolvedPlacement {
            vm,
            datastore,
            host,
            cluster,
            network,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_boundary_passes_at_exact_fit() {
        // capacity=100, free=25, buffer=20% -> buffered free = 5
        let buffered_free = 25.0 - 100.0 * 20.0 / 100.0;
        assert!(buffered_free >= 4.0);
        assert!(buffered_free < 6.0);
    }

    #[test]
    fn failure_messages_are_diagnosable() {
        let failure = ValidationFailure::InsufficientCapacity {
            datastore: "pod-a-01".to_string(),
            buffered_free_gb: 5.0,
            required_gb: 6.0,
        };
        let message = failure.to_string();
        assert!(message.contains("pod-a-01"));
        assert!(message.contains("5.0"));
        assert!(message.contains("6.0"));

        let missing = ValidationFailure::NotFound {
            kind: EntityKind::Vm,
            name: "vm-gone".to_string(),
            endpoint: "vc-old".to_string(),
        };
        assert_eq!(missing.to_string(), "vm 'vm-gone' not found at vc-old");
    }
}
