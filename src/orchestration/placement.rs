//! # Placement Resolver
//!
//! Turns a coarse target (datastore cluster, host cluster) into one concrete
//! datastore and one concrete host. Both resolutions are point-in-time best
//! guesses over an inventory snapshot: no lock is held between resolution and
//! submission, so two concurrently validated items targeting the same cluster
//! may transiently pick the same datastore. That race is an accepted
//! imprecision of the greedy heuristic, not a bug to lock away.

use std::sync::Arc;

use tracing::debug;

use crate::provider::{
    Datastore, EndpointRef, HostConnectionState, HostSystem, InfrastructureProvider,
    ProviderResult,
};

pub struct PlacementResolver {
    provider: Arc<dyn InfrastructureProvider>,
}

impl PlacementResolver {
    pub fn new(provider: Arc<dyn InfrastructureProvider>) -> Self {
        Self { provider }
    }

    /// Resolve a name that may be a single datastore or a datastore cluster.
    ///
    /// An exact datastore match wins. Otherwise the name is treated as a
    /// datastore cluster and the member with the greatest free space is
    /// chosen, ties broken by first-seen order. Returns `None` when neither
    /// lookup matches.
    pub async fn resolve_datastore(
        &self,
        name: &str,
        endpoint: &EndpointRef,
    ) -> ProviderResult<Option<Datastore>> {
        if let Some(datastore) = self.provider.find_datastore(name, endpoint).await? {
            return Ok(Some(datastore));
        }

        let Some(members) = self.provider.find_datastore_cluster(name, endpoint).await? else {
            return Ok(None);
        };

        let chosen = pick_most_free(&members);
        if let Some(datastore) = &chosen {
            debug!(
                cluster = name,
                datastore = %datastore.name,
                free_space_gb = datastore.free_space_gb,
                "Resolved datastore cluster member"
            );
        }
        Ok(chosen)
    }

    /// Pick the connected host with the lowest memory utilization ratio,
    /// ties broken by first-seen order. Hosts with zero total memory are
    /// skipped. `None` when the cluster has no usable host; the caller
    /// surfaces that as a validation failure, never a crash.
    pub fn pick_host(hosts: &[HostSystem]) -> Option<HostSystem> {
        let mut best: Option<(&HostSystem, f64)> = None;
        for host in hosts {
            if host.connection_state != HostConnectionState::Connected {
                continue;
            }
            if host.memory_total_gb <= 0.0 {
                continue;
            }
            let ratio = host.memory_used_gb / host.memory_total_gb;
            match best {
                Some((_, best_ratio)) if ratio >= best_ratio => {}
                _ => best = Some((host, ratio)),
            }
        }
        best.map(|(host, _)| host.clone())
    }

    /// Resolve the least-utilized connected host in the given cluster.
    pub async fn resolve_host(
        &self,
        cluster: &crate::provider::ClusterRef,
    ) -> ProviderResult<Option<HostSystem>> {
        let hosts = self.provider.find_hosts(cluster).await?;
        let chosen = Self::pick_host(&hosts);
        if let Some(host) = &chosen {
            debug!(
                cluster = %cluster.name,
                host = %host.name,
                "Resolved target host"
            );
        }
        Ok(chosen)
    }
}

/// Greatest free space wins; ties keep the first-seen candidate.
pub fn pick_most_free(datastores: &[Datastore]) -> Option<Datastore> {
    let mut best: Option<&Datastore> = None;
    for candidate in datastores {
        match best {
            Some(current) if candidate.free_space_gb <= current.free_space_gb => {}
            _ => best = Some(candidate),
        }
    }
    best.cloned()
}
