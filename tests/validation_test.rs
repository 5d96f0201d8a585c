//! Validation pipeline behavior against the in-memory provider: check
//! ordering, short-circuiting, the capacity buffer boundary, and idempotence
//! over an immutable snapshot.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use relocator_core::models::SwitchType;
use relocator_core::orchestration::{
    EntityKind, ValidationFailure, ValidationOutcome, ValidationPipeline,
};
use relocator_core::provider::memory::{InMemoryProvider, InventorySnapshot};

use common::{request, standard_hosts, standard_inventory, SOURCE_VC, TARGET_VC};

fn pipeline(provider: &Arc<InMemoryProvider>) -> ValidationPipeline {
    ValidationPipeline::new(provider.clone(), 20.0)
}

#[tokio::test]
async fn passing_item_resolves_full_placement() {
    let provider = Arc::new(InMemoryProvider::new(standard_inventory(&["vm-1"])));
    let outcome = pipeline(&provider).validate(&request("vm-1")).await.unwrap();

    let ValidationOutcome::Passed(placement) = outcome else {
        panic!("expected pass, got {outcome:?}");
    };
    assert_eq!(placement.vm.used_space_gb, 100.0);
    assert_eq!(placement.datastore.name, "pod-a-01");
    // esx-02 carries the lower memory ratio
    assert_eq!(placement.host.name, "esx-02");
    assert_eq!(placement.network.port_groups, vec!["pg-app"]);
}

#[tokio::test]
async fn missing_vm_short_circuits_before_datastore_lookup() {
    let provider = Arc::new(InMemoryProvider::new(standard_inventory(&[])));
    let outcome = pipeline(&provider).validate(&request("vm-gone")).await.unwrap();

    let ValidationOutcome::Rejected(failure) = outcome else {
        panic!("expected rejection");
    };
    assert!(matches!(
        failure,
        ValidationFailure::NotFound {
            kind: EntityKind::Vm,
            ..
        }
    ));

    assert_eq!(provider.calls.find_vm.load(Ordering::SeqCst), 1);
    assert_eq!(provider.calls.find_datastore.load(Ordering::SeqCst), 0);
    assert_eq!(provider.calls.find_datastore_cluster.load(Ordering::SeqCst), 0);
    assert_eq!(provider.calls.find_cluster.load(Ordering::SeqCst), 0);
    assert_eq!(provider.calls.find_network.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_cluster_stops_before_network_lookup() {
    let inventory = InventorySnapshot::default()
        .with_vm("vm-1", SOURCE_VC, 10.0)
        .with_datastore("pod-a-01", TARGET_VC, 2000.0, 1500.0);
    let provider = Arc::new(InMemoryProvider::new(inventory));

    let outcome = pipeline(&provider).validate(&request("vm-1")).await.unwrap();
    let ValidationOutcome::Rejected(failure) = outcome else {
        panic!("expected rejection");
    };
    assert!(matches!(
        failure,
        ValidationFailure::NotFound {
            kind: EntityKind::Cluster,
            ..
        }
    ));
    assert_eq!(provider.calls.find_network.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn capacity_boundary_exact_fit_passes() {
    // buffered free = 25 - 100 * 20% = 5
    let inventory = InventorySnapshot::default()
        .with_vm("vm-small", SOURCE_VC, 4.0)
        .with_datastore("pod-a-01", TARGET_VC, 100.0, 25.0)
        .with_cluster("prod-cluster", TARGET_VC, standard_hosts())
        .with_network("prod-cluster", "dvs-prod", SwitchType::Vds, &["pg-app"]);
    let provider = Arc::new(InMemoryProvider::new(inventory));

    let outcome = pipeline(&provider)
        .validate(&request("vm-small"))
        .await
        .unwrap();
    assert!(matches!(outcome, ValidationOutcome::Passed(_)));
}

#[tokio::test]
async fn capacity_boundary_over_fit_fails_with_diagnosable_message() {
    let inventory = InventorySnapshot::default()
        .with_vm("vm-big", SOURCE_VC, 6.0)
        .with_datastore("pod-a-01", TARGET_VC, 100.0, 25.0)
        .with_cluster("prod-cluster", TARGET_VC, standard_hosts())
        .with_network("prod-cluster", "dvs-prod", SwitchType::Vds, &["pg-app"]);
    let provider = Arc::new(InMemoryProvider::new(inventory));

    let outcome = pipeline(&provider).validate(&request("vm-big")).await.unwrap();
    let ValidationOutcome::Rejected(failure) = outcome else {
        panic!("expected rejection");
    };
    let message = failure.to_string();
    assert!(message.contains("insufficient capacity"));
    assert!(message.contains("5.0"), "buffered free missing: {message}");
    assert!(message.contains("6.0"), "required value missing: {message}");
}

#[tokio::test]
async fn datastore_cluster_resolves_to_most_free_member() {
    let inventory = InventorySnapshot::default()
        .with_vm("vm-1", SOURCE_VC, 10.0)
        .with_datastore("pod-b-01", TARGET_VC, 1000.0, 200.0)
        .with_datastore("pod-b-02", TARGET_VC, 1000.0, 700.0)
        .with_datastore_cluster("pod-b", TARGET_VC, &["pod-b-01", "pod-b-02"])
        .with_cluster("prod-cluster", TARGET_VC, standard_hosts())
        .with_network("prod-cluster", "dvs-prod", SwitchType::Vds, &["pg-app"]);
    let provider = Arc::new(InMemoryProvider::new(inventory));

    let mut req = request("vm-1");
    req.target_datastore = "pod-b".to_string();
    let outcome = pipeline(&provider).validate(&req).await.unwrap();

    let ValidationOutcome::Passed(placement) = outcome else {
        panic!("expected pass");
    };
    assert_eq!(placement.datastore.name, "pod-b-02");
}

#[tokio::test]
async fn capacity_is_checked_on_the_resolved_cluster_member() {
    // Most-free member still cannot fit the VM once the buffer is held back
    let inventory = InventorySnapshot::default()
        .with_vm("vm-1", SOURCE_VC, 90.0)
        .with_datastore("pod-b-01", TARGET_VC, 1000.0, 150.0)
        .with_datastore("pod-b-02", TARGET_VC, 1000.0, 250.0)
        .with_datastore_cluster("pod-b", TARGET_VC, &["pod-b-01", "pod-b-02"])
        .with_cluster("prod-cluster", TARGET_VC, standard_hosts())
        .with_network("prod-cluster", "dvs-prod", SwitchType::Vds, &["pg-app"]);
    let provider = Arc::new(InMemoryProvider::new(inventory));

    let mut req = request("vm-1");
    req.target_datastore = "pod-b".to_string();
    let outcome = pipeline(&provider).validate(&req).await.unwrap();

    // buffered free on pod-b-02 = 250 - 200 = 50 < 90
    let ValidationOutcome::Rejected(ValidationFailure::InsufficientCapacity {
        datastore, ..
    }) = outcome
    else {
        panic!("expected insufficient capacity");
    };
    assert_eq!(datastore, "pod-b-02");
}

#[tokio::test]
async fn unresolvable_port_group_rejects_the_network() {
    let provider = Arc::new(InMemoryProvider::new(standard_inventory(&["vm-1"])));

    let mut req = request("vm-1");
    req.target_port_groups = vec!["pg-app".to_string(), "pg-missing".to_string()];
    let outcome = pipeline(&provider).validate(&req).await.unwrap();

    let ValidationOutcome::Rejected(failure) = outcome else {
        panic!("expected rejection");
    };
    assert!(matches!(
        failure,
        ValidationFailure::NotFound {
            kind: EntityKind::Network,
            ..
        }
    ));
}

#[tokio::test]
async fn switch_type_mismatch_rejects_the_network() {
    let provider = Arc::new(InMemoryProvider::new(standard_inventory(&["vm-1"])));

    let mut req = request("vm-1");
    req.switch_type = SwitchType::Standard;
    let outcome = pipeline(&provider).validate(&req).await.unwrap();
    assert!(matches!(
        outcome,
        ValidationOutcome::Rejected(ValidationFailure::NotFound {
            kind: EntityKind::Network,
            ..
        })
    ));
}

#[tokio::test]
async fn cluster_without_usable_hosts_rejects() {
    let inventory = InventorySnapshot::default()
        .with_vm("vm-1", SOURCE_VC, 10.0)
        .with_datastore("pod-a-01", TARGET_VC, 2000.0, 1500.0)
        .with_cluster("prod-cluster", TARGET_VC, vec![])
        .with_network("prod-cluster", "dvs-prod", SwitchType::Vds, &["pg-app"]);
    let provider = Arc::new(InMemoryProvider::new(inventory));

    let outcome = pipeline(&provider).validate(&request("vm-1")).await.unwrap();
    assert!(matches!(
        outcome,
        ValidationOutcome::Rejected(ValidationFailure::NotFound {
            kind: EntityKind::Host,
            ..
        })
    ));
}

#[tokio::test]
async fn validation_is_idempotent_over_an_immutable_snapshot() {
    let provider = Arc::new(InMemoryProvider::new(standard_inventory(&["vm-1"])));
    let pipeline = pipeline(&provider);

    let first = pipeline.validate(&request("vm-1")).await.unwrap();
    let second = pipeline.validate(&request("vm-1")).await.unwrap();
    assert!(matches!(first, ValidationOutcome::Passed(_)));
    assert!(matches!(second, ValidationOutcome::Passed(_)));

    let missing_first = pipeline.validate(&request("vm-gone")).await.unwrap();
    let missing_second = pipeline.validate(&request("vm-gone")).await.unwrap();
    let (ValidationOutcome::Rejected(a), ValidationOutcome::Rejected(b)) =
        (missing_first, missing_second)
    else {
        panic!("expected two rejections");
    };
    assert_eq!(a, b);
}
