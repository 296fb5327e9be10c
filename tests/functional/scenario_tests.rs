//! Multi-step upgrade cycles.
//!
//! Each test plays the orchestrator (calling hooks) and, where needed, the
//! upgrade executor (reporting success on the record).

use capi_upgrade_gate::client::MembershipMode;
use capi_upgrade_gate::config::ExtensionConfig;
use capi_upgrade_gate::crd::{ClusterUpgrade, ClusterUpgradeStatus, UpgradeCondition};
use capi_upgrade_gate::hooks::{HookRequest, LifecycleHook, ResponseStatus};

use crate::mock_state::{Harness, default_machines, machine};

fn before(version: &str) -> HookRequest {
    HookRequest::for_cluster("c1", "ns1").to_version(version)
}

fn after(version: &str) -> HookRequest {
    HookRequest::for_cluster("c1", "ns1").at_version(version)
}

#[tokio::test]
async fn test_full_upgrade_cycle() {
    let h = Harness::new(default_machines());

    // First touch creates the record and blocks
    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.retry_after_seconds, Some(30));

    let record = h.store.get("c1", "ns1", "1.29.0").unwrap();
    assert_eq!(record.metadata.name.as_deref(), Some("c1-1.29.0"));
    assert_eq!(record.spec.nodes_ip, vec!["10.0.0.5", "10.0.0.6"]);
    assert!(!record.spec.upgraded);

    // Still pending while the executor works
    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert_eq!(response.retry_after_seconds, Some(30));
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.store.create_attempts(), 1);

    // Executor reports success, upgrade may proceed
    h.store.report_success("c1", "ns1", "1.29.0");
    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.retry_after_seconds, None);

    // Orchestrator finishes
    let response = h
        .dispatcher
        .dispatch(LifecycleHook::AfterClusterUpgrade, &after("1.29.0"))
        .await;
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.kind, "AfterClusterUpgradeResponse");
    assert!(h.store.get("c1", "ns1", "1.29.0").unwrap().spec.upgraded);

    // A late before-upgrade call for the same version still passes
    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert!(response.is_success());
    assert_eq!(response.retry_after_seconds, None);
    assert_eq!(h.store.len(), 1);
    assert!(h.health.metrics.encode().contains("capi_upgrade_gate_records_created_total 1"));
}

#[tokio::test]
async fn test_unblock_is_monotonic() {
    let h = Harness::new(default_machines());
    h.dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    h.store.report_success("c1", "ns1", "1.29.0");

    for _ in 0..5 {
        let response = h
            .dispatcher
            .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
            .await;
        assert!(response.is_success());
        assert_eq!(response.retry_after_seconds, None);
    }
    assert_eq!(h.store.create_attempts(), 1);
}

#[tokio::test]
async fn test_versions_are_gated_independently() {
    let h = Harness::new(default_machines());
    h.dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    h.store.report_success("c1", "ns1", "1.29.0");

    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.30.0"))
        .await;
    assert_eq!(response.retry_after_seconds, Some(30));
    assert_eq!(h.store.len(), 2);
    assert!(h.store.get("c1", "ns1", "1.30.0").is_some());
}

#[tokio::test]
async fn test_no_record_without_control_plane_nodes() {
    let h = Harness::new(vec![
        machine("c2-control-plane-abc", &["10.0.0.8"]),
        machine("c1-md-0-xyz", &["10.0.0.7"]),
    ]);

    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert_eq!(response.status, ResponseStatus::Failure);
    assert_eq!(response.retry_after_seconds, None);
    assert!(h.store.is_empty());
    assert_eq!(h.store.create_attempts(), 0);
}

#[tokio::test]
async fn test_reserved_subnet_only_nodes_never_create_records() {
    let h = Harness::new(vec![machine("c1-control-plane-abc", &["10.6.0.5", "10.6.1.9"])]);

    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert_eq!(response.status, ResponseStatus::Failure);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_empty_inventory_fails() {
    let h = Harness::new(vec![]);

    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert_eq!(response.status, ResponseStatus::Failure);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_completion_requires_prior_record() {
    let h = Harness::new(default_machines());

    let response = h
        .dispatcher
        .dispatch(LifecycleHook::AfterClusterUpgrade, &after("1.29.0"))
        .await;
    assert_eq!(response.status, ResponseStatus::Failure);
    assert!(response.message.contains("c1-1.29.0"));
    assert!(h.store.is_empty());
    assert_eq!(h.inventory.calls(), 0);
}

#[tokio::test]
async fn test_completion_for_other_version_fails() {
    let h = Harness::new(default_machines());
    h.dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;

    let response = h
        .dispatcher
        .dispatch(LifecycleHook::AfterClusterUpgrade, &after("1.30.0"))
        .await;
    assert_eq!(response.status, ResponseStatus::Failure);
    assert!(!h.store.get("c1", "ns1", "1.29.0").unwrap().spec.upgraded);
}

#[tokio::test]
async fn test_upgraded_without_success_still_blocks() {
    let h = Harness::new(default_machines());
    let mut record = ClusterUpgrade::for_cluster("c1", "ns1", "1.29.0", vec!["10.0.0.5".into()]);
    record.spec.upgraded = true;
    h.store.insert(record);

    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert_eq!(response.retry_after_seconds, Some(30));
    assert_eq!(h.store.create_attempts(), 0);
}

#[tokio::test]
async fn test_success_condition_presence_is_enough() {
    let h = Harness::new(default_machines());
    let mut record = ClusterUpgrade::for_cluster("c1", "ns1", "1.29.0", vec!["10.0.0.5".into()]);
    record.status = Some(ClusterUpgradeStatus {
        conditions: vec![UpgradeCondition::new("Successful", false)],
    });
    h.store.insert(record);

    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert!(response.is_success());
    assert_eq!(response.retry_after_seconds, None);
}

#[tokio::test]
async fn test_passthrough_hooks_do_not_touch_records() {
    let h = Harness::new(default_machines());
    for hook in [
        LifecycleHook::BeforeClusterCreate,
        LifecycleHook::AfterControlPlaneInitialized,
        LifecycleHook::AfterControlPlaneUpgrade,
        LifecycleHook::BeforeClusterDelete,
    ] {
        let response = h.dispatcher.dispatch(hook, &before("1.29.0")).await;
        assert!(response.is_success());
        assert_eq!(response.retry_after_seconds, None);
        assert_eq!(response.kind, hook.response_kind());
    }
    assert!(h.store.is_empty());
    assert_eq!(h.inventory.calls(), 0);
}

#[tokio::test]
async fn test_missing_namespace_defaults() {
    let h = Harness::new(default_machines());
    let mut request = before("1.29.0");
    if let Some(cluster) = request.cluster.as_mut() {
        cluster.metadata.namespace = None;
    }

    h.dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &request)
        .await;
    assert!(h.store.get("c1", "default", "1.29.0").is_some());
}

#[tokio::test]
async fn test_configured_retry_interval() {
    let config = ExtensionConfig {
        retry_after_seconds: 10,
        ..Default::default()
    };
    let h = Harness::with_config(default_machines(), &config);

    let response = h
        .dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    assert_eq!(response.retry_after_seconds, Some(10));
}

#[tokio::test]
async fn test_label_membership_mode() {
    let config = ExtensionConfig {
        membership: MembershipMode::Label,
        ..Default::default()
    };
    let mut labeled = machine("node-a", &["10.0.1.1"]);
    labeled
        .labels
        .insert("cluster.x-k8s.io/cluster-name".into(), "c1".into());
    labeled
        .labels
        .insert("cluster.x-k8s.io/control-plane".into(), String::new());
    let machines = vec![labeled, machine("c1-control-plane-abc", &["10.0.0.5"])];
    let h = Harness::with_config(machines, &config);

    h.dispatcher
        .dispatch(LifecycleHook::BeforeClusterUpgrade, &before("1.29.0"))
        .await;
    let record = h.store.get("c1", "ns1", "1.29.0").unwrap();
    assert_eq!(record.spec.nodes_ip, vec!["10.0.1.1"]);
}
