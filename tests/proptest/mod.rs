// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for capi-upgrade-gate.
//!
//! Uses proptest to generate random inputs and verify invariants.

use std::collections::BTreeMap;

use proptest::prelude::*;

use capi_upgrade_gate::client::{
    ClusterLabelPredicate, Machine, MembershipPredicate, NameMarkerPredicate,
    filter_control_plane_addresses,
};
use capi_upgrade_gate::controller::{GateDecision, GateState};
use capi_upgrade_gate::crd::{
    ClusterUpgrade, ClusterUpgradeStatus, SUCCESSFUL_CONDITION, UpgradeCondition, record_name,
};
use capi_upgrade_gate::hooks::{HookResponse, LifecycleHook};

/// Strategy for IPv4 addresses, biased towards the reserved subnet.
fn address() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u8..=255, 0u8..=255).prop_map(|(c, d)| format!("10.6.{}.{}", c, d)),
        (0u8..=255, 0u8..=255, 0u8..=255).prop_map(|(b, c, d)| format!("10.{}.{}.{}", b, c, d)),
        (0u8..=255, 0u8..=255).prop_map(|(c, d)| format!("192.168.{}.{}", c, d)),
    ]
}

/// Strategy for DNS-label-like cluster names.
fn cluster_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,10}"
}

/// Strategy for machine names drawn from a few clusters and roles.
fn machine() -> impl Strategy<Value = Machine> {
    (
        prop_oneof![Just("c1"), Just("c2"), Just("prod")],
        prop_oneof![Just("control-plane"), Just("md-0"), Just("worker")],
        "[a-z0-9]{5}",
        prop::collection::vec(address(), 0..4),
    )
        .prop_map(|(cluster, role, suffix, addresses)| Machine {
            name: format!("{}-{}-{}", cluster, role, suffix),
            labels: BTreeMap::new(),
            addresses,
        })
}

/// Strategy for Kubernetes versions.
fn version() -> impl Strategy<Value = String> {
    (1u8..=2, 0u8..=40, 0u8..=20).prop_map(|(major, minor, patch)| {
        format!("{}.{}.{}", major, minor, patch)
    })
}

/// Strategy for arbitrary records.
fn any_record() -> impl Strategy<Value = ClusterUpgrade> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(upgraded, successful, status)| {
        let mut record = ClusterUpgrade::for_cluster("c1", "ns1", "1.29.0", vec![]);
        record.spec.upgraded = upgraded;
        if successful {
            record.status = Some(ClusterUpgradeStatus {
                conditions: vec![UpgradeCondition::new(SUCCESSFUL_CONDITION, status)],
            });
        }
        record
    })
}

proptest! {
    /// Reserved-subnet addresses never reach a record.
    #[test]
    fn reserved_addresses_are_never_returned(
        machines in prop::collection::vec(machine(), 0..12),
        cluster in prop_oneof![Just("c1"), Just("c2"), Just("prod")],
    ) {
        let predicate = NameMarkerPredicate::new("control-plane");
        let addresses = filter_control_plane_addresses(&machines, &predicate, cluster, "10.6.");
        prop_assert!(addresses.iter().all(|a| !a.starts_with("10.6.")));
    }

    /// Every returned address belongs to a member machine.
    #[test]
    fn addresses_come_from_member_machines(
        machines in prop::collection::vec(machine(), 0..12),
        cluster in prop_oneof![Just("c1"), Just("c2"), Just("prod")],
    ) {
        let predicate = NameMarkerPredicate::new("control-plane");
        let addresses = filter_control_plane_addresses(&machines, &predicate, cluster, "10.6.");
        let member_addresses: Vec<&String> = machines
            .iter()
            .filter(|m| predicate.is_member(m, cluster))
            .flat_map(|m| m.addresses.iter())
            .collect();
        for address in &addresses {
            prop_assert!(member_addresses.contains(&address));
        }
    }

    /// Without a prefix nothing is dropped from member machines.
    #[test]
    fn empty_prefix_keeps_all_member_addresses(
        machines in prop::collection::vec(machine(), 0..12),
    ) {
        let predicate = NameMarkerPredicate::new("control-plane");
        let expected: usize = machines
            .iter()
            .filter(|m| predicate.is_member(m, "c1"))
            .map(|m| m.addresses.len())
            .sum();
        let addresses = filter_control_plane_addresses(&machines, &predicate, "c1", "");
        prop_assert_eq!(addresses.len(), expected);
    }

    /// Unlabeled machines never match the label predicate.
    #[test]
    fn label_predicate_requires_labels(m in machine(), cluster in cluster_name()) {
        prop_assert!(!ClusterLabelPredicate.is_member(&m, &cluster));
    }

    /// Record names are derived deterministically and keep both parts.
    #[test]
    fn record_name_is_derived(cluster in cluster_name(), v in version()) {
        let name = record_name(&cluster, &v);
        prop_assert_eq!(&name, &format!("{}-{}", cluster, v));
        prop_assert!(name.starts_with(&cluster));
        prop_assert!(name.ends_with(&v));

        let record = ClusterUpgrade::for_cluster(&cluster, "ns1", &v, vec![]);
        prop_assert_eq!(record.metadata.name, Some(name));
        prop_assert!(!record.spec.upgraded);
    }

    /// A record without a Successful condition is never Ready.
    #[test]
    fn ready_requires_success(record in any_record()) {
        let state = GateState::of(Some(&record));
        if state == GateState::Ready {
            prop_assert!(record.is_successful());
            prop_assert!(!record.spec.upgraded);
        }
        if !record.is_successful() {
            prop_assert_ne!(state, GateState::Ready);
        }
    }

    /// Retry responses are successes carrying the interval.
    #[test]
    fn retry_responses_carry_interval(seconds in 1i32..3600) {
        let decision = GateDecision::RetryAfter(seconds);
        let response = HookResponse::retry_after(LifecycleHook::BeforeClusterUpgrade, seconds);
        prop_assert!(response.is_success());
        prop_assert_eq!(response.retry_after_seconds, decision.retry_after_seconds());
    }
}
