// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for fleet-operator.
//!
//! Uses proptest to generate random populations and verify the
//! convergence invariants of the planner and the determinism of the
//! status projection.

use proptest::prelude::*;

use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};

use fleet_operator::controller::classify::classify;
use fleet_operator::controller::plan::{Cardinality, PlannedAction, Target, plan};
use fleet_operator::controller::project::worker_set_status;

const OWNER_UID: &str = "uid-prop-owner";

fn mock_pod(name: &str, phase: &str, deleting: bool) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            deletion_timestamp: deleting.then(|| Time(k8s_openapi::chrono::Utc::now())),
            owner_references: Some(vec![OwnerReference {
                uid: OWNER_UID.to_string(),
                controller: Some(true),
                ..Default::default()
            }]),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Apply one planned action to a simulated store. Created pods come up
/// Running; deletes remove the pod outright.
fn apply(pods: &mut Vec<Pod>, action: &PlannedAction, serial: &mut u32) {
    match action {
        PlannedAction::CreateReplica => {
            *serial += 1;
            pods.push(mock_pod(&format!("fleet-r{serial}"), "Running", false));
        }
        PlannedAction::CreateForTargets(targets) => {
            for target in targets {
                pods.push(mock_pod(&target.unit_name, "Running", false));
            }
        }
        PlannedAction::Delete(victim) => {
            pods.retain(|p| p.metadata.name.as_deref() != Some(victim));
        }
        PlannedAction::None => {}
    }
}

fn active_count(pods: &[Pod]) -> i32 {
    classify(pods, OWNER_UID).active.len() as i32
}

/// Strategy for initial active populations (0-30 pods).
fn initial_active() -> impl Strategy<Value = i32> {
    0..=30i32
}

/// Strategy for desired replica counts (0-30).
fn desired_replicas() -> impl Strategy<Value = i32> {
    0..=30i32
}

/// Strategy for random pod phases.
fn any_phase() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("Pending"),
        Just("Running"),
        Just("Succeeded"),
        Just("Failed"),
        Just("Unknown"),
    ]
}

/// Strategy for target node sets (1-12 uniquely named nodes).
fn node_set() -> impl Strategy<Value = Vec<String>> {
    (1usize..=12).prop_map(|n| (0..n).map(|i| format!("node-{i}")).collect())
}

proptest! {
    /// Property: for all desired counts d and initial populations a,
    /// repeated invocations converge to active == d in exactly |a - d|
    /// steps, each changing the active count by exactly one.
    #[test]
    fn prop_replicas_converge_in_exact_steps(a in initial_active(), d in desired_replicas()) {
        let mut pods: Vec<Pod> = (0..a)
            .map(|i| mock_pod(&format!("fleet-pre{i}"), "Running", false))
            .collect();
        let mut serial = 0u32;

        let expected_steps = (a - d).unsigned_abs();
        let mut steps = 0u32;

        loop {
            let action = {
                let observed = classify(&pods, OWNER_UID);
                plan(&Cardinality::Replicas(d), &observed)
            };
            if action == PlannedAction::None {
                break;
            }
            let before = active_count(&pods);
            apply(&mut pods, &action, &mut serial);
            let after = active_count(&pods);
            prop_assert_eq!((before - after).abs(), 1);
            steps += 1;
            prop_assert!(steps <= expected_steps, "planner overshot the target");
        }

        prop_assert_eq!(steps, expected_steps);
        prop_assert_eq!(active_count(&pods), d);
    }

    /// Property: the planner never plans against terminating or finished
    /// pods; only the active partition drives the diff.
    #[test]
    fn prop_inactive_pods_never_satisfy_the_target(
        phases in proptest::collection::vec((any_phase(), any_bool()), 0..12),
        d in 0..=10i32,
    ) {
        let pods: Vec<Pod> = phases
            .iter()
            .enumerate()
            .map(|(i, (phase, deleting))| mock_pod(&format!("fleet-p{i}"), phase, *deleting))
            .collect();

        let observed = classify(&pods, OWNER_UID);
        let active = observed.active.len() as i32;
        let action = plan(&Cardinality::Replicas(d), &observed);

        match action {
            PlannedAction::CreateReplica => prop_assert!(active < d),
            PlannedAction::Delete(_) => prop_assert!(active > d),
            PlannedAction::None => prop_assert_eq!(active, d),
            PlannedAction::CreateForTargets(_) => prop_assert!(false, "wrong mode"),
        }
    }

    /// Property: fan-out over n empty targets creates exactly n uniquely
    /// named workers in one invocation, and a second invocation creates
    /// nothing.
    #[test]
    fn prop_fan_out_exactness(nodes in node_set()) {
        let targets: Vec<Target> = nodes
            .iter()
            .map(|node| Target {
                id: node.clone(),
                unit_name: format!("fleet-{node}"),
            })
            .collect();

        let mut pods: Vec<Pod> = Vec::new();
        let mut serial = 0u32;

        let first = {
            let observed = classify(&pods, OWNER_UID);
            plan(&Cardinality::PerTarget(targets.clone()), &observed)
        };
        match &first {
            PlannedAction::CreateForTargets(missing) => {
                prop_assert_eq!(missing.len(), nodes.len());
                let mut names: Vec<&str> = missing.iter().map(|t| t.unit_name.as_str()).collect();
                names.sort_unstable();
                names.dedup();
                prop_assert_eq!(names.len(), nodes.len(), "worker names must be unique per target");
            }
            other => prop_assert!(false, "expected a batch create, got {:?}", other),
        }
        apply(&mut pods, &first, &mut serial);

        let second = {
            let observed = classify(&pods, OWNER_UID);
            plan(&Cardinality::PerTarget(targets), &observed)
        };
        prop_assert_eq!(second, PlannedAction::None);
    }

    /// Property: the status projection is deterministic and independent
    /// of enumeration order.
    #[test]
    fn prop_projection_is_order_independent(
        phases in proptest::collection::vec(any_phase(), 0..10),
    ) {
        let now: jiff::Timestamp = "2026-03-01T00:00:00Z".parse().unwrap();

        let pods: Vec<Pod> = phases
            .iter()
            .enumerate()
            .map(|(i, phase)| mock_pod(&format!("fleet-p{i}"), phase, false))
            .collect();
        let mut reversed = pods.clone();
        reversed.reverse();

        let forward = worker_set_status(None, &classify(&pods, OWNER_UID), now);
        let backward = worker_set_status(None, &classify(&reversed, OWNER_UID), now);
        prop_assert_eq!(&forward, &backward);

        // Projecting again over the same set against the stored status
        // yields an equal value, so no second write is issued.
        let later: jiff::Timestamp = "2026-03-01T01:00:00Z".parse().unwrap();
        let again = worker_set_status(Some(&forward), &classify(&pods, OWNER_UID), later);
        prop_assert_eq!(&forward, &again);
    }
}

fn any_bool() -> impl Strategy<Value = bool> {
    proptest::bool::ANY
}
