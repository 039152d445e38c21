//! Convergence tests for the replica-count planner (Mode A).
//!
//! These verify the one-unit-per-invocation contract: repeated
//! invocations converge to the target in exactly |active − desired|
//! steps, each changing the active count by one.

use crate::mock_fleet::MockFleet;
use fleet_operator::controller::plan::PlannedAction;

#[test]
fn test_scale_up_converges_in_exact_steps() {
    let mut fleet = MockFleet::new("crunchers");
    let steps = fleet.run_until_converged(5, 20);
    assert_eq!(steps, 5);
    assert_eq!(fleet.active_count(), 5);
}

#[test]
fn test_scale_down_converges_in_exact_steps() {
    let mut fleet = MockFleet::with_running("crunchers", 7);
    let steps = fleet.run_until_converged(2, 20);
    assert_eq!(steps, 5);
    assert_eq!(fleet.active_count(), 2);
}

#[test]
fn test_each_step_changes_active_count_by_one() {
    let mut fleet = MockFleet::with_running("crunchers", 6);
    let mut previous = fleet.active_count();
    loop {
        match fleet.step_replicas(1) {
            PlannedAction::None => break,
            _ => {
                let current = fleet.active_count();
                assert_eq!(previous.abs_diff(current), 1);
                previous = current;
            }
        }
    }
    assert_eq!(fleet.active_count(), 1);
}

#[test]
fn test_noop_is_stable() {
    let mut fleet = MockFleet::with_running("crunchers", 3);
    // Once at the target, every further invocation plans nothing.
    for _ in 0..5 {
        assert_eq!(fleet.step_replicas(3), PlannedAction::None);
    }
    assert_eq!(fleet.active_count(), 3);
}

#[test]
fn test_scale_to_zero() {
    let mut fleet = MockFleet::with_running("crunchers", 3);
    let steps = fleet.run_until_converged(0, 20);
    assert_eq!(steps, 3);
    assert_eq!(fleet.active_count(), 0);
}

#[test]
fn test_desired_two_from_empty_scenario() {
    // desired=2: [] → create; [A] → create; [A, B] → none.
    let mut fleet = MockFleet::new("crunchers");

    assert_eq!(fleet.step_replicas(2), PlannedAction::CreateReplica);
    assert_eq!(fleet.active_count(), 1);

    assert_eq!(fleet.step_replicas(2), PlannedAction::CreateReplica);
    assert_eq!(fleet.active_count(), 2);

    assert_eq!(fleet.step_replicas(2), PlannedAction::None);
    assert_eq!(fleet.active_count(), 2);
}

#[test]
fn test_desired_one_with_two_running_deletes_first_enumerated() {
    let mut fleet = MockFleet::new("crunchers");
    fleet.add_pod("crunchers-a", "Running", false);
    fleet.add_pod("crunchers-b", "Running", false);

    assert_eq!(
        fleet.step_replicas(1),
        PlannedAction::Delete("crunchers-a".to_string())
    );
    assert_eq!(fleet.pod_names(), vec!["crunchers-b"]);
}

#[test]
fn test_terminating_pod_is_replaced() {
    // Three pods on paper, one of them terminating: true active is 2, so
    // desired=3 still plans a create.
    let mut fleet = MockFleet::new("crunchers");
    fleet.add_pod("crunchers-a", "Running", false);
    fleet.add_pod("crunchers-b", "Running", true);
    fleet.add_pod("crunchers-c", "Running", false);

    assert_eq!(fleet.step_replicas(3), PlannedAction::CreateReplica);
    assert_eq!(fleet.active_count(), 3);
}

#[test]
fn test_finished_pods_are_replaced() {
    let mut fleet = MockFleet::new("crunchers");
    fleet.add_pod("crunchers-a", "Succeeded", false);
    fleet.add_pod("crunchers-b", "Failed", false);

    let steps = fleet.run_until_converged(2, 20);
    assert_eq!(steps, 2);
    // Finished pods stay in the store; only the active count converged.
    assert_eq!(fleet.active_count(), 2);
    assert_eq!(fleet.pods.len(), 4);
}

#[test]
fn test_interleaved_target_changes() {
    // The planner holds no memory between invocations, so a target that
    // moves mid-convergence is simply converged to from wherever the
    // fleet currently is.
    let mut fleet = MockFleet::new("crunchers");
    assert_eq!(fleet.run_until_converged(4, 20), 4);
    assert_eq!(fleet.run_until_converged(1, 20), 3);
    assert_eq!(fleet.run_until_converged(3, 20), 2);
    assert_eq!(fleet.active_count(), 3);
}
