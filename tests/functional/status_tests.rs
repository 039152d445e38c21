//! Status projection tests.
//!
//! The status is a pure function of the classified pod set: recomputed
//! from scratch, compared structurally, and written only on change. These
//! tests verify the equality guard that keeps reconcile-write loops from
//! forming, and the set-once timestamp semantics.

use jiff::Timestamp;

use crate::mock_fleet::MockFleet;
use fleet_operator::controller::project::{node_job_status, worker_set_status};
use fleet_operator::crd::WorkerSetStatus;

fn ts(s: &str) -> Timestamp {
    s.parse().expect("valid timestamp")
}

/// Simulate the driver's write decision: project against the stored
/// status and report whether a write would be issued.
fn would_write(stored: Option<&WorkerSetStatus>, fleet: &MockFleet, now: Timestamp) -> (bool, WorkerSetStatus) {
    let projected = worker_set_status(stored, &fleet.observed(), now);
    (stored != Some(&projected), projected)
}

#[test]
fn test_unchanged_fleet_never_writes_twice() {
    let mut fleet = MockFleet::new("crunchers");
    fleet.add_pod("crunchers-a", "Running", false);
    fleet.add_pod("crunchers-b", "Succeeded", false);

    let (first_write, stored) = would_write(None, &fleet, ts("2026-03-01T00:00:00Z"));
    assert!(first_write);

    // Same pod set five minutes later: projection is equal, no write.
    let (second_write, again) = would_write(Some(&stored), &fleet, ts("2026-03-01T00:05:00Z"));
    assert!(!second_write);
    assert_eq!(stored, again);
}

#[test]
fn test_pod_change_triggers_exactly_one_write() {
    let mut fleet = MockFleet::new("crunchers");
    fleet.add_pod("crunchers-a", "Running", false);

    let (_, stored) = would_write(None, &fleet, ts("2026-03-01T00:00:00Z"));

    fleet.add_pod("crunchers-b", "Running", false);
    let (write, stored) = would_write(Some(&stored), &fleet, ts("2026-03-01T00:01:00Z"));
    assert!(write);

    let (write_again, _) = would_write(Some(&stored), &fleet, ts("2026-03-01T00:02:00Z"));
    assert!(!write_again);
}

#[test]
fn test_status_counts_follow_classification() {
    let mut fleet = MockFleet::new("crunchers");
    fleet.add_pod("crunchers-a", "Running", false);
    fleet.add_pod("crunchers-b", "Pending", false);
    fleet.add_pod("crunchers-c", "Succeeded", false);
    fleet.add_pod("crunchers-d", "Failed", false);
    fleet.add_pod("crunchers-e", "Running", true);

    let status = worker_set_status(None, &fleet.observed(), ts("2026-03-01T00:00:00Z"));
    assert_eq!(status.active, 2);
    assert_eq!(status.succeeded, 1);
    assert_eq!(status.failed, 1);
    assert_eq!(status.active_pods, vec!["crunchers-a", "crunchers-b"]);
}

#[test]
fn test_status_active_names_are_sorted() {
    let mut fleet = MockFleet::new("crunchers");
    fleet.add_pod("crunchers-z", "Running", false);
    fleet.add_pod("crunchers-a", "Running", false);

    let status = worker_set_status(None, &fleet.observed(), ts("2026-03-01T00:00:00Z"));
    assert_eq!(status.active_pods, vec!["crunchers-a", "crunchers-z"]);
}

#[test]
fn test_timestamps_survive_the_whole_lifecycle() {
    let mut fleet = MockFleet::new("crunchers");

    // First observation stamps startTime.
    let (_, stored) = would_write(None, &fleet, ts("2026-03-01T00:00:00Z"));
    assert_eq!(stored.start_time.as_deref(), Some("2026-03-01T00:00:00Z"));
    assert!(stored.completion_time.is_none());

    // Work runs.
    fleet.add_pod("crunchers-a", "Running", false);
    let (_, stored) = would_write(Some(&stored), &fleet, ts("2026-03-01T00:01:00Z"));
    assert_eq!(stored.start_time.as_deref(), Some("2026-03-01T00:00:00Z"));
    assert!(stored.completion_time.is_none());

    // Work finishes successfully: completionTime is stamped once.
    fleet.pods.clear();
    fleet.add_pod("crunchers-a", "Succeeded", false);
    let (_, stored) = would_write(Some(&stored), &fleet, ts("2026-03-01T02:00:00Z"));
    assert_eq!(
        stored.completion_time.as_deref(),
        Some("2026-03-01T02:00:00Z")
    );

    // Later churn never clears either stamp.
    fleet.add_pod("crunchers-b", "Running", false);
    let (_, stored) = would_write(Some(&stored), &fleet, ts("2026-03-01T03:00:00Z"));
    assert_eq!(stored.start_time.as_deref(), Some("2026-03-01T00:00:00Z"));
    assert_eq!(
        stored.completion_time.as_deref(),
        Some("2026-03-01T02:00:00Z")
    );
}

#[test]
fn test_node_job_status_tracks_target_set() {
    let mut fleet = MockFleet::new("log-shipper");
    fleet.step_targets(&["node-a", "node-b"]);

    let status = node_job_status(2, &fleet.observed());
    assert_eq!(status.desired_number_scheduled, 2);
    assert_eq!(status.current_number_scheduled, 2);

    // A node left: desired shrinks immediately, current follows once the
    // reap lands.
    let status = node_job_status(1, &fleet.observed());
    assert_eq!(status.desired_number_scheduled, 1);
    assert_eq!(status.current_number_scheduled, 2);

    fleet.step_targets(&["node-a"]);
    let status = node_job_status(1, &fleet.observed());
    assert_eq!(status.current_number_scheduled, 1);
}
