//! Status projection from classified observations.
//!
//! Status is never incremented in place: it is recomputed from scratch on
//! every invocation and compared structurally against the stored value, so
//! projecting twice from an unchanged pod set never issues a second write.

use jiff::Timestamp;

use crate::controller::classify::UnitPartitions;
use crate::crd::{NodeJobStatus, WorkerSetStatus};

/// Counts derived from one classification pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnitCounts {
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
}

/// Count the partitions. Order-independent by construction.
pub fn project_counts(observed: &UnitPartitions<'_>) -> UnitCounts {
    UnitCounts {
        active: observed.active.len() as i32,
        succeeded: observed.succeeded.len() as i32,
        failed: observed.failed.len() as i32,
    }
}

/// Project the status of a WorkerSet from the current observations.
///
/// `startTime` is stamped on the first projection and carried forward;
/// `completionTime` is stamped once nothing is active and at least one
/// worker succeeded. Neither is ever cleared. Pod names are sorted so the
/// projection does not depend on enumeration order.
pub fn worker_set_status(
    previous: Option<&WorkerSetStatus>,
    observed: &UnitPartitions<'_>,
    now: Timestamp,
) -> WorkerSetStatus {
    let counts = project_counts(observed);

    let mut active_pods = observed.active_names();
    active_pods.sort();

    let start_time = previous
        .and_then(|s| s.start_time.clone())
        .or_else(|| Some(now.to_string()));

    let completion_time = previous.and_then(|s| s.completion_time.clone()).or_else(|| {
        (counts.active == 0 && counts.succeeded > 0).then(|| now.to_string())
    });

    WorkerSetStatus {
        active: counts.active,
        succeeded: counts.succeeded,
        failed: counts.failed,
        active_pods,
        start_time,
        completion_time,
    }
}

/// Project the status of a NodeJob from the target set size and the
/// current observations.
pub fn node_job_status(desired: i32, observed: &UnitPartitions<'_>) -> NodeJobStatus {
    NodeJobStatus {
        desired_number_scheduled: desired,
        current_number_scheduled: observed.active.len() as i32,
    }
}
