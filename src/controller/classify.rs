//! Partitioning of observed worker pods by lifecycle state.
//!
//! Classification is a pure function over the enumerated pod list; no I/O
//! happens here. The planner and the status projector both consume the
//! resulting partitions.

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::warn;

/// Disjoint partitions of the pods enumerated for one owner.
#[derive(Debug, Default)]
pub struct UnitPartitions<'a> {
    /// Pods that are neither finished nor marked for deletion, in
    /// enumeration order.
    pub active: Vec<&'a Pod>,
    /// Pods that reached phase Succeeded.
    pub succeeded: Vec<&'a Pod>,
    /// Pods that reached phase Failed.
    pub failed: Vec<&'a Pod>,
    /// Pods with a deletion timestamp, regardless of phase. Excluded from
    /// active so a concurrent external deletion never inflates the count.
    pub terminating: Vec<&'a Pod>,
}

impl UnitPartitions<'_> {
    /// Names of the active pods, in enumeration order.
    pub fn active_names(&self) -> Vec<String> {
        self.active.iter().map(|p| p.name_any()).collect()
    }
}

/// The reported phase of a pod, defaulting to Unknown.
pub fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown")
}

/// Whether a pod counts toward the active population.
pub fn is_pod_active(pod: &Pod) -> bool {
    pod.metadata.deletion_timestamp.is_none()
        && !matches!(pod_phase(pod), "Succeeded" | "Failed")
}

/// Partition pods into active / succeeded / failed / terminating.
///
/// Pods matched by the selector but lacking an owner reference back to
/// `owner_uid` are not managed by this controller; they are skipped and
/// never adopted or mutated.
pub fn classify<'a>(pods: &'a [Pod], owner_uid: &str) -> UnitPartitions<'a> {
    let mut partitions = UnitPartitions::default();

    for pod in pods {
        if !is_controlled_by(pod, owner_uid) {
            warn!(
                pod = %pod.name_any(),
                "Selector matched a pod without an owner reference to this object, skipping"
            );
            continue;
        }

        if pod.metadata.deletion_timestamp.is_some() {
            partitions.terminating.push(pod);
        } else {
            match pod_phase(pod) {
                "Succeeded" => partitions.succeeded.push(pod),
                "Failed" => partitions.failed.push(pod),
                _ => partitions.active.push(pod),
            }
        }
    }

    partitions
}

fn is_controlled_by(pod: &Pod, owner_uid: &str) -> bool {
    pod.metadata
        .owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|r| r.uid == owner_uid)
}
