//! WorkerSet Custom Resource Definition.
//!
//! A WorkerSet declares a fixed population of interchangeable worker pods.
//! The controller converges the set of running pods toward `spec.replicas`,
//! one step at a time, and reports observed counts back onto the status.

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// WorkerSet is a custom resource for running N fungible worker pods.
///
/// Example:
/// ```yaml
/// apiVersion: fleetoperator.example.com/v1alpha1
/// kind: WorkerSet
/// metadata:
///   name: crunchers
/// spec:
///   replicas: 3
///   template:
///     metadata:
///       labels:
///         tier: batch
///     spec:
///       containers:
///         - name: worker
///           image: busybox
///           command: ["sleep", "3600"]
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "fleetoperator.example.com",
    version = "v1alpha1",
    kind = "WorkerSet",
    plural = "workersets",
    shortname = "ws",
    status = "WorkerSetStatus",
    namespaced,
    printcolumn = r#"{"name":"Desired", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Active", "type":"integer", "jsonPath":".status.active"}"#,
    printcolumn = r#"{"name":"Succeeded", "type":"integer", "jsonPath":".status.succeeded"}"#,
    printcolumn = r#"{"name":"Failed", "type":"integer", "jsonPath":".status.failed"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSetSpec {
    /// Number of worker pods that should be running (default 1).
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Pod template copied verbatim into every worker created for this set.
    /// The controller never mutates the template; it only reads and copies it.
    pub template: PodTemplateSpec,
}

fn default_replicas() -> i32 {
    1
}

/// Observed state of a WorkerSet.
///
/// Recomputed from scratch from the live pod set on every reconciliation
/// and written only when it differs from what is stored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSetStatus {
    /// Number of pods that are neither finished nor marked for deletion.
    #[serde(default)]
    pub active: i32,

    /// Number of pods that reached phase Succeeded.
    #[serde(default)]
    pub succeeded: i32,

    /// Number of pods that reached phase Failed.
    #[serde(default)]
    pub failed: i32,

    /// Names of the active pods, sorted.
    #[serde(default)]
    pub active_pods: Vec<String>,

    /// When the controller first observed this set. Set once, never cleared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    /// When every worker finished with at least one success. Set once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
}
