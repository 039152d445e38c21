//! NodeJob Custom Resource Definition.
//!
//! A NodeJob declares one worker pod per eligible cluster node. The target
//! population is derived from the live node list on every reconciliation,
//! never cached on the object.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// NodeJob is a custom resource that fans one worker pod out to every node.
///
/// Example:
/// ```yaml
/// apiVersion: fleetoperator.example.com/v1alpha1
/// kind: NodeJob
/// metadata:
///   name: log-shipper
/// spec:
///   nodeSelector:
///     kubernetes.io/os: linux
///   template:
///     spec:
///       containers:
///         - name: shipper
///           image: busybox
///           command: ["sh", "-c", "tail -F /var/log/messages"]
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "fleetoperator.example.com",
    version = "v1alpha1",
    kind = "NodeJob",
    plural = "nodejobs",
    shortname = "nj",
    status = "NodeJobStatus",
    namespaced,
    printcolumn = r#"{"name":"Desired", "type":"integer", "jsonPath":".status.desiredNumberScheduled"}"#,
    printcolumn = r#"{"name":"Current", "type":"integer", "jsonPath":".status.currentNumberScheduled"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NodeJobSpec {
    /// Pod template copied verbatim into the worker created for each node.
    /// The controller never mutates the template beyond pinning the pod to
    /// its node.
    pub template: PodTemplateSpec,

    /// Only fan out to nodes carrying these labels. Empty matches all nodes.
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
}

/// Observed state of a NodeJob.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeJobStatus {
    /// Number of nodes that should be running a worker pod.
    #[serde(default)]
    pub desired_number_scheduled: i32,

    /// Number of nodes currently running an active worker pod.
    #[serde(default)]
    pub current_number_scheduled: i32,
}
