//! Worker pod generation.
//!
//! Provides the label/selector scheme shared by the enumerator and the
//! factory, and builds worker pods from an owner's template. The template
//! is copied verbatim; the only fields set here are identity, namespace,
//! labels, the owner reference, and (for node workers) the node pinning.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use crate::crd::{NodeJob, WorkerSet};

/// Value of the managed-by label on every pod this operator creates.
pub const MANAGED_BY: &str = "fleet-operator";

/// Version marker of the label scheme. Part of the selector, so a future
/// scheme change does not capture pods created under the old one.
pub const SELECTOR_VERSION: &str = "v1";

/// Which controller a worker pod belongs to.
///
/// The component label keeps the selectors of a WorkerSet and a NodeJob
/// with the same name disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    WorkerSet,
    NodeJob,
}

impl OwnerKind {
    /// Value of the component label for this owner kind.
    pub fn component(self) -> &'static str {
        match self {
            OwnerKind::WorkerSet => "workerset",
            OwnerKind::NodeJob => "nodejob",
        }
    }
}

/// Labels stamped on every worker pod of the given owner.
pub fn unit_labels(kind: OwnerKind, owner_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/name".to_string(),
        owner_name.to_string(),
    );
    labels.insert(
        "app.kubernetes.io/component".to_string(),
        kind.component().to_string(),
    );
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        MANAGED_BY.to_string(),
    );
    labels.insert(
        "app.kubernetes.io/version".to_string(),
        SELECTOR_VERSION.to_string(),
    );
    labels
}

/// Label selector string matching exactly the pods of the given owner.
pub fn selector_for(kind: OwnerKind, owner_name: &str) -> String {
    unit_labels(kind, owner_name)
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Owner reference stamped on each created pod so garbage collection
/// cascades when the owner is deleted.
pub fn owner_reference<K>(owner: &K) -> OwnerReference
where
    K: Resource<DynamicType = ()>,
{
    OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name: owner.name_any(),
        uid: owner.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Build a replica worker for a WorkerSet. The name is the owner name
/// plus the supplied suffix; replicas are fungible, so the suffix comes
/// from the injected generator rather than a deterministic key.
pub fn replica_pod(set: &WorkerSet, suffix: &str) -> Pod {
    let owner_name = set.name_any();
    build_pod(
        format!("{owner_name}-{suffix}"),
        set.namespace(),
        unit_labels(OwnerKind::WorkerSet, &owner_name),
        owner_reference(set),
        &set.spec.template,
        None,
    )
}

/// Deterministic name of the worker pod for one node, enabling idempotent
/// re-creation checks by name alone.
pub fn node_pod_name(job_name: &str, node: &str) -> String {
    format!("{job_name}-{node}")
}

/// Build the worker for one node of a NodeJob, pinned to that node.
pub fn node_pod(job: &NodeJob, node: &str) -> Pod {
    let owner_name = job.name_any();
    build_pod(
        node_pod_name(&owner_name, node),
        job.namespace(),
        unit_labels(OwnerKind::NodeJob, &owner_name),
        owner_reference(job),
        &job.spec.template,
        Some(node),
    )
}

fn build_pod(
    name: String,
    namespace: Option<String>,
    selector_labels: BTreeMap<String, String>,
    owner_ref: OwnerReference,
    template: &k8s_openapi::api::core::v1::PodTemplateSpec,
    node: Option<&str>,
) -> Pod {
    // Template labels are preserved; the selector labels win on conflict
    // so the enumerator always finds what the factory built.
    let mut labels = template
        .metadata
        .as_ref()
        .and_then(|m| m.labels.clone())
        .unwrap_or_default();
    labels.extend(selector_labels);

    let mut spec = template.spec.clone();
    if let (Some(spec), Some(node)) = (spec.as_mut(), node) {
        spec.node_name = Some(node.to_string());
    }

    Pod {
        metadata: ObjectMeta {
            name: Some(name),
            namespace,
            labels: Some(labels),
            owner_references: Some(vec![owner_ref]),
            ..Default::default()
        },
        spec,
        ..Default::default()
    }
}
