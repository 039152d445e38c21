//! Enumeration of the worker pods belonging to one owner.

use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::ListParams;

use crate::controller::error::Result;
use crate::resources::pod::{OwnerKind, selector_for};

/// List every pod whose labels match the owner's selector set.
///
/// Matching is purely label based. Name prefixes are never consulted, so
/// owners with similar names cannot capture each other's pods. An owner
/// with no pods yields an empty list, not an error.
pub async fn list_owned_pods(
    pods: &Api<Pod>,
    kind: OwnerKind,
    owner_name: &str,
) -> Result<Vec<Pod>> {
    let params = ListParams::default().labels(&selector_for(kind, owner_name));
    Ok(pods.list(&params).await?.items)
}
