//! Shared driver helpers.
//!
//! Utilities used by both the WorkerSet and NodeJob controllers.

use kube::api::PostParams;
use kube::{Api, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::controller::error::{Error, Result};

/// Fetch a fresh copy of the owner object, so the status write that
/// follows is keyed on the current resourceVersion.
///
/// Returns `None` when the object is gone: external deletion is terminal
/// for the invocation, and owned pods are garbage collected through their
/// owner references.
pub async fn fetch_owner<K>(api: &Api<K>, name: &str) -> Result<Option<K>>
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug,
    <K as Resource>::DynamicType: Default,
{
    match api.get(name).await {
        Ok(obj) => Ok(Some(obj)),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replace the status subresource of `obj`.
///
/// The object must be the freshly fetched copy: the replace is keyed on
/// its resourceVersion, so a racing writer surfaces as a 409 Conflict,
/// which the error policy retries after the diff is recomputed.
pub async fn replace_status<K>(api: &Api<K>, obj: &K) -> Result<K>
where
    K: Resource + Serialize + Clone + DeserializeOwned + std::fmt::Debug,
    <K as Resource>::DynamicType: Default,
{
    let name = obj
        .meta()
        .name
        .as_deref()
        .ok_or_else(|| Error::MissingField("metadata.name".to_string()))?;
    let data = serde_json::to_vec(obj)?;
    Ok(api.replace_status(name, &PostParams::default(), data).await?)
}
