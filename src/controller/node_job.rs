//! Reconciliation loop for NodeJob.
//!
//! The target population is one worker pod per eligible node, derived
//! from a fresh node list on every invocation and never cached on the
//! object. Fan-out is a single batch create keyed per node, so a partial
//! failure leaves some nodes unfulfilled for the next invocation to fill.

use std::sync::Arc;
use std::time::{Duration, Instant};

use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use tracing::{debug, error, info, warn};

use crate::controller::classify::classify;
use crate::controller::common::{fetch_owner, replace_status};
use crate::controller::context::Context;
use crate::controller::enumerate::list_owned_pods;
use crate::controller::error::Error;
use crate::controller::plan::{Cardinality, PlannedAction, Target, plan};
use crate::controller::project::node_job_status;
use crate::crd::NodeJob;
use crate::resources::pod::{OwnerKind, node_pod, node_pod_name};

/// Reconcile a NodeJob
///
/// Enumerates eligible nodes and owned pods, projects status, and fills
/// every node that lacks an active worker. Workers whose node left the
/// cluster are reaped one per invocation.
pub async fn reconcile(obj: Arc<NodeJob>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start_time = Instant::now();
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());

    debug!(name = %name, namespace = %namespace, "Reconciling NodeJob");

    let api: Api<NodeJob> = Api::namespaced(ctx.client.clone(), &namespace);
    let pods_api: Api<Pod> = Api::namespaced(ctx.client.clone(), &namespace);

    let Some(mut job) = fetch_owner(&api, &name).await? else {
        debug!(name = %name, "NodeJob no longer exists, owned pods are garbage collected");
        return Ok(Action::await_change());
    };

    let uid = job
        .uid()
        .ok_or_else(|| Error::MissingField("metadata.uid".to_string()))?;

    let targets = eligible_targets(&ctx, &job, &name).await?;

    let pods = list_owned_pods(&pods_api, OwnerKind::NodeJob, &name).await?;
    let observed = classify(&pods, &uid);

    let status = node_job_status(targets.len() as i32, &observed);
    if job.status.as_ref() != Some(&status) {
        debug!(
            name = %name,
            desired = status.desired_number_scheduled,
            current = status.current_number_scheduled,
            "Updating NodeJob status"
        );
        job.status = Some(status);
        replace_status(&api, &job).await?;
    }

    let desired = targets.len();
    let action = plan(&Cardinality::PerTarget(targets), &observed);
    let acted = action.is_mutation();

    match &action {
        PlannedAction::CreateForTargets(missing) => {
            info!(
                name = %name,
                nodes = missing.len(),
                "Fanning out worker pods to unfulfilled nodes"
            );
            // Any single failure aborts the rest of the batch; the next
            // invocation recomputes the diff and fills what is still
            // missing.
            for target in missing {
                let pod = node_pod(&job, &target.id);
                debug!(name = %name, node = %target.id, pod = %pod.name_any(), "Creating worker pod");
                pods_api.create(&PostParams::default(), &pod).await?;
            }
            ctx.publish_normal_event(
                &job,
                "FannedOut",
                "CreateWorkers",
                Some(format!("Created worker pods on {} node(s)", missing.len())),
            )
            .await;
        }
        PlannedAction::Delete(victim) => {
            info!(name = %name, pod = %victim, "Reaping worker pod whose node left the cluster");
            pods_api.delete(victim, &DeleteParams::default()).await?;
            ctx.publish_normal_event(
                &job,
                "Reaped",
                "DeleteWorker",
                Some(format!("Deleted worker pod {victim}")),
            )
            .await;
        }
        // Replica creation belongs to WorkerSet; the per-target planner
        // never emits it.
        PlannedAction::CreateReplica | PlannedAction::None => {}
    }

    if let Some(ref health_state) = ctx.health_state {
        let duration = start_time.elapsed().as_secs_f64();
        health_state
            .metrics
            .record_reconcile(&namespace, &name, duration);
        health_state.metrics.set_fleet_size(
            &namespace,
            &name,
            desired as i64,
            observed.active.len() as i64,
        );
    }

    if acted {
        Ok(Action::requeue(Duration::ZERO))
    } else {
        Ok(Action::await_change())
    }
}

/// Compute the target set: one entry per node matching the job's node
/// selector, with the deterministic worker name for that node.
async fn eligible_targets(ctx: &Context, job: &NodeJob, name: &str) -> Result<Vec<Target>, Error> {
    let nodes: Api<Node> = Api::all(ctx.client.clone());

    let mut params = ListParams::default();
    if !job.spec.node_selector.is_empty() {
        let selector = job
            .spec
            .node_selector
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        params = params.labels(&selector);
    }

    let node_list = nodes.list(&params).await?;
    Ok(node_list
        .items
        .iter()
        .filter_map(|n| n.metadata.name.as_deref())
        .map(|node| Target {
            id: node.to_string(),
            unit_name: node_pod_name(name, node),
        })
        .collect())
}

/// Error policy for the NodeJob controller
pub fn error_policy(obj: Arc<NodeJob>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());

    if let Some(ref health_state) = ctx.health_state {
        health_state.metrics.record_error(&namespace, &name);
    }

    if error.is_not_found() {
        debug!(name = %name, "NodeJob not found (likely deleted)");
        return Action::await_change();
    }

    if error.is_retryable() {
        warn!(name = %name, error = %error, "Retryable error, will retry");
        Action::requeue(error.requeue_after())
    } else {
        error!(name = %name, error = %error, "Non-retryable error");
        Action::requeue(error.requeue_after())
    }
}
