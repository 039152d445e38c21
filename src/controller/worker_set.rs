//! Reconciliation loop for WorkerSet.
//!
//! One invocation drives the observed pod population one step toward
//! `spec.replicas` and refreshes the status. Convergence across a larger
//! gap happens over repeated invocations via the immediate-requeue
//! directive returned after every applied action.

use std::sync::Arc;
use std::time::{Duration, Instant};

use k8s_openapi::api::core::v1::Pod;
use kube::api::{DeleteParams, PostParams};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use tracing::{debug, error, info, warn};

use crate::controller::classify::classify;
use crate::controller::common::{fetch_owner, replace_status};
use crate::controller::context::Context;
use crate::controller::enumerate::list_owned_pods;
use crate::controller::error::Error;
use crate::controller::plan::{Cardinality, PlannedAction, plan};
use crate::controller::project::worker_set_status;
use crate::crd::WorkerSet;
use crate::resources::pod::{OwnerKind, replica_pod};

/// Reconcile a WorkerSet
///
/// This is the main reconciliation function called by the controller.
/// It enumerates the owned pods, projects status, and applies at most
/// one corrective action.
pub async fn reconcile(obj: Arc<WorkerSet>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start_time = Instant::now();
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());

    debug!(name = %name, namespace = %namespace, "Reconciling WorkerSet");

    let api: Api<WorkerSet> = Api::namespaced(ctx.client.clone(), &namespace);
    let pods_api: Api<Pod> = Api::namespaced(ctx.client.clone(), &namespace);

    // Work on a fresh copy so the status write below is keyed on the
    // current resourceVersion.
    let Some(mut set) = fetch_owner(&api, &name).await? else {
        debug!(name = %name, "WorkerSet no longer exists, owned pods are garbage collected");
        return Ok(Action::await_change());
    };

    let uid = set
        .uid()
        .ok_or_else(|| Error::MissingField("metadata.uid".to_string()))?;

    let pods = list_owned_pods(&pods_api, OwnerKind::WorkerSet, &name).await?;
    let observed = classify(&pods, &uid);

    let status = worker_set_status(set.status.as_ref(), &observed, jiff::Timestamp::now());
    if set.status.as_ref() != Some(&status) {
        debug!(
            name = %name,
            active = status.active,
            succeeded = status.succeeded,
            failed = status.failed,
            "Updating WorkerSet status"
        );
        set.status = Some(status);
        replace_status(&api, &set).await?;
    }

    let desired = set.spec.replicas;
    let action = plan(&Cardinality::Replicas(desired), &observed);
    let acted = action.is_mutation();

    match &action {
        PlannedAction::CreateReplica => {
            let pod = replica_pod(&set, &ctx.namer.suffix());
            info!(
                name = %name,
                pod = %pod.name_any(),
                desired = desired,
                active = observed.active.len(),
                "Scaling up, creating a worker pod"
            );
            pods_api.create(&PostParams::default(), &pod).await?;
            ctx.publish_normal_event(
                &set,
                "ScalingUp",
                "CreateWorker",
                Some(format!("Created worker pod {}", pod.name_any())),
            )
            .await;
        }
        PlannedAction::Delete(victim) => {
            info!(
                name = %name,
                pod = %victim,
                desired = desired,
                active = observed.active.len(),
                "Scaling down, deleting a worker pod"
            );
            pods_api.delete(victim, &DeleteParams::default()).await?;
            ctx.publish_normal_event(
                &set,
                "ScalingDown",
                "DeleteWorker",
                Some(format!("Deleted worker pod {victim}")),
            )
            .await;
        }
        PlannedAction::CreateForTargets(_) | PlannedAction::None => {}
    }

    if let Some(ref health_state) = ctx.health_state {
        let duration = start_time.elapsed().as_secs_f64();
        health_state
            .metrics
            .record_reconcile(&namespace, &name, duration);
        health_state.metrics.set_fleet_size(
            &namespace,
            &name,
            i64::from(desired),
            observed.active.len() as i64,
        );
    }

    if acted {
        // More convergence steps may remain; come back immediately.
        Ok(Action::requeue(Duration::ZERO))
    } else {
        // Nothing to do; the watch layer re-invokes on the next change.
        Ok(Action::await_change())
    }
}

/// Error policy for the WorkerSet controller
pub fn error_policy(obj: Arc<WorkerSet>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());

    if let Some(ref health_state) = ctx.health_state {
        health_state.metrics.record_error(&namespace, &name);
    }

    if error.is_not_found() {
        debug!(name = %name, "WorkerSet not found (likely deleted)");
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
