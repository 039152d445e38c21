//! fleet-operator library crate
//!
//! This module exports the controllers, CRD definitions, and worker pod
//! generators.

pub mod controller;
pub mod crd;
pub mod health;
pub mod resources;

pub use health::HealthState;

use std::sync::Arc;

use futures::{SinkExt, Stream, StreamExt};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::runtime::controller::Action;
use kube::runtime::reflector::{Lookup, ObjectRef};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::{Controller, WatchStreamExt, metadata_watcher, predicates, reflector, watcher};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use controller::context::Context;
use controller::error::Error;
use crd::{NodeJob, WorkerSet};

/// Create namespaced or cluster-wide API based on scope
pub fn scoped_api<T>(client: Client, namespace: Option<&str>) -> Api<T>
where
    T: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <T as Resource>::DynamicType: Default,
    T: Clone + DeserializeOwned + std::fmt::Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Create the default watcher configuration for all controllers.
///
/// This ensures consistent behavior across all controllers:
/// - `any_semantic()`: More reliable resource discovery in test environments
fn default_watcher_config() -> WatcherConfig {
    WatcherConfig::default().any_semantic()
}

/// Create a filtered stream for a resource type with standard optimizations.
///
/// This creates a reflector-backed stream that:
/// - Maintains an in-memory cache via reflector
/// - Uses automatic retry with exponential backoff on errors
/// - Converts watch events to objects (Added/Modified only)
/// - Filters out status-only updates via generation predicate
///
/// Returns the reflector store (for cache lookups) and the filtered stream.
fn create_filtered_stream<K>(
    api: Api<K>,
    watcher_config: WatcherConfig,
) -> (
    reflector::Store<K>,
    impl Stream<Item = Result<K, watcher::Error>>,
)
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug + Send + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let (reader, writer) = reflector::store();
    let stream = reflector(writer, watcher(api, watcher_config))
        .default_backoff()
        .applied_objects()
        .predicate_filter(predicates::generation);
    (reader, stream)
}

/// Log the outcome of one reconciliation delivered by a controller stream.
///
/// ObjectNotFound/NotFound errors are expected after deletion, when watch
/// events for related objects still trigger reconciliation for a deleted
/// owner; those are demoted to debug.
fn log_reconcile_result<K>(
    kind: &str,
    result: &Result<(ObjectRef<K>, Action), kube::runtime::controller::Error<Error, watcher::Error>>,
) where
    K: Lookup,
    K::DynamicType: std::fmt::Debug,
{
    match result {
        Ok((obj, _action)) => {
            debug!(kind = kind, name = %obj.name, "Reconciled");
        }
        Err(e) => {
            let is_not_found = match e {
                kube::runtime::controller::Error::ObjectNotFound(_) => true,
                kube::runtime::controller::Error::ReconcilerFailed(err, _) => err.is_not_found(),
                _ => false,
            };
            if is_not_found {
                debug!(kind = kind, "Object no longer exists (likely deleted): {:?}", e);
            } else {
                error!(kind = kind, "Reconciliation error: {:?}", e);
            }
        }
    }
}

/// Run both controllers (cluster-wide).
///
/// Watches WorkerSet and NodeJob resources and converges their worker
/// pods. Can be called from main.rs or spawned as a background task
/// during integration tests.
///
/// If health_state is provided, metrics will be recorded for reconciliations.
pub async fn run_controllers(client: Client, health_state: Option<Arc<HealthState>>) {
    run_controllers_scoped(client, health_state, None).await
}

/// Run both controllers with optional namespace scoping.
///
/// When `namespace` is `Some(ns)`, only watches resources in that namespace.
/// When `namespace` is `None`, watches resources cluster-wide.
///
/// Use the scoped version for integration tests to enable parallel test execution.
pub async fn run_controllers_scoped(
    client: Client,
    health_state: Option<Arc<HealthState>>,
    namespace: Option<&str>,
) {
    let scope_msg = namespace.unwrap_or("cluster-wide");
    info!("Starting controllers for WorkerSet and NodeJob resources (scope: {})", scope_msg);

    // Mark as ready once we start the controllers
    if let Some(ref state) = health_state {
        state.set_ready(true).await;
    }

    let ctx = Arc::new(Context::new(client.clone(), health_state));

    futures::join!(
        run_worker_set_controller(client.clone(), ctx.clone(), namespace),
        run_node_job_controller(client, ctx, namespace),
    );

    // This should never complete in normal operation
    error!("Controller streams ended unexpectedly");
}

async fn run_worker_set_controller(client: Client, ctx: Arc<Context>, namespace: Option<&str>) {
    let worker_sets: Api<WorkerSet> = scoped_api(client.clone(), namespace);
    let pods: Api<Pod> = scoped_api(client, namespace);

    let watcher_config = default_watcher_config();
    let (reader, stream) = create_filtered_stream(worker_sets, watcher_config.clone());

    Controller::for_stream(stream, reader)
        .owns(pods, watcher_config)
        .run(
            controller::worker_set::reconcile,
            controller::worker_set::error_policy,
            ctx,
        )
        .for_each(|result| async move {
            log_reconcile_result("WorkerSet", &result);
        })
        .await;
}

async fn run_node_job_controller(client: Client, ctx: Arc<Context>, namespace: Option<&str>) {
    let node_jobs: Api<NodeJob> = scoped_api(client.clone(), namespace);
    let pods: Api<Pod> = scoped_api(client.clone(), namespace);
    let nodes: Api<Node> = Api::all(client);

    let watcher_config = default_watcher_config();
    let (reader, stream) = create_filtered_stream(node_jobs, watcher_config.clone());

    // Nodes are not owned objects, so node churn would otherwise go
    // unnoticed until the next owner change. A metadata watch on nodes
    // re-triggers every NodeJob whenever the target set may have moved.
    let node_churn_source = metadata_watcher(nodes, default_watcher_config())
        .touched_objects()
        .filter_map(|event| async move { event.ok() })
        .map(|_| ());

    // `reconcile_all_on` requires a `Send + Sync` trigger stream, but the
    // watcher-backed stream is only `Send`. Forward its `()` triggers through
    // an mpsc channel, whose `Receiver` is `Send + Sync`, without changing the
    // churn-triggers-reconcile behavior.
    let (mut node_churn_tx, node_churn) = futures::channel::mpsc::channel::<()>(16);
    tokio::spawn(async move {
        let mut node_churn_source = Box::pin(node_churn_source);
        while let Some(()) = node_churn_source.next().await {
            if node_churn_tx.send(()).await.is_err() {
                break;
            }
        }
    });

    Controller::for_stream(stream, reader)
        .owns(pods, watcher_config)
        .reconcile_all_on(node_churn)
        .run(
            controller::node_job::reconcile,
            controller::node_job::error_policy,
            ctx,
        )
        .for_each(|result| async move {
            log_reconcile_result("NodeJob", &result);
        })
        .await;
}
