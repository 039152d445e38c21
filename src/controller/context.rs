//! Shared context for the controllers.
//!
//! The Context holds the state threaded through every reconciliation:
//! the Kubernetes client, the event reporter identity, the optional
//! health state, and the replica-name generator. Nothing here is global;
//! tests construct a Context with a seeded generator.

use std::sync::Arc;

use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};

use crate::controller::naming::{RandomSuffix, SuffixGenerator};
use crate::health::HealthState;

/// Field manager name for the operator
pub const FIELD_MANAGER: &str = "fleet-operator";

/// Shared context for the controllers
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Event reporter identity
    reporter: Reporter,
    /// Optional health state for metrics and readiness
    pub health_state: Option<Arc<HealthState>>,
    /// Generator for replica pod name suffixes
    pub namer: Arc<dyn SuffixGenerator>,
}

impl Context {
    /// Create a new context with an entropy-seeded name generator
    pub fn new(client: Client, health_state: Option<Arc<HealthState>>) -> Self {
        Self::with_namer(client, health_state, Arc::new(RandomSuffix::from_entropy()))
    }

    /// Create a new context with an explicit name generator
    pub fn with_namer(
        client: Client,
        health_state: Option<Arc<HealthState>>,
        namer: Arc<dyn SuffixGenerator>,
    ) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: FIELD_MANAGER.into(),
                instance: std::env::var("POD_NAME").ok(),
            },
            health_state,
            namer,
        }
    }

    /// Create an event recorder for publishing Kubernetes events
    fn recorder(&self) -> Recorder {
        Recorder::new(self.client.clone(), self.reporter.clone())
    }

    /// Publish a normal event for a resource
    pub async fn publish_normal_event<K>(
        &self,
        resource: &K,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) where
        K: Resource<DynamicType = ()>,
    {
        self.publish(resource, EventType::Normal, reason, action, note)
            .await;
    }

    /// Publish a warning event for a resource
    pub async fn publish_warning_event<K>(
        &self,
        resource: &K,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) where
        K: Resource<DynamicType = ()>,
    {
        self.publish(resource, EventType::Warning, reason, action, note)
            .await;
    }

    async fn publish<K>(
        &self,
        resource: &K,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) where
        K: Resource<DynamicType = ()>,
    {
        let recorder = self.recorder();
        let object_ref = resource.object_ref(&());
        if let Err(e) = recorder
            .publish(
                &Event {
                    type_,
                    reason: reason.into(),
                    note,
                    action: action.into(),
                    secondary: None,
                },
                &object_ref,
            )
            .await
        {
            tracing::warn!(reason = %reason, error = %e, "Failed to publish event");
        }
    }
}
