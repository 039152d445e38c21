//! Diff and action planning between a declared population and observed pods.
//!
//! One generic planner serves both controllers; the cardinality mode is the
//! only thing that differs between them. Planning is pure: it reads the
//! partitions produced by [`crate::controller::classify`] and emits at most
//! one corrective step, so an invocation that fails half-way leaves the next
//! invocation with a fresh, still-correct diff to compute.

use std::collections::BTreeSet;

use kube::ResourceExt;

use crate::controller::classify::UnitPartitions;

/// An external target a worker is keyed to (one pod per target), together
/// with the deterministic name that pod is created under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Target identity, e.g. a node name.
    pub id: String,
    /// Name the worker pod for this target carries.
    pub unit_name: String,
}

/// How the desired population for an owner is derived.
#[derive(Debug, Clone)]
pub enum Cardinality {
    /// An explicit count of interchangeable replicas.
    Replicas(i32),
    /// Exactly one worker per target. The target list is recomputed from
    /// the external enumeration on every invocation.
    PerTarget(Vec<Target>),
}

/// The corrective step for one reconciliation invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// Create a single replica from the template.
    CreateReplica,
    /// Create one worker per listed target. Each creation is independently
    /// keyed by target identity, so a partial failure simply leaves some
    /// targets unfulfilled for the next invocation to fill.
    CreateForTargets(Vec<Target>),
    /// Delete the named worker.
    Delete(String),
    /// Observed state already matches the declared population.
    None,
}

impl PlannedAction {
    /// Whether applying this action mutates the cluster.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, PlannedAction::None)
    }
}

/// Compute the corrective step for the given cardinality and observations.
pub fn plan(cardinality: &Cardinality, observed: &UnitPartitions<'_>) -> PlannedAction {
    match cardinality {
        Cardinality::Replicas(desired) => plan_replicas(*desired, observed),
        Cardinality::PerTarget(targets) => plan_per_target(targets, observed),
    }
}

/// Mode A: move the active count toward `desired` by exactly one unit.
///
/// Convergence to the target happens over repeated invocations, which
/// bounds the blast radius of any single reconciliation and keeps every
/// step independently retryable.
fn plan_replicas(desired: i32, observed: &UnitPartitions<'_>) -> PlannedAction {
    let desired = desired.max(0);
    let active = observed.active.len() as i32;

    if active > desired {
        // First in enumeration order keeps the victim deterministic.
        match observed.active.first() {
            Some(pod) => PlannedAction::Delete(pod.name_any()),
            None => PlannedAction::None,
        }
    } else if active < desired {
        PlannedAction::CreateReplica
    } else {
        PlannedAction::None
    }
}

/// Mode B: fill every target lacking an active worker, matched by the
/// deterministic per-target name. Once all targets are fulfilled, reap at
/// most one active worker whose target no longer exists.
fn plan_per_target(targets: &[Target], observed: &UnitPartitions<'_>) -> PlannedAction {
    let have: BTreeSet<String> = observed.active.iter().map(|p| p.name_any()).collect();

    let missing: Vec<Target> = targets
        .iter()
        .filter(|t| !have.contains(&t.unit_name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return PlannedAction::CreateForTargets(missing);
    }

    let wanted: BTreeSet<&str> = targets.iter().map(|t| t.unit_name.as_str()).collect();
    if let Some(orphan) = observed
        .active
        .iter()
        .find(|p| !wanted.contains(p.name_any().as_str()))
    {
        return PlannedAction::Delete(orphan.name_any());
    }

    PlannedAction::None
}
