//! Controller module for fleet-operator.
//!
//! Contains the generic convergence core (enumeration, classification,
//! planning, status projection) and the two thin reconcilers built on it:
//! - WorkerSet controller (explicit replica count)
//! - NodeJob controller (one worker per node)

// Shared modules
pub mod classify;
pub mod common;
pub mod context;
pub mod enumerate;
pub mod error;
pub mod naming;
pub mod plan;
pub mod project;

// Reconcilers
pub mod node_job;
pub mod worker_set;
