//! Custom Resource Definitions for fleet-operator.
//!
//! - `WorkerSet`: a fixed count of interchangeable worker pods
//! - `NodeJob`: one worker pod per eligible cluster node

mod node_job;
mod worker_set;

pub use node_job::*;
pub use worker_set::*;
