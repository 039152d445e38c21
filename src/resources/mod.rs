//! Resource generation module.
//!
//! Builds the worker pods owned by WorkerSet and NodeJob objects, and
//! defines the label scheme their enumeration selectors are derived from.

pub mod pod;

pub use pod::{OwnerKind, owner_reference, selector_for, unit_labels};
