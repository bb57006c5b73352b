//! Propagation of configuration changes into derived lookup tables.
//!
//! One [`DependencyRule`] per configuration class. Every raw object is first
//! mirrored into its `Mo` table; the rule then recomputes the records derived
//! from it and from its dependents. Forward references resolve to the
//! [`UNRESOLVED`](crate::UNRESOLVED) sentinel and deletes of a parent reset,
//! never delete, the dependent references.

mod context;
mod graph;
mod rules;

pub use context::*;
pub use graph::*;
