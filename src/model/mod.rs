//! Domain model shared by every stage of the pipeline.
//!
//! Everything here is plain data: keys, events, ledgers, anomaly records,
//! configuration objects and the jobs exchanged between tasks. Values are
//! immutable once constructed; successive versions are compared, never
//! mutated in place.

mod anomaly;
mod event;
mod flags;
mod job;
mod key;
mod ledger;
mod objects;

pub use anomaly::*;
pub use event::*;
pub use flags::*;
pub use job::*;
pub use key::*;
pub use ledger::*;
pub use objects::*;

#[cfg(test)]
mod ledger_test;
