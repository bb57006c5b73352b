//! Merge of endpoint events into the per-node history ledgers.
//!
//! Transport events arrive out of order, partially populated and
//! duplicated. The reconciler compares each one against the latest ledger
//! entry for its `(key, node)` and appends only genuine placement changes.

mod merge;
mod refresh;

pub use merge::*;
pub use refresh::*;
