//! Topology-watch task: debounces unconfirmed stale and off-subnet findings
//! and rebuilds keys of nodes that change state.

mod watch_table;
mod watcher;

pub use watch_table::*;
pub use watcher::*;
