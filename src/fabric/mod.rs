//! Lifecycle of one fabric: context, task supervision and restart, and the
//! handle used to submit requests from outside.

mod context;
mod handle;
mod task;

pub use context::*;
pub use handle::*;
pub use task::*;
