//! Pool workers and the priority worker.
//!
//! A pool worker owns a [`FabricCache`](crate::FabricCache) and processes the
//! jobs of the keys bound to it, one at a time and in order. The priority
//! worker applies configuration changes and broadcasts the resulting cache
//! flushes to every pool worker.

mod priority;
mod worker;

pub use priority::*;
pub use worker::*;
