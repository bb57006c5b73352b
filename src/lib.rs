//! Endpoint location reconciliation engine.
//!
//! Ingests per-switch endpoint records, merges them into a canonical
//! per-(key, node) history and detects endpoints that moved, remote entries
//! that point at the wrong node, and endpoints learned outside their
//! subnets. [`FabricTask`] wires every component together for one fabric.

mod analysis;
mod cache;
mod config;
mod constants;
mod dependency;
mod dispatcher;
mod errors;
mod fabric;
mod metrics;
mod model;
mod notify;
mod parser;
mod reconcile;
mod remediation;
mod storage;
mod transport;
pub mod utils;
mod watcher;
mod worker;

pub use analysis::*;
pub use cache::*;
pub use config::*;
pub use constants::*;
pub use dependency::*;
pub use dispatcher::*;
pub use errors::*;
pub use fabric::*;
pub use metrics::*;
pub use model::*;
pub use notify::*;
pub use parser::*;
pub use reconcile::*;
pub use remediation::*;
pub use storage::*;
pub use transport::*;
pub use utils::*;
pub use watcher::*;
pub use worker::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
