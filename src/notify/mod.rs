//! Structured anomaly notifications and their delivery channel.

mod sink;

pub use sink::*;
