//! Automatic clearing of confirmed stale and off-subnet entries.

mod executor;

pub use executor::*;
