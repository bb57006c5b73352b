//! Bounded recency cache with key, name and not-found indices, and the
//! per-worker fabric lookups built on it.
//!
//! The cache is never a source of truth: a miss or a flush only costs a
//! store lookup.

mod fabric_cache;
mod multi_index;

pub use fabric_cache::*;
pub use multi_index::*;

#[cfg(test)]
mod fabric_cache_test;
