//! Persistence layer: per-key history ledgers, anomaly records, endpoint
//! summaries and the fabric object tables.
//!
//! The store is the only mutable state shared across tasks. Every mutation
//! is a single read-modify-write on one record (append + cap + increment),
//! so concurrent writers to different keys never interfere.

mod mem_store;
mod sled_store;
mod traits;

pub use mem_store::*;
pub use sled_store::*;
pub use traits::*;


use std::sync::Arc;

use crate::Result;
use crate::StorageBackend;
use crate::StorageConfig;

/// Store handles shared by every component of a fabric task.
#[derive(Clone)]
pub struct Stores {
    pub history: Arc<dyn HistoryStore>,
    pub objects: Arc<dyn ObjectStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemStore::new());
        Self {
            history: store.clone(),
            objects: store,
        }
    }

    /// Opens the configured backend.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Mem => Ok(Self::in_memory()),
            StorageBackend::Sled => {
                let store = Arc::new(SledStore::open(&config.db_root_dir)?);
                Ok(Self {
                    history: store.clone(),
                    objects: store,
                })
            }
        }
    }
}
