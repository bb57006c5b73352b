use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Entries kept per cache collection before the coldest is evicted
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(config_error("cache.capacity must be > 0"));
        }
        Ok(())
    }
}

fn default_capacity() -> usize {
    512
}
