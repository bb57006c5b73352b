use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use crate::Result;

/// Worker pool sizing, backlog bounds and liveness supervision
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatcherConfig {
    /// Number of endpoint workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pool-wide outstanding job limit; reaching it restarts the fabric task
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,

    /// Outstanding jobs allowed for a single key
    #[serde(default = "default_max_key_count")]
    pub max_key_count: usize,

    /// Rejected jobs tolerated per key before its session is dropped
    #[serde(default = "default_key_failure_threshold")]
    pub key_failure_threshold: u32,

    #[serde(default = "default_hello_interval_ms")]
    pub hello_interval_ms: u64,

    /// A task is dead after `hello_interval_ms * hello_miss_multiplier`
    #[serde(default = "default_hello_miss_multiplier")]
    pub hello_miss_multiplier: u32,

    /// Delay before restarting a failed fabric task
    #[serde(default = "default_restart_backoff_ms")]
    pub restart_backoff_ms: u64,

    /// Deadline of an out-of-band refresh fetch
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_jobs: default_max_jobs(),
            max_key_count: default_max_key_count(),
            key_failure_threshold: default_key_failure_threshold(),
            hello_interval_ms: default_hello_interval_ms(),
            hello_miss_multiplier: default_hello_miss_multiplier(),
            restart_backoff_ms: default_restart_backoff_ms(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(config_error("dispatcher.workers must be at least 1"));
        }
        if self.max_key_count == 0 {
            return Err(config_error("dispatcher.max_key_count must be at least 1"));
        }
        if self.max_jobs < self.max_key_count {
            return Err(config_error(format!(
                "dispatcher.max_jobs {} must not be lower than max_key_count {}",
                self.max_jobs, self.max_key_count
            )));
        }
        if self.hello_interval_ms == 0 || self.hello_miss_multiplier < 2 {
            return Err(config_error(
                "dispatcher.hello_interval_ms must be > 0 and hello_miss_multiplier >= 2",
            ));
        }
        if self.refresh_timeout_ms == 0 {
            return Err(config_error("dispatcher.refresh_timeout_ms must be > 0"));
        }
        Ok(())
    }

    pub fn hello_interval(&self) -> Duration {
        Duration::from_millis(self.hello_interval_ms)
    }

    pub fn hello_timeout(&self) -> Duration {
        self.hello_interval() * self.hello_miss_multiplier
    }

    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(self.restart_backoff_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

fn default_workers() -> usize {
    4
}
fn default_max_jobs() -> usize {
    65536
}
fn default_max_key_count() -> usize {
    64
}
fn default_key_failure_threshold() -> u32 {
    3
}
fn default_hello_interval_ms() -> u64 {
    5_000
}
fn default_hello_miss_multiplier() -> u32 {
    3
}
fn default_restart_backoff_ms() -> u64 {
    1_000
}
fn default_refresh_timeout_ms() -> u64 {
    10_000
}
