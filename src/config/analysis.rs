use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use crate::Result;

/// Ledger capacities and anomaly debounce windows
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Rotation cap of a per-node history ledger
    #[serde(default = "default_capacity")]
    pub max_events_per_node: usize,

    /// Rotation cap of an anomaly record
    #[serde(default = "default_capacity")]
    pub max_anomaly_events: usize,

    /// Rotation cap of the per-key endpoint summary
    #[serde(default = "default_capacity")]
    pub max_endpoint_events: usize,

    /// Deletes closer than this to the next placement are ignored by move
    /// analysis
    #[serde(default = "default_transitory_delete_secs")]
    pub transitory_delete_secs: f64,

    #[serde(default = "default_stale_window_ms")]
    pub stale_window_ms: u64,

    /// Stale window used when no node holds the endpoint locally
    #[serde(default = "default_xr_stale_window_ms")]
    pub xr_stale_window_ms: u64,

    #[serde(default = "default_offsubnet_window_ms")]
    pub offsubnet_window_ms: u64,

    /// Longest bounce-to-proxy chain followed by stale analysis
    #[serde(default = "default_max_bounce_hops")]
    pub max_bounce_hops: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_events_per_node: default_capacity(),
            max_anomaly_events: default_capacity(),
            max_endpoint_events: default_capacity(),
            transitory_delete_secs: default_transitory_delete_secs(),
            stale_window_ms: default_stale_window_ms(),
            xr_stale_window_ms: default_xr_stale_window_ms(),
            offsubnet_window_ms: default_offsubnet_window_ms(),
            max_bounce_hops: default_max_bounce_hops(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_events_per_node < 2 {
            return Err(config_error("analysis.max_events_per_node must be at least 2"));
        }
        if self.max_anomaly_events == 0 || self.max_endpoint_events == 0 {
            return Err(config_error(
                "analysis.max_anomaly_events and max_endpoint_events must be > 0",
            ));
        }
        if !(self.transitory_delete_secs >= 0.0) {
            return Err(config_error(format!(
                "analysis.transitory_delete_secs {} must be >= 0",
                self.transitory_delete_secs
            )));
        }
        if self.xr_stale_window_ms < self.stale_window_ms {
            return Err(config_error(format!(
                "analysis.xr_stale_window_ms {} must not be shorter than stale_window_ms {}",
                self.xr_stale_window_ms, self.stale_window_ms
            )));
        }
        Ok(())
    }

    pub fn stale_window(&self) -> Duration {
        Duration::from_millis(self.stale_window_ms)
    }

    pub fn xr_stale_window(&self) -> Duration {
        Duration::from_millis(self.xr_stale_window_ms)
    }

    pub fn offsubnet_window(&self) -> Duration {
        Duration::from_millis(self.offsubnet_window_ms)
    }
}

fn default_capacity() -> usize {
    64
}
fn default_transitory_delete_secs() -> f64 {
    3.0
}
fn default_stale_window_ms() -> u64 {
    30_000
}
fn default_xr_stale_window_ms() -> u64 {
    300_000
}
fn default_offsubnet_window_ms() -> u64 {
    30_000
}
fn default_max_bounce_hops() -> usize {
    2
}
