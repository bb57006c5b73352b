use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RemediationConfig {
    /// Clear confirmed stale entries on the offending node
    #[serde(default)]
    pub auto_clear_stale: bool,

    /// Clear confirmed off-subnet entries on the offending node
    #[serde(default)]
    pub auto_clear_offsubnet: bool,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            auto_clear_stale: false,
            auto_clear_offsubnet: false,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RemediationConfig {
    pub fn validate(&self) -> Result<()> {
        if (self.auto_clear_stale || self.auto_clear_offsubnet) && self.timeout_ms == 0 {
            return Err(config_error(
                "remediation.timeout_ms must be > 0 when auto clear is enabled",
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}
