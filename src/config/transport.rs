use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TransportConfig {
    /// Record file replayed by the binary, one tab separated record per line
    #[serde(default)]
    pub replay_path: Option<PathBuf>,
}

impl TransportConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.replay_path {
            if path.as_os_str().is_empty() {
                return Err(config_error("transport.replay_path cannot be empty"));
            }
        }
        Ok(())
    }
}
