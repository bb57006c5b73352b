use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::config_error;
use super::validate_directory;
use crate::Result;

/// Identity of the fabric tracked by this process
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FabricConfig {
    /// Fabric name, prefix of every persisted key
    ///
    /// Default: `fab1`
    #[serde(default = "default_name")]
    pub name: String,

    /// vnid of the infra overlay vrf; endpoints learned there are dropped
    ///
    /// Default: `16777199`
    #[serde(default = "default_overlay_vnid")]
    pub overlay_vnid: u32,

    /// Log files output directory
    ///
    /// Default: `./logs`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            overlay_vnid: default_overlay_vnid(),
            log_dir: default_log_dir(),
        }
    }
}

impl FabricConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(config_error("fabric name cannot be empty"));
        }
        if self.name.contains(crate::constants::KEY_SEPARATOR) {
            return Err(config_error("fabric name cannot contain NUL"));
        }
        validate_directory(&self.log_dir, "log_dir")
    }
}

fn default_name() -> String {
    "fab1".to_string()
}
fn default_overlay_vnid() -> u32 {
    16777199
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}
