//! Configuration management for the endpoint tracker.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
mod analysis;
mod cache;
mod dispatcher;
mod fabric;
mod monitoring;
mod remediation;
mod storage;
mod transport;
pub use analysis::*;
pub use cache::*;
pub use dispatcher::*;
pub use fabric::*;
pub use monitoring::*;
pub use remediation::*;
pub use storage::*;
pub use transport::*;


use std::env;
use std::fmt::Debug;
use std::path::Path;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Prefix of environment overrides, e.g. `EPT__DISPATCHER__WORKERS=8`
const ENV_PREFIX: &str = "EPT";

/// Main configuration container
///
/// Combines all section configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Fabric identity
    #[serde(default)]
    pub fabric: FabricConfig,
    /// Worker pool sizing, backlog caps and liveness
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Ledger capacities and debounce windows
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Automatic clearing of confirmed anomalies
    #[serde(default)]
    pub remediation: RemediationConfig,
    /// Per-worker lookup cache
    #[serde(default)]
    pub cache: CacheConfig,
    /// History and object store backend
    #[serde(default)]
    pub storage: StorageConfig,
    /// Metrics and monitoring settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Event source used by the binary
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Debug for Settings {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("fabric", &self.fabric)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Settings {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in order, later ones override earlier ones:
    /// 1. Type defaults
    /// 2. Configuration file from `CONFIG_PATH` (if set)
    /// 3. Environment variables with `EPT__` prefix
    ///
    /// # Note
    /// Validation is deferred so callers can layer more files with
    /// `with_override_config()`. Callers MUST call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("EPT__FABRIC__NAME", "fab1");
    /// let settings = Settings::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from file without validation.
    ///
    /// Environment variables are re-applied on top so they keep the highest
    /// priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.fabric.validate()?;
        self.dispatcher.validate()?;
        self.analysis.validate()?;
        self.remediation.validate()?;
        self.cache.validate()?;
        self.storage.validate()?;
        self.monitoring.validate()?;
        self.transport.validate()?;
        Ok(self)
    }
}

pub(super) fn config_error(msg: impl Into<String>) -> Error {
    Error::Config(ConfigError::Message(msg.into()))
}

/// Ensures directory path is valid and writable
pub(super) fn validate_directory(
    path: &Path,
    name: &str,
) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(config_error(format!("{name} path cannot be empty")));
    }

    #[cfg(not(test))]
    {
        use std::fs;
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| {
                config_error(format!(
                    "Failed to create {} directory at {}: {}",
                    name,
                    path.display(),
                    e
                ))
            })?;
        }

        let test_file = path.join(".permission_test");
        fs::write(&test_file, b"test").map_err(|e| {
            config_error(format!(
                "No write permission in {} directory {}: {}",
                name,
                path.display(),
                e
            ))
        })?;
        fs::remove_file(&test_file).ok();
    }

    Ok(())
}
