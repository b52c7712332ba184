//! Config file loading for the control plane.
//!
//! The file path comes from `OUTREACH_CONFIG_PATH`. Values from the file are
//! layered under environment overrides of the form
//! `OUTREACH__<SECTION>__<FIELD>` (e.g. `OUTREACH__RETRY__MAX_RETRIES=5`).

use std::path::{Path, PathBuf};

use super::{ConfigurationError, ControlPlaneConfig};

/// Environment variable naming the config file to load
pub const CONFIG_PATH_ENV: &str = "OUTREACH_CONFIG_PATH";

const ENV_OVERRIDE_PREFIX: &str = "OUTREACH";
const ENV_OVERRIDE_SEPARATOR: &str = "__";

/// Loaded and validated control plane configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ControlPlaneConfig,
    source_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load from the path in `OUTREACH_CONFIG_PATH`.
    pub fn load() -> Result<Self, ConfigurationError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_err(|_| ConfigurationError::MissingPath(CONFIG_PATH_ENV.to_string()))?;
        Self::load_from_path(path)
    }

    /// Load a TOML file, apply environment overrides, and validate.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        if !path.is_file() {
            return Err(ConfigurationError::load(&path_str, "file not found"));
        }

        let config: ControlPlaneConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_OVERRIDE_PREFIX)
                    .prefix_separator(ENV_OVERRIDE_SEPARATOR)
                    .separator(ENV_OVERRIDE_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .and_then(|raw| raw.try_deserialize())
            .map_err(|e| ConfigurationError::load(&path_str, e.to_string()))?;

        config.validate()?;

        tracing::info!(path = %path_str, "Loaded control plane configuration");

        Ok(Self {
            config,
            source_path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an in-memory configuration after validating it.
    pub fn from_config(config: ControlPlaneConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            config,
            source_path: None,
        })
    }

    /// The loaded configuration
    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }

    /// File the configuration was read from, if any
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Consume the manager, returning the configuration
    pub fn into_config(self) -> ControlPlaneConfig {
        self.config
    }
}
