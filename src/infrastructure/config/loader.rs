use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use super::EngineSettings;

/// Settings validation errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("File env var name cannot be empty")]
    EmptyFileEnvVar,

    #[error("At least one config file suffix is required")]
    NoFileSuffixes,

    #[error("Invalid file suffix {0:?}: must be non-empty and must not start with '.'")]
    InvalidFileSuffix(String),

    #[error("List separator cannot be empty")]
    EmptyListSeparator,

    #[error("Secret path name cannot be empty")]
    EmptySecretPath,
}

/// Loader for [`EngineSettings`] with hierarchical merging
pub struct SettingsLoader;

impl SettingsLoader {
    pub const FILE: &'static str = "strata.yaml";
    pub const ENV_PREFIX: &'static str = "STRATA_";

    /// Load settings
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. ./strata.yaml (optional)
    /// 3. Environment variables (STRATA_* prefix, `__` for nesting)
    pub fn load() -> Result<EngineSettings> {
        let settings: EngineSettings = Figment::new()
            .merge(Serialized::defaults(EngineSettings::default()))
            .merge(Yaml::file(Self::FILE))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract engine settings from figment")?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Load settings from a specific file, without environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<EngineSettings> {
        let settings: EngineSettings = Figment::new()
            .merge(Serialized::defaults(EngineSettings::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load engine settings from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    pub fn validate(settings: &EngineSettings) -> Result<(), SettingsError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&settings.logging.level.to_lowercase().as_str()) {
            return Err(SettingsError::InvalidLogLevel(settings.logging.level.clone()));
        }

        if settings.file.env_var.is_empty() {
            return Err(SettingsError::EmptyFileEnvVar);
        }

        if settings.file.suffixes.is_empty() {
            return Err(SettingsError::NoFileSuffixes);
        }
        if let Some(bad) = settings
            .file
            .suffixes
            .iter()
            .find(|s| s.is_empty() || s.starts_with('.'))
        {
            return Err(SettingsError::InvalidFileSuffix(bad.clone()));
        }

        if settings.coercion.list_separator.is_empty() {
            return Err(SettingsError::EmptyListSeparator);
        }

        if settings
            .secrets
            .additional_paths
            .iter()
            .any(|p| p.name.is_empty())
        {
            return Err(SettingsError::EmptySecretPath);
        }

        Ok(())
    }
}
