//! Settings for the engine itself
//!
//! Hierarchical configuration using figment:
//! - Programmatic defaults
//! - strata.yaml overrides
//! - STRATA_* environment overrides
//! - Validation after extraction

pub mod loader;

use serde::{Deserialize, Serialize};

use crate::infrastructure::logging::LogConfig;
use crate::services::coercion::DEFAULT_LIST_SEPARATOR;

pub use loader::{SettingsError, SettingsLoader};

/// Tunables of the canonical provider set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineSettings {
    #[serde(default)]
    pub file: FileSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub secrets: SecretSettings,

    #[serde(default)]
    pub coercion: CoercionSettings,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Config file discovery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSettings {
    /// Environment variable holding an explicit config file path
    #[serde(default = "default_file_env_var")]
    pub env_var: String,

    /// System-wide directory searched after the working directory
    #[serde(default = "default_etc_path")]
    pub etc_path: String,

    /// Only honor the explicit path from `env_var`
    #[serde(default)]
    pub no_folder_check: bool,

    /// Extensions tried in order, without the dot
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Key prefix; the application's document lives at `<prefix>/<app>`
    #[serde(default = "default_remote_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretSettings {
    /// Mount path every secret path is joined onto
    #[serde(default = "default_secret_base_path")]
    pub base_path: String,

    /// Shared secret paths loaded before the application path
    #[serde(default = "default_additional_paths")]
    pub additional_paths: Vec<SecretPath>,
}

/// A shared secret path, optionally nested under `map` in the merged data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretPath {
    #[serde(default)]
    pub map: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoercionSettings {
    #[serde(default = "default_list_separator")]
    pub list_separator: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            env_var: default_file_env_var(),
            etc_path: default_etc_path(),
            no_folder_check: false,
            suffixes: default_suffixes(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            prefix: default_remote_prefix(),
        }
    }
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            base_path: default_secret_base_path(),
            additional_paths: default_additional_paths(),
        }
    }
}

impl Default for CoercionSettings {
    fn default() -> Self {
        Self {
            list_separator: default_list_separator(),
        }
    }
}

fn default_file_env_var() -> String {
    "CONFIG_FILE".to_string()
}

fn default_etc_path() -> String {
    "/etc".to_string()
}

fn default_suffixes() -> Vec<String> {
    ["yml", "yaml", "json", "toml"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_remote_prefix() -> String {
    "config".to_string()
}

fn default_secret_base_path() -> String {
    "secret".to_string()
}

fn default_additional_paths() -> Vec<SecretPath> {
    vec![SecretPath {
        map: String::new(),
        name: "generic".to_string(),
    }]
}

fn default_list_separator() -> String {
    DEFAULT_LIST_SEPARATOR.to_string()
}
