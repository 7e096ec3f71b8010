//! Local configuration file provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::ConfigError;
use crate::domain::models::Record;
use crate::infrastructure::codec::decoder_for_path;
use crate::infrastructure::config::FileSettings;
use crate::services::naming::SeparatorNamer;
use crate::services::pipeline::{LoadContext, Provider};

use super::value_map::{apply_map, PATH_SEPARATOR};

/// Reads `<app>.<ext>` from the working directory or the system directory.
///
/// Search order:
/// 1. The path in the configured environment variable (`CONFIG_FILE`)
/// 2. `./<app>.<ext>` for each configured extension
/// 3. `<etc_path>/<app>.<ext>` for each configured extension
#[derive(Debug, Clone, Default)]
pub struct FileProvider {
    settings: FileSettings,
    working_dir: Option<PathBuf>,
}

impl FileProvider {
    pub fn new(settings: FileSettings) -> Self {
        Self {
            settings,
            working_dir: None,
        }
    }

    /// Search `dir` instead of the process working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Locate the config file for `app_name`.
    ///
    /// Only the last `/` segment of the name is used, so `team/svc` looks for
    /// `svc.<ext>`.
    pub fn discover(&self, app_name: &str) -> Result<PathBuf, ConfigError> {
        let app_name = file_stem(app_name);
        if let Some(explicit) = std::env::var_os(&self.settings.env_var).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(explicit));
        }
        if self.settings.no_folder_check {
            return Err(ConfigError::NoConfigFile(format!(
                "{app_name} ({} not set)",
                self.settings.env_var
            )));
        }

        let working_dir = self.working_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let folders = [working_dir.as_path(), Path::new(&self.settings.etc_path)];
        folders
            .iter()
            .flat_map(|folder| {
                self.settings
                    .suffixes
                    .iter()
                    .map(move |suffix| folder.join(format!("{app_name}.{suffix}")))
            })
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ConfigError::NoConfigFile(app_name.to_string()))
    }
}

fn file_stem(app_name: &str) -> &str {
    let trimmed = app_name.trim().trim_matches(|c| c == '/' || c == '\\');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[async_trait]
impl Provider for FileProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self, ctx: &LoadContext<'_>, record: &mut dyn Record) -> Result<(), ConfigError> {
        let path = self.discover(ctx.app_name)?;
        let decoder = decoder_for_path(&path).ok_or_else(|| {
            ConfigError::NoDecoder(
                path.extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
        let map = decoder.decode(&bytes)?;

        tracing::debug!(path = %path.display(), keys = map.len(), "config file loaded");
        apply_map(
            record,
            &map,
            &SeparatorNamer::new("cfg", PATH_SEPARATOR),
            ctx.registry,
        )
    }
}
