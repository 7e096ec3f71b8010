//! Secret store provider.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::domain::errors::ConfigError;
use crate::domain::models::Record;
use crate::domain::ports::{SecretStore, ValueMap};
use crate::infrastructure::config::{SecretPath, SecretSettings};
use crate::services::naming::SeparatorNamer;
use crate::services::pipeline::{LoadContext, Provider};

use super::value_map::{apply_map, PATH_SEPARATOR};

pub const SECRET_KEY: &str = "secret";

/// Loads secrets for the application from a hierarchical secret store.
///
/// Shared paths are loaded first, then `<base>/<app>`; later data wins.
/// A path ending in `/` is listed and its children read; any other path is
/// read first and listed only when nothing is stored there. Child reads are
/// lenient: a failing child is logged and skipped.
pub struct SecretProvider {
    client: Option<Arc<dyn SecretStore>>,
    base_path: String,
    additional_paths: Vec<SecretPath>,
}

impl SecretProvider {
    pub fn new(client: Option<Arc<dyn SecretStore>>, settings: &SecretSettings) -> Self {
        Self {
            client,
            base_path: settings.base_path.clone(),
            additional_paths: settings.additional_paths.clone(),
        }
    }

    fn path_for(&self, name: &str) -> String {
        let base = self.base_path.trim_end_matches('/');
        if base.is_empty() {
            name.to_string()
        } else {
            format!("{base}/{name}")
        }
    }

    /// Everything stored at or below `path`.
    pub async fn collect(&self, client: &dyn SecretStore, path: &str) -> Result<ValueMap, ConfigError> {
        collect_path(client, path.to_string(), true).await
    }
}

fn collect_path(
    client: &dyn SecretStore,
    path: String,
    strict: bool,
) -> BoxFuture<'_, Result<ValueMap, ConfigError>> {
    async move {
        if path.ends_with('/') {
            if let Some(children) = list(client, &path).await {
                return collect_children(client, &path, children).await;
            }
            let leaf_path = path.trim_end_matches('/');
            return Ok(read(client, leaf_path, strict).await?.unwrap_or_default());
        }

        if let Some(data) = read(client, &path, strict).await? {
            return Ok(data);
        }
        let dir = format!("{path}/");
        match list(client, &dir).await {
            Some(children) => collect_children(client, &dir, children).await,
            None => Ok(ValueMap::new()),
        }
    }
    .boxed()
}

async fn collect_children(
    client: &dyn SecretStore,
    dir: &str,
    children: Vec<String>,
) -> Result<ValueMap, ConfigError> {
    let mut out = ValueMap::new();
    for child in children {
        let data = collect_path(client, format!("{dir}{child}"), false).await?;
        let name = child.trim_end_matches('/').to_string();
        if !data.is_empty() {
            out.insert(name, Value::Object(data));
        }
    }
    Ok(out)
}

async fn read(client: &dyn SecretStore, path: &str, strict: bool) -> Result<Option<ValueMap>, ConfigError> {
    match client.read(path).await {
        Ok(data) => Ok(data),
        Err(source) if strict => Err(ConfigError::Secret {
            path: path.to_string(),
            source,
        }),
        Err(err) => {
            tracing::warn!(path, error = %err, "secret read failed, skipping");
            Ok(None)
        }
    }
}

async fn list(client: &dyn SecretStore, path: &str) -> Option<Vec<String>> {
    match client.list(path).await {
        Ok(children) => children.filter(|c| !c.is_empty()),
        Err(err) => {
            tracing::warn!(path, error = %err, "secret list failed");
            None
        }
    }
}

/// Merge `source` into `target`, descending into maps present on both sides.
pub fn deep_merge(target: &mut ValueMap, source: ValueMap) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => deep_merge(existing, incoming),
            (Some(slot), value) => *slot = value,
            (None, value) => {
                target.insert(key, value);
            }
        }
    }
}

impl std::fmt::Debug for SecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretProvider")
            .field("has_client", &self.client.is_some())
            .field("base_path", &self.base_path)
            .field("additional_paths", &self.additional_paths)
            .finish()
    }
}

#[async_trait]
impl Provider for SecretProvider {
    fn name(&self) -> &'static str {
        "secrets"
    }

    async fn load(&self, ctx: &LoadContext<'_>, record: &mut dyn Record) -> Result<(), ConfigError> {
        let client = self
            .client
            .as_deref()
            .ok_or_else(|| ConfigError::NoClientAvailable("secret store".to_string()))?;

        let mut merged = ValueMap::new();
        for shared in &self.additional_paths {
            let data = self.collect(client, &self.path_for(&shared.name)).await?;
            if shared.map.is_empty() {
                deep_merge(&mut merged, data);
            } else {
                let mut wrapped = ValueMap::new();
                wrapped.insert(shared.map.clone(), Value::Object(data));
                deep_merge(&mut merged, wrapped);
            }
        }

        let app_data = self.collect(client, &self.path_for(ctx.app_name)).await?;
        deep_merge(&mut merged, app_data);

        tracing::debug!(app = ctx.app_name, keys = merged.len(), "secrets loaded");
        apply_map(
            record,
            &merged,
            &SeparatorNamer::new(SECRET_KEY, PATH_SEPARATOR),
            ctx.registry,
        )
    }
}
