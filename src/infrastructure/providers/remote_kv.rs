//! Remote key/value store provider.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{ConfigError, WatchError};
use crate::domain::models::Record;
use crate::domain::ports::{Decoder, RemoteKv};
use crate::infrastructure::codec::YamlDecoder;
use crate::services::naming::SeparatorNamer;
use crate::services::pipeline::{LoadContext, Provider};
use crate::services::watch::{watch_key, Subscription};

use super::value_map::{apply_map, PATH_SEPARATOR};

/// Loads the document stored at `<prefix>/<app>` in the remote store.
///
/// Documents are YAML unless another decoder is configured. A missing key
/// means the store has nothing for this application.
pub struct RemoteKvProvider {
    client: Option<Arc<dyn RemoteKv>>,
    prefix: String,
    decoder: Arc<dyn Decoder>,
}

impl RemoteKvProvider {
    pub fn new(client: Option<Arc<dyn RemoteKv>>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            decoder: Arc::new(YamlDecoder),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn key_for(&self, name: &str) -> String {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        }
    }

    /// Watch `<prefix>/<key>` for changes.
    pub fn dynamic_value(
        &self,
        cancel: CancellationToken,
        key: &str,
    ) -> Result<Subscription, WatchError> {
        let client = self
            .client
            .clone()
            .ok_or_else(|| WatchError::NoClient("remote key/value store".to_string()))?;
        watch_key(client, cancel, self.key_for(key))
    }
}

impl std::fmt::Debug for RemoteKvProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteKvProvider")
            .field("has_client", &self.client.is_some())
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[async_trait]
impl Provider for RemoteKvProvider {
    fn name(&self) -> &'static str {
        "remote-kv"
    }

    async fn load(&self, ctx: &LoadContext<'_>, record: &mut dyn Record) -> Result<(), ConfigError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ConfigError::NoClientAvailable("remote key/value store".to_string()))?;

        let key = self.key_for(ctx.app_name);
        let Some(pair) = client.get(&key).await? else {
            tracing::debug!(key = %key, "no remote configuration stored");
            return Ok(());
        };

        let map = self.decoder.decode(&pair.value)?;
        tracing::debug!(key = %key, index = pair.modify_index, "remote configuration loaded");
        apply_map(
            record,
            &map,
            &SeparatorNamer::new("cfg", PATH_SEPARATOR),
            ctx.registry,
        )
    }
}
