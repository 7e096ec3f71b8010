//! Source adapters for the resolution pipeline.

pub mod defaults;
pub mod env;
pub mod file;
pub mod flags;
pub mod remote_kv;
pub mod secrets;
pub mod value_map;

use std::sync::Arc;

use crate::domain::ports::{RemoteKv, SecretStore};
use crate::infrastructure::config::EngineSettings;
use crate::services::coercion::{CoercionRegistry, DEFAULT_LIST_SEPARATOR};
use crate::services::pipeline::Pipeline;

pub use defaults::Defaults;
pub use env::Env;
pub use file::FileProvider;
pub use flags::Flags;
pub use remote_kv::RemoteKvProvider;
pub use secrets::SecretProvider;

/// Wire clients for the remote stores; a missing client soft-skips its provider.
#[derive(Clone, Default)]
pub struct StoreClients {
    pub remote_kv: Option<Arc<dyn RemoteKv>>,
    pub secrets: Option<Arc<dyn SecretStore>>,
}

impl Pipeline {
    /// The canonical order: defaults, remote KV, secrets, file, environment,
    /// command line.
    pub fn from_settings(settings: &EngineSettings, clients: StoreClients) -> Self {
        let registry = if settings.coercion.list_separator == DEFAULT_LIST_SEPARATOR {
            CoercionRegistry::global()
        } else {
            Arc::new(CoercionRegistry::with_list_separator(
                settings.coercion.list_separator.clone(),
            ))
        };

        Pipeline::with_registry(registry)
            .provider(Defaults)
            .provider(RemoteKvProvider::new(clients.remote_kv, settings.remote.prefix.clone()))
            .provider(SecretProvider::new(clients.secrets, &settings.secrets))
            .provider(FileProvider::new(settings.file.clone()))
            .provider(Env::new())
            .provider(Flags::new())
    }
}
