//! Strata - layered configuration resolution
//!
//! Strata fills a typed configuration record from several sources in a fixed
//! order: annotation defaults, a remote key/value store, a secret store, a
//! local file, the process environment and the command line. Later sources
//! override earlier ones field by field.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): record description, error taxonomy, ports
//! - **Service Layer** (`services`): naming, walking, coercion, the pipeline
//!   and the dynamic value watch
//! - **Infrastructure Layer** (`infrastructure`): providers, decoders,
//!   engine settings and logging
//!
//! # Example
//!
//! ```ignore
//! strata::config_record! {
//!     #[derive(Debug, Default)]
//!     pub struct Settings {
//!         #[field(default = "Jan")]
//!         pub name: String,
//!         #[field(default = "8080")]
//!         pub port: u16,
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut settings = Settings::default();
//!     strata::load_config("myapp", &mut settings).await?;
//!     Ok(())
//! }
//! ```

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export the record description at the crate root; the exported macros
// refer to these paths.
pub use domain::errors::{ConfigError, ConfigResult, WatchError};
pub use domain::models::{
    AssignError, FieldDescriptor, FieldSlot, FieldValue, FieldView, FieldVisitor,
    FieldVisitorMut, Leaf, LeafKind, OptionSlot, OptionalRecord, Primitive, Record,
    RenderedValue,
};
pub use domain::ports::{Decoder, KvPair, RemoteKv, SecretStore, ValueMap, WatchResponse};
pub use infrastructure::config::{EngineSettings, SettingsLoader};
pub use infrastructure::providers::StoreClients;
pub use services::{CoercionRegistry, Pipeline, Printer, Provider, Subscription};

/// Resolve `record` for `app_name` with the canonical provider order and
/// default engine settings.
///
/// No remote store or secret store clients are configured, so those two
/// providers are skipped with a warning.
pub async fn load_config(app_name: &str, record: &mut dyn Record) -> Result<(), ConfigError> {
    Pipeline::from_settings(&EngineSettings::default(), StoreClients::default())
        .resolve(app_name, record)
        .await
}
