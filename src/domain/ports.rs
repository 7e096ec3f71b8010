//! Port trait definitions (Hexagonal Architecture)
//!
//! Contracts the resolution engine consumes from external collaborators:
//! - RemoteKv: remote key/value store with blocking queries
//! - SecretStore: hierarchical secret store
//! - Decoder: structured document decoder (bytes in, map out)
//!
//! Wire clients live outside this crate and implement these traits.

use async_trait::async_trait;

use super::errors::{DecodeError, RemoteError, SecretError};

/// Generic name to value map produced by decoders and secret reads.
pub type ValueMap = serde_json::Map<String, serde_json::Value>;

/// One key as stored in the remote KV store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
    /// Version token; increases whenever the key is written.
    pub modify_index: u64,
}

/// Result of one blocking query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchResponse {
    /// `None` when the key does not exist (or was deleted).
    pub pair: Option<KvPair>,
    /// Store index at the time the query returned.
    pub index: u64,
}

/// Remote key/value store client
#[async_trait]
pub trait RemoteKv: Send + Sync {
    /// Fetch the current value of `key`
    ///
    /// Returns `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<KvPair>, RemoteError>;

    /// Blocking query on `key`
    ///
    /// Returns once the store index exceeds `last_index` or the store's
    /// long-poll timeout expires, whichever comes first. A `last_index` of 0
    /// returns immediately with the current state.
    async fn watch(&self, key: &str, last_index: u64) -> Result<WatchResponse, RemoteError>;
}

/// Hierarchical secret store client
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the secret at `path`
    ///
    /// Returns `Ok(None)` when nothing is stored there, including secrets
    /// that were destroyed or soft-deleted.
    async fn read(&self, path: &str) -> Result<Option<ValueMap>, SecretError>;

    /// List child names below `path`
    ///
    /// Children that are themselves directories end with `/`.
    /// Returns `Ok(None)` when `path` has no children.
    async fn list(&self, path: &str) -> Result<Option<Vec<String>>, SecretError>;
}

/// Structured document decoder
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<ValueMap, DecodeError>;
}
