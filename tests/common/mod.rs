//! Common test utilities for integration tests
//!
//! Provides in-memory store clients and fixture records shared across
//! the integration test files.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use strata::domain::errors::{RemoteError, SecretError, TransportError};
use strata::{KvPair, RemoteKv, SecretStore, ValueMap, WatchResponse};
use tokio::sync::Notify;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Object literal as a `ValueMap`.
#[allow(dead_code)]
pub fn object(value: Value) -> ValueMap {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

/// A refused connection to `addr`, as a client would report it.
#[allow(dead_code)]
pub fn refused(addr: &str) -> TransportError {
    let addr: SocketAddr = addr.parse().expect("valid socket address");
    TransportError::new(
        addr,
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
    )
}

/// In-memory key/value store with blocking queries.
///
/// The store index starts at 1, like a real store that has been written once.
/// `watch` returns immediately when the store moved past `last_index`,
/// otherwise it waits for the next write or the long-poll timeout.
#[allow(dead_code)]
pub struct MemoryKv {
    state: Mutex<KvState>,
    changed: Notify,
    poll_timeout: Duration,
}

#[derive(Default)]
struct KvState {
    index: u64,
    values: HashMap<String, KvPair>,
    fail_get: Option<fn() -> RemoteError>,
    fail_watch: Option<fn() -> RemoteError>,
}

#[allow(dead_code)]
impl MemoryKv {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(KvState {
                index: 1,
                ..KvState::default()
            }),
            changed: Notify::new(),
            poll_timeout: Duration::from_millis(50),
        })
    }

    pub fn put(&self, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        state.index += 1;
        let index = state.index;
        state.values.insert(
            key.to_string(),
            KvPair {
                key: key.to_string(),
                value: value.as_bytes().to_vec(),
                modify_index: index,
            },
        );
        drop(state);
        self.changed.notify_waiters();
    }

    pub fn delete(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.index += 1;
        state.values.remove(key);
        drop(state);
        self.changed.notify_waiters();
    }

    pub fn fail_get_with(&self, error: fn() -> RemoteError) {
        self.state.lock().unwrap().fail_get = Some(error);
    }

    pub fn fail_watch_with(&self, error: fn() -> RemoteError) {
        self.state.lock().unwrap().fail_watch = Some(error);
        self.changed.notify_waiters();
    }

    fn snapshot(&self, key: &str) -> Result<WatchResponse, RemoteError> {
        let state = self.state.lock().unwrap();
        if let Some(error) = state.fail_watch {
            return Err(error());
        }
        Ok(WatchResponse {
            pair: state.values.get(key).cloned(),
            index: state.index,
        })
    }
}

#[async_trait]
impl RemoteKv for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<KvPair>, RemoteError> {
        let state = self.state.lock().unwrap();
        if let Some(error) = state.fail_get {
            return Err(error());
        }
        Ok(state.values.get(key).cloned())
    }

    async fn watch(&self, key: &str, last_index: u64) -> Result<WatchResponse, RemoteError> {
        let notified = self.changed.notified();
        let current = self.snapshot(key)?;
        if last_index == 0 || current.index > last_index {
            return Ok(current);
        }
        let _ = tokio::time::timeout(self.poll_timeout, notified).await;
        self.snapshot(key)
    }
}

/// In-memory secret store keyed by path.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemorySecrets {
    secrets: HashMap<String, ValueMap>,
    dirs: HashMap<String, Vec<String>>,
    failing: HashMap<String, String>,
    reads: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MemorySecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn secret(mut self, path: &str, data: Value) -> Self {
        self.secrets.insert(path.to_string(), object(data));
        self
    }

    /// Children listed under `dir`, which must end with `/`.
    pub fn dir(mut self, dir: &str, children: &[&str]) -> Self {
        self.dirs.insert(
            dir.to_string(),
            children.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Reads of `path` fail with a permission error.
    pub fn deny(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string(), format!("no access to {path}"));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for MemorySecrets {
    async fn read(&self, path: &str) -> Result<Option<ValueMap>, SecretError> {
        self.reads.lock().unwrap().push(path.to_string());
        if let Some(message) = self.failing.get(path) {
            return Err(SecretError::Denied(message.clone()));
        }
        Ok(self.secrets.get(path).cloned())
    }

    async fn list(&self, path: &str) -> Result<Option<Vec<String>>, SecretError> {
        Ok(self.dirs.get(path).cloned())
    }
}

strata::config_record! {
    /// Connection settings nested inside [`ServiceConfig`].
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct DatabaseConfig {
        #[field(default = "localhost")]
        pub host: String,
        #[field(default = "5432")]
        pub port: u16,
        #[field(secret = "password")]
        pub password: String,
    }
}

strata::config_record! {
    /// Fixture record covering leaves, nesting and skipped fields.
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct ServiceConfig {
        #[field(default = "Jan", usage = "service name")]
        pub name: String,
        #[field(default = "8080", env = "PORT,HTTP_PORT")]
        pub port: u16,
        #[field(default = "30s")]
        pub timeout: Duration,
        pub debug: bool,
        pub tags: Vec<String>,
        pub database: DatabaseConfig,
        #[field(cfg = "-", env = "-", cmd = "-", secret = "-", default = "-")]
        pub internal: String,
    }
}
