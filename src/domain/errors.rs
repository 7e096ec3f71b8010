//! Error taxonomy for configuration resolution.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while resolving a record from one or more providers.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("destination is not a record: {type_name}")]
    NotARecord { type_name: &'static str },

    #[error("field {field:?} has unsupported type {type_name}")]
    UnsupportedType {
        field: String,
        type_name: &'static str,
    },

    #[error("value {value:?} for field {field:?} is not a valid {type_name}: {reason}")]
    ParseFailure {
        field: String,
        type_name: &'static str,
        value: String,
        reason: String,
    },

    #[error("no client available: {0}")]
    NoClientAvailable(String),

    #[error("config file not found: {0}")]
    NoConfigFile(String),

    #[error("decoder not found for file type {0:?}")]
    NoDecoder(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("secret store request for path {path:?} failed: {source}")]
    Secret {
        path: String,
        #[source]
        source: SecretError,
    },

    #[error("invalid command line: {0}")]
    InvalidFlags(String),

    #[error("{provider}: {source}")]
    ProviderHardFailure {
        provider: &'static str,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    /// Wrap this error with the identity of the provider that produced it.
    pub fn in_provider(self, provider: &'static str) -> Self {
        ConfigError::ProviderHardFailure {
            provider,
            source: Box::new(self),
        }
    }
}

/// A failed connection attempt against a concrete socket address.
///
/// Clients report connection failures through this type so the pipeline can
/// tell a refused loopback endpoint apart from a refused remote one.
#[derive(Debug, Error)]
#[error("connection to {addr} failed: {source}")]
pub struct TransportError {
    pub addr: SocketAddr,
    #[source]
    pub source: io::Error,
}

impl TransportError {
    pub fn new(addr: SocketAddr, source: io::Error) -> Self {
        Self { addr, source }
    }

    /// True when the connection was refused by a loopback address.
    pub fn is_loopback_refused(&self) -> bool {
        self.source.kind() == io::ErrorKind::ConnectionRefused && self.addr.ip().is_loopback()
    }
}

/// Errors reported by a remote key/value client.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("request for key {key:?} failed with status {status}")]
    Status { key: String, status: u16 },

    #[error("{0}")]
    Other(String),
}

/// Errors reported by a secret store client.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("permission denied: {0}")]
    Denied(String),

    #[error("malformed secret: {0}")]
    Malformed(String),

    #[error("{0}")]
    Other(String),
}

/// Errors from structured decoders.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("input is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("top-level value is {0}, expected a map")]
    NotAMap(&'static str),
}

/// Errors that terminate a dynamic value watch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("no client available: {0}")]
    NoClient(String),

    #[error("watch requires a running tokio runtime")]
    NoRuntime,

    #[error("watch loop failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("watch worker aborted: {0}")]
    Worker(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn refused(ip: IpAddr) -> TransportError {
        TransportError::new(
            SocketAddr::new(ip, 8500),
            io::Error::from(io::ErrorKind::ConnectionRefused),
        )
    }

    #[test]
    fn test_loopback_refused() {
        assert!(refused(IpAddr::V4(Ipv4Addr::LOCALHOST)).is_loopback_refused());
        assert!(refused("::1".parse().unwrap()).is_loopback_refused());
        assert!(!refused(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))).is_loopback_refused());
    }

    #[test]
    fn test_loopback_other_io_kind_is_not_refused() {
        let err = TransportError::new(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8200),
            io::Error::from(io::ErrorKind::TimedOut),
        );
        assert!(!err.is_loopback_refused());
    }

    #[test]
    fn test_in_provider_wraps_identity() {
        let err = ConfigError::NoConfigFile("app".into()).in_provider("file");
        assert_eq!(err.to_string(), "file: config file not found: app");
        assert!(matches!(err, ConfigError::ProviderHardFailure { provider: "file", .. }));
    }
}
