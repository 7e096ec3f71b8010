//! Domain layer for the strata resolution engine
//!
//! Record description, the error taxonomy and the ports to external stores.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    ConfigError, ConfigResult, DecodeError, RemoteError, SecretError, TransportError, WatchError,
};
