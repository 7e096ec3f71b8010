//! Infrastructure layer module
//!
//! Adapters around the resolution engine:
//! - Providers for each configuration source
//! - Structured decoders (YAML, JSON, TOML)
//! - Engine settings loaded with figment
//! - Logging infrastructure
//!
//! Providers implement the `Provider` trait from the service layer and talk
//! to external stores through the port traits defined in the domain layer.

pub mod codec;
pub mod config;
pub mod logging;
pub mod providers;
