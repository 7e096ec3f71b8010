//! Strata demo binary: resolves a sample record and logs it.

use std::time::Duration;

use anyhow::{Context, Result};

use strata::infrastructure::logging::LoggerImpl;
use strata::{Pipeline, Printer, SettingsLoader, StoreClients};

strata::config_record! {
    #[derive(Debug, Default)]
    struct Database {
        #[field(default = "localhost")]
        host: String,
        #[field(default = "5432")]
        port: u16,
        #[field(secret = "password")]
        password: String,
    }
}

strata::config_record! {
    /// Sample application configuration.
    #[derive(Debug, Default)]
    struct DemoConfig {
        #[field(default = "strata-demo", usage = "service name")]
        name: String,
        #[field(default = "8080", env = "PORT", usage = "listen port")]
        port: u16,
        #[field(default = "5s")]
        timeout: Duration,
        #[field(usage = "enable verbose output")]
        verbose: bool,
        #[field(cmd = "db")]
        database: Database,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = SettingsLoader::load()?;
    let _logger = LoggerImpl::init(&settings.logging)?;

    let mut config = DemoConfig::default();
    Pipeline::from_settings(&settings, StoreClients::default())
        .resolve("strata", &mut config)
        .await
        .context("Failed to resolve configuration")?;

    tracing::info!(config = %Printer::new(&config), "configuration resolved");
    Ok(())
}
