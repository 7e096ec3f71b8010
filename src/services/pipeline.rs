//! Layered resolution: run providers in order over one record.

use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{ConfigError, TransportError};
use crate::domain::models::Record;

use super::coercion::CoercionRegistry;

/// Everything a provider needs besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    pub app_name: &'a str,
    pub registry: &'a CoercionRegistry,
}

/// One configuration source.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short identity used in logs and wrapped errors.
    fn name(&self) -> &'static str;

    /// Populate whichever fields of `record` this source has data for.
    async fn load(&self, ctx: &LoadContext<'_>, record: &mut dyn Record) -> Result<(), ConfigError>;
}

/// How the pipeline reacts to a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NoClientAvailable,
    LocalNetworkUnreachable,
    NoConfigFile,
    Hard,
}

impl ErrorClass {
    pub fn is_soft(self) -> bool {
        self != ErrorClass::Hard
    }
}

/// Classify a provider error, most specific soft condition first.
pub fn classify(err: &ConfigError) -> ErrorClass {
    if matches!(err, ConfigError::NoClientAvailable(_)) {
        ErrorClass::NoClientAvailable
    } else if is_loopback_refused(err) {
        ErrorClass::LocalNetworkUnreachable
    } else if matches!(err, ConfigError::NoConfigFile(_)) {
        ErrorClass::NoConfigFile
    } else {
        ErrorClass::Hard
    }
}

/// True if any error in the source chain is a refused loopback connection.
fn is_loopback_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e
            .downcast_ref::<TransportError>()
            .is_some_and(TransportError::is_loopback_refused)
        {
            return true;
        }
        current = e.source();
    }
    false
}

/// Ordered list of providers sharing one coercion registry.
///
/// Providers run one at a time; a later provider overwrites whatever fields
/// it has data for and leaves the rest untouched.
pub struct Pipeline {
    providers: Vec<Box<dyn Provider>>,
    registry: Arc<CoercionRegistry>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_registry(CoercionRegistry::global())
    }

    pub fn with_registry(registry: Arc<CoercionRegistry>) -> Self {
        Self {
            providers: Vec::new(),
            registry,
        }
    }

    /// Append a provider; it runs after every provider already added.
    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn push(&mut self, provider: Box<dyn Provider>) {
        self.providers.push(provider);
    }

    pub fn registry(&self) -> &Arc<CoercionRegistry> {
        &self.registry
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn resolve(&self, app_name: &str, record: &mut dyn Record) -> Result<(), ConfigError> {
        self.resolve_with_cancel(&CancellationToken::new(), app_name, record)
            .await
    }

    /// Like [`resolve`](Self::resolve), but stops quietly before the next
    /// provider once `cancel` fires. A provider already running finishes.
    pub async fn resolve_with_cancel(
        &self,
        cancel: &CancellationToken,
        app_name: &str,
        record: &mut dyn Record,
    ) -> Result<(), ConfigError> {
        if !record.is_present() {
            return Err(ConfigError::NotARecord {
                type_name: record.type_name(),
            });
        }

        let ctx = LoadContext {
            app_name,
            registry: &self.registry,
        };

        for provider in &self.providers {
            if cancel.is_cancelled() {
                tracing::debug!(app = app_name, "resolution cancelled");
                return Ok(());
            }

            tracing::debug!(provider = provider.name(), app = app_name, "loading provider");
            let Err(err) = provider.load(&ctx, record).await else {
                continue;
            };

            match classify(&err) {
                ErrorClass::NoClientAvailable => {
                    tracing::warn!(provider = provider.name(), error = %err, "no client available, skipping provider");
                }
                ErrorClass::LocalNetworkUnreachable => {
                    tracing::warn!(provider = provider.name(), error = %err, "local endpoint unreachable, skipping provider");
                }
                ErrorClass::NoConfigFile => {
                    tracing::warn!(provider = provider.name(), error = %err, "no config file found, skipping provider");
                }
                ErrorClass::Hard => {
                    tracing::error!(provider = provider.name(), error = %err, "provider failed");
                    return Err(err.in_provider(provider.name()));
                }
            }
        }

        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{RemoteError, SecretError};
    use std::io;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn refused(ip: IpAddr) -> TransportError {
        TransportError::new(
            SocketAddr::new(ip, 8500),
            io::Error::from(io::ErrorKind::ConnectionRefused),
        )
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            classify(&ConfigError::NoClientAvailable("kv".into())),
            ErrorClass::NoClientAvailable
        );
        assert_eq!(
            classify(&ConfigError::NoConfigFile("app".into())),
            ErrorClass::NoConfigFile
        );
        assert_eq!(
            classify(&ConfigError::NoDecoder("ini".into())),
            ErrorClass::Hard
        );
    }

    #[test]
    fn test_classify_walks_source_chain() {
        let local = ConfigError::Remote(RemoteError::Transport(refused(IpAddr::V4(Ipv4Addr::LOCALHOST))));
        assert_eq!(classify(&local), ErrorClass::LocalNetworkUnreachable);

        let secret = ConfigError::Secret {
            path: "secret/app".into(),
            source: SecretError::Transport(refused(IpAddr::V4(Ipv4Addr::LOCALHOST))),
        };
        assert_eq!(classify(&secret), ErrorClass::LocalNetworkUnreachable);

        let remote = ConfigError::Remote(RemoteError::Transport(refused(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)))));
        assert_eq!(classify(&remote), ErrorClass::Hard);
    }

    crate::config_record! {
        #[derive(Debug, Default)]
        struct Counter {
            hits: u32,
        }
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
        cancel_after: Option<CancellationToken>,
    }

    #[async_trait]
    impl Provider for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn load(&self, _ctx: &LoadContext<'_>, _record: &mut dyn Record) -> Result<(), ConfigError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_after {
                token.cancel();
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let pipeline = Pipeline::new()
            .provider(Counting {
                calls: Arc::clone(&calls),
                cancel_after: Some(cancel.clone()),
            })
            .provider(Counting {
                calls: Arc::clone(&calls),
                cancel_after: None,
            });

        let mut record = Counter::default();
        pipeline
            .resolve_with_cancel(&cancel, "app", &mut record)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_absent_record_fails_before_providers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new().provider(Counting {
            calls: Arc::clone(&calls),
            cancel_after: None,
        });

        let mut missing: Option<Counter> = None;
        let err = pipeline.resolve("app", &mut missing).await.unwrap_err();
        assert!(matches!(err, ConfigError::NotARecord { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
