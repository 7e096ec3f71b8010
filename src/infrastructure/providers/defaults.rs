//! Annotation-declared default values.

use async_trait::async_trait;

use crate::domain::errors::ConfigError;
use crate::domain::models::{FieldDescriptor, FieldShape, Record, SKIP_SENTINEL};
use crate::services::naming::{join_field_names, FieldNamer, ResolvedName};
use crate::services::pipeline::{LoadContext, Provider};
use crate::services::walker::walk;

pub const DEFAULT_KEY: &str = "default";

/// Applies `default = "..."` annotations to fields that are still unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct Defaults;

/// Leaves are named only when they declare a default; nested records are
/// always entered unless marked `default = "-"`.
struct DefaultsNamer;

impl FieldNamer for DefaultsNamer {
    fn resolve(&self, outer: &str, field: &FieldDescriptor, shape: FieldShape) -> ResolvedName {
        match (field.annotation(DEFAULT_KEY), shape) {
            (Some(SKIP_SENTINEL), _) => ResolvedName::Skip,
            (None, FieldShape::Leaf) => ResolvedName::Skip,
            _ => ResolvedName::named(join_field_names(outer, field.ident, ".")),
        }
    }
}

#[async_trait]
impl Provider for Defaults {
    fn name(&self) -> &'static str {
        "defaults"
    }

    async fn load(&self, ctx: &LoadContext<'_>, record: &mut dyn Record) -> Result<(), ConfigError> {
        walk(
            record,
            &DefaultsNamer,
            &mut |field, leaf| match field.descriptor.annotation(DEFAULT_KEY) {
                Some(value) => ctx.registry.coerce(&field.name, value, leaf),
                None => Ok(()),
            },
            "",
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::coercion::CoercionRegistry;
    use std::time::Duration;

    crate::config_record! {
        #[derive(Debug, Default)]
        struct Limits {
            #[field(default = "30s")]
            timeout: Duration,
            #[field(default = "a,b")]
            tags: Vec<String>,
        }
    }

    crate::config_record! {
        #[derive(Debug, Default)]
        struct Settings {
            #[field(default = "Jan")]
            name: String,
            #[field(default = "8080")]
            port: u16,
            plain: u32,
            limits: Limits,
            #[field(default = "-")]
            disabled: Limits,
        }
    }

    async fn load(settings: &mut Settings) -> Result<(), ConfigError> {
        let registry = CoercionRegistry::new();
        let ctx = LoadContext {
            app_name: "test",
            registry: &registry,
        };
        Defaults.load(&ctx, settings).await
    }

    #[tokio::test]
    async fn test_applies_defaults_recursively() {
        let mut settings = Settings::default();
        load(&mut settings).await.unwrap();

        assert_eq!(settings.name, "Jan");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.plain, 0);
        assert_eq!(settings.limits.timeout, Duration::from_secs(30));
        assert_eq!(settings.limits.tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(settings.disabled.timeout, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_never_clobbers_set_values() {
        let mut settings = Settings {
            port: 9999,
            ..Settings::default()
        };
        settings.limits.timeout = Duration::from_secs(1);
        load(&mut settings).await.unwrap();

        assert_eq!(settings.port, 9999);
        assert_eq!(settings.limits.timeout, Duration::from_secs(1));
        assert_eq!(settings.name, "Jan");
    }

    crate::config_record! {
        #[derive(Debug, Default)]
        struct Broken {
            #[field(default = "eighty")]
            port: u16,
        }
    }

    #[tokio::test]
    async fn test_bad_default_is_parse_failure() {
        let registry = CoercionRegistry::new();
        let ctx = LoadContext {
            app_name: "test",
            registry: &registry,
        };
        let err = Defaults.load(&ctx, &mut Broken::default()).await.unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailure { .. }));
    }
}
