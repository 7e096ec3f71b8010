//! Process environment provider.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::errors::ConfigError;
use crate::domain::models::Record;
use crate::services::naming::SeparatorNamer;
use crate::services::pipeline::{LoadContext, Provider};
use crate::services::walker::walk;

pub const ENV_KEY: &str = "env";

/// Reads fields from environment variables named by their `env` annotation.
///
/// Nested names are joined with `_`. Each candidate is looked up as written,
/// then upper-cased, then lower-cased.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: Option<HashMap<String, String>>,
}

impl Env {
    /// Read from the process environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from a fixed set of variables instead of the process environment.
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn namer() -> SeparatorNamer {
        SeparatorNamer::new(ENV_KEY, "_")
    }

    fn get(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    /// Value for `name`, tolerating case differences.
    pub fn lookup(&self, name: &str) -> Option<String> {
        let mut variants = vec![name.to_string()];
        for variant in [name.to_uppercase(), name.to_lowercase()] {
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
        variants.iter().find_map(|variant| self.get(variant))
    }
}

#[async_trait]
impl Provider for Env {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn load(&self, ctx: &LoadContext<'_>, record: &mut dyn Record) -> Result<(), ConfigError> {
        walk(
            record,
            &Self::namer(),
            &mut |field, leaf| {
                let found = field
                    .candidates()
                    .find_map(|name| self.lookup(name).map(|value| (name, value)));
                match found {
                    Some((name, value)) => {
                        tracing::trace!(variable = name, field = %field.name, "environment value found");
                        ctx.registry.coerce(&field.name, &value, leaf)
                    }
                    None => Ok(()),
                }
            },
            "",
            false,
        )
    }
}
