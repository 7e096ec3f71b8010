//! Command-line provider.

use std::collections::HashSet;

use async_trait::async_trait;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::domain::errors::ConfigError;
use crate::domain::models::{LeafKind, Record};
use crate::services::naming::{NameCase, SeparatorNamer};
use crate::services::pipeline::{LoadContext, Provider};
use crate::services::walker::walk;

pub const CMD_KEY: &str = "cmd";

/// One long flag per leaf field, named by its `cmd` annotation.
///
/// Nested names are joined with `-` and lower-cased. Boolean flags take an
/// optional `=value`, so `--verbose` and `--verbose=false` both work. Only
/// flags that actually appear on the command line are applied.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    args: Option<Vec<String>>,
    no_usage: bool,
}

struct FlagSpec {
    name: String,
    aliases: Vec<String>,
    kind: LeafKind,
    help: Option<&'static str>,
}

impl Flags {
    /// Parse the process arguments (without the binary name).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: Some(args.into_iter().map(Into::into).collect()),
            no_usage: false,
        }
    }

    /// Report parse errors without the rendered usage text.
    pub fn no_usage(mut self, no_usage: bool) -> Self {
        self.no_usage = no_usage;
        self
    }

    fn namer() -> SeparatorNamer {
        SeparatorNamer::new(CMD_KEY, "-").with_case(NameCase::Lower)
    }

    fn command(app_name: &str, specs: &[FlagSpec]) -> Command {
        let mut command = Command::new(app_name.to_string())
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true);

        let mut taken: HashSet<&str> = HashSet::new();
        for spec in specs {
            if spec.name.is_empty() {
                tracing::warn!("flag with empty name ignored");
                continue;
            }
            if !taken.insert(spec.name.as_str()) {
                tracing::warn!(flag = %spec.name, "duplicate flag name, keeping first definition");
                continue;
            }
        }

        let mut registered: HashSet<&str> = HashSet::new();
        for spec in specs {
            if spec.name.is_empty() || !registered.insert(spec.name.as_str()) {
                continue;
            }

            let aliases: Vec<String> = spec
                .aliases
                .iter()
                .filter(|alias| !alias.is_empty() && !taken.contains(alias.as_str()))
                .cloned()
                .collect();
            taken.extend(spec.aliases.iter().map(String::as_str));

            let mut arg = Arg::new(spec.name.clone())
                .long(spec.name.clone())
                .aliases(aliases)
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(String));
            if let Some(help) = spec.help {
                arg = arg.help(help);
            }
            if spec.kind == LeafKind::Bool {
                arg = arg
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true");
            }
            command = command.arg(arg);
        }
        command
    }

    fn parse(&self, app_name: &str, args: Vec<String>, specs: &[FlagSpec]) -> Result<ArgMatches, ConfigError> {
        Self::command(app_name, specs)
            .try_get_matches_from(args)
            .map_err(|err| {
                if self.no_usage {
                    ConfigError::InvalidFlags(err.kind().to_string())
                } else {
                    ConfigError::InvalidFlags(err.render().to_string())
                }
            })
    }
}

#[async_trait]
impl Provider for Flags {
    fn name(&self) -> &'static str {
        "flags"
    }

    async fn load(&self, ctx: &LoadContext<'_>, record: &mut dyn Record) -> Result<(), ConfigError> {
        let args = self
            .args
            .clone()
            .unwrap_or_else(|| {
                std::env::args_os()
                    .skip(1)
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect()
            });
        if args.is_empty() {
            return Ok(());
        }

        let namer = Self::namer();
        let mut specs = Vec::new();
        walk(
            record,
            &namer,
            &mut |field, leaf| {
                specs.push(FlagSpec {
                    name: field.name.clone(),
                    aliases: field.aliases.clone(),
                    kind: leaf.kind(),
                    help: field.descriptor.annotation("usage"),
                });
                Ok(())
            },
            "",
            false,
        )?;

        let matches = self.parse(ctx.app_name, args, &specs)?;

        walk(
            record,
            &namer,
            &mut |field, leaf| {
                if field.name.is_empty()
                    || matches.value_source(&field.name) != Some(ValueSource::CommandLine)
                {
                    return Ok(());
                }
                match matches.get_one::<String>(&field.name) {
                    Some(value) => ctx.registry.coerce(&field.name, value, leaf),
                    None => Ok(()),
                }
            },
            "",
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::coercion::CoercionRegistry;

    crate::config_record! {
        #[derive(Debug, Default)]
        struct Db {
            #[field(cmd = "host,server")]
            host: String,
            port: u16,
        }
    }

    crate::config_record! {
        #[derive(Debug, Default)]
        struct Settings {
            name: String,
            verbose: bool,
            #[field(cmd = "DB")]
            db: Db,
            #[field(cmd = "-")]
            internal: String,
        }
    }

    async fn load(flags: Flags, settings: &mut Settings) -> Result<(), ConfigError> {
        let registry = CoercionRegistry::new();
        let ctx = LoadContext {
            app_name: "test",
            registry: &registry,
        };
        flags.load(&ctx, settings).await
    }

    #[tokio::test]
    async fn test_parses_nested_and_bool_flags() {
        let mut settings = Settings::default();
        load(
            Flags::with_args(["--name", "FromFlags", "--verbose", "--db-server=db.local", "--db-port", "5432"]),
            &mut settings,
        )
        .await
        .unwrap();

        assert_eq!(settings.name, "FromFlags");
        assert!(settings.verbose);
        assert_eq!(settings.db.host, "db.local");
        assert_eq!(settings.db.port, 5432);
    }

    #[tokio::test]
    async fn test_absent_flags_leave_fields() {
        let mut settings = Settings {
            name: "keep".into(),
            verbose: true,
            ..Settings::default()
        };
        load(Flags::with_args(["--db-port", "1"]), &mut settings).await.unwrap();
        assert_eq!(settings.name, "keep");
        assert!(settings.verbose);

        load(Flags::with_args(["--verbose=false"]), &mut settings).await.unwrap();
        assert!(!settings.verbose);
    }

    #[tokio::test]
    async fn test_empty_args_is_noop() {
        let mut settings = Settings::default();
        load(Flags::with_args(Vec::<String>::new()), &mut settings).await.unwrap();
        assert!(settings.name.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_flag_is_hard_error() {
        let mut settings = Settings::default();
        let err = load(Flags::with_args(["--internal", "x"]), &mut settings)
            .await
            .unwrap_err();
        match err {
            ConfigError::InvalidFlags(message) => assert!(message.contains("--internal")),
            other => panic!("expected InvalidFlags, got {other:?}"),
        }

        let err = load(Flags::with_args(["--bogus"]).no_usage(true), &mut settings)
            .await
            .unwrap_err();
        match err {
            ConfigError::InvalidFlags(message) => assert!(!message.contains("Usage")),
            other => panic!("expected InvalidFlags, got {other:?}"),
        }
    }
}
