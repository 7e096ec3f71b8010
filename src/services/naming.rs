//! Field naming: maps a field plus its parent path to a source-specific key.

use crate::domain::models::{FieldDescriptor, FieldShape, SKIP_SENTINEL};

/// Outcome of naming one field for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedName {
    /// Look the field up under `name`, then under each alias in order.
    Named { name: String, aliases: Vec<String> },
    /// Leave the field (and its subtree) alone.
    Skip,
}

impl ResolvedName {
    pub fn named(name: impl Into<String>) -> Self {
        ResolvedName::Named {
            name: name.into(),
            aliases: Vec::new(),
        }
    }
}

/// Strategy a provider uses to name the fields it visits.
pub trait FieldNamer: Send + Sync {
    fn resolve(&self, outer: &str, field: &FieldDescriptor, shape: FieldShape) -> ResolvedName;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCase {
    AsIs,
    Upper,
    Lower,
}

impl NameCase {
    fn apply(self, name: String) -> String {
        match self {
            NameCase::AsIs => name,
            NameCase::Upper => name.to_uppercase(),
            NameCase::Lower => name.to_lowercase(),
        }
    }
}

/// Join a parent path and a field token.
///
/// A skipped inner token stays skipped and an empty parent contributes nothing.
pub fn join_field_names(outer: &str, inner: &str, separator: &str) -> String {
    if inner == SKIP_SENTINEL {
        return SKIP_SENTINEL.to_string();
    }
    if outer.is_empty() {
        return inner.to_string();
    }
    format!("{outer}{separator}{inner}")
}

/// Annotation-driven namer shared by the environment, command-line and
/// map-backed providers.
#[derive(Debug, Clone)]
pub struct SeparatorNamer {
    pub key: &'static str,
    pub backup: Option<&'static str>,
    pub separator: &'static str,
    pub case: NameCase,
}

impl SeparatorNamer {
    pub const fn new(key: &'static str, separator: &'static str) -> Self {
        Self {
            key,
            backup: Some(crate::domain::models::BACKUP_KEY),
            separator,
            case: NameCase::AsIs,
        }
    }

    pub const fn with_case(mut self, case: NameCase) -> Self {
        self.case = case;
        self
    }

    pub const fn without_backup(mut self) -> Self {
        self.backup = None;
        self
    }
}

impl FieldNamer for SeparatorNamer {
    fn resolve(&self, outer: &str, field: &FieldDescriptor, _shape: FieldShape) -> ResolvedName {
        let naming = field.naming(self.key, self.backup);
        if naming.skip {
            return ResolvedName::Skip;
        }

        let name = self
            .case
            .apply(join_field_names(outer, &naming.primary, self.separator));
        let aliases = naming
            .aliases
            .iter()
            .map(|alias| self.case.apply(join_field_names(outer, alias, self.separator)))
            .collect();

        ResolvedName::Named { name, aliases }
    }
}
