//! Recursive record traversal shared by every provider.

use crate::domain::errors::ConfigError;
use crate::domain::models::{FieldDescriptor, FieldSlot, Leaf, Record};

use super::naming::{FieldNamer, ResolvedName};

/// A leaf field together with the name a provider resolved for it.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub name: String,
    pub aliases: Vec<String>,
    pub descriptor: &'static FieldDescriptor,
}

impl ResolvedField {
    /// Resolved name followed by its aliases.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

pub type LeafSetter<'s> =
    dyn FnMut(&ResolvedField, &mut dyn Leaf) -> Result<(), ConfigError> + 's;

/// Walk `record` in declaration order, handing every named leaf to `setter`.
///
/// Skipped fields are neither visited nor descended into. With
/// `no_overwrite`, leaves that already hold a non-default value are left
/// alone, including leaves inside nested records. Optional nested records
/// are allocated before descending.
pub fn walk(
    record: &mut dyn Record,
    namer: &dyn FieldNamer,
    setter: &mut LeafSetter<'_>,
    base: &str,
    no_overwrite: bool,
) -> Result<(), ConfigError> {
    if !record.is_present() {
        return Err(ConfigError::NotARecord {
            type_name: record.type_name(),
        });
    }
    walk_fields(record, namer, setter, base, no_overwrite)
}

fn walk_fields(
    record: &mut dyn Record,
    namer: &dyn FieldNamer,
    setter: &mut LeafSetter<'_>,
    base: &str,
    no_overwrite: bool,
) -> Result<(), ConfigError> {
    record.visit_fields_mut(&mut |descriptor, slot| {
        let (name, aliases) = match namer.resolve(base, descriptor, slot.shape()) {
            ResolvedName::Named { name, aliases } => (name, aliases),
            ResolvedName::Skip => {
                tracing::trace!(field = descriptor.ident, "field skipped");
                return Ok(());
            }
        };

        match slot {
            FieldSlot::Leaf(leaf) => {
                if no_overwrite && !leaf.is_default() {
                    return Ok(());
                }
                let field = ResolvedField {
                    name,
                    aliases,
                    descriptor,
                };
                setter(&field, leaf)
            }
            FieldSlot::Record(nested) => walk_fields(nested, namer, &mut *setter, &name, no_overwrite),
            FieldSlot::OptionalRecord(optional) => walk_fields(
                optional.get_or_allocate(),
                namer,
                &mut *setter,
                &name,
                no_overwrite,
            ),
        }
    })
}
