//! Value coercion: text from a source into a typed leaf slot.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use crate::domain::errors::ConfigError;
use crate::domain::models::{AssignError, Leaf, LeafKind, Primitive};

pub type ConvertError = Box<dyn StdError + Send + Sync>;

type Converter = Arc<dyn Fn(&str, &mut dyn Any) -> Result<(), ConvertError> + Send + Sync>;

#[derive(Clone)]
struct Entry {
    type_name: &'static str,
    convert: Converter,
}

pub const DEFAULT_LIST_SEPARATOR: &str = ",";

const TRUTHY: [&str; 8] = ["true", "t", "yes", "y", "1", "ja", "j", ".t."];

/// Registry of custom converters keyed by destination type.
///
/// Lookups take the read side of the lock, so registration from elsewhere
/// in the process never races a resolution in progress.
pub struct CoercionRegistry {
    entries: RwLock<HashMap<TypeId, Entry>>,
    list_separator: String,
}

impl CoercionRegistry {
    /// Registry with the built-in converters and the default list separator.
    pub fn new() -> Self {
        Self::with_list_separator(DEFAULT_LIST_SEPARATOR)
    }

    pub fn with_list_separator(separator: impl Into<String>) -> Self {
        let registry = Self {
            entries: RwLock::new(HashMap::new()),
            list_separator: separator.into(),
        };
        registry.install_builtins();
        registry
    }

    /// Registry with no converters at all.
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            list_separator: DEFAULT_LIST_SEPARATOR.to_string(),
        }
    }

    /// Process-wide registry, built on first use.
    pub fn global() -> Arc<CoercionRegistry> {
        static GLOBAL: OnceLock<Arc<CoercionRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(CoercionRegistry::new())).clone()
    }

    pub fn list_separator(&self) -> &str {
        &self.list_separator
    }

    /// Register (or replace) the converter for `T`.
    pub fn register<T, F>(&self, parse: F)
    where
        T: Any,
        F: Fn(&str) -> Result<T, ConvertError> + Send + Sync + 'static,
    {
        self.insert::<T>(Arc::new(move |text: &str, slot: &mut dyn Any| {
            if let Some(slot) = slot.downcast_mut::<T>() {
                *slot = parse(text)?;
            }
            Ok(())
        }));
    }

    pub fn unregister<T: Any>(&self) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&TypeId::of::<T>())
            .is_some()
    }

    pub fn is_registered<T: Any>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    fn insert<T: Any>(&self, convert: Converter) {
        let entry = Entry {
            type_name: std::any::type_name::<T>(),
            convert,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), entry);
    }

    fn lookup(&self, type_id: TypeId) -> Option<Entry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned()
    }

    fn install_builtins(&self) {
        self.register::<Duration, _>(|text| Ok(humantime::parse_duration(text.trim())?));
        self.register::<DateTime<Utc>, _>(|text| {
            Ok(DateTime::parse_from_rfc3339(text.trim())?.with_timezone(&Utc))
        });
        self.register::<DateTime<FixedOffset>, _>(|text| {
            Ok(DateTime::parse_from_rfc3339(text.trim())?)
        });

        let separator = self.list_separator.clone();
        self.insert::<Vec<String>>(Arc::new(move |text: &str, slot: &mut dyn Any| {
            if text.is_empty() {
                return Ok(());
            }
            if let Some(slot) = slot.downcast_mut::<Vec<String>>() {
                *slot = text.split(separator.as_str()).map(String::from).collect();
            }
            Ok(())
        }));
    }

    /// Convert `text` and store it in `slot`.
    ///
    /// A registered converter for the slot's concrete type always wins;
    /// otherwise the slot's primitive kind decides.
    pub fn coerce(&self, field: &str, text: &str, slot: &mut dyn Leaf) -> Result<(), ConfigError> {
        let slot = slot.target();
        let type_name = slot.type_name();
        let parse_failure = |reason: String| ConfigError::ParseFailure {
            field: field.to_string(),
            type_name,
            value: text.to_string(),
            reason,
        };

        let type_id = Any::type_id(slot.as_any());
        if let Some(entry) = self.lookup(type_id) {
            tracing::trace!(field, converter = entry.type_name, "using registered converter");
            return (entry.convert)(text, slot.as_any_mut())
                .map_err(|e| parse_failure(e.to_string()));
        }

        let value = match slot.kind() {
            LeafKind::Bool => Primitive::Bool(parse_bool(text)),
            LeafKind::Signed => Primitive::Signed(parse_signed(text).map_err(parse_failure)?),
            LeafKind::Unsigned => Primitive::Unsigned(parse_unsigned(text).map_err(parse_failure)?),
            LeafKind::Float => Primitive::Float(
                text.parse::<f64>()
                    .map_err(|e| parse_failure(e.to_string()))?,
            ),
            LeafKind::Text => Primitive::Text(text.to_string()),
            LeafKind::Custom => {
                return Err(ConfigError::UnsupportedType {
                    field: field.to_string(),
                    type_name,
                })
            }
        };

        slot.assign(value).map_err(|e| match e {
            AssignError::Mismatch(_) => ConfigError::UnsupportedType {
                field: field.to_string(),
                type_name,
            },
            other => parse_failure(other.to_string()),
        })
    }

    /// Store list elements decoded from a document in `slot`.
    ///
    /// A `Vec<String>` slot takes the elements as they are. Any other slot
    /// gets them joined with the list separator and goes through
    /// [`coerce`](Self::coerce).
    pub fn coerce_items(
        &self,
        field: &str,
        items: &[String],
        slot: &mut dyn Leaf,
    ) -> Result<(), ConfigError> {
        let slot = slot.target();
        if let Some(list) = slot.as_any_mut().downcast_mut::<Vec<String>>() {
            list.clear();
            list.extend_from_slice(items);
            return Ok(());
        }
        self.coerce(field, &items.join(self.list_separator.as_str()), slot)
    }
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CoercionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&str> = entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("CoercionRegistry")
            .field("converters", &names)
            .field("list_separator", &self.list_separator)
            .finish()
    }
}

/// Lenient boolean: a fixed set of truthy tokens, anything else is false.
pub fn parse_bool(text: &str) -> bool {
    let text = text.trim();
    TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(text))
}

/// Parse an integer magnitude, detecting the base from its prefix.
fn parse_magnitude(text: &str) -> Result<u128, String> {
    let (radix, digits) = match text.get(..2) {
        Some("0x") | Some("0X") => (16, &text[2..]),
        Some("0o") | Some("0O") => (8, &text[2..]),
        Some("0b") | Some("0B") => (2, &text[2..]),
        _ if text.len() > 1 && text.starts_with('0') => (8, &text[1..]),
        _ => (10, text),
    };

    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err("invalid digit syntax".to_string());
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if !cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("invalid digit found in string".to_string());
    }
    u128::from_str_radix(&cleaned, radix).map_err(|e| e.to_string())
}

pub fn parse_signed(text: &str) -> Result<i64, String> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = i128::try_from(parse_magnitude(rest)?).map_err(|_| "value out of range".to_string())?;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).map_err(|_| "value out of range".to_string())
}

pub fn parse_unsigned(text: &str) -> Result<u64, String> {
    if text.starts_with('-') || text.starts_with('+') {
        return Err("sign not allowed for unsigned value".to_string());
    }
    u64::try_from(parse_magnitude(text)?).map_err(|_| "value out of range".to_string())
}
