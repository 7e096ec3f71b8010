//! Routes a decoded document onto a record.
//!
//! Shared by the file, remote KV and secret store providers so all three
//! name and coerce fields identically.

use serde_json::Value;

use crate::domain::errors::ConfigError;
use crate::domain::models::Record;
use crate::domain::ports::ValueMap;
use crate::services::coercion::CoercionRegistry;
use crate::services::naming::SeparatorNamer;
use crate::services::walker::{walk, ResolvedField};

pub const PATH_SEPARATOR: &str = ".";

/// Set every leaf of `record` that has a value in `map`.
pub fn apply_map(
    record: &mut dyn Record,
    map: &ValueMap,
    namer: &SeparatorNamer,
    registry: &CoercionRegistry,
) -> Result<(), ConfigError> {
    walk(
        record,
        namer,
        &mut |field, leaf| {
            let Some(value) = lookup(map, field) else {
                return Ok(());
            };
            match to_input(value) {
                Ok(Some(Input::Text(text))) => registry.coerce(&field.name, &text, leaf),
                Ok(Some(Input::Items(items))) => registry.coerce_items(&field.name, &items, leaf),
                Ok(None) => Ok(()),
                Err(reason) => Err(ConfigError::ParseFailure {
                    field: field.name.clone(),
                    type_name: leaf.type_name(),
                    value: value.to_string(),
                    reason,
                }),
            }
        },
        "",
        false,
    )
}

/// First value found under the field's name or one of its aliases.
pub fn lookup<'m>(map: &'m ValueMap, field: &ResolvedField) -> Option<&'m Value> {
    field.candidates().find_map(|name| navigate(map, name))
}

fn navigate<'m>(map: &'m ValueMap, path: &str) -> Option<&'m Value> {
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let (last, parents) = segments.split_last()?;

    let mut current = map;
    for segment in parents {
        match get_key(current, segment)? {
            Value::Object(inner) => current = inner,
            _ => return None,
        }
    }
    get_key(current, last)
}

/// Exact key, then `-`/`_` swapped, then case-insensitive.
fn get_key<'m>(map: &'m ValueMap, key: &str) -> Option<&'m Value> {
    map.get(key)
        .or_else(|| map.get(&key.replace('-', "_")))
        .or_else(|| map.get(&key.replace('_', "-")))
        .or_else(|| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
}

/// A document value reduced to what a leaf can take.
enum Input {
    Text(String),
    /// Elements of a list, each kept whole.
    Items(Vec<String>),
}

/// `None` for null.
fn to_input(value: &Value) -> Result<Option<Input>, String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| scalar_text(item).map(Option::unwrap_or_default))
            .collect::<Result<Vec<_>, _>>()
            .map(|items| Some(Input::Items(items))),
        scalar => Ok(scalar_text(scalar)?.map(Input::Text)),
    }
}

fn scalar_text(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Array(_) => Err("nested collections are not supported in a list".to_string()),
        Value::Object(_) => Err("expected a scalar, found a map".to_string()),
    }
}
