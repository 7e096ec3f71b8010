//! Structured decoders for file and remote documents.

use std::path::Path;

use serde_json::Value;

use crate::domain::errors::DecodeError;
use crate::domain::ports::{Decoder, ValueMap};

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlDecoder;

impl Decoder for YamlDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ValueMap, DecodeError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ValueMap::new());
        }
        into_map(serde_yaml::from_slice(bytes)?)
    }
}

impl Decoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ValueMap, DecodeError> {
        into_map(serde_json::from_slice(bytes)?)
    }
}

impl Decoder for TomlDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ValueMap, DecodeError> {
        let text = std::str::from_utf8(bytes)?;
        into_map(toml::from_str(text)?)
    }
}

/// Decoder for a file extension (without the dot), case-insensitive.
pub fn decoder_for_extension(extension: &str) -> Option<Box<dyn Decoder>> {
    match extension.to_ascii_lowercase().as_str() {
        "yml" | "yaml" => Some(Box::new(YamlDecoder)),
        "json" => Some(Box::new(JsonDecoder)),
        "toml" => Some(Box::new(TomlDecoder)),
        _ => None,
    }
}

pub fn decoder_for_path(path: &Path) -> Option<Box<dyn Decoder>> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(decoder_for_extension)
}

/// An empty document decodes to an empty map.
fn into_map(value: Value) -> Result<ValueMap, DecodeError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ValueMap::new()),
        Value::Bool(_) => Err(DecodeError::NotAMap("a boolean")),
        Value::Number(_) => Err(DecodeError::NotAMap("a number")),
        Value::String(_) => Err(DecodeError::NotAMap("a string")),
        Value::Array(_) => Err(DecodeError::NotAMap("a sequence")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_nested() {
        let map = YamlDecoder
            .decode(b"name: svc\ndb:\n  port: 5432\n  hosts: [a, b]\n")
            .unwrap();
        assert_eq!(map["name"], json!("svc"));
        assert_eq!(map["db"]["port"], json!(5432));
        assert_eq!(map["db"]["hosts"], json!(["a", "b"]));
    }

    #[test]
    fn test_empty_yaml_is_empty_map() {
        assert!(YamlDecoder.decode(b"").unwrap().is_empty());
    }

    #[test]
    fn test_toml_and_json() {
        let map = TomlDecoder.decode(b"port = 8080\n[db]\nhost = \"x\"\n").unwrap();
        assert_eq!(map["db"]["host"], json!("x"));
        let map = JsonDecoder.decode(br#"{"port": 8080}"#).unwrap();
        assert_eq!(map["port"], json!(8080));
    }

    #[test]
    fn test_top_level_must_be_map() {
        assert!(matches!(
            JsonDecoder.decode(b"[1, 2]"),
            Err(DecodeError::NotAMap("a sequence"))
        ));
        assert!(matches!(YamlDecoder.decode(b"- a\n"), Err(DecodeError::NotAMap(_))));
        assert!(matches!(TomlDecoder.decode(&[0xff, 0xfe]), Err(DecodeError::Utf8(_))));
    }

    #[test]
    fn test_decoder_lookup() {
        assert!(decoder_for_path(Path::new("/etc/app.YML")).is_some());
        assert!(decoder_for_path(Path::new("app.ini")).is_none());
        assert!(decoder_for_path(Path::new("app")).is_none());
    }
}
