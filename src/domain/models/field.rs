//! Static field metadata and the annotation naming mini-language.

/// Annotation value meaning "do not resolve this field (or its subtree) from this source".
pub const SKIP_SENTINEL: &str = "-";

/// Annotation key consulted when a source-specific key is absent.
pub const BACKUP_KEY: &str = "cfg";

/// Compile-time description of one record field.
///
/// Built by [`config_record!`](crate::config_record); annotations are the
/// `key = "value"` pairs written in the field's `#[field(...)]` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub ident: &'static str,
    pub type_name: &'static str,
    pub annotations: &'static [(&'static str, &'static str)],
}

impl FieldDescriptor {
    pub const fn new(
        ident: &'static str,
        type_name: &'static str,
        annotations: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            ident,
            type_name,
            annotations,
        }
    }

    /// Raw annotation value for `key`, if the field carries one.
    pub fn annotation(&self, key: &str) -> Option<&'static str> {
        self.annotations
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// First annotation present among `keys`, in order.
    pub fn annotation_any(&self, keys: &[&str]) -> Option<&'static str> {
        keys.iter().find_map(|key| self.annotation(key))
    }

    /// Parsed naming for `key`, falling back to `backup` and then to the
    /// lowercased field identifier.
    pub fn naming(&self, key: &str, backup: Option<&str>) -> FieldNaming {
        let raw = self
            .annotation(key)
            .or_else(|| backup.and_then(|b| self.annotation(b)));

        match raw {
            Some(raw) => FieldNaming::parse(raw),
            None => FieldNaming::from_ident(self.ident),
        }
    }
}

/// Parsed form of a naming annotation such as `"name,alias"` or `"-"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNaming {
    pub primary: String,
    pub aliases: Vec<String>,
    pub skip: bool,
}

impl FieldNaming {
    /// Only an annotation that is exactly `"-"` is a skip; `"-,x"` names a field `-`.
    pub fn parse(raw: &str) -> Self {
        if raw == SKIP_SENTINEL {
            return Self {
                primary: SKIP_SENTINEL.to_string(),
                aliases: Vec::new(),
                skip: true,
            };
        }

        let mut tokens = raw.split(',');
        let primary = tokens.next().unwrap_or_default().to_string();
        let aliases = tokens
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        Self {
            primary,
            aliases,
            skip: false,
        }
    }

    pub fn from_ident(ident: &str) -> Self {
        Self {
            primary: ident.to_lowercase(),
            aliases: Vec::new(),
            skip: false,
        }
    }

    /// Primary name followed by aliases.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}
