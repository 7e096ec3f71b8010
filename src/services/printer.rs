//! Diagnostic rendering of a resolved record with secrets withheld.

use std::fmt;

use serde_json::{Map, Value};

use crate::domain::models::{FieldDescriptor, FieldNaming, FieldView, Record};

use super::coercion::parse_bool;

const LOGGABLE_KEYS: [&str; 2] = ["loggable", "log"];

/// Renders loggable fields of a record as a JSON object.
///
/// Field names are the lowercased identifiers. A field is left out when it
/// is marked `loggable = "false"`, or when it carries a `secret` annotation
/// without opting back in through `loggable = "true"` or a `loggable` token
/// in the secret annotation itself.
pub struct Printer<'a> {
    record: &'a dyn Record,
}

impl<'a> Printer<'a> {
    pub fn new(record: &'a dyn Record) -> Self {
        Self { record }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(render_record(self.record))
    }
}

fn render_record(record: &dyn Record) -> Map<String, Value> {
    let mut out = Map::new();
    record.visit_fields(&mut |descriptor, view| {
        if !is_loggable(descriptor) {
            return;
        }
        let value = match view {
            FieldView::Leaf(leaf) => leaf.render(),
            FieldView::Record(nested) => Value::Object(render_record(nested)),
            FieldView::OptionalRecord(Some(nested)) => Value::Object(render_record(nested)),
            FieldView::OptionalRecord(None) => Value::Null,
        };
        out.insert(descriptor.ident.to_lowercase(), value);
    });
    out
}

pub fn is_loggable(descriptor: &FieldDescriptor) -> bool {
    if let Some(flag) = descriptor.annotation_any(&LOGGABLE_KEYS) {
        return parse_bool(flag);
    }

    match descriptor.annotation("secret").map(FieldNaming::parse) {
        Some(naming) if !naming.skip => naming
            .aliases
            .iter()
            .any(|token| LOGGABLE_KEYS.contains(&token.as_str())),
        _ => true,
    }
}

impl fmt::Display for Printer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Debug for Printer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Printer").field(&self.record.type_name()).finish()
    }
}
