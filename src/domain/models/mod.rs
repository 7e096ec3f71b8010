pub mod field;
pub mod leaf;
pub mod record;

pub use field::{FieldDescriptor, FieldNaming, BACKUP_KEY, SKIP_SENTINEL};
pub use leaf::{AssignError, Leaf, LeafKind, Primitive, RenderedValue};
pub use record::{
    FieldShape, FieldSlot, FieldValue, FieldView, FieldVisitor, FieldVisitorMut, OptionSlot,
    OptionalRecord, Record,
};
