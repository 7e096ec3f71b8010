pub mod coercion;
pub mod naming;
pub mod pipeline;
pub mod printer;
pub mod walker;
pub mod watch;

pub use coercion::CoercionRegistry;
pub use naming::{join_field_names, FieldNamer, NameCase, ResolvedName, SeparatorNamer};
pub use pipeline::{classify, ErrorClass, LoadContext, Pipeline, Provider};
pub use printer::Printer;
pub use walker::{walk, LeafSetter, ResolvedField};
pub use watch::{watch_key, Subscription, Update};
