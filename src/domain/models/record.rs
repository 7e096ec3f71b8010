//! Record description: the compile-time field table the walker traverses.

use crate::domain::errors::ConfigError;

use super::field::FieldDescriptor;
use super::leaf::Leaf;

/// Mutable access to one field, as seen by the walker.
pub enum FieldSlot<'a> {
    Leaf(&'a mut dyn Leaf),
    Record(&'a mut dyn Record),
    OptionalRecord(&'a mut dyn OptionalRecord),
}

/// Read-only access to one field, as seen by diagnostics.
pub enum FieldView<'a> {
    Leaf(&'a dyn Leaf),
    Record(&'a dyn Record),
    OptionalRecord(Option<&'a dyn Record>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Leaf,
    Nested,
}

impl FieldSlot<'_> {
    pub fn shape(&self) -> FieldShape {
        match self {
            FieldSlot::Leaf(_) => FieldShape::Leaf,
            FieldSlot::Record(_) | FieldSlot::OptionalRecord(_) => FieldShape::Nested,
        }
    }
}

pub type FieldVisitorMut<'v> =
    dyn FnMut(&'static FieldDescriptor, FieldSlot<'_>) -> Result<(), ConfigError> + 'v;

pub type FieldVisitor<'v> = dyn FnMut(&'static FieldDescriptor, FieldView<'_>) + 'v;

/// A configuration record: a struct of named fields visited in declaration order.
///
/// Implemented by [`config_record!`](crate::config_record).
pub trait Record: Send {
    fn type_name(&self) -> &'static str;

    /// False for an unset optional record; resolution into it fails with `NotARecord`.
    fn is_present(&self) -> bool {
        true
    }

    fn visit_fields_mut(&mut self, visit: &mut FieldVisitorMut<'_>) -> Result<(), ConfigError>;

    fn visit_fields(&self, visit: &mut FieldVisitor<'_>);
}

/// A nested `Option<Record>` field, allocated when the walker descends into it.
pub trait OptionalRecord: Send {
    fn is_allocated(&self) -> bool;

    fn get_or_allocate(&mut self) -> &mut dyn Record;
}

impl<R: Record + Default> OptionalRecord for Option<R> {
    fn is_allocated(&self) -> bool {
        self.is_some()
    }

    fn get_or_allocate(&mut self) -> &mut dyn Record {
        self.get_or_insert_with(R::default)
    }
}

impl<R: Record> Record for Option<R> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn is_present(&self) -> bool {
        self.is_some()
    }

    fn visit_fields_mut(&mut self, visit: &mut FieldVisitorMut<'_>) -> Result<(), ConfigError> {
        match self {
            Some(inner) => inner.visit_fields_mut(visit),
            None => Ok(()),
        }
    }

    fn visit_fields(&self, visit: &mut FieldVisitor<'_>) {
        if let Some(inner) = self {
            inner.visit_fields(visit);
        }
    }
}

/// Conversion from a struct field to the walker's view of it.
pub trait FieldValue {
    fn slot(&mut self) -> FieldSlot<'_>;

    fn view(&self) -> FieldView<'_>;
}

/// Per-type dispatch for `Option<T>` fields: leaves stay leaves, records become optional records.
pub trait OptionSlot: Sized {
    fn option_slot(opt: &mut Option<Self>) -> FieldSlot<'_>;

    fn option_view(opt: &Option<Self>) -> FieldView<'_>;
}

impl<T: OptionSlot> FieldValue for Option<T> {
    fn slot(&mut self) -> FieldSlot<'_> {
        T::option_slot(self)
    }

    fn view(&self) -> FieldView<'_> {
        T::option_view(self)
    }
}

/// Declare a configuration record.
///
/// Wraps an ordinary struct definition and generates its [`Record`] table.
/// Each field may carry one `#[field(key = "value", ...)]` attribute after its
/// doc comments. Every field type must be a leaf, another record, or an
/// `Option` of either. Records must implement `Default`.
///
/// ```ignore
/// strata::config_record! {
///     #[derive(Debug, Default)]
///     pub struct Settings {
///         #[field(default = "Jan")]
///         pub name: String,
///         #[field(default = "8080", env = "PORT")]
///         pub port: u16,
///         #[field(cmd = "db")]
///         pub database: Database,
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[field($($key:ident = $value:literal),* $(,)?)])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $fvis $field: $ty,
            )*
        }

        impl $name {
            #[doc(hidden)]
            pub const FIELD_DESCRIPTORS: &'static [$crate::FieldDescriptor] = &[
                $(
                    $crate::FieldDescriptor::new(
                        stringify!($field),
                        stringify!($ty),
                        &[$($((stringify!($key), $value),)*)?],
                    ),
                )*
            ];
        }

        impl $crate::Record for $name {
            fn type_name(&self) -> &'static str {
                ::core::any::type_name::<Self>()
            }

            fn visit_fields_mut(
                &mut self,
                visit: &mut $crate::FieldVisitorMut<'_>,
            ) -> ::core::result::Result<(), $crate::ConfigError> {
                #[allow(unused_mut, unused_variables)]
                let mut descriptors = Self::FIELD_DESCRIPTORS.iter();
                $(
                    if let ::core::option::Option::Some(descriptor) = descriptors.next() {
                        visit(descriptor, $crate::FieldValue::slot(&mut self.$field))?;
                    }
                )*
                ::core::result::Result::Ok(())
            }

            fn visit_fields(&self, visit: &mut $crate::FieldVisitor<'_>) {
                #[allow(unused_mut, unused_variables)]
                let mut descriptors = Self::FIELD_DESCRIPTORS.iter();
                $(
                    if let ::core::option::Option::Some(descriptor) = descriptors.next() {
                        visit(descriptor, $crate::FieldValue::view(&self.$field));
                    }
                )*
            }
        }

        impl $crate::FieldValue for $name {
            fn slot(&mut self) -> $crate::FieldSlot<'_> {
                $crate::FieldSlot::Record(self)
            }

            fn view(&self) -> $crate::FieldView<'_> {
                $crate::FieldView::Record(self)
            }
        }

        impl $crate::OptionSlot for $name {
            fn option_slot(opt: &mut ::core::option::Option<Self>) -> $crate::FieldSlot<'_> {
                $crate::FieldSlot::OptionalRecord(opt)
            }

            fn option_view(opt: &::core::option::Option<Self>) -> $crate::FieldView<'_> {
                $crate::FieldView::OptionalRecord(
                    opt.as_ref().map(|inner| inner as &dyn $crate::Record),
                )
            }
        }
    };
}
