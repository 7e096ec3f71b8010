//! Leaf values: the field types the walker assigns instead of descending into.

use std::any::Any;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use super::record::{FieldSlot, FieldValue, FieldView, OptionSlot};

/// JSON rendering of a leaf, used by diagnostics.
pub type RenderedValue = serde_json::Value;

/// How the coercion registry treats a leaf that has no registered converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    /// Assigned from verbatim text (strings and `FromStr` types).
    Text,
    /// Only assignable through a registered converter.
    Custom,
}

/// A parsed primitive ready to be stored in a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl Primitive {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Primitive::Bool(_) => "bool",
            Primitive::Signed(_) => "signed integer",
            Primitive::Unsigned(_) => "unsigned integer",
            Primitive::Float(_) => "float",
            Primitive::Text(_) => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("value out of range")]
    OutOfRange,

    #[error("{0}")]
    Invalid(String),

    #[error("cannot assign a {0} to this field")]
    Mismatch(&'static str),
}

/// A destination slot the walker hands to a provider's setter.
pub trait Leaf: Any + Send {
    fn kind(&self) -> LeafKind;

    fn type_name(&self) -> &'static str;

    /// True while the slot still holds its type's default value.
    fn is_default(&self) -> bool;

    fn assign(&mut self, value: Primitive) -> Result<(), AssignError>;

    /// The concrete slot to write into. Optional leaves allocate here.
    fn target(&mut self) -> &mut dyn Leaf;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn render(&self) -> RenderedValue;
}

macro_rules! leaf_common {
    () => {
        fn type_name(&self) -> &'static str {
            ::std::any::type_name::<Self>()
        }

        fn target(&mut self) -> &mut dyn Leaf {
            self
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}

macro_rules! leaf_field {
    ($($t:ty),+ $(,)?) => {
        $(
            impl FieldValue for $t {
                fn slot(&mut self) -> FieldSlot<'_> {
                    FieldSlot::Leaf(self)
                }

                fn view(&self) -> FieldView<'_> {
                    FieldView::Leaf(self)
                }
            }

            impl OptionSlot for $t {
                fn option_slot(opt: &mut Option<Self>) -> FieldSlot<'_> {
                    FieldSlot::Leaf(opt)
                }

                fn option_view(opt: &Option<Self>) -> FieldView<'_> {
                    FieldView::Leaf(opt)
                }
            }
        )+
    };
}

macro_rules! integer_leaf {
    ($kind:ident, $variant:ident: $($t:ty),+) => {
        $(
            impl Leaf for $t {
                fn kind(&self) -> LeafKind {
                    LeafKind::$kind
                }

                fn is_default(&self) -> bool {
                    *self == 0
                }

                fn assign(&mut self, value: Primitive) -> Result<(), AssignError> {
                    match value {
                        Primitive::$variant(n) => {
                            *self = <$t>::try_from(n).map_err(|_| AssignError::OutOfRange)?;
                            Ok(())
                        }
                        other => Err(AssignError::Mismatch(other.kind_name())),
                    }
                }

                fn render(&self) -> RenderedValue {
                    RenderedValue::from(*self)
                }

                leaf_common!();
            }

            leaf_field!($t);
        )+
    };
}

integer_leaf!(Signed, Signed: i8, i16, i32, i64, isize);
integer_leaf!(Unsigned, Unsigned: u8, u16, u32, u64, usize);

macro_rules! float_leaf {
    ($($t:ty),+) => {
        $(
            impl Leaf for $t {
                fn kind(&self) -> LeafKind {
                    LeafKind::Float
                }

                fn is_default(&self) -> bool {
                    *self == 0.0
                }

                fn assign(&mut self, value: Primitive) -> Result<(), AssignError> {
                    match value {
                        Primitive::Float(f) => {
                            *self = f as $t;
                            Ok(())
                        }
                        other => Err(AssignError::Mismatch(other.kind_name())),
                    }
                }

                fn render(&self) -> RenderedValue {
                    RenderedValue::from(*self)
                }

                leaf_common!();
            }

            leaf_field!($t);
        )+
    };
}

float_leaf!(f32, f64);

impl Leaf for bool {
    fn kind(&self) -> LeafKind {
        LeafKind::Bool
    }

    fn is_default(&self) -> bool {
        !*self
    }

    fn assign(&mut self, value: Primitive) -> Result<(), AssignError> {
        match value {
            Primitive::Bool(b) => {
                *self = b;
                Ok(())
            }
            other => Err(AssignError::Mismatch(other.kind_name())),
        }
    }

    fn render(&self) -> RenderedValue {
        RenderedValue::Bool(*self)
    }

    leaf_common!();
}

impl Leaf for String {
    fn kind(&self) -> LeafKind {
        LeafKind::Text
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }

    fn assign(&mut self, value: Primitive) -> Result<(), AssignError> {
        match value {
            Primitive::Text(text) => {
                *self = text;
                Ok(())
            }
            other => Err(AssignError::Mismatch(other.kind_name())),
        }
    }

    fn render(&self) -> RenderedValue {
        RenderedValue::String(self.clone())
    }

    leaf_common!();
}

impl Leaf for PathBuf {
    fn kind(&self) -> LeafKind {
        LeafKind::Text
    }

    fn is_default(&self) -> bool {
        self.as_os_str().is_empty()
    }

    fn assign(&mut self, value: Primitive) -> Result<(), AssignError> {
        match value {
            Primitive::Text(text) => {
                *self = PathBuf::from(text);
                Ok(())
            }
            other => Err(AssignError::Mismatch(other.kind_name())),
        }
    }

    fn render(&self) -> RenderedValue {
        RenderedValue::String(self.to_string_lossy().into_owned())
    }

    leaf_common!();
}

leaf_field!(bool, String, PathBuf);

macro_rules! custom_leaf {
    ($t:ty, |$this:ident| default: $is_default:expr, render: $render:expr) => {
        impl Leaf for $t {
            fn kind(&self) -> LeafKind {
                LeafKind::Custom
            }

            fn is_default(&self) -> bool {
                let $this = self;
                $is_default
            }

            fn assign(&mut self, value: Primitive) -> Result<(), AssignError> {
                Err(AssignError::Mismatch(value.kind_name()))
            }

            fn render(&self) -> RenderedValue {
                let $this = self;
                $render
            }

            leaf_common!();
        }

        leaf_field!($t);
    };
}

custom_leaf!(Duration, |d| default: d.is_zero(),
    render: RenderedValue::String(humantime::format_duration(*d).to_string()));
custom_leaf!(DateTime<Utc>, |t| default: *t == DateTime::<Utc>::default(),
    render: RenderedValue::String(t.to_rfc3339()));
custom_leaf!(DateTime<FixedOffset>, |t| default: *t == DateTime::<FixedOffset>::default(),
    render: RenderedValue::String(t.to_rfc3339()));
custom_leaf!(Vec<String>, |v| default: v.is_empty(),
    render: RenderedValue::from(v.clone()));

impl<T: Leaf + Default> Leaf for Option<T> {
    fn kind(&self) -> LeafKind {
        match self {
            Some(inner) => inner.kind(),
            None => T::default().kind(),
        }
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn is_default(&self) -> bool {
        self.is_none()
    }

    fn assign(&mut self, value: Primitive) -> Result<(), AssignError> {
        self.get_or_insert_with(T::default).assign(value)
    }

    fn target(&mut self) -> &mut dyn Leaf {
        self.get_or_insert_with(T::default)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn render(&self) -> RenderedValue {
        self.as_ref().map_or(RenderedValue::Null, |inner| inner.render())
    }
}

/// Mark `FromStr + Display` types as text leaves.
///
/// The type must also implement `Default`, `PartialEq` and `Send`, and its
/// `FromStr::Err` must implement `Display`.
///
/// ```ignore
/// #[derive(Debug, Default, PartialEq)]
/// struct Region(String);
///
/// impl std::str::FromStr for Region { /* ... */ }
/// impl std::fmt::Display for Region { /* ... */ }
///
/// strata::impl_text_leaf!(Region);
/// ```
#[macro_export]
macro_rules! impl_text_leaf {
    ($($t:ty),+ $(,)?) => {
        $(
            impl $crate::Leaf for $t {
                fn kind(&self) -> $crate::LeafKind {
                    $crate::LeafKind::Text
                }

                fn type_name(&self) -> &'static str {
                    ::core::any::type_name::<Self>()
                }

                fn is_default(&self) -> bool {
                    *self == <$t as ::core::default::Default>::default()
                }

                fn assign(
                    &mut self,
                    value: $crate::Primitive,
                ) -> ::core::result::Result<(), $crate::AssignError> {
                    match value {
                        $crate::Primitive::Text(text) => {
                            *self = text
                                .parse::<$t>()
                                .map_err(|e| $crate::AssignError::Invalid(e.to_string()))?;
                            ::core::result::Result::Ok(())
                        }
                        other => ::core::result::Result::Err(
                            $crate::AssignError::Mismatch(other.kind_name()),
                        ),
                    }
                }

                fn target(&mut self) -> &mut dyn $crate::Leaf {
                    self
                }

                fn as_any(&self) -> &dyn ::core::any::Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                    self
                }

                fn render(&self) -> $crate::RenderedValue {
                    $crate::RenderedValue::String(self.to_string())
                }
            }

            impl $crate::FieldValue for $t {
                fn slot(&mut self) -> $crate::FieldSlot<'_> {
                    $crate::FieldSlot::Leaf(self)
                }

                fn view(&self) -> $crate::FieldView<'_> {
                    $crate::FieldView::Leaf(self)
                }
            }

            impl $crate::OptionSlot for $t {
                fn option_slot(opt: &mut ::core::option::Option<Self>) -> $crate::FieldSlot<'_> {
                    $crate::FieldSlot::Leaf(opt)
                }

                fn option_view(opt: &::core::option::Option<Self>) -> $crate::FieldView<'_> {
                    $crate::FieldView::Leaf(opt)
                }
            }
        )+
    };
}
