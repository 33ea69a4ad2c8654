//! Type descriptors: the closed vocabulary target schemas are written in.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::diagnostics::cjoin;
use crate::node::{Node, ScalarKind};

/// Describes the shape a node must have.
///
/// Descriptors are immutable values. [`Type::Union`] with a `null` member is
/// what an optional value looks like; see [`Type::optional`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// A scalar whose intrinsic kind is exactly this one.
    Scalar(ScalarKind),
    /// A boolean that only wins a union when nothing else does.
    ///
    /// Use it next to `int` in unions of int and bool; when both this and
    /// [`Type::BOOL`] recognize a node, the union keeps the plain bool.
    BoolFix,
    /// Any one of the alternatives.
    Union(Vec<Type>),
    /// A sequence whose items all have the given type.
    Seq(Box<Type>),
    /// A mapping with keys and values of the given types. Keys must be string-like.
    Map(Box<Type>, Box<Type>),
    /// An instance of a registered class, or of one of its registered subclasses.
    Class(String),
    /// Anything at all, passed through untouched.
    Any,
    /// Declared absent; treated like [`Type::Any`].
    Untyped,
}

impl Type {
    pub const STR: Type = Type::Scalar(ScalarKind::Str);
    pub const INT: Type = Type::Scalar(ScalarKind::Int);
    pub const FLOAT: Type = Type::Scalar(ScalarKind::Float);
    pub const BOOL: Type = Type::Scalar(ScalarKind::Bool);
    pub const NULL: Type = Type::Scalar(ScalarKind::Null);
    pub const TIMESTAMP: Type = Type::Scalar(ScalarKind::Timestamp);
    pub const BOOL_FIX: Type = Type::BoolFix;

    /// `T` or null.
    pub fn optional(t: Type) -> Type {
        Type::union([t, Type::NULL])
    }

    /// A union of the given alternatives. Nested unions are flattened and
    /// duplicates dropped; a single alternative is returned as itself.
    pub fn union(alternatives: impl IntoIterator<Item = Type>) -> Type {
        let mut flat: Vec<Type> = Vec::new();
        for alternative in alternatives {
            match alternative {
                Type::Union(inner) => {
                    for t in inner {
                        if !flat.contains(&t) {
                            flat.push(t);
                        }
                    }
                }
                t => {
                    if !flat.contains(&t) {
                        flat.push(t);
                    }
                }
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Type::Union(flat)
        }
    }

    pub fn seq(item: Type) -> Type {
        Type::Seq(Box::new(item))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    /// A mapping from strings to `value`.
    pub fn dict(value: Type) -> Type {
        Type::map(Type::STR, value)
    }

    pub fn class(name: impl Into<String>) -> Type {
        Type::Class(name.into())
    }

    /// Whether a null value satisfies this type without further ado.
    pub fn accepts_null(&self) -> bool {
        match self {
            Type::Scalar(ScalarKind::Null) | Type::Any | Type::Untyped => true,
            Type::Union(alternatives) => alternatives.iter().any(Type::accepts_null),
            _ => false,
        }
    }

    /// Human-readable description, as used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Type::Scalar(ScalarKind::Str) => "a string".to_string(),
            Type::Scalar(ScalarKind::Int) => "an int".to_string(),
            Type::Scalar(ScalarKind::Float) => "a float".to_string(),
            Type::Scalar(ScalarKind::Bool) | Type::BoolFix => "a boolean".to_string(),
            Type::Scalar(ScalarKind::Null) => "a null value".to_string(),
            Type::Scalar(ScalarKind::Timestamp) => "a date or time".to_string(),
            Type::Union(alternatives) => format!(
                "any one of {}",
                cjoin("or", alternatives.iter().map(Type::describe))
            ),
            Type::Seq(item) => format!("a list of ({})", item.describe()),
            Type::Map(_, value) => format!("a dict of string to ({})", value.describe()),
            Type::Any | Type::Untyped => {
                "a string, int, float, boolean, null value, list or dict".to_string()
            }
            Type::Class(name) => format!("a(n) {name}"),
        }
    }

    /// Visit every class named anywhere inside this descriptor.
    pub(crate) fn for_each_class<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Type::Class(name) => f(name),
            Type::Union(alternatives) => alternatives.iter().for_each(|t| t.for_each_class(f)),
            Type::Seq(item) => item.for_each_class(f),
            Type::Map(key, value) => {
                key.for_each_class(f);
                value.for_each_class(f);
            }
            Type::Scalar(_) | Type::BoolFix | Type::Any | Type::Untyped => {}
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Scalar(kind) => write!(f, "{kind}"),
            Type::BoolFix => f.write_str("bool_union_fix"),
            Type::Union(alternatives) => {
                f.write_str("Union[")?;
                for (i, t) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_str("]")
            }
            Type::Seq(item) => write!(f, "List[{item}]"),
            Type::Map(key, value) => write!(f, "Dict[{key}, {value}]"),
            Type::Class(name) => f.write_str(name),
            Type::Any => f.write_str("Any"),
            Type::Untyped => f.write_str("Untyped"),
        }
    }
}

/// Rust types that know their own [`Type`].
///
/// Implemented for the scalar primitives, `String`, `PathBuf`, `Option`,
/// `Vec`, string-keyed maps and [`Node`]. Registered classes implement it
/// by returning [`Type::class`] with their registered name.
pub trait Typed {
    fn yaml_type() -> Type;
}

macro_rules! typed_scalar {
    ($ty:expr => $($t:ty),*) => {
        $(
            impl Typed for $t {
                fn yaml_type() -> Type {
                    $ty
                }
            }
        )*
    };
}

typed_scalar!(Type::STR => String, char, PathBuf);
typed_scalar!(Type::INT => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
typed_scalar!(Type::FLOAT => f32, f64);
typed_scalar!(Type::BOOL => bool);
typed_scalar!(Type::NULL => ());
typed_scalar!(Type::Any => Node);

impl<T: Typed> Typed for Option<T> {
    fn yaml_type() -> Type {
        Type::optional(T::yaml_type())
    }
}

impl<T: Typed> Typed for Vec<T> {
    fn yaml_type() -> Type {
        Type::seq(T::yaml_type())
    }
}

impl<T: Typed> Typed for Box<T> {
    fn yaml_type() -> Type {
        T::yaml_type()
    }
}

impl<T: Typed> Typed for BTreeMap<String, T> {
    fn yaml_type() -> Type {
        Type::dict(T::yaml_type())
    }
}

impl<T: Typed, S: BuildHasher> Typed for HashMap<String, T, S> {
    fn yaml_type() -> Type {
        Type::dict(T::yaml_type())
    }
}

impl<T: Typed, S: BuildHasher> Typed for IndexMap<String, T, S> {
    fn yaml_type() -> Type {
        Type::dict(T::yaml_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unions_flatten_and_collapse() {
        assert_eq!(Type::union([Type::INT]), Type::INT);
        assert_eq!(
            Type::union([Type::INT, Type::union([Type::STR, Type::INT])]),
            Type::Union(vec![Type::INT, Type::STR])
        );
        assert_eq!(Type::optional(Type::FLOAT), Type::Union(vec![Type::FLOAT, Type::NULL]));
    }

    #[test]
    fn descriptions() {
        assert_eq!(Type::INT.describe(), "an int");
        assert_eq!(
            Type::seq(Type::class("Shape")).describe(),
            "a list of (a(n) Shape)"
        );
        assert_eq!(
            Type::dict(Type::optional(Type::STR)).describe(),
            "a dict of string to (any one of a string or a null value)"
        );
    }

    #[test]
    fn rust_types_know_their_descriptor() {
        assert_eq!(<Vec<Option<i32>>>::yaml_type(), Type::seq(Type::optional(Type::INT)));
        assert_eq!(<IndexMap<String, Node>>::yaml_type(), Type::dict(Type::Any));
        assert!(<Option<String>>::yaml_type().accepts_null());
    }
}
