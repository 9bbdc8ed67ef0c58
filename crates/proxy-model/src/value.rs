//! Runtime values
//!
//! Arguments passed to constructors and members, and values returned from
//! them. Every non-null value knows its runtime type, which is what overload
//! resolution works from.

use crate::core_types::core_types;
use crate::types::{TypeHandle, TypeRef};
use std::fmt::{self, Display, Formatter};

/// A runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null reference
    Null,

    /// `System.Boolean`
    Bool(bool),

    /// `System.Int32`
    Int(i32),

    /// `System.Double`
    Float(f64),

    /// `System.String`
    Str(String),

    /// Single-dimensional array
    Array(ArrayValue),

    /// Opaque instance of a type
    Object(TypeHandle),
}

impl Value {
    /// Runtime type, `None` for null
    #[must_use]
    pub fn runtime_type(&self) -> Option<TypeRef> {
        let core = core_types();
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(TypeRef::of(&core.boolean)),
            Self::Int(_) => Some(TypeRef::of(&core.int32)),
            Self::Float(_) => Some(TypeRef::of(&core.double)),
            Self::Str(_) => Some(TypeRef::of(&core.string)),
            Self::Array(array) => Some(TypeRef::array_of(array.element_type.clone())),
            Self::Object(handle) => Some(TypeRef::of(handle)),
        }
    }

    /// Whether this is the null reference
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// String contents, if this is a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer contents, if this is an integer
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Array contents, if this is an array
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Array(a) => write!(f, "{a}"),
            Self::Object(handle) => write!(f, "{}", handle.full_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<ArrayValue> for Value {
    fn from(a: ArrayValue) -> Self {
        Self::Array(a)
    }
}

/// Array value with a declared element type
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    element_type: TypeRef,
    items: Vec<Value>,
}

impl ArrayValue {
    /// Create array of `element_type`
    #[inline]
    #[must_use]
    pub fn new(element_type: TypeRef, items: Vec<Value>) -> Self {
        Self {
            element_type,
            items,
        }
    }

    /// Empty array of `element_type`
    #[inline]
    #[must_use]
    pub fn empty(element_type: TypeRef) -> Self {
        Self::new(element_type, Vec::new())
    }

    /// Declared element type
    #[inline]
    #[must_use]
    pub fn element_type(&self) -> &TypeRef {
        &self.element_type
    }

    /// Elements
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Number of elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the array has no elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Display for ArrayValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[]{{", self.element_type.full_name())?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("}")
    }
}
