//! Type registry
//!
//! Provides [`TypeRegistry`], a concurrent name → type index used to resolve
//! manifest type expressions and JSON argument values.
//!
//! Short aliases are accepted wherever a type name is: `object`, `string`,
//! `int`, `bool`, `double`.

use crate::core_types::core_types;
use crate::error::ModelError;
use crate::manifest::TypeExpr;
use crate::types::{TypeHandle, TypeRef, TypeSpec};
use crate::value::{ArrayValue, Value};
use dashmap::DashMap;

/// Concurrent index of types by full name
///
/// The built-in types are always registered.
#[derive(Debug)]
pub struct TypeRegistry {
    types: DashMap<String, TypeHandle>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create registry holding only the built-in types
    #[must_use]
    pub fn new() -> Self {
        let types = DashMap::new();
        for handle in core_types().all() {
            types.insert(handle.full_name(), handle.clone());
        }
        Self { types }
    }

    /// Register a type under its full name
    ///
    /// # Errors
    /// Returns [`ModelError::DuplicateType`] if the name is taken
    pub fn register(&self, handle: TypeHandle) -> Result<(), ModelError> {
        match self.types.entry(handle.full_name()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                Err(ModelError::DuplicateType(entry.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(handle);
                Ok(())
            }
        }
    }

    /// Look up a type by full name or alias
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeHandle> {
        if let Some(alias) = alias(name) {
            return Some(alias.clone());
        }
        self.types.get(name).map(|entry| entry.value().clone())
    }

    /// Look up a type, failing if absent
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownType`] if no type has that name
    pub fn require(&self, name: &str) -> Result<TypeHandle, ModelError> {
        self.get(name)
            .ok_or_else(|| ModelError::UnknownType(name.to_string()))
    }

    /// Number of registered types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered (never true: built-ins are always present)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolve a type expression
    ///
    /// Names listed in `generic_scope` resolve to unbound generic parameters.
    ///
    /// # Errors
    /// Fails on unknown names and on invalid generic instantiations
    pub fn resolve(&self, expr: &TypeExpr, generic_scope: &[String]) -> Result<TypeRef, ModelError> {
        match expr {
            TypeExpr::Name(name) => {
                let mut base = name.trim();
                let mut rank = 0;
                while let Some(stripped) = base.strip_suffix("[]") {
                    base = stripped.trim_end();
                    rank += 1;
                }
                let inner = if generic_scope.iter().any(|p| p == base) {
                    TypeRef::param(base)
                } else {
                    TypeRef::Type(self.require(base)?)
                };
                Ok(wrap_arrays(inner, rank))
            }
            TypeExpr::Generic {
                generic,
                args,
                rank,
            } => {
                let definition = self.require(generic)?;
                let arguments = args
                    .iter()
                    .map(|a| self.resolve(a, generic_scope))
                    .collect::<Result<Vec<_>, _>>()?;
                let closed = TypeSpec::make_generic(&definition, arguments)?;
                Ok(wrap_arrays(TypeRef::Type(closed), *rank))
            }
        }
    }

    /// Convert a JSON value to a runtime value
    ///
    /// - `null`, booleans, strings map directly
    /// - integers become `Int`; ones outside the `i32` range are rejected
    /// - other numbers become `Float`
    /// - arrays infer their element type: the common runtime type of the
    ///   non-null items if it admits every item, `System.Object` otherwise
    /// - `{"array": "<type>", "items": [...]}` builds an array with an explicit element type
    /// - `{"object": "<type>"}` builds an opaque instance of a registered type
    ///
    /// # Errors
    /// Returns [`ModelError::UnsupportedValue`] for other shapes or items not
    /// assignable to an explicit element type
    pub fn value_from_json(&self, json: &serde_json::Value) -> Result<Value, ModelError> {
        use serde_json::Value as Json;

        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    n.as_i64()
                        .and_then(|i| i32::try_from(i).ok())
                        .map(Value::Int)
                        .ok_or_else(|| {
                            ModelError::UnsupportedValue(format!("{n} is out of range for System.Int32"))
                        })
                } else {
                    n.as_f64()
                        .map(Value::Float)
                        .ok_or_else(|| ModelError::UnsupportedValue(n.to_string()))
                }
            }
            Json::String(s) => Ok(Value::Str(s.clone())),
            Json::Array(items) => {
                let items = self.values_from_json_items(items)?;
                let element = infer_element_type(&items);
                Ok(Value::Array(ArrayValue::new(element, items)))
            }
            Json::Object(map) => {
                if let (Some(Json::String(element)), Some(Json::Array(items))) =
                    (map.get("array"), map.get("items"))
                {
                    let element = self.resolve(&TypeExpr::Name(element.clone()), &[])?;
                    let items = self.values_from_json_items(items)?;
                    if let Some(bad) = items.iter().find(|item| !fits(&element, item)) {
                        return Err(ModelError::UnsupportedValue(format!(
                            "{bad} cannot be stored in {element}[]"
                        )));
                    }
                    return Ok(Value::Array(ArrayValue::new(element, items)));
                }
                if let Some(Json::String(name)) = map.get("object") {
                    return Ok(Value::Object(self.require(name)?));
                }
                Err(ModelError::UnsupportedValue(json.to_string()))
            }
        }
    }

    /// Convert a JSON array of arguments
    ///
    /// # Errors
    /// Fails if `json` is not an array or any item is unsupported
    pub fn values_from_json(&self, json: &serde_json::Value) -> Result<Vec<Value>, ModelError> {
        match json {
            serde_json::Value::Array(items) => self.values_from_json_items(items),
            other => Err(ModelError::UnsupportedValue(format!(
                "expected an argument array, found {other}"
            ))),
        }
    }

    fn values_from_json_items(&self, items: &[serde_json::Value]) -> Result<Vec<Value>, ModelError> {
        items.iter().map(|item| self.value_from_json(item)).collect()
    }
}

fn alias(name: &str) -> Option<&'static TypeHandle> {
    let core = core_types();
    match name {
        "object" => Some(&core.object),
        "string" => Some(&core.string),
        "int" => Some(&core.int32),
        "bool" => Some(&core.boolean),
        "double" => Some(&core.double),
        _ => None,
    }
}

fn wrap_arrays(inner: TypeRef, rank: usize) -> TypeRef {
    (0..rank).fold(inner, |ty, _| TypeRef::array_of(ty))
}

fn fits(element: &TypeRef, item: &Value) -> bool {
    match item.runtime_type() {
        None => element.accepts_null(),
        Some(ty) => element.is_assignable_from(&ty),
    }
}

fn infer_element_type(items: &[Value]) -> TypeRef {
    let object = TypeRef::of(&core_types().object);
    let mut types = items.iter().filter_map(Value::runtime_type);
    let Some(first) = types.next() else {
        return object;
    };
    if types.all(|t| t == first) && items.iter().all(|item| fits(&first, item)) {
        first
    } else {
        object
    }
}
