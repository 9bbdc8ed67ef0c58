//! Constructors and members
//!
//! Constructors and methods carry an optional executable body. Bodies run
//! against a [`Receiver`], the object being constructed or invoked on, so the
//! same description can back both the declared type and any generated
//! subclass of it.

use crate::error::{InvocationError, ModelError};
use crate::types::{Accessibility, TypeRef};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Field set by [`ConstructorSpec::recording`] constructors
pub const CONSTRUCTOR_CALLED_FIELD: &str = "constructor_called";

/// The object a constructor or method body runs against
pub trait Receiver: Send + Sync {
    /// Full name of the receiver's runtime type
    fn type_name(&self) -> String;

    /// Read an instance field
    fn field(&self, name: &str) -> Option<Value>;

    /// Write an instance field
    fn set_field(&self, name: &str, value: Value);

    /// Invoke a member with virtual dispatch
    ///
    /// # Errors
    /// Returns an error if no member matches or the member itself fails
    fn invoke(&self, member: &str, arguments: Vec<Value>) -> Result<Value, InvocationError>;
}

/// Executable constructor body
pub type ConstructorBody =
    Arc<dyn Fn(&dyn Receiver, &[Value]) -> Result<(), InvocationError> + Send + Sync>;

/// Executable method body
pub type MethodBody =
    Arc<dyn Fn(&dyn Receiver, &[Value]) -> Result<Value, InvocationError> + Send + Sync>;

/// A formal parameter
#[derive(Clone)]
pub enum ParamKind {
    /// Ordinary parameter of the given type
    Exact(TypeRef),

    /// Ordinary array parameter with the given element type
    Array(TypeRef),

    /// Trailing variadic (`params`) array parameter with the given element type
    Variadic(TypeRef),
}

impl ParamKind {
    /// Ordinary parameter of `ty`; array types become [`ParamKind::Array`]
    #[must_use]
    pub fn of(ty: TypeRef) -> Self {
        match ty {
            TypeRef::Array(element) => Self::Array(*element),
            other => Self::Exact(other),
        }
    }

    /// Declared type of the parameter
    #[must_use]
    pub fn declared_type(&self) -> TypeRef {
        match self {
            Self::Exact(ty) => ty.clone(),
            Self::Array(element) | Self::Variadic(element) => TypeRef::array_of(element.clone()),
        }
    }

    /// Element type for array and variadic parameters
    #[must_use]
    pub fn element_type(&self) -> Option<&TypeRef> {
        match self {
            Self::Exact(ty) => ty.element_type(),
            Self::Array(element) | Self::Variadic(element) => Some(element),
        }
    }

    /// Whether this is a `params` parameter
    #[inline]
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        matches!(self, Self::Variadic(_))
    }

    fn substitute(&self, map: &HashMap<String, TypeRef>) -> Result<Self, ModelError> {
        Ok(match self {
            Self::Exact(ty) => Self::of(ty.substitute(map)?),
            Self::Array(element) => Self::Array(element.substitute(map)?),
            Self::Variadic(element) => Self::Variadic(element.substitute(map)?),
        })
    }
}

impl PartialEq for ParamKind {
    fn eq(&self, other: &Self) -> bool {
        self.is_variadic() == other.is_variadic() && self.declared_type() == other.declared_type()
    }
}

impl Eq for ParamKind {}

impl Hash for ParamKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_variadic().hash(state);
        self.declared_type().hash(state);
    }
}

impl Debug for ParamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ParamKind({self})")
    }
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_variadic() {
            f.write_str("params ")?;
        }
        f.write_str(&self.declared_type().full_name())
    }
}

/// Ordered formal parameters of a constructor
///
/// A variadic parameter is only meaningful in last position; earlier ones
/// are treated as plain array parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConstructorSignature {
    parameters: Vec<ParamKind>,
}

impl ConstructorSignature {
    /// Create signature from parameters
    #[must_use]
    pub fn new(parameters: Vec<ParamKind>) -> Self {
        Self {
            parameters: normalize_variadic(parameters),
        }
    }

    /// Formal parameters in order
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[ParamKind] {
        &self.parameters
    }

    /// Number of formal parameters
    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the last parameter is variadic
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.parameters.last().is_some_and(ParamKind::is_variadic)
    }
}

impl Display for ConstructorSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}

fn normalize_variadic(mut parameters: Vec<ParamKind>) -> Vec<ParamKind> {
    let last = parameters.len().saturating_sub(1);
    for p in &mut parameters[..last] {
        if let ParamKind::Variadic(element) = p {
            *p = ParamKind::Array(element.clone());
        }
    }
    parameters
}

/// A declared constructor
#[derive(Clone)]
pub struct ConstructorSpec {
    accessibility: Accessibility,
    signature: ConstructorSignature,
    body: ConstructorBody,
}

impl ConstructorSpec {
    /// Public constructor with an empty body
    #[must_use]
    pub fn new(parameters: Vec<ParamKind>) -> Self {
        Self {
            accessibility: Accessibility::Public,
            signature: ConstructorSignature::new(parameters),
            body: Arc::new(|_, _| Ok(())),
        }
    }

    /// Public parameterless constructor with an empty body
    #[must_use]
    pub fn default_constructor() -> Self {
        Self::new(Vec::new())
    }

    /// Public constructor that records `label` in [`CONSTRUCTOR_CALLED_FIELD`]
    #[must_use]
    pub fn recording(parameters: Vec<ParamKind>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self::new(parameters).with_body(move |receiver, _| {
            receiver.set_field(CONSTRUCTOR_CALLED_FIELD, Value::Str(label.clone()));
            Ok(())
        })
    }

    /// Set accessibility
    #[must_use]
    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Set body
    #[must_use]
    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&dyn Receiver, &[Value]) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        self.body = Arc::new(body);
        self
    }

    /// Declared accessibility
    #[inline]
    #[must_use]
    pub fn accessibility(&self) -> Accessibility {
        self.accessibility
    }

    /// Formal signature
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &ConstructorSignature {
        &self.signature
    }

    /// Executable body
    #[inline]
    #[must_use]
    pub fn body(&self) -> &ConstructorBody {
        &self.body
    }

    pub(crate) fn substitute(&self, map: &HashMap<String, TypeRef>) -> Result<Self, ModelError> {
        let parameters = self
            .signature
            .parameters
            .iter()
            .map(|p| p.substitute(map))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            accessibility: self.accessibility,
            signature: ConstructorSignature::new(parameters),
            body: self.body.clone(),
        })
    }
}

impl Debug for ConstructorSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorSpec")
            .field("accessibility", &self.accessibility)
            .field("signature", &self.signature.to_string())
            .finish_non_exhaustive()
    }
}

/// A declared method
#[derive(Clone)]
pub struct MemberSpec {
    name: String,
    parameters: Vec<ParamKind>,
    return_type: Option<TypeRef>,
    generic_parameters: Vec<String>,
    accessibility: Accessibility,
    is_virtual: bool,
    is_final: bool,
    body: Option<MethodBody>,
}

impl MemberSpec {
    /// Public non-virtual method returning `null`
    #[must_use]
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
            generic_parameters: Vec::new(),
            accessibility: Accessibility::Public,
            is_virtual: false,
            is_final: false,
            body: Some(Arc::new(|_, _| Ok(Value::Null))),
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn parameter(mut self, parameter: ParamKind) -> Self {
        self.parameters.push(parameter);
        self.parameters = normalize_variadic(self.parameters);
        self
    }

    /// Set declared return type
    #[must_use]
    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Declare method-level generic parameters
    #[must_use]
    pub fn generic_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    /// Set accessibility
    #[must_use]
    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Mark virtual
    #[must_use]
    pub fn virtual_member(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Mark as a sealed override (virtual, but no longer overridable)
    #[must_use]
    pub fn final_member(mut self) -> Self {
        self.is_virtual = true;
        self.is_final = true;
        self
    }

    /// Mark abstract (virtual, no body)
    #[must_use]
    pub fn abstract_member(mut self) -> Self {
        self.is_virtual = true;
        self.body = None;
        self
    }

    /// Set body
    #[must_use]
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&dyn Receiver, &[Value]) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// Set a body that always returns `value`
    #[must_use]
    pub fn returning(self, value: Value) -> Self {
        self.body(move |_, _| Ok(value.clone()))
    }

    /// Method name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formal parameters
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[ParamKind] {
        &self.parameters
    }

    /// Declared return type (`None` for void)
    #[inline]
    #[must_use]
    pub fn return_type(&self) -> Option<&TypeRef> {
        self.return_type.as_ref()
    }

    /// Method-level generic parameters
    #[inline]
    #[must_use]
    pub fn method_generic_parameters(&self) -> &[String] {
        &self.generic_parameters
    }

    /// Declared accessibility
    #[inline]
    #[must_use]
    pub fn member_accessibility(&self) -> Accessibility {
        self.accessibility
    }

    /// Whether the method is virtual
    #[inline]
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    /// Whether the method can be overridden by a subclass
    #[inline]
    #[must_use]
    pub fn is_overridable(&self) -> bool {
        self.is_virtual && !self.is_final
    }

    /// Whether the method has no implementation
    #[inline]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    /// Executable body, absent for abstract methods
    #[inline]
    #[must_use]
    pub fn method_body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }

    /// Override identity: name, generic arity and parameter types
    ///
    /// `Foo`1(System.String, params System.Object[])`
    #[must_use]
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(ToString::to_string).collect();
        if self.generic_parameters.is_empty() {
            format!("{}({})", self.name, params.join(", "))
        } else {
            format!(
                "{}`{}({})",
                self.name,
                self.generic_parameters.len(),
                params.join(", ")
            )
        }
    }

    pub(crate) fn substitute(&self, map: &HashMap<String, TypeRef>) -> Result<Self, ModelError> {
        let mut scoped = map.clone();
        for own in &self.generic_parameters {
            scoped.remove(own);
        }
        let parameters = self
            .parameters
            .iter()
            .map(|p| p.substitute(&scoped))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = self
            .return_type
            .as_ref()
            .map(|t| t.substitute(&scoped))
            .transpose()?;
        Ok(Self {
            parameters,
            return_type,
            ..self.clone()
        })
    }
}

impl Debug for MemberSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberSpec")
            .field("signature", &self.signature())
            .field("accessibility", &self.accessibility)
            .field("virtual", &self.is_virtual)
            .field("final", &self.is_final)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::core_types;
    use pretty_assertions::assert_eq;

    #[test]
    fn param_kind_normalizes_arrays() {
        let string = TypeRef::of(&core_types().string);
        let array = ParamKind::of(TypeRef::array_of(string.clone()));
        assert_eq!(array, ParamKind::Array(string.clone()));
        assert_ne!(array, ParamKind::Variadic(string));
    }

    #[test]
    fn signature_display() {
        let core = core_types();
        let sig = ConstructorSignature::new(vec![
            ParamKind::Exact(TypeRef::of(&core.int32)),
            ParamKind::Variadic(TypeRef::of(&core.object)),
        ]);
        assert_eq!(sig.to_string(), "(System.Int32, params System.Object[])");
        assert!(sig.is_variadic());
    }

    #[test]
    fn variadic_only_kept_in_last_position() {
        let string = TypeRef::of(&core_types().string);
        let sig = ConstructorSignature::new(vec![
            ParamKind::Variadic(string.clone()),
            ParamKind::Exact(string.clone()),
        ]);
        assert_eq!(sig.parameters()[0], ParamKind::Array(string));
        assert!(!sig.is_variadic());
    }

    #[test]
    fn member_signature_includes_generic_arity() {
        let member = MemberSpec::method("Foo")
            .generic_parameters(["T"])
            .parameter(ParamKind::Exact(TypeRef::param("T")))
            .virtual_member();
        assert_eq!(member.signature(), "Foo`1(T)");
        assert!(member.is_overridable());
        assert!(!member.is_abstract());
    }

    #[test]
    fn abstract_and_final_members() {
        let abstract_member = MemberSpec::method("Area").abstract_member();
        assert!(abstract_member.is_abstract());
        assert!(abstract_member.is_overridable());

        let sealed = MemberSpec::method("Area").final_member();
        assert!(sealed.is_virtual());
        assert!(!sealed.is_overridable());
    }

    #[test]
    fn method_generic_parameters_shadow_type_parameters() {
        let object = TypeRef::of(&core_types().object);
        let member = MemberSpec::method("Map")
            .generic_parameters(["T"])
            .parameter(ParamKind::Exact(TypeRef::param("T")));
        let map = HashMap::from([("T".to_string(), object)]);

        let substituted = member.substitute(&map).unwrap();
        assert_eq!(substituted.parameters()[0], ParamKind::Exact(TypeRef::param("T")));
    }
}
