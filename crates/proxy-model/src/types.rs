//! Type specifications
//!
//! [`TypeSpec`] is the explicit, immutable description of a type that proxy
//! generation inspects: identity, accessibility, inheritance, generic shape,
//! constructors and members. Specs are shared as [`TypeHandle`]s and compare
//! by identity (assembly-qualified full name).
//!
//! [`TypeRef`] is a type as it appears in a signature or as a generic
//! argument: a named type, an array of some type, or an unbound generic
//! parameter.

use crate::core_types::core_types;
use crate::error::ModelError;
use crate::members::{ConstructorSpec, MemberSpec};
use crate::name::TypeName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shared handle to an immutable type specification
pub type TypeHandle = Arc<TypeSpec>;

/// Declared accessibility of a type or member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Visible everywhere
    #[default]
    Public,

    /// Visible inside the declaring assembly and its friends
    Internal,

    /// Visible to subclasses
    Protected,

    /// Visible to subclasses and to the declaring assembly and its friends
    ProtectedInternal,

    /// Visible only inside the declaring type
    Private,
}

impl Accessibility {
    /// Whether a subclass generated in another assembly may use a member
    /// (constructor, method) declared with this accessibility
    #[inline]
    #[must_use]
    pub fn admits_subclass(self, internals_visible: bool) -> bool {
        match self {
            Self::Public | Self::Protected | Self::ProtectedInternal => true,
            Self::Internal => internals_visible,
            Self::Private => false,
        }
    }
}

/// Kind of type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Reference type with implementation inheritance
    #[default]
    Class,

    /// Contract-only reference type
    Interface,

    /// Value type (never null, boxed when widened to a reference type)
    ValueType,
}

/// An assembly: the unit of internal visibility
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyInfo {
    name: String,
    /// Assemblies granted visibility into this assembly's internals
    #[serde(default)]
    friends: BTreeSet<String>,
}

impl AssemblyInfo {
    /// Create assembly with no visibility grants
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            friends: BTreeSet::new(),
        }
    }

    /// Grant `friend` visibility into this assembly's internals
    #[inline]
    #[must_use]
    pub fn with_friend(mut self, friend: impl Into<String>) -> Self {
        self.friends.insert(friend.into());
        self
    }

    /// Wrap into a shared handle
    #[inline]
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Assembly name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether code in `assembly` may see this assembly's internals
    #[inline]
    #[must_use]
    pub fn grants_internals_to(&self, assembly: &str) -> bool {
        self.name == assembly || self.friends.contains(assembly)
    }
}

/// Generic shape of a type
#[derive(Debug, Clone)]
pub enum GenericShape {
    /// Not generic
    NonGeneric,

    /// Generic definition with unbound parameters (e.g. ``List`1``)
    Definition {
        /// Parameter names in declaration order
        parameters: Vec<String>,
    },

    /// Generic definition instantiated with arguments
    Instance {
        /// The instantiated definition
        definition: TypeHandle,
        /// Arguments in parameter order
        arguments: Vec<TypeRef>,
    },
}

/// Immutable description of a type
pub struct TypeSpec {
    name: TypeName,
    assembly: Arc<AssemblyInfo>,
    kind: TypeKind,
    accessibility: Accessibility,
    declaring_type: Option<TypeHandle>,
    base_type: Option<TypeHandle>,
    interfaces: Vec<TypeHandle>,
    is_sealed: bool,
    is_abstract: bool,
    generic: GenericShape,
    constructors: Vec<ConstructorSpec>,
    members: Vec<MemberSpec>,
    /// Assembly-qualified full name, computed once
    key: String,
}

impl TypeSpec {
    /// Start describing a class (base type defaults to `System.Object`)
    #[must_use]
    pub fn class(name: TypeName, assembly: &Arc<AssemblyInfo>) -> TypeSpecBuilder {
        TypeSpecBuilder::new(name, assembly.clone(), TypeKind::Class)
            .base(core_types().object.clone())
    }

    /// Start describing an interface
    #[must_use]
    pub fn interface(name: TypeName, assembly: &Arc<AssemblyInfo>) -> TypeSpecBuilder {
        let mut builder = TypeSpecBuilder::new(name, assembly.clone(), TypeKind::Interface);
        builder.is_abstract = true;
        builder
    }

    /// Start describing a value type
    #[must_use]
    pub fn value_type(name: TypeName, assembly: &Arc<AssemblyInfo>) -> TypeSpecBuilder {
        TypeSpecBuilder::new(name, assembly.clone(), TypeKind::ValueType).sealed()
    }

    /// Instantiate a generic definition with `arguments`
    ///
    /// Generic parameters are substituted through constructor and member
    /// signatures, the base type and implemented interfaces. Arguments may
    /// themselves be open (unbound parameters or generic definitions); the
    /// resulting type then reports [`contains_generic_parameters`].
    ///
    /// # Errors
    /// - [`ModelError::NotGenericDefinition`] if `definition` is not a generic definition
    /// - [`ModelError::GenericArityMismatch`] if the argument count is wrong
    ///
    /// [`contains_generic_parameters`]: TypeSpec::contains_generic_parameters
    pub fn make_generic(
        definition: &TypeHandle,
        arguments: Vec<TypeRef>,
    ) -> Result<TypeHandle, ModelError> {
        let GenericShape::Definition { parameters } = &definition.generic else {
            return Err(ModelError::NotGenericDefinition(definition.full_name()));
        };
        if parameters.len() != arguments.len() {
            return Err(ModelError::GenericArityMismatch {
                type_name: definition.full_name(),
                expected: parameters.len(),
                actual: arguments.len(),
            });
        }

        let map: HashMap<String, TypeRef> = parameters
            .iter()
            .cloned()
            .zip(arguments.iter().cloned())
            .collect();

        let constructors = definition
            .constructors
            .iter()
            .map(|c| c.substitute(&map))
            .collect::<Result<Vec<_>, _>>()?;
        let members = definition
            .members
            .iter()
            .map(|m| m.substitute(&map))
            .collect::<Result<Vec<_>, _>>()?;
        let base_type = definition
            .base_type
            .as_ref()
            .map(|b| substitute_handle(b, &map))
            .transpose()?;
        let interfaces = definition
            .interfaces
            .iter()
            .map(|i| substitute_handle(i, &map))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: definition.name.clone(),
            assembly: definition.assembly.clone(),
            kind: definition.kind,
            accessibility: definition.accessibility,
            declaring_type: definition.declaring_type.clone(),
            base_type,
            interfaces,
            is_sealed: definition.is_sealed,
            is_abstract: definition.is_abstract,
            generic: GenericShape::Instance {
                definition: definition.clone(),
                arguments,
            },
            constructors,
            members,
            key: String::new(),
        }
        .finish())
    }

    fn finish(mut self) -> TypeHandle {
        self.key = format!("{}, {}", self.full_name(), self.assembly.name());
        Arc::new(self)
    }

    /// Definition name
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.name
    }

    /// Simple name, including any arity suffix (``List`1``)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.name()
    }

    /// Full display name
    ///
    /// Closed generic instances render their arguments assembly-qualified:
    /// ``System.Collections.Generic.List`1[[Ns.Item, Items]]``.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.generic {
            GenericShape::Instance { arguments, .. } => {
                let args: Vec<String> = arguments
                    .iter()
                    .map(|a| match a.assembly_name() {
                        Some(asm) => format!("[{}, {}]", a.full_name(), asm),
                        None => format!("[{}]", a.full_name()),
                    })
                    .collect();
                format!("{}[{}]", self.name, args.join(","))
            }
            _ => self.name.to_string(),
        }
    }

    /// Assembly-qualified full name; the identity of this type
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Declaring assembly
    #[inline]
    #[must_use]
    pub fn assembly(&self) -> &AssemblyInfo {
        &self.assembly
    }

    /// Kind of type
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Declared accessibility
    #[inline]
    #[must_use]
    pub fn accessibility(&self) -> Accessibility {
        self.accessibility
    }

    /// Enclosing type for nested types
    #[inline]
    #[must_use]
    pub fn declaring_type(&self) -> Option<&TypeHandle> {
        self.declaring_type.as_ref()
    }

    /// Direct base type
    #[inline]
    #[must_use]
    pub fn base_type(&self) -> Option<&TypeHandle> {
        self.base_type.as_ref()
    }

    /// Directly implemented interfaces
    #[inline]
    #[must_use]
    pub fn interfaces(&self) -> &[TypeHandle] {
        &self.interfaces
    }

    /// Whether the type forbids subclassing
    #[inline]
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.is_sealed
    }

    /// Whether the type is abstract
    #[inline]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether values of this type are references (nullable)
    #[inline]
    #[must_use]
    pub fn is_reference_type(&self) -> bool {
        self.kind != TypeKind::ValueType
    }

    /// Generic shape
    #[inline]
    #[must_use]
    pub fn generic(&self) -> &GenericShape {
        &self.generic
    }

    /// Whether this is an uninstantiated generic definition
    #[inline]
    #[must_use]
    pub fn is_generic_definition(&self) -> bool {
        matches!(self.generic, GenericShape::Definition { .. })
    }

    /// Generic arguments of an instance (empty otherwise)
    #[must_use]
    pub fn generic_arguments(&self) -> &[TypeRef] {
        match &self.generic {
            GenericShape::Instance { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// Whether any generic parameter is left unbound, at any depth
    #[must_use]
    pub fn contains_generic_parameters(&self) -> bool {
        match &self.generic {
            GenericShape::NonGeneric => false,
            GenericShape::Definition { .. } => true,
            GenericShape::Instance { arguments, .. } => {
                arguments.iter().any(TypeRef::contains_generic_parameters)
            }
        }
    }

    /// Declared constructors
    #[inline]
    #[must_use]
    pub fn constructors(&self) -> &[ConstructorSpec] {
        &self.constructors
    }

    /// Declared members (not including inherited ones)
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[MemberSpec] {
        &self.members
    }

    /// Whether this is the root `System.Object`
    #[inline]
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.key == core_types().object.key
    }

    /// Iterate this type and its base chain, most derived first
    pub fn ancestry(self: &Arc<Self>) -> impl Iterator<Item = TypeHandle> {
        std::iter::successors(Some(self.clone()), |t| t.base_type.clone())
    }

    /// Whether `self` is `other` or derives from it
    #[must_use]
    pub fn is_subclass_of(self: &Arc<Self>, other: &TypeSpec) -> bool {
        self.ancestry().any(|t| *t == *other)
    }

    /// All interfaces implemented by this type, its bases and inherited interfaces
    #[must_use]
    pub fn all_interfaces(self: &Arc<Self>) -> Vec<TypeHandle> {
        let mut seen: Vec<TypeHandle> = Vec::new();
        let mut stack: Vec<TypeHandle> = self
            .ancestry()
            .flat_map(|t| t.interfaces.clone())
            .collect();
        while let Some(iface) = stack.pop() {
            if !seen.contains(&iface) {
                stack.extend(iface.interfaces.iter().cloned());
                seen.push(iface);
            }
        }
        seen
    }

    /// Whether this type implements `iface` (directly or through inheritance)
    #[must_use]
    pub fn implements(self: &Arc<Self>, iface: &TypeSpec) -> bool {
        self.all_interfaces().iter().any(|i| **i == *iface)
    }
}

impl PartialEq for TypeSpec {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TypeSpec {}

impl Hash for TypeSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Debug for TypeSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSpec")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("accessibility", &self.accessibility)
            .field("constructors", &self.constructors.len())
            .field("members", &self.members.len())
            .finish_non_exhaustive()
    }
}

impl Display for TypeSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

fn substitute_handle(
    handle: &TypeHandle,
    map: &HashMap<String, TypeRef>,
) -> Result<TypeHandle, ModelError> {
    match &handle.generic {
        GenericShape::Instance {
            definition,
            arguments,
        } if arguments.iter().any(TypeRef::contains_generic_parameters) => {
            let arguments = arguments
                .iter()
                .map(|a| a.substitute(map))
                .collect::<Result<Vec<_>, _>>()?;
            TypeSpec::make_generic(definition, arguments)
        }
        _ => Ok(handle.clone()),
    }
}

/// Builder for [`TypeSpec`]
///
/// Classes that declare no constructor receive the implicit parameterless
/// one (protected for abstract classes).
pub struct TypeSpecBuilder {
    name: TypeName,
    assembly: Arc<AssemblyInfo>,
    kind: TypeKind,
    accessibility: Accessibility,
    declaring_type: Option<TypeHandle>,
    base_type: Option<TypeHandle>,
    interfaces: Vec<TypeHandle>,
    is_sealed: bool,
    is_abstract: bool,
    generic_parameters: Vec<String>,
    constructors: Vec<ConstructorSpec>,
    members: Vec<MemberSpec>,
}

impl TypeSpecBuilder {
    pub(crate) fn new(name: TypeName, assembly: Arc<AssemblyInfo>, kind: TypeKind) -> Self {
        Self {
            name,
            assembly,
            kind,
            accessibility: Accessibility::Public,
            declaring_type: None,
            base_type: None,
            interfaces: Vec::new(),
            is_sealed: false,
            is_abstract: false,
            generic_parameters: Vec::new(),
            constructors: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Set declared accessibility
    #[must_use]
    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Nest this type inside `outer` (renames it `Outer+Name`)
    #[must_use]
    pub fn nested_in(mut self, outer: &TypeHandle) -> Self {
        self.name = outer.type_name().nested(self.name.name());
        self.declaring_type = Some(outer.clone());
        self
    }

    /// Set the base type
    #[must_use]
    pub fn base(mut self, base: TypeHandle) -> Self {
        self.base_type = Some(base);
        self
    }

    /// Add an implemented interface
    #[must_use]
    pub fn implements(mut self, iface: TypeHandle) -> Self {
        self.interfaces.push(iface);
        self
    }

    /// Mark sealed
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.is_sealed = true;
        self
    }

    /// Mark abstract
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare generic parameters, turning the type into a generic definition
    #[must_use]
    pub fn generic_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    /// Add a constructor
    #[must_use]
    pub fn constructor(mut self, constructor: ConstructorSpec) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add a member
    #[must_use]
    pub fn member(mut self, member: MemberSpec) -> Self {
        self.members.push(member);
        self
    }

    /// Finish the spec
    #[must_use]
    pub fn build(mut self) -> TypeHandle {
        if self.kind == TypeKind::Class && self.constructors.is_empty() {
            let accessibility = if self.is_abstract {
                Accessibility::Protected
            } else {
                Accessibility::Public
            };
            self.constructors
                .push(ConstructorSpec::default_constructor().with_accessibility(accessibility));
        }

        let generic = if self.generic_parameters.is_empty() {
            GenericShape::NonGeneric
        } else {
            GenericShape::Definition {
                parameters: self.generic_parameters,
            }
        };

        TypeSpec {
            name: self.name,
            assembly: self.assembly,
            kind: self.kind,
            accessibility: self.accessibility,
            declaring_type: self.declaring_type,
            base_type: self.base_type,
            interfaces: self.interfaces,
            is_sealed: self.is_sealed,
            is_abstract: self.is_abstract,
            generic,
            constructors: self.constructors,
            members: self.members,
            key: String::new(),
        }
        .finish()
    }
}

/// A type as used in a signature or as a generic argument
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A named type
    Type(TypeHandle),

    /// Single-dimensional array of the element type
    Array(Box<TypeRef>),

    /// Unbound generic parameter
    Param(String),
}

impl TypeRef {
    /// Reference a named type
    #[inline]
    #[must_use]
    pub fn of(handle: &TypeHandle) -> Self {
        Self::Type(handle.clone())
    }

    /// Array of `element`
    #[inline]
    #[must_use]
    pub fn array_of(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    /// Unbound generic parameter named `name`
    #[inline]
    #[must_use]
    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }

    /// Element type for arrays
    #[inline]
    #[must_use]
    pub fn element_type(&self) -> Option<&TypeRef> {
        match self {
            Self::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Named type, if this is one
    #[inline]
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeHandle> {
        match self {
            Self::Type(handle) => Some(handle),
            _ => None,
        }
    }

    /// Full display name (`Ns.Name`, `Ns.Name[]`, `T`)
    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            Self::Type(handle) => handle.full_name(),
            Self::Array(element) => format!("{}[]", element.full_name()),
            Self::Param(name) => name.clone(),
        }
    }

    /// Name of the assembly defining the innermost named type
    #[must_use]
    pub fn assembly_name(&self) -> Option<&str> {
        match self {
            Self::Type(handle) => Some(handle.assembly().name()),
            Self::Array(element) => element.assembly_name(),
            Self::Param(_) => None,
        }
    }

    /// Whether values of this type are references
    #[must_use]
    pub fn is_reference_type(&self) -> bool {
        match self {
            Self::Type(handle) => handle.is_reference_type(),
            Self::Array(_) => true,
            Self::Param(_) => false,
        }
    }

    /// Whether `null` may be stored in this type
    #[inline]
    #[must_use]
    pub fn accepts_null(&self) -> bool {
        self.is_reference_type()
    }

    /// Whether any generic parameter is left unbound
    #[must_use]
    pub fn contains_generic_parameters(&self) -> bool {
        match self {
            Self::Type(handle) => handle.contains_generic_parameters(),
            Self::Array(element) => element.contains_generic_parameters(),
            Self::Param(_) => true,
        }
    }

    /// Whether a value of type `source` may be stored in `self`
    ///
    /// Covers identity, subclassing, interface implementation, boxing to
    /// `System.Object` and covariance of reference-element arrays.
    #[must_use]
    pub fn is_assignable_from(&self, source: &TypeRef) -> bool {
        if self == source {
            return true;
        }
        match (self, source) {
            (Self::Type(target), Self::Type(src)) => {
                target.is_object()
                    || src.is_subclass_of(target)
                    || (target.kind() == TypeKind::Interface && src.implements(target))
            }
            (Self::Type(target), Self::Array(_)) => target.is_object(),
            (Self::Array(target), Self::Array(src)) => {
                src.is_reference_type() && target.is_assignable_from(src)
            }
            _ => false,
        }
    }

    /// Replace generic parameters found in `map`; others are kept
    ///
    /// # Errors
    /// Propagates instantiation errors of nested generic types
    pub fn substitute(&self, map: &HashMap<String, TypeRef>) -> Result<TypeRef, ModelError> {
        Ok(match self {
            Self::Param(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Array(element) => Self::array_of(element.substitute(map)?),
            Self::Type(handle) => Self::Type(substitute_handle(handle, map)?),
        })
    }
}

impl Debug for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.full_name())
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

impl From<TypeHandle> for TypeRef {
    fn from(handle: TypeHandle) -> Self {
        Self::Type(handle)
    }
}

impl From<&TypeHandle> for TypeRef {
    fn from(handle: &TypeHandle) -> Self {
        Self::Type(handle.clone())
    }
}
