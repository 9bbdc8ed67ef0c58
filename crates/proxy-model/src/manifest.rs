//! Type manifests
//!
//! JSON documents describing assemblies and the types they declare, so type
//! graphs can be fed to the generator without writing Rust. Types are loaded
//! in document order; a type may only refer to types registered before it.
//!
//! ```json
//! {
//!   "assemblies": [{ "name": "App", "internals_visible_to": ["DynamicProxyGenAssembly"] }],
//!   "types": [{
//!     "name": "App.Greeter",
//!     "assembly": "App",
//!     "constructors": [{ "parameters": [{ "type": "string" }], "label": "String" }],
//!     "methods": [{ "name": "Greet", "virtual": true, "result": "hello" }]
//!   }]
//! }
//! ```

use crate::error::ModelError;
use crate::members::{ConstructorSpec, MemberSpec, ParamKind};
use crate::name::TypeName;
use crate::registry::TypeRegistry;
use crate::types::{Accessibility, AssemblyInfo, TypeHandle, TypeKind, TypeRef, TypeSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A type as written in a manifest
///
/// Either a name with optional `[]` suffixes (`"System.String[]"`, `"T"`,
/// `"int"`), or a generic instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeExpr {
    /// Named type, array of named type, or generic parameter
    Name(String),

    /// Generic instantiation
    Generic {
        /// Full name of the generic definition
        generic: String,
        /// Generic arguments
        args: Vec<TypeExpr>,
        /// Array rank applied to the instantiation
        #[serde(default)]
        rank: usize,
    },
}

/// An assembly declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyDecl {
    /// Assembly name
    pub name: String,
    /// Assemblies granted visibility into internals
    #[serde(default)]
    pub internals_visible_to: Vec<String>,
}

/// A formal parameter declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Parameter type
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    /// Whether this is a trailing `params` array
    #[serde(default)]
    pub params: bool,
}

/// A constructor declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    /// Accessibility
    #[serde(default)]
    pub accessibility: Accessibility,
    /// Formal parameters
    #[serde(default)]
    pub parameters: Vec<ParamDecl>,
    /// Recorded into the `constructor_called` field when this constructor runs
    #[serde(default)]
    pub label: Option<String>,
}

/// A method declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Method name
    pub name: String,
    /// Formal parameters
    #[serde(default)]
    pub parameters: Vec<ParamDecl>,
    /// Return type
    #[serde(default)]
    pub returns: Option<TypeExpr>,
    /// Accessibility
    #[serde(default)]
    pub accessibility: Accessibility,
    /// Virtual method
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    /// Abstract method (implies virtual)
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Method-level generic parameters
    #[serde(default)]
    pub generic_parameters: Vec<String>,
    /// Constant returned by the body
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

/// A type declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Full name; nested types use `Outer+Inner`
    pub name: String,
    /// Declaring assembly
    pub assembly: String,
    /// Kind
    #[serde(default)]
    pub kind: TypeKind,
    /// Accessibility
    #[serde(default)]
    pub accessibility: Accessibility,
    /// Base class (classes only, defaults to `System.Object`)
    #[serde(default)]
    pub base: Option<TypeExpr>,
    /// Implemented interfaces
    #[serde(default)]
    pub interfaces: Vec<TypeExpr>,
    /// Sealed class
    #[serde(default)]
    pub sealed: bool,
    /// Abstract class
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Type-level generic parameters
    #[serde(default)]
    pub generic_parameters: Vec<String>,
    /// Constructors
    #[serde(default)]
    pub constructors: Vec<ConstructorDecl>,
    /// Methods
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

/// A manifest document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeManifest {
    /// Assemblies and their visibility grants
    #[serde(default)]
    pub assemblies: Vec<AssemblyDecl>,
    /// Types in load order
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

impl TypeManifest {
    /// Parse a manifest from JSON
    ///
    /// # Errors
    /// Returns [`ModelError::Manifest`] on malformed JSON
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json).map_err(|e| ModelError::Manifest(e.to_string()))
    }

    /// Build every declared type and register it
    ///
    /// Returns the registered handles in declaration order.
    ///
    /// # Errors
    /// Fails on unknown type references, duplicate names or malformed
    /// parameter lists; types registered before the failure stay registered.
    pub fn load_into(&self, registry: &TypeRegistry) -> Result<Vec<TypeHandle>, ModelError> {
        let mut assemblies: HashMap<String, Arc<AssemblyInfo>> = self
            .assemblies
            .iter()
            .map(|decl| {
                let info = decl
                    .internals_visible_to
                    .iter()
                    .fold(AssemblyInfo::new(&decl.name), |info, friend| {
                        info.with_friend(friend)
                    });
                (decl.name.clone(), info.shared())
            })
            .collect();

        let mut loaded = Vec::with_capacity(self.types.len());
        for decl in &self.types {
            let assembly = assemblies
                .entry(decl.assembly.clone())
                .or_insert_with(|| AssemblyInfo::new(&decl.assembly).shared())
                .clone();
            let handle = build_type(decl, &assembly, registry)?;
            registry.register(handle.clone())?;
            loaded.push(handle);
        }
        Ok(loaded)
    }
}

fn build_type(
    decl: &TypeDecl,
    assembly: &Arc<AssemblyInfo>,
    registry: &TypeRegistry,
) -> Result<TypeHandle, ModelError> {
    let parsed: TypeName = decl.name.parse()?;
    let simple = TypeName::new(parsed.namespace(), parsed.name());

    let mut builder = match decl.kind {
        TypeKind::Class => TypeSpec::class(simple, assembly),
        TypeKind::Interface => TypeSpec::interface(simple, assembly),
        TypeKind::ValueType => TypeSpec::value_type(simple, assembly),
    };

    if let Some((outer, _)) = decl.name.rsplit_once('+') {
        builder = builder.nested_in(&registry.require(outer)?);
    }

    builder = builder
        .accessibility(decl.accessibility)
        .generic_parameters(decl.generic_parameters.iter().cloned());
    if decl.sealed {
        builder = builder.sealed();
    }
    if decl.is_abstract {
        builder = builder.abstract_type();
    }

    let scope = &decl.generic_parameters;
    if let Some(base) = &decl.base {
        if decl.kind != TypeKind::Class {
            return Err(ModelError::Manifest(format!(
                "{} declares a base type but is not a class",
                decl.name
            )));
        }
        builder = builder.base(resolve_named(registry, base, scope, &decl.name)?);
    }
    for iface in &decl.interfaces {
        builder = builder.implements(resolve_named(registry, iface, scope, &decl.name)?);
    }

    for ctor in &decl.constructors {
        let parameters = resolve_parameters(registry, &ctor.parameters, scope)?;
        let spec = match &ctor.label {
            Some(label) => ConstructorSpec::recording(parameters, label),
            None => ConstructorSpec::new(parameters),
        };
        builder = builder.constructor(spec.with_accessibility(ctor.accessibility));
    }

    for method in &decl.methods {
        builder = builder.member(build_method(registry, method, scope)?);
    }

    Ok(builder.build())
}

fn build_method(
    registry: &TypeRegistry,
    decl: &MethodDecl,
    type_scope: &[String],
) -> Result<MemberSpec, ModelError> {
    let scope: Vec<String> = type_scope
        .iter()
        .chain(&decl.generic_parameters)
        .cloned()
        .collect();

    let mut member = MemberSpec::method(&decl.name)
        .generic_parameters(decl.generic_parameters.iter().cloned())
        .accessibility(decl.accessibility);
    for param in resolve_parameters(registry, &decl.parameters, &scope)? {
        member = member.parameter(param);
    }
    if let Some(returns) = &decl.returns {
        member = member.returns(registry.resolve(returns, &scope)?);
    }
    if decl.is_virtual {
        member = member.virtual_member();
    }
    if decl.is_abstract {
        member = member.abstract_member();
    } else if let Some(result) = &decl.result {
        member = member.returning(registry.value_from_json(result)?);
    }
    Ok(member)
}

fn resolve_parameters(
    registry: &TypeRegistry,
    decls: &[ParamDecl],
    scope: &[String],
) -> Result<Vec<ParamKind>, ModelError> {
    let last = decls.len().saturating_sub(1);
    decls
        .iter()
        .enumerate()
        .map(|(i, decl)| {
            let ty = registry.resolve(&decl.ty, scope)?;
            if !decl.params {
                return Ok(ParamKind::of(ty));
            }
            if i != last {
                return Err(ModelError::InvalidParameters(
                    "params parameter must be last".to_string(),
                ));
            }
            match ty {
                TypeRef::Array(element) => Ok(ParamKind::Variadic(*element)),
                other => Err(ModelError::InvalidParameters(format!(
                    "params parameter must be an array, found {other}"
                ))),
            }
        })
        .collect()
}

fn resolve_named(
    registry: &TypeRegistry,
    expr: &TypeExpr,
    scope: &[String],
    owner: &str,
) -> Result<TypeHandle, ModelError> {
    match registry.resolve(expr, scope)? {
        TypeRef::Type(handle) => Ok(handle),
        other => Err(ModelError::Manifest(format!(
            "{owner} cannot inherit from {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"{
        "assemblies": [{ "name": "App", "internals_visible_to": ["Gen"] }],
        "types": [
            {
                "name": "App.Outer",
                "assembly": "App",
                "accessibility": "internal"
            },
            {
                "name": "App.Outer+Inner",
                "assembly": "App",
                "accessibility": "private"
            },
            {
                "name": "App.Varargs",
                "assembly": "App",
                "constructors": [
                    { "parameters": [{ "type": "string[]" }, { "type": "string" }], "label": "Pair" },
                    { "parameters": [{ "type": "string[]", "params": true }], "label": "Strings" }
                ],
                "methods": [
                    { "name": "Count", "virtual": true, "returns": "int", "result": 3 },
                    { "name": "Shape", "abstract": true }
                ]
            }
        ]
    }"#;

    #[test]
    fn load_registers_types_in_order() {
        let registry = TypeRegistry::new();
        let manifest = TypeManifest::from_json_str(MANIFEST).unwrap();
        let loaded = manifest.load_into(&registry).unwrap();

        assert_eq!(loaded.len(), 3);
        let inner = registry.get("App.Outer+Inner").unwrap();
        assert_eq!(inner.accessibility(), Accessibility::Private);
        assert_eq!(inner.declaring_type().unwrap().full_name(), "App.Outer");
        assert!(inner.assembly().grants_internals_to("Gen"));
    }

    #[test]
    fn constructors_and_methods() {
        let registry = TypeRegistry::new();
        TypeManifest::from_json_str(MANIFEST)
            .unwrap()
            .load_into(&registry)
            .unwrap();
        let varargs = registry.get("App.Varargs").unwrap();

        let signatures: Vec<String> = varargs
            .constructors()
            .iter()
            .map(|c| c.signature().to_string())
            .collect();
        assert_eq!(
            signatures,
            vec![
                "(System.String[], System.String)".to_string(),
                "(params System.String[])".to_string(),
            ]
        );

        let members = varargs.members();
        assert!(members[0].is_overridable());
        assert!(members[1].is_abstract());
    }

    #[test]
    fn params_must_be_last_array() {
        let registry = TypeRegistry::new();
        let manifest = TypeManifest::from_json_str(
            r#"{ "types": [{
                "name": "App.Bad", "assembly": "App",
                "constructors": [{ "parameters": [{ "type": "string", "params": true }] }]
            }] }"#,
        )
        .unwrap();
        assert!(matches!(
            manifest.load_into(&registry),
            Err(ModelError::InvalidParameters(_))
        ));
    }

    #[test]
    fn unknown_base_is_reported() {
        let registry = TypeRegistry::new();
        let manifest = TypeManifest::from_json_str(
            r#"{ "types": [{ "name": "App.Child", "assembly": "App", "base": "App.Missing" }] }"#,
        )
        .unwrap();
        assert_eq!(
            manifest.load_into(&registry).unwrap_err(),
            ModelError::UnknownType("App.Missing".to_string())
        );
    }

    #[test]
    fn malformed_json_is_manifest_error() {
        assert!(matches!(
            TypeManifest::from_json_str("{ nope"),
            Err(ModelError::Manifest(_))
        ));
    }
}
