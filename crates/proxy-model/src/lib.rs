//! Proxy Model - type descriptions for class proxy generation
//!
//! An explicit, immutable description of the types a proxy generator works
//! against, standing in for runtime reflection:
//!
//! - [`TypeSpec`]: identity, accessibility, inheritance and generic shape of a type
//! - [`ConstructorSpec`] / [`MemberSpec`]: constructors and methods, with executable bodies
//! - [`Value`]: runtime argument and return values
//! - [`TypeRegistry`]: name lookup, type expressions and JSON values
//! - [`TypeManifest`]: JSON documents describing type graphs
//!
//! # Example
//!
//! ```rust,ignore
//! use proxy_model::prelude::*;
//!
//! let app = AssemblyInfo::new("App").shared();
//! let greeter = TypeSpec::class(TypeName::new("App", "Greeter"), &app)
//!     .constructor(ConstructorSpec::recording(
//!         vec![ParamKind::Exact(TypeRef::of(&core_types().string))],
//!         "String",
//!     ))
//!     .member(MemberSpec::method("Greet").virtual_member().returning("hi".into()))
//!     .build();
//!
//! assert_eq!(greeter.full_name(), "App.Greeter");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod core_types;
pub mod error;
pub mod manifest;
pub mod members;
pub mod name;
pub mod registry;
pub mod types;
pub mod value;

// Re-exports
pub use core_types::{core_types, CoreTypes, CORE_ASSEMBLY};
pub use error::{InvocationError, ModelError};
pub use manifest::{
    AssemblyDecl, ConstructorDecl, MethodDecl, ParamDecl, TypeDecl, TypeExpr, TypeManifest,
};
pub use members::{
    ConstructorBody, ConstructorSignature, ConstructorSpec, MemberSpec, MethodBody, ParamKind,
    Receiver, CONSTRUCTOR_CALLED_FIELD,
};
pub use name::TypeName;
pub use registry::TypeRegistry;
pub use types::{
    Accessibility, AssemblyInfo, GenericShape, TypeHandle, TypeKind, TypeRef, TypeSpec,
    TypeSpecBuilder,
};
pub use value::{ArrayValue, Value};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for describing types
    pub use crate::{
        core_types, Accessibility, ArrayValue, AssemblyInfo, ConstructorSignature,
        ConstructorSpec, InvocationError, MemberSpec, ParamKind, Receiver, TypeHandle, TypeKind,
        TypeName, TypeRef, TypeRegistry, TypeSpec, Value,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
