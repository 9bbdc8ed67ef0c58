//! Built-in types
//!
//! The handful of runtime library types every type graph bottoms out in.

use crate::members::{ConstructorSpec, MemberSpec, ParamKind, Receiver};
use crate::name::TypeName;
use crate::types::{AssemblyInfo, TypeHandle, TypeKind, TypeRef, TypeSpecBuilder};
use crate::value::Value;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Name of the assembly declaring the built-in types
pub const CORE_ASSEMBLY: &str = "mscorlib";

/// Built-in type handles
#[derive(Debug)]
pub struct CoreTypes {
    /// Declaring assembly
    pub assembly: Arc<AssemblyInfo>,
    /// `System.Object`, root of every class
    pub object: TypeHandle,
    /// `System.String`
    pub string: TypeHandle,
    /// `System.Int32`
    pub int32: TypeHandle,
    /// `System.Boolean`
    pub boolean: TypeHandle,
    /// `System.Double`
    pub double: TypeHandle,
    /// ``System.Collections.Generic.List`1``
    pub list: TypeHandle,
}

impl CoreTypes {
    fn build() -> Self {
        let assembly = AssemblyInfo::new(CORE_ASSEMBLY).shared();

        let object = TypeSpecBuilder::new(
            TypeName::new("System", "Object"),
            assembly.clone(),
            TypeKind::Class,
        )
        .constructor(ConstructorSpec::default_constructor())
        .member(
            MemberSpec::method("ToString")
                .virtual_member()
                .body(|receiver: &dyn Receiver, _| Ok(Value::Str(receiver.type_name()))),
        )
        .build();

        let string = TypeSpecBuilder::new(
            TypeName::new("System", "String"),
            assembly.clone(),
            TypeKind::Class,
        )
        .base(object.clone())
        .sealed()
        .build();

        let value_type = |name: &str| {
            TypeSpecBuilder::new(
                TypeName::new("System", name),
                assembly.clone(),
                TypeKind::ValueType,
            )
            .sealed()
            .build()
        };
        let int32 = value_type("Int32");
        let boolean = value_type("Boolean");
        let double = value_type("Double");

        let list = TypeSpecBuilder::new(
            TypeName::generic("System.Collections.Generic", "List", 1),
            assembly.clone(),
            TypeKind::Class,
        )
        .base(object.clone())
        .generic_parameters(["T"])
        .constructor(ConstructorSpec::default_constructor())
        .constructor(ConstructorSpec::new(vec![ParamKind::Exact(TypeRef::of(
            &int32,
        ))]))
        .member(MemberSpec::method("Add").parameter(ParamKind::Exact(TypeRef::param("T"))))
        .member(MemberSpec::method("Clear"))
        .build();

        Self {
            assembly,
            object,
            string,
            int32,
            boolean,
            double,
            list,
        }
    }

    /// All built-in handles
    #[must_use]
    pub fn all(&self) -> [&TypeHandle; 6] {
        [
            &self.object,
            &self.string,
            &self.int32,
            &self.boolean,
            &self.double,
            &self.list,
        ]
    }
}

static CORE_TYPES: Lazy<CoreTypes> = Lazy::new(CoreTypes::build);

/// Process-wide built-in types
#[inline]
#[must_use]
pub fn core_types() -> &'static CoreTypes {
    &CORE_TYPES
}
