//! Accessibility and genericity validation
//!
//! Decides whether a type may be subclassed from the generation assembly:
//! it must be closed (no unbound generic parameters at any depth) and every
//! type involved, including generic arguments, must be visible to generated
//! code.

use crate::error::GenerationError;
use proxy_model::{Accessibility, AssemblyInfo, TypeKind, TypeRef, TypeSpec};

/// Validates proxy targets against a generation assembly
#[derive(Debug, Clone)]
pub struct ProxyValidator {
    generation_assembly: String,
}

impl ProxyValidator {
    /// Create validator for code generated into `generation_assembly`
    #[inline]
    #[must_use]
    pub fn new(generation_assembly: impl Into<String>) -> Self {
        Self {
            generation_assembly: generation_assembly.into(),
        }
    }

    /// Assembly generated code lives in
    #[inline]
    #[must_use]
    pub fn generation_assembly(&self) -> &str {
        &self.generation_assembly
    }

    /// Validate a class proxy target
    ///
    /// Checks, in order: the target is not a generic definition; the target
    /// is accessible; its generic arguments, depth-first and left to right,
    /// are closed and accessible; it is a class; it is not sealed. The first
    /// failure is reported.
    ///
    /// # Errors
    /// Returns the [`GenerationError`] describing the first violation
    pub fn validate_target(&self, target: &TypeSpec) -> Result<(), GenerationError> {
        self.validate_type(target)?;
        if target.kind() != TypeKind::Class {
            return Err(GenerationError::not_a_class(target));
        }
        if target.is_sealed() {
            return Err(GenerationError::sealed(target));
        }
        Ok(())
    }

    /// Validate an additional interface
    ///
    /// # Errors
    /// [`NotAnInterface`](crate::GenerationErrorKind::NotAnInterface) for
    /// non-interfaces, otherwise as for the genericity and accessibility walk
    pub fn validate_interface(&self, iface: &TypeSpec) -> Result<(), GenerationError> {
        if iface.kind() != TypeKind::Interface {
            return Err(GenerationError::not_an_interface(iface));
        }
        self.validate_type(iface)
    }

    /// Validate a mixin type
    ///
    /// # Errors
    /// As for the genericity and accessibility walk
    pub fn validate_mixin(&self, mixin: &TypeSpec) -> Result<(), GenerationError> {
        self.validate_type(mixin)
    }

    fn validate_type(&self, ty: &TypeSpec) -> Result<(), GenerationError> {
        if ty.is_generic_definition() {
            return Err(GenerationError::open_generic(ty));
        }
        if !self.is_accessible(ty) {
            return Err(GenerationError::not_accessible(ty, &self.generation_assembly));
        }
        for argument in ty.generic_arguments() {
            self.validate_argument(ty, argument)?;
        }
        Ok(())
    }

    fn validate_argument(&self, outer: &TypeSpec, argument: &TypeRef) -> Result<(), GenerationError> {
        match argument {
            TypeRef::Param(name) => Err(GenerationError::open_generic_argument(outer, name)),
            TypeRef::Array(element) => self.validate_argument(outer, element),
            TypeRef::Type(ty) => {
                if ty.is_generic_definition() {
                    return Err(GenerationError::open_generic_argument(outer, &ty.full_name()));
                }
                if !self.is_accessible(ty) {
                    return Err(GenerationError::argument_not_accessible(
                        outer,
                        ty,
                        &self.generation_assembly,
                    ));
                }
                ty.generic_arguments()
                    .iter()
                    .try_for_each(|nested| self.validate_argument(outer, nested))
            }
        }
    }

    /// Whether generated code can name `ty`
    ///
    /// Public types are accessible; internal and protected-internal types
    /// only when their assembly grants visibility to the generation
    /// assembly. Nested types additionally need an accessible declaring type.
    #[must_use]
    pub fn is_accessible(&self, ty: &TypeSpec) -> bool {
        let own = match ty.accessibility() {
            Accessibility::Public => true,
            Accessibility::Internal | Accessibility::ProtectedInternal => {
                self.sees_internals_of(ty.assembly())
            }
            Accessibility::Protected | Accessibility::Private => false,
        };
        own && ty
            .declaring_type()
            .map_or(true, |outer| self.is_accessible(outer))
    }

    /// Whether a generated subclass may use a member of `owner` declared
    /// with `accessibility`
    #[must_use]
    pub fn is_member_accessible(&self, owner: &TypeSpec, accessibility: Accessibility) -> bool {
        accessibility.admits_subclass(self.sees_internals_of(owner.assembly()))
    }

    fn sees_internals_of(&self, assembly: &AssemblyInfo) -> bool {
        assembly.grants_internals_to(&self.generation_assembly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationErrorKind;
    use pretty_assertions::assert_eq;
    use proxy_model::{core_types, AssemblyInfo, TypeName, TypeSpec};

    const GEN: &str = "DynamicProxyGenAssembly";

    fn validator() -> ProxyValidator {
        ProxyValidator::new(GEN)
    }

    #[test]
    fn public_closed_class_is_valid() {
        let asm = AssemblyInfo::new("App").shared();
        let ty = TypeSpec::class(TypeName::new("App", "Service"), &asm).build();
        assert_eq!(validator().validate_target(&ty), Ok(()));
    }

    #[test]
    fn generic_definition_is_open() {
        let err = validator().validate_target(&core_types().list).unwrap_err();
        assert_eq!(err.kind(), GenerationErrorKind::OpenGenericType);
    }

    #[test]
    fn internal_needs_grant() {
        let hidden = AssemblyInfo::new("App").shared();
        let granted = AssemblyInfo::new("Friendly").with_friend(GEN).shared();

        let a = TypeSpec::class(TypeName::new("App", "Hidden"), &hidden)
            .accessibility(Accessibility::Internal)
            .build();
        let b = TypeSpec::class(TypeName::new("Friendly", "Shown"), &granted)
            .accessibility(Accessibility::Internal)
            .build();

        let err = validator().validate_target(&a).unwrap_err();
        assert_eq!(err.kind(), GenerationErrorKind::TypeNotAccessible);
        assert_eq!(
            err.message(),
            "Can not create proxy for type App.Hidden because it is not accessible. \
             Make it public, or internal and grant visibility to DynamicProxyGenAssembly"
        );
        assert_eq!(validator().validate_target(&b), Ok(()));
    }

    #[test]
    fn nested_type_needs_accessible_declaring_type() {
        let asm = AssemblyInfo::new("App").shared();
        let outer = TypeSpec::class(TypeName::new("App", "Outer"), &asm)
            .accessibility(Accessibility::Internal)
            .build();
        let inner = TypeSpec::class(TypeName::new("App", "Inner"), &asm)
            .nested_in(&outer)
            .build();

        assert!(!validator().is_accessible(&inner));
    }

    #[test]
    fn protected_nested_type_is_not_accessible() {
        let asm = AssemblyInfo::new("App").with_friend(GEN).shared();
        let outer = TypeSpec::class(TypeName::new("App", "Outer"), &asm).build();
        let inner = TypeSpec::class(TypeName::new("App", "Inner"), &asm)
            .nested_in(&outer)
            .accessibility(Accessibility::Protected)
            .build();

        assert!(!validator().is_accessible(&inner));
    }

    #[test]
    fn interfaces_and_value_types_are_not_classes() {
        let asm = AssemblyInfo::new("App").shared();
        let iface = TypeSpec::interface(TypeName::new("App", "IThing"), &asm).build();

        assert_eq!(
            validator().validate_target(&iface).unwrap_err().kind(),
            GenerationErrorKind::NotAClass
        );
        assert_eq!(
            validator().validate_target(&core_types().int32).unwrap_err().kind(),
            GenerationErrorKind::NotAClass
        );
    }

    #[test]
    fn sealed_class_rejected() {
        assert_eq!(
            validator()
                .validate_target(&core_types().string)
                .unwrap_err()
                .kind(),
            GenerationErrorKind::SealedType
        );
    }

    #[test]
    fn additional_interface_must_be_interface() {
        let err = validator()
            .validate_interface(&core_types().object)
            .unwrap_err();
        assert_eq!(err.kind(), GenerationErrorKind::NotAnInterface);
    }

    #[test]
    fn member_accessibility() {
        let asm = AssemblyInfo::new("App").shared();
        let ty = TypeSpec::class(TypeName::new("App", "Service"), &asm).build();
        let v = validator();

        assert!(v.is_member_accessible(&ty, Accessibility::Public));
        assert!(v.is_member_accessible(&ty, Accessibility::Protected));
        assert!(!v.is_member_accessible(&ty, Accessibility::Internal));
        assert!(!v.is_member_accessible(&ty, Accessibility::Private));
    }
}
