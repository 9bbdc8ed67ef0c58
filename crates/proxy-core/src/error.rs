//! Error types for proxy generation
//!
//! Provides error handling for:
//! - Generation (validation, constructor binding, emission)
//! - Construction of proxy instances
//! - Configuration loading

use proxy_model::{ConstructorSignature, InvocationError, TypeSpec};

/// Category of a generation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationErrorKind {
    /// Target, or one of its generic arguments, has unbound generic parameters
    OpenGenericType,

    /// Target, or one of its generic arguments, cannot be seen from the generation assembly
    TypeNotAccessible,

    /// No single accessible constructor matches the arguments
    ConstructorBindingFailed,

    /// The emission backend failed
    EmissionFailed,

    /// Target is not a class
    NotAClass,

    /// Target forbids subclassing
    SealedType,

    /// Additional interface is not an interface
    NotAnInterface,
}

/// A failed generation request
///
/// Carries a category for programmatic handling and the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GenerationError {
    kind: GenerationErrorKind,
    message: String,
}

impl GenerationError {
    /// Create error of `kind`
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Target is an open generic type
    pub fn open_generic(target: &TypeSpec) -> Self {
        Self::new(
            GenerationErrorKind::OpenGenericType,
            format!(
                "Can not create proxy for type {} because it is an open generic type.",
                target.full_name()
            ),
        )
    }

    /// A generic argument of `outer` is open
    pub fn open_generic_argument(outer: &TypeSpec, argument: &str) -> Self {
        Self::new(
            GenerationErrorKind::OpenGenericType,
            format!(
                "Can not create proxy for type {} because type {argument} is an open generic type.",
                outer.full_name()
            ),
        )
    }

    /// Target cannot be seen from `generation_assembly`
    pub fn not_accessible(target: &TypeSpec, generation_assembly: &str) -> Self {
        Self::new(
            GenerationErrorKind::TypeNotAccessible,
            format!(
                "Can not create proxy for type {} because it is not accessible. \
                 Make it public, or internal and grant visibility to {generation_assembly}",
                target.full_name()
            ),
        )
    }

    /// A generic argument of `outer` cannot be seen from `generation_assembly`
    pub fn argument_not_accessible(
        outer: &TypeSpec,
        argument: &TypeSpec,
        generation_assembly: &str,
    ) -> Self {
        Self::new(
            GenerationErrorKind::TypeNotAccessible,
            format!(
                "Can not create proxy for type {} because type {} is not accessible. \
                 Make it public, or internal and grant visibility to {generation_assembly}",
                outer.full_name(),
                argument.full_name()
            ),
        )
    }

    /// No accessible constructor matches `arguments`
    pub fn no_matching_constructor(target: &TypeSpec, arguments: &str) -> Self {
        Self::new(
            GenerationErrorKind::ConstructorBindingFailed,
            format!(
                "Can not instantiate proxy of class: {}. \
                 Could not find a constructor that would match given arguments: ({arguments})",
                target.full_name()
            ),
        )
    }

    /// Several constructors match `arguments` equally well
    pub fn ambiguous_constructor(target: &TypeSpec, arguments: &str, candidates: &[String]) -> Self {
        Self::new(
            GenerationErrorKind::ConstructorBindingFailed,
            format!(
                "Can not instantiate proxy of class: {}. \
                 Arguments ({arguments}) match more than one constructor: {}",
                target.full_name(),
                candidates.join(", ")
            ),
        )
    }

    /// The generated type has no constructor with the bound signature
    pub fn constructor_not_generated(
        proxy_type: &str,
        target: &TypeSpec,
        signature: &ConstructorSignature,
    ) -> Self {
        Self::new(
            GenerationErrorKind::ConstructorBindingFailed,
            format!(
                "Can not instantiate proxy of class: {}. \
                 Proxy type {proxy_type} has no constructor {signature}",
                target.full_name()
            ),
        )
    }

    /// Target is not a class
    pub fn not_a_class(target: &TypeSpec) -> Self {
        Self::new(
            GenerationErrorKind::NotAClass,
            format!(
                "Can not create class proxy for type {} because it is not a class.",
                target.full_name()
            ),
        )
    }

    /// Target is sealed
    pub fn sealed(target: &TypeSpec) -> Self {
        Self::new(
            GenerationErrorKind::SealedType,
            format!(
                "Can not create proxy for type {} because it is sealed.",
                target.full_name()
            ),
        )
    }

    /// Additional interface is not an interface
    pub fn not_an_interface(ty: &TypeSpec) -> Self {
        Self::new(
            GenerationErrorKind::NotAnInterface,
            format!(
                "Type {} is not an interface and can not be implemented by a proxy.",
                ty.full_name()
            ),
        )
    }

    /// Failure category
    #[inline]
    #[must_use]
    pub fn kind(&self) -> GenerationErrorKind {
        self.kind
    }

    /// User-facing message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<EmissionError> for GenerationError {
    fn from(err: EmissionError) -> Self {
        Self::new(GenerationErrorKind::EmissionFailed, err.to_string())
    }
}

/// Failure reported by an emission backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to emit proxy type for {type_name}: {reason}")]
pub struct EmissionError {
    pub type_name: String,
    pub reason: String,
}

impl EmissionError {
    /// Create emission error for `type_name`
    pub fn new(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from creating a proxy instance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// The proxy type could not be generated or bound
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The base constructor failed; no instance was produced
    #[error("proxy constructor failed: {0}")]
    Construction(#[from] InvocationError),
}

impl ProxyError {
    /// Generation failure category, if this is a generation error
    #[must_use]
    pub fn generation_kind(&self) -> Option<GenerationErrorKind> {
        match self {
            Self::Generation(err) => Some(err.kind()),
            Self::Construction(_) => None,
        }
    }
}

/// Errors loading generator configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is not valid TOML for the expected shape
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_model::core_types;

    #[test]
    fn open_generic_message() {
        let err = GenerationError::open_generic(&core_types().list);
        assert_eq!(err.kind(), GenerationErrorKind::OpenGenericType);
        assert_eq!(
            err.to_string(),
            "Can not create proxy for type System.Collections.Generic.List`1 \
             because it is an open generic type."
        );
    }

    #[test]
    fn emission_error_converts() {
        let err: GenerationError = EmissionError::new("App.Foo", "boom").into();
        assert_eq!(err.kind(), GenerationErrorKind::EmissionFailed);
        assert!(err.message().contains("boom"));
    }

    #[test]
    fn proxy_error_kind() {
        let err: ProxyError = GenerationError::sealed(&core_types().string).into();
        assert_eq!(err.generation_kind(), Some(GenerationErrorKind::SealedType));

        let err: ProxyError = InvocationError::failed("ctor threw").into();
        assert_eq!(err.generation_kind(), None);
    }
}
