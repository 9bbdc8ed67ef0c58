//! Error types for the type model
//!
//! Provides error handling for:
//! - Type construction and registry lookups
//! - Manifest loading
//! - Member invocation on proxied objects

/// Errors raised while describing or resolving types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Type name could not be parsed
    #[error("invalid type name: '{0}'")]
    InvalidTypeName(String),

    /// Type is not registered
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A type with the same full name is already registered
    #[error("type already registered: {0}")]
    DuplicateType(String),

    /// Generic instantiation requested on a non-generic-definition type
    #[error("type {0} is not a generic type definition")]
    NotGenericDefinition(String),

    /// Wrong number of generic arguments
    #[error("type {type_name} expects {expected} generic arguments, got {actual}")]
    GenericArityMismatch {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    /// Malformed parameter list (e.g. `params` on a non-array or non-final parameter)
    #[error("invalid parameter list: {0}")]
    InvalidParameters(String),

    /// Manifest could not be parsed or applied
    #[error("manifest error: {0}")]
    Manifest(String),

    /// JSON value cannot be represented as a runtime value
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),
}

/// Errors raised while invoking members on an object
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    /// Call reached an abstract member with nothing left to proceed to
    #[error("member {member} of {type_name} is abstract and has no implementation to proceed to")]
    AbstractMember { type_name: String, member: String },

    /// No member with that name exists
    #[error("type {type_name} has no member named {member}")]
    MissingMember { type_name: String, member: String },

    /// Members exist but none accepts the arguments
    #[error("no overload of {type_name}.{member} accepts arguments ({arguments})")]
    NoMatchingOverload {
        type_name: String,
        member: String,
        arguments: String,
    },

    /// Several overloads accept the arguments equally well
    #[error("call to {type_name}.{member} is ambiguous between: {candidates:?}")]
    AmbiguousMember {
        type_name: String,
        member: String,
        candidates: Vec<String>,
    },

    /// Raised by a member body or an interceptor
    #[error("{0}")]
    Failed(String),
}

impl InvocationError {
    /// Create a failure raised by user code
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
