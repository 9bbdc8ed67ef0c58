//! Type names
//!
//! Provides [`TypeName`], the namespace-qualified name of a type definition.
//! Nested types are spelled `Namespace.Outer+Inner`; generic definitions carry
//! their arity as a `` `N `` suffix (``System.Collections.Generic.List`1``).

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Name of a type definition as the host type system spells it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeName {
    namespace: String,
    /// Enclosing type names, outermost first
    nesting: Vec<String>,
    name: String,
}

impl TypeName {
    /// Create a top-level type name
    #[inline]
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            nesting: Vec::new(),
            name: name.into(),
        }
    }

    /// Create the name of a generic definition with `arity` type parameters
    #[must_use]
    pub fn generic(namespace: impl Into<String>, name: impl Into<String>, arity: usize) -> Self {
        Self::new(namespace, format!("{}`{}", name.into(), arity))
    }

    /// Name of a type nested inside `self`
    #[must_use]
    pub fn nested(&self, name: impl Into<String>) -> Self {
        let mut nesting = self.nesting.clone();
        nesting.push(self.name.clone());
        Self {
            namespace: self.namespace.clone(),
            nesting,
            name: name.into(),
        }
    }

    /// Namespace (may be empty)
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Simple name, including any arity suffix
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simple name without the arity suffix
    #[must_use]
    pub fn base_name(&self) -> &str {
        self.name.split('`').next().unwrap_or(&self.name)
    }

    /// Enclosing type names, outermost first
    #[inline]
    #[must_use]
    pub fn nesting(&self) -> &[String] {
        &self.nesting
    }

    /// Whether this names a nested type
    #[inline]
    #[must_use]
    pub fn is_nested(&self) -> bool {
        !self.nesting.is_empty()
    }

    /// Generic arity encoded in the name, 0 for non-generic names
    #[must_use]
    pub fn arity(&self) -> usize {
        self.name
            .rsplit_once('`')
            .and_then(|(_, n)| n.parse().ok())
            .unwrap_or(0)
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{}.", self.namespace)?;
        }
        for outer in &self.nesting {
            write!(f, "{outer}+")?;
        }
        f.write_str(&self.name)
    }
}

impl FromStr for TypeName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('+');
        let head = parts.next().unwrap_or_default();
        let (namespace, first) = match head.rsplit_once('.') {
            Some((ns, name)) => (ns, name),
            None => ("", head),
        };

        let mut names: Vec<String> = std::iter::once(first.to_string())
            .chain(parts.map(str::to_string))
            .collect();

        if names.iter().any(|n| n.is_empty() || n.contains('.')) {
            return Err(ModelError::InvalidTypeName(s.to_string()));
        }

        let name = names.pop().unwrap_or_default();
        Ok(Self {
            namespace: namespace.to_string(),
            nesting: names,
            name,
        })
    }
}
