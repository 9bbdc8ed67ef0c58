//! Type emission
//!
//! [`EmissionBackend`] is the boundary between planning a proxy type and
//! materializing it. The default [`InterpretingBackend`] materializes a
//! descriptor as a constructor list plus a dispatch table that proxy
//! instances interpret at call time.

use crate::descriptor::{DispatchMode, ProxyDescriptor};
use crate::error::EmissionError;
use dashmap::DashMap;
use indexmap::IndexMap;
use proxy_model::{ConstructorBody, ConstructorSignature, MemberSpec, TypeHandle, TypeName};
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Turns a validated descriptor into a concrete proxy type
pub trait EmissionBackend: Send + Sync {
    /// Materialize `descriptor`
    ///
    /// # Errors
    /// Returns [`EmissionError`] if the type cannot be produced
    fn emit(&self, descriptor: Arc<ProxyDescriptor>) -> Result<GeneratedProxyType, EmissionError>;
}

/// Unique identity of a generated proxy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyTypeId(Uuid);

impl ProxyTypeId {
    /// Fresh random id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProxyTypeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ProxyTypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A constructor of the generated type, forwarding to a base constructor
#[derive(Clone)]
pub struct GeneratedConstructor {
    /// Index into the target's declared constructors
    pub base_index: usize,
    /// Signature shared with the base constructor
    pub signature: ConstructorSignature,
    /// Base constructor body
    pub body: ConstructorBody,
}

impl Debug for GeneratedConstructor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedConstructor")
            .field("base_index", &self.base_index)
            .field("signature", &self.signature.to_string())
            .finish_non_exhaustive()
    }
}

/// Entry of a dispatch table
#[derive(Debug, Clone)]
pub struct DispatchSlot {
    /// Type declaring the implementation
    pub declaring_type: TypeHandle,
    /// Member being dispatched
    pub member: MemberSpec,
    /// Routing
    pub mode: DispatchMode,
}

/// A generated proxy type
#[derive(Debug)]
pub struct GeneratedProxyType {
    id: ProxyTypeId,
    name: TypeName,
    descriptor: Arc<ProxyDescriptor>,
    constructors: Vec<GeneratedConstructor>,
    dispatch: IndexMap<String, DispatchSlot>,
}

impl GeneratedProxyType {
    /// Assemble a proxy type; for use by emission backends
    #[must_use]
    pub fn new(
        name: TypeName,
        descriptor: Arc<ProxyDescriptor>,
        constructors: Vec<GeneratedConstructor>,
        dispatch: IndexMap<String, DispatchSlot>,
    ) -> Self {
        Self {
            id: ProxyTypeId::new(),
            name,
            descriptor,
            constructors,
            dispatch,
        }
    }

    /// Unique id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ProxyTypeId {
        self.id
    }

    /// Generated type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// Generated type full name
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        self.name.to_string()
    }

    /// Descriptor this type was emitted from
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &Arc<ProxyDescriptor> {
        &self.descriptor
    }

    /// Base type (the proxied class)
    #[inline]
    #[must_use]
    pub fn base_type(&self) -> &TypeHandle {
        self.descriptor.target()
    }

    /// Interfaces added by the proxy
    #[inline]
    #[must_use]
    pub fn interfaces(&self) -> &[TypeHandle] {
        self.descriptor.interfaces()
    }

    /// Generated constructors
    #[inline]
    #[must_use]
    pub fn constructors(&self) -> &[GeneratedConstructor] {
        &self.constructors
    }

    /// Generated constructor forwarding to the base constructor at `base_index`
    #[must_use]
    pub fn constructor_for(&self, base_index: usize) -> Option<&GeneratedConstructor> {
        self.constructors.iter().find(|c| c.base_index == base_index)
    }

    /// Dispatch table keyed by member signature
    #[inline]
    #[must_use]
    pub fn dispatch_table(&self) -> &IndexMap<String, DispatchSlot> {
        &self.dispatch
    }

    /// Slots for every member named `name`
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DispatchSlot> + 'a {
        self.dispatch
            .values()
            .filter(move |slot| slot.member.name() == name)
    }
}

/// Default backend: interprets descriptors instead of generating code
///
/// Names generated types `{namespace}.{Target}Proxy`, appending `_N` when a
/// name repeats (e.g. the same target with different options).
#[derive(Debug)]
pub struct InterpretingBackend {
    namespace: String,
    name_counts: DashMap<String, usize>,
}

impl InterpretingBackend {
    /// Create backend emitting into `namespace`
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name_counts: DashMap::new(),
        }
    }

    fn next_name(&self, target: &TypeHandle) -> TypeName {
        let base = format!("{}Proxy", target.type_name().base_name());
        let mut count = self.name_counts.entry(base.clone()).or_insert(0);
        let name = if *count == 0 {
            base
        } else {
            format!("{base}_{}", *count)
        };
        *count += 1;
        TypeName::new(self.namespace.clone(), name)
    }
}

impl EmissionBackend for InterpretingBackend {
    fn emit(&self, descriptor: Arc<ProxyDescriptor>) -> Result<GeneratedProxyType, EmissionError> {
        let target = descriptor.target();
        if descriptor.constructors().is_empty() {
            return Err(EmissionError::new(
                target.full_name(),
                "no accessible constructor to forward to",
            ));
        }

        let constructors = descriptor
            .constructors()
            .iter()
            .map(|plan| {
                target
                    .constructors()
                    .get(plan.base_index)
                    .map(|ctor| GeneratedConstructor {
                        base_index: plan.base_index,
                        signature: plan.signature.clone(),
                        body: ctor.body().clone(),
                    })
                    .ok_or_else(|| {
                        EmissionError::new(
                            target.full_name(),
                            format!("constructor #{} does not exist", plan.base_index),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dispatch = descriptor
            .members()
            .iter()
            .map(|plan| {
                (
                    plan.signature(),
                    DispatchSlot {
                        declaring_type: plan.declaring_type.clone(),
                        member: plan.member.clone(),
                        mode: plan.dispatch,
                    },
                )
            })
            .collect();

        let name = self.next_name(target);
        Ok(GeneratedProxyType::new(name, descriptor, constructors, dispatch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorBuilder;
    use crate::options::ProxyGenerationOptions;
    use crate::validator::ProxyValidator;
    use pretty_assertions::assert_eq;
    use proxy_model::{Accessibility, AssemblyInfo, ConstructorSpec, TypeSpec};

    fn describe(target: &TypeHandle) -> Arc<ProxyDescriptor> {
        Arc::new(
            DescriptorBuilder::new(ProxyValidator::new("Gen"))
                .build(target, &[], &ProxyGenerationOptions::new())
                .unwrap(),
        )
    }

    #[test]
    fn names_are_unique_per_backend() {
        let asm = AssemblyInfo::new("App").shared();
        let target = TypeSpec::class(TypeName::new("App", "Widget"), &asm).build();
        let backend = InterpretingBackend::new("Proxies");

        let first = backend.emit(describe(&target)).unwrap();
        let second = backend.emit(describe(&target)).unwrap();

        assert_eq!(first.full_name(), "Proxies.WidgetProxy");
        assert_eq!(second.full_name(), "Proxies.WidgetProxy_1");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn dispatch_table_keyed_by_signature() {
        let asm = AssemblyInfo::new("App").shared();
        let target = TypeSpec::class(TypeName::new("App", "Widget"), &asm).build();
        let emitted = InterpretingBackend::new("Proxies")
            .emit(describe(&target))
            .unwrap();

        let slot = &emitted.dispatch_table()["ToString()"];
        assert_eq!(slot.mode, DispatchMode::Intercept);
        assert_eq!(emitted.overloads("ToString").count(), 1);
        assert_eq!(emitted.base_type(), &target);
    }

    #[test]
    fn target_without_accessible_constructor_fails() {
        let asm = AssemblyInfo::new("App").shared();
        let target = TypeSpec::class(TypeName::new("App", "Locked"), &asm)
            .constructor(ConstructorSpec::default_constructor().with_accessibility(Accessibility::Private))
            .build();

        let err = InterpretingBackend::new("Proxies")
            .emit(describe(&target))
            .unwrap_err();
        assert_eq!(err.type_name, "App.Locked");
    }
}
