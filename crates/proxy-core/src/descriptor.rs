//! Proxy type descriptors
//!
//! A [`ProxyDescriptor`] is the validated plan for one proxy type: which
//! base constructors it forwards to, which interfaces it adds, and how each
//! member it exposes is dispatched. The emission backend turns a descriptor
//! into a [`GeneratedProxyType`](crate::GeneratedProxyType).

use crate::cache::{CacheKey, SignatureFingerprint};
use crate::error::GenerationError;
use crate::options::ProxyGenerationOptions;
use crate::validator::ProxyValidator;
use indexmap::{IndexMap, IndexSet};
use proxy_model::{ConstructorSignature, MemberSpec, TypeHandle, TypeKind};

/// How calls to a member are routed on the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchMode {
    /// Through the instance's interceptor chain, then the base body
    Intercept,
    /// Straight to the base body
    PassThrough,
}

/// A generated constructor forwarding to one base constructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorPlan {
    /// Index into the target's declared constructors
    pub base_index: usize,
    /// Signature shared with the base constructor
    pub signature: ConstructorSignature,
}

/// A member exposed by the proxy
#[derive(Debug, Clone)]
pub struct MemberPlan {
    /// Type declaring the most-derived implementation
    pub declaring_type: TypeHandle,
    /// The member itself
    pub member: MemberSpec,
    /// Routing
    pub dispatch: DispatchMode,
}

impl MemberPlan {
    /// Override identity of the member
    #[inline]
    #[must_use]
    pub fn signature(&self) -> String {
        self.member.signature()
    }
}

/// Validated plan for one proxy type
#[derive(Debug, Clone)]
pub struct ProxyDescriptor {
    target: TypeHandle,
    interfaces: Vec<TypeHandle>,
    options: ProxyGenerationOptions,
    constructors: Vec<ConstructorPlan>,
    members: Vec<MemberPlan>,
    fingerprint: SignatureFingerprint,
}

impl ProxyDescriptor {
    /// Proxied class
    #[inline]
    #[must_use]
    pub fn target(&self) -> &TypeHandle {
        &self.target
    }

    /// Interfaces added on top of those the target already implements
    #[inline]
    #[must_use]
    pub fn interfaces(&self) -> &[TypeHandle] {
        &self.interfaces
    }

    /// Options the descriptor was planned with
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ProxyGenerationOptions {
        &self.options
    }

    /// One plan per accessible target constructor, in declaration order
    #[inline]
    #[must_use]
    pub fn constructors(&self) -> &[ConstructorPlan] {
        &self.constructors
    }

    /// Exposed members, most-derived first
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[MemberPlan] {
        &self.members
    }

    /// Digest of the generation signature
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> SignatureFingerprint {
        self.fingerprint
    }

    /// Plan for the constructor at `base_index`, if it is exposed
    #[must_use]
    pub fn constructor_for(&self, base_index: usize) -> Option<&ConstructorPlan> {
        self.constructors.iter().find(|c| c.base_index == base_index)
    }
}

/// Plans proxy types
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    validator: ProxyValidator,
}

impl DescriptorBuilder {
    /// Create builder judging accessibility with `validator`
    #[inline]
    #[must_use]
    pub fn new(validator: ProxyValidator) -> Self {
        Self { validator }
    }

    /// Plan a proxy of `target` adding `interfaces`
    ///
    /// Validates the target, each additional interface and each mixin, then
    /// walks the target's base chain. For every member signature the
    /// most-derived accessible declaration is kept; overridable ones are
    /// dispatched as the options' hook decides, the rest pass through after
    /// being reported to the hook.
    ///
    /// # Errors
    /// Returns the first validation failure
    pub fn build(
        &self,
        target: &TypeHandle,
        interfaces: &[TypeHandle],
        options: &ProxyGenerationOptions,
    ) -> Result<ProxyDescriptor, GenerationError> {
        self.validator.validate_target(target)?;
        for iface in interfaces {
            self.validator.validate_interface(iface)?;
        }
        for mixin in options.mixins() {
            self.validator.validate_mixin(mixin)?;
        }

        let constructors = target
            .constructors()
            .iter()
            .enumerate()
            .filter(|(_, ctor)| {
                self.validator
                    .is_member_accessible(target, ctor.accessibility())
            })
            .map(|(base_index, ctor)| ConstructorPlan {
                base_index,
                signature: ctor.signature().clone(),
            })
            .collect();

        Ok(ProxyDescriptor {
            target: target.clone(),
            interfaces: self.interface_set(target, interfaces, options),
            options: options.clone(),
            constructors,
            members: self.plan_members(target, options),
            fingerprint: CacheKey::new(
                self.validator.generation_assembly(),
                target,
                interfaces,
                options,
            )
            .fingerprint(),
        })
    }

    fn interface_set(
        &self,
        target: &TypeHandle,
        interfaces: &[TypeHandle],
        options: &ProxyGenerationOptions,
    ) -> Vec<TypeHandle> {
        let mixin_interfaces = options.mixins().iter().flat_map(|mixin| {
            let mut own = mixin.all_interfaces();
            if mixin.kind() == TypeKind::Interface {
                own.insert(0, mixin.clone());
            }
            own
        });

        let set: IndexSet<TypeHandle> = interfaces
            .iter()
            .cloned()
            .chain(mixin_interfaces)
            .filter(|iface| !target.implements(iface))
            .collect();
        set.into_iter().collect()
    }

    fn plan_members(&self, target: &TypeHandle, options: &ProxyGenerationOptions) -> Vec<MemberPlan> {
        let hook = options.hook();
        let mut plans: IndexMap<String, MemberPlan> = IndexMap::new();

        for declaring_type in target.ancestry() {
            for member in declaring_type.members() {
                let signature = member.signature();
                if plans.contains_key(&signature) {
                    continue;
                }
                if !self
                    .validator
                    .is_member_accessible(&declaring_type, member.member_accessibility())
                {
                    continue;
                }

                let dispatch = if member.is_overridable() {
                    if hook.should_intercept(&declaring_type, member) {
                        DispatchMode::Intercept
                    } else {
                        DispatchMode::PassThrough
                    }
                } else {
                    hook.non_proxyable_member(&declaring_type, member);
                    DispatchMode::PassThrough
                };

                plans.insert(
                    signature,
                    MemberPlan {
                        declaring_type: declaring_type.clone(),
                        member: member.clone(),
                        dispatch,
                    },
                );
            }
        }

        hook.methods_inspected();
        plans.into_values().collect()
    }
}
