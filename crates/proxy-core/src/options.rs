//! Proxy generation options
//!
//! [`ProxyGenerationOptions`] carries the per-request knobs that shape a
//! generated type: which members route through interceptors (the
//! [`ProxyGenerationHook`]), which interceptors a call sees (the
//! [`InterceptorSelector`]) and auxiliary mixin types. Options take part in
//! the cache identity of a generated type, so two requests with equal
//! options share one type.

use crate::interception::Interceptor;
use once_cell::sync::Lazy;
use proxy_model::{MemberSpec, TypeHandle, TypeSpec};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Decides, while a proxy type is planned, which members are intercepted
pub trait ProxyGenerationHook: Send + Sync {
    /// Whether calls to `member` (declared on `ty`) go through the interceptor chain
    fn should_intercept(&self, ty: &TypeSpec, member: &MemberSpec) -> bool;

    /// Called for accessible members that cannot be overridden
    fn non_proxyable_member(&self, ty: &TypeSpec, member: &MemberSpec) {
        let _ = (ty, member);
    }

    /// Called once after every member has been inspected
    fn methods_inspected(&self) {}
}

/// Intercepts every overridable member
#[derive(Debug, Clone, Copy, Default)]
pub struct AllMethodsHook;

impl ProxyGenerationHook for AllMethodsHook {
    fn should_intercept(&self, _ty: &TypeSpec, _member: &MemberSpec) -> bool {
        true
    }
}

static DEFAULT_HOOK: Lazy<Arc<dyn ProxyGenerationHook>> = Lazy::new(|| Arc::new(AllMethodsHook));

/// Chooses, per call, which interceptors of an instance's chain apply
pub trait InterceptorSelector: Send + Sync {
    /// Interceptors to run for a call to `member` declared on `ty`, in order
    fn select_interceptors(
        &self,
        ty: &TypeSpec,
        member: &MemberSpec,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Vec<Arc<dyn Interceptor>>;
}

/// Options for one proxy generation request
///
/// Equality is value equality over every field; hooks and selectors compare
/// by `Arc` identity, types by type identity.
#[derive(Clone)]
pub struct ProxyGenerationOptions {
    base_type: Option<TypeHandle>,
    hook: Arc<dyn ProxyGenerationHook>,
    selector: Option<Arc<dyn InterceptorSelector>>,
    mixins: Vec<TypeHandle>,
}

impl ProxyGenerationOptions {
    /// Default options: intercept all members, no selector, no mixins
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an explicit base type; class proxies always subclass the target,
    /// so this only distinguishes cached types
    #[must_use]
    pub fn with_base_type(mut self, base_type: TypeHandle) -> Self {
        self.base_type = Some(base_type);
        self
    }

    /// With generation hook
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn ProxyGenerationHook>) -> Self {
        self.hook = hook;
        self
    }

    /// With interceptor selector
    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn InterceptorSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// With an additional mixin type
    #[must_use]
    pub fn with_mixin(mut self, mixin: TypeHandle) -> Self {
        self.mixins.push(mixin);
        self
    }

    /// Explicit base type
    #[inline]
    #[must_use]
    pub fn base_type(&self) -> Option<&TypeHandle> {
        self.base_type.as_ref()
    }

    /// Generation hook
    #[inline]
    #[must_use]
    pub fn hook(&self) -> &Arc<dyn ProxyGenerationHook> {
        &self.hook
    }

    /// Interceptor selector
    #[inline]
    #[must_use]
    pub fn selector(&self) -> Option<&Arc<dyn InterceptorSelector>> {
        self.selector.as_ref()
    }

    /// Mixin types
    #[inline]
    #[must_use]
    pub fn mixins(&self) -> &[TypeHandle] {
        &self.mixins
    }

    /// Hashable identity of these options
    ///
    /// Only meaningful while the options (and so their hook and selector)
    /// are alive; the descriptor cache keeps them alive alongside the key.
    #[must_use]
    pub fn identity(&self) -> OptionsIdentity {
        OptionsIdentity {
            base_type: self.base_type.as_ref().map(|t| t.key().to_string()),
            hook: arc_address(&self.hook),
            selector: self.selector.as_ref().map(arc_address),
            mixins: self.mixins.iter().map(|m| m.key().to_string()).collect(),
        }
    }
}

impl Default for ProxyGenerationOptions {
    fn default() -> Self {
        Self {
            base_type: None,
            hook: DEFAULT_HOOK.clone(),
            selector: None,
            mixins: Vec::new(),
        }
    }
}

impl PartialEq for ProxyGenerationOptions {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ProxyGenerationOptions {}

impl Debug for ProxyGenerationOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyGenerationOptions")
            .field("base_type", &self.base_type.as_ref().map(|t| t.full_name()))
            .field("hook", &arc_address(&self.hook))
            .field("selector", &self.selector.as_ref().map(arc_address))
            .field("mixins", &self.mixins.iter().map(|m| m.full_name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Hashable identity of [`ProxyGenerationOptions`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionsIdentity {
    base_type: Option<String>,
    hook: usize,
    selector: Option<usize>,
    mixins: Vec<String>,
}

impl OptionsIdentity {
    pub(crate) fn hash_into(&self, hasher: &mut blake3::Hasher) {
        if let Some(base) = &self.base_type {
            hasher.update(b"base:").update(base.as_bytes());
        }
        hasher.update(b"hook:").update(&self.hook.to_le_bytes());
        if let Some(selector) = self.selector {
            hasher.update(b"selector:").update(&selector.to_le_bytes());
        }
        for mixin in &self.mixins {
            hasher.update(b"mixin:").update(mixin.as_bytes());
        }
    }
}

fn arc_address<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc).cast::<()>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_model::core_types;

    struct NoMethodsHook;

    impl ProxyGenerationHook for NoMethodsHook {
        fn should_intercept(&self, _ty: &TypeSpec, _member: &MemberSpec) -> bool {
            false
        }
    }

    #[test]
    fn default_options_are_equal() {
        assert_eq!(ProxyGenerationOptions::new(), ProxyGenerationOptions::default());
        assert_eq!(
            ProxyGenerationOptions::new().identity(),
            ProxyGenerationOptions::new().identity()
        );
    }

    #[test]
    fn hooks_compare_by_identity() {
        let hook: Arc<dyn ProxyGenerationHook> = Arc::new(NoMethodsHook);
        let a = ProxyGenerationOptions::new().with_hook(hook.clone());
        let b = ProxyGenerationOptions::new().with_hook(hook);
        let c = ProxyGenerationOptions::new().with_hook(Arc::new(NoMethodsHook));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, ProxyGenerationOptions::new());
    }

    #[test]
    fn mixins_and_base_type_compare_by_type() {
        let core = core_types();
        let a = ProxyGenerationOptions::new().with_mixin(core.string.clone());
        let b = ProxyGenerationOptions::new().with_mixin(core.string.clone());
        assert_eq!(a, b);

        let based = ProxyGenerationOptions::new().with_base_type(core.object.clone());
        assert_ne!(based, ProxyGenerationOptions::new());
    }
}
