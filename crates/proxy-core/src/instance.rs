//! Proxy instances
//!
//! A [`ProxyInstance`] is one object of a generated proxy type. It owns its
//! interceptor chain and field state; its type (and so its dispatch table)
//! is shared with every other instance generated for the same signature.

use crate::binder::{bind_overload, describe_arguments, ConstructorBinding, OverloadError};
use crate::descriptor::DispatchMode;
use crate::emission::{DispatchSlot, GeneratedProxyType};
use crate::error::{GenerationError, ProxyError};
use crate::interception::{Interceptor, Invocation};
use parking_lot::Mutex;
use proxy_model::{ConstructorSignature, InvocationError, Receiver, Value};
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// An object of a generated proxy type
pub struct ProxyInstance {
    proxy_type: Arc<GeneratedProxyType>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    fields: Mutex<BTreeMap<String, Value>>,
    constructed_with: ConstructorSignature,
    log_steps: bool,
}

impl ProxyInstance {
    /// Generated type of this instance
    #[inline]
    #[must_use]
    pub fn proxy_type(&self) -> &Arc<GeneratedProxyType> {
        &self.proxy_type
    }

    /// Interceptor chain installed on this instance
    #[inline]
    #[must_use]
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    /// Signature of the base constructor that initialized this instance
    #[inline]
    #[must_use]
    pub fn constructed_with(&self) -> &ConstructorSignature {
        &self.constructed_with
    }

    /// Read a field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.lock().get(name).cloned()
    }

    /// Write a field
    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.lock().insert(name.to_string(), value);
    }

    /// Call member `name` with `arguments`
    ///
    /// The overload is chosen with the same rules as constructor binding.
    /// Intercepted members run through the interceptor chain (filtered by
    /// the options' selector, if any); other members run their base body
    /// directly.
    ///
    /// # Errors
    /// - [`InvocationError::MissingMember`] if no member has that name
    /// - [`InvocationError::NoMatchingOverload`] / [`InvocationError::AmbiguousMember`]
    ///   if overload resolution fails
    /// - [`InvocationError::AbstractMember`] if the call reaches a member without body
    /// - any error raised by interceptors or the body
    pub fn invoke(&self, name: &str, arguments: Vec<Value>) -> Result<Value, InvocationError> {
        let slots: Vec<&DispatchSlot> = self.proxy_type.overloads(name).collect();
        if slots.is_empty() {
            return Err(InvocationError::MissingMember {
                type_name: self.proxy_type.full_name(),
                member: name.to_string(),
            });
        }

        let described = describe_arguments(&arguments);
        let chosen = bind_overload(
            slots
                .iter()
                .enumerate()
                .map(|(i, slot)| (i, slot.member.parameters())),
            arguments,
        )
        .map_err(|err| match err {
            OverloadError::NoMatch => InvocationError::NoMatchingOverload {
                type_name: self.proxy_type.full_name(),
                member: name.to_string(),
                arguments: described,
            },
            OverloadError::Ambiguous(tied) => InvocationError::AmbiguousMember {
                type_name: self.proxy_type.full_name(),
                member: name.to_string(),
                candidates: tied.iter().map(|&i| slots[i].member.signature()).collect(),
            },
        })?;

        let slot = slots[chosen.index];
        match slot.mode {
            DispatchMode::PassThrough => {
                let body = slot.member.method_body().ok_or_else(|| {
                    InvocationError::AbstractMember {
                        type_name: slot.declaring_type.full_name(),
                        member: slot.member.signature(),
                    }
                })?;
                body(self, &chosen.arguments)
            }
            DispatchMode::Intercept => {
                let selected: Vec<Arc<dyn Interceptor>> =
                    match self.proxy_type.descriptor().options().selector() {
                        Some(selector) => selector.select_interceptors(
                            &slot.declaring_type,
                            &slot.member,
                            &self.interceptors,
                        ),
                        None => self.interceptors.to_vec(),
                    };
                let mut invocation =
                    Invocation::new(self, slot, chosen.arguments, &selected, self.log_steps);
                invocation.proceed()?;
                Ok(invocation.return_value().clone())
            }
        }
    }
}

impl Receiver for ProxyInstance {
    fn type_name(&self) -> String {
        self.proxy_type.full_name()
    }

    fn field(&self, name: &str) -> Option<Value> {
        ProxyInstance::field(self, name)
    }

    fn set_field(&self, name: &str, value: Value) {
        ProxyInstance::set_field(self, name, value);
    }

    fn invoke(&self, member: &str, arguments: Vec<Value>) -> Result<Value, InvocationError> {
        ProxyInstance::invoke(self, member, arguments)
    }
}

impl Debug for ProxyInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyInstance")
            .field("proxy_type", &self.proxy_type.full_name())
            .field("interceptors", &self.interceptors.len())
            .field("constructed_with", &self.constructed_with.to_string())
            .field("fields", &*self.fields.lock())
            .finish()
    }
}

/// Creates proxy instances from generated types
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyInstanceFactory {
    log_interceptor_steps: bool,
}

impl ProxyInstanceFactory {
    /// Create factory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a trace event per interceptor step on created instances
    #[inline]
    #[must_use]
    pub fn with_interceptor_step_logging(mut self, enabled: bool) -> Self {
        self.log_interceptor_steps = enabled;
        self
    }

    /// Instantiate `proxy_type` through the constructor chosen by `binding`
    ///
    /// The interceptor chain is installed before the base constructor body
    /// runs, so virtual calls made by the constructor are intercepted.
    ///
    /// # Errors
    /// - [`ProxyError::Generation`] if the generated type has no constructor
    ///   forwarding to the bound base constructor with the bound signature
    /// - [`ProxyError::Construction`] if the base constructor body fails;
    ///   no instance is returned
    pub fn create(
        &self,
        proxy_type: Arc<GeneratedProxyType>,
        binding: ConstructorBinding,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Result<ProxyInstance, ProxyError> {
        let body = proxy_type
            .constructor_for(binding.constructor_index)
            .filter(|ctor| ctor.signature == binding.signature)
            .map(|ctor| ctor.body.clone())
            .ok_or_else(|| {
                tracing::warn!(
                    proxy_type = %proxy_type.full_name(),
                    signature = %binding.signature,
                    "bound constructor not present on generated type"
                );
                GenerationError::constructor_not_generated(
                    &proxy_type.full_name(),
                    proxy_type.base_type(),
                    &binding.signature,
                )
            })?;

        let instance = ProxyInstance {
            proxy_type,
            interceptors: interceptors.into(),
            fields: Mutex::new(BTreeMap::new()),
            constructed_with: binding.signature,
            log_steps: self.log_interceptor_steps,
        };
        body(&instance, &binding.arguments)?;
        Ok(instance)
    }
}
