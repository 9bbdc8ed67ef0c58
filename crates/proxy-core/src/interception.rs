//! Interceptor chain runtime
//!
//! Calls to intercepted members walk the instance's interceptor chain in
//! order. Each interceptor receives the [`Invocation`] and may inspect or
//! rewrite arguments, call [`Invocation::proceed`] to continue down the
//! chain (eventually reaching the base implementation), set a return value
//! without proceeding, or wrap the rest of the chain.

use crate::emission::DispatchSlot;
use crate::instance::ProxyInstance;
use proxy_model::{InvocationError, MemberSpec, TypeHandle, Value};
use std::sync::Arc;

/// A link of an interceptor chain
pub trait Interceptor: Send + Sync {
    /// Handle one call
    ///
    /// # Errors
    /// Errors propagate to the caller of the intercepted member
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError>;
}

/// An in-flight call to an intercepted member
pub struct Invocation<'a> {
    proxy: &'a ProxyInstance,
    slot: &'a DispatchSlot,
    arguments: Vec<Value>,
    return_value: Value,
    interceptors: &'a [Arc<dyn Interceptor>],
    position: usize,
    log_steps: bool,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        proxy: &'a ProxyInstance,
        slot: &'a DispatchSlot,
        arguments: Vec<Value>,
        interceptors: &'a [Arc<dyn Interceptor>],
        log_steps: bool,
    ) -> Self {
        Self {
            proxy,
            slot,
            arguments,
            return_value: Value::Null,
            interceptors,
            position: 0,
            log_steps,
        }
    }

    /// The proxy the call was made on
    #[inline]
    #[must_use]
    pub fn proxy(&self) -> &'a ProxyInstance {
        self.proxy
    }

    /// Member being called
    #[inline]
    #[must_use]
    pub fn member(&self) -> &MemberSpec {
        &self.slot.member
    }

    /// Name of the member being called
    #[inline]
    #[must_use]
    pub fn method_name(&self) -> &str {
        self.slot.member.name()
    }

    /// Type declaring the implementation that `proceed` eventually reaches
    #[inline]
    #[must_use]
    pub fn declaring_type(&self) -> &TypeHandle {
        &self.slot.declaring_type
    }

    /// Current arguments
    #[inline]
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Replace argument `index` for the rest of the chain
    ///
    /// # Errors
    /// Fails if `index` is out of range
    pub fn set_argument(&mut self, index: usize, value: Value) -> Result<(), InvocationError> {
        let count = self.arguments.len();
        let slot = self.arguments.get_mut(index).ok_or_else(|| {
            InvocationError::failed(format!(
                "argument index {index} out of range for {} ({count} arguments)",
                self.slot.member.signature()
            ))
        })?;
        *slot = value;
        Ok(())
    }

    /// Current return value (`null` until set)
    #[inline]
    #[must_use]
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }

    /// Set the value returned to the caller
    #[inline]
    pub fn set_return_value(&mut self, value: Value) {
        self.return_value = value;
    }

    /// Continue with the next interceptor, or the base implementation once
    /// the chain is exhausted
    ///
    /// # Errors
    /// [`InvocationError::AbstractMember`] when the chain is exhausted on a
    /// member without implementation; otherwise whatever the rest of the
    /// chain or the base body raises
    pub fn proceed(&mut self) -> Result<(), InvocationError> {
        let interceptors = self.interceptors;
        let Some(next) = interceptors.get(self.position) else {
            return self.invoke_base();
        };

        if self.log_steps {
            tracing::trace!(
                "{} {}: interceptor step {}",
                self.proxy.proxy_type().full_name(),
                self.slot.member.signature(),
                self.position
            );
        }

        self.position += 1;
        let result = next.intercept(self);
        self.position -= 1;
        result
    }

    fn invoke_base(&mut self) -> Result<(), InvocationError> {
        let body = self
            .slot
            .member
            .method_body()
            .ok_or_else(|| InvocationError::AbstractMember {
                type_name: self.slot.declaring_type.full_name(),
                member: self.slot.member.signature(),
            })?;
        self.return_value = body(self.proxy, &self.arguments)?;
        Ok(())
    }
}

/// Interceptor that always proceeds
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardInterceptor;

impl Interceptor for StandardInterceptor {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        invocation.proceed()
    }
}

/// Interceptor backed by a closure
pub struct FnInterceptor<F>(F);

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> Result<(), InvocationError> + Send + Sync,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        (self.0)(invocation)
    }
}

/// Wrap a closure as a shared interceptor
pub fn interceptor_fn<F>(f: F) -> Arc<dyn Interceptor>
where
    F: Fn(&mut Invocation<'_>) -> Result<(), InvocationError> + Send + Sync + 'static,
{
    Arc::new(FnInterceptor(f))
}
