//! Proxy Core - runtime class proxy generation
//!
//! Synthesizes subclasses of described classes whose virtual members route
//! through a per-instance interceptor chain:
//!
//! - [`ProxyValidator`]: rejects open generic, inaccessible, sealed and non-class targets
//! - [`ConstructorBinder`]: picks the base constructor an argument list calls
//! - [`DescriptorBuilder`] / [`DescriptorCache`]: plan each distinct proxy type once
//! - [`EmissionBackend`]: materializes planned types ([`InterpretingBackend`] by default)
//! - [`ProxyInstanceFactory`] / [`Interceptor`]: instances and their interceptor chains
//! - [`ProxyGenerator`]: the entry points tying these together
//!
//! # Example
//!
//! ```rust,ignore
//! use proxy_core::{interceptor_fn, ProxyGenerator};
//! use proxy_model::Value;
//!
//! let generator = ProxyGenerator::shared();
//! let logger = interceptor_fn(|invocation| {
//!     println!("calling {}", invocation.method_name());
//!     invocation.proceed()
//! });
//!
//! let proxy = generator.create_class_proxy_with_args(&greeter, vec![Value::from("hi")])?;
//! let greeting = proxy.invoke("Greet", vec![])?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod binder;
pub mod cache;
pub mod config;
pub mod descriptor;
pub mod emission;
pub mod error;
pub mod generator;
pub mod instance;
pub mod interception;
pub mod options;
pub mod validator;

// Re-exports for convenience
pub use binder::{bind_overload, ConstructorBinder, ConstructorBinding, OverloadError, OverloadMatch};
pub use cache::{CacheKey, CacheLookup, CacheStats, DescriptorCache, SignatureFingerprint};
pub use config::{GeneratorConfig, DEFAULT_GENERATION_ASSEMBLY};
pub use descriptor::{ConstructorPlan, DescriptorBuilder, DispatchMode, MemberPlan, ProxyDescriptor};
pub use emission::{
    DispatchSlot, EmissionBackend, GeneratedConstructor, GeneratedProxyType, InterpretingBackend,
    ProxyTypeId,
};
pub use error::{ConfigError, EmissionError, GenerationError, GenerationErrorKind, ProxyError};
pub use generator::ProxyGenerator;
pub use instance::{ProxyInstance, ProxyInstanceFactory};
pub use interception::{interceptor_fn, FnInterceptor, Interceptor, Invocation, StandardInterceptor};
pub use options::{
    AllMethodsHook, InterceptorSelector, OptionsIdentity, ProxyGenerationHook,
    ProxyGenerationOptions,
};
pub use validator::ProxyValidator;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for creating proxies
    pub use crate::{
        interceptor_fn, GenerationError, GenerationErrorKind, GeneratorConfig, Interceptor,
        Invocation, ProxyError, ProxyGenerationOptions, ProxyGenerator, ProxyInstance,
        StandardInterceptor,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
