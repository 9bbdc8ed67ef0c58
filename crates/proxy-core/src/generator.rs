//! Proxy generator entry points
//!
//! [`ProxyGenerator`] runs the class proxy pipeline:
//!
//! 1. validate the target (genericity, accessibility, subclassability)
//! 2. bind constructor arguments to one accessible constructor
//! 3. fetch or generate the proxy type for (target, interfaces, options)
//! 4. instantiate it with the caller's interceptor chain

use crate::binder::ConstructorBinder;
use crate::cache::{CacheKey, CacheStats, DescriptorCache};
use crate::config::GeneratorConfig;
use crate::descriptor::DescriptorBuilder;
use crate::emission::{EmissionBackend, GeneratedProxyType, InterpretingBackend};
use crate::error::{GenerationError, ProxyError};
use crate::instance::{ProxyInstance, ProxyInstanceFactory};
use crate::interception::Interceptor;
use crate::options::ProxyGenerationOptions;
use crate::validator::ProxyValidator;
use proxy_model::{TypeHandle, Value};
use std::sync::Arc;

/// Creates class proxies
#[derive(Clone)]
pub struct ProxyGenerator {
    config: GeneratorConfig,
    validator: ProxyValidator,
    binder: ConstructorBinder,
    builder: DescriptorBuilder,
    backend: Arc<dyn EmissionBackend>,
    cache: Arc<DescriptorCache>,
    factory: ProxyInstanceFactory,
}

impl ProxyGenerator {
    /// Create generator with its own cache and the interpreting backend
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let backend = Arc::new(InterpretingBackend::new(config.proxy_namespace.clone()));
        Self::with_backend(config, backend)
    }

    /// Create generator with its own cache and a custom emission backend
    #[must_use]
    pub fn with_backend(config: GeneratorConfig, backend: Arc<dyn EmissionBackend>) -> Self {
        let validator = ProxyValidator::new(config.generation_assembly.clone());
        Self {
            binder: ConstructorBinder::new(validator.clone()),
            builder: DescriptorBuilder::new(validator.clone()),
            factory: ProxyInstanceFactory::new()
                .with_interceptor_step_logging(config.log_interceptor_steps),
            validator,
            backend,
            cache: Arc::new(DescriptorCache::new()),
            config,
        }
    }

    /// Generator with default configuration over the process-wide cache
    #[must_use]
    pub fn shared() -> Self {
        Self::new(GeneratorConfig::default()).with_cache(DescriptorCache::global())
    }

    /// Use `cache` instead of the generator's own
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<DescriptorCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Descriptor cache in use
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<DescriptorCache> {
        &self.cache
    }

    /// Create a proxy of `target`
    ///
    /// The generated type subclasses `target` and adds `interfaces`;
    /// `arguments` select and feed the base constructor; `interceptors`
    /// form the new instance's chain.
    ///
    /// # Errors
    /// - [`ProxyError::Generation`] if validation, binding or emission fails
    /// - [`ProxyError::Construction`] if the base constructor fails
    pub fn create_class_proxy_with(
        &self,
        target: &TypeHandle,
        interfaces: &[TypeHandle],
        options: &ProxyGenerationOptions,
        arguments: Vec<Value>,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Result<ProxyInstance, ProxyError> {
        self.validator
            .validate_target(target)
            .inspect_err(|e| tracing::warn!("Rejected proxy target: {}", e))?;

        let binding = self
            .binder
            .bind(target, arguments)
            .inspect_err(|e| tracing::warn!("Constructor binding failed: {}", e))?;
        tracing::debug!(
            "Bound {} to constructor {}{}",
            target.full_name(),
            binding.signature,
            if binding.expanded { " (expanded)" } else { "" }
        );

        let proxy_type = self.generate_class_proxy_type(target, interfaces, options)?;
        self.factory.create(proxy_type, binding, interceptors)
    }

    /// Create a proxy of `target` with constructor `arguments` and no interceptors
    ///
    /// # Errors
    /// As for [`create_class_proxy_with`](Self::create_class_proxy_with)
    pub fn create_class_proxy_with_args(
        &self,
        target: &TypeHandle,
        arguments: Vec<Value>,
    ) -> Result<ProxyInstance, ProxyError> {
        self.create_class_proxy_with(
            target,
            &[],
            &ProxyGenerationOptions::default(),
            arguments,
            Vec::new(),
        )
    }

    /// Create a proxy of `target` through its parameterless constructor
    ///
    /// # Errors
    /// As for [`create_class_proxy_with`](Self::create_class_proxy_with)
    pub fn create_class_proxy(
        &self,
        target: &TypeHandle,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Result<ProxyInstance, ProxyError> {
        self.create_class_proxy_with(
            target,
            &[],
            &ProxyGenerationOptions::default(),
            Vec::new(),
            interceptors,
        )
    }

    /// Fetch or generate the proxy type for `target`, `interfaces` and `options`
    ///
    /// # Errors
    /// Validation failures and emission failures; failures are not cached
    pub fn generate_class_proxy_type(
        &self,
        target: &TypeHandle,
        interfaces: &[TypeHandle],
        options: &ProxyGenerationOptions,
    ) -> Result<Arc<GeneratedProxyType>, GenerationError> {
        let key = CacheKey::new(&self.config.generation_assembly, target, interfaces, options);
        let lookup = self
            .cache
            .get_or_build(key, || {
                let descriptor = self.builder.build(target, interfaces, options)?;
                let fingerprint = descriptor.fingerprint();
                let proxy_type = self.backend.emit(Arc::new(descriptor))?;
                tracing::info!(
                    "Emitted proxy type {} for {} ({})",
                    proxy_type.full_name(),
                    target.full_name(),
                    fingerprint.short()
                );
                Ok(Arc::new(proxy_type))
            })
            .inspect_err(|e| tracing::warn!("Proxy type generation failed: {}", e))?;

        if lookup.hit {
            tracing::debug!(
                "Reusing proxy type {} for {}",
                lookup.proxy_type.full_name(),
                target.full_name()
            );
        }
        Ok(lookup.proxy_type)
    }

    /// Cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for ProxyGenerator {
    fn default() -> Self {
        Self::shared()
    }
}

impl std::fmt::Debug for ProxyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyGenerator")
            .field("config", &self.config)
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}
