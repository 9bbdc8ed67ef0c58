//! Process-wide cache of generated proxy types using moka
//!
//! Maps a generation signature (target type, additional interfaces, options)
//! to the proxy type generated for it. Concurrent requests for one signature
//! are coalesced: exactly one caller runs generation, the others wait and
//! share its result. Failed generations are not cached.

use crate::emission::GeneratedProxyType;
use crate::error::GenerationError;
use crate::options::{OptionsIdentity, ProxyGenerationOptions};
use moka::sync::Cache;
use once_cell::sync::Lazy;
use proxy_model::{TypeHandle, TypeRef, TypeSpec};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of a generation request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    generation_assembly: String,
    target: TypeIdentity,
    interfaces: BTreeSet<TypeIdentity>,
    options: OptionsIdentity,
}

/// Assembly-qualified name plus a digest of everything generation reads
///
/// Two specs that share a name but differ in constructors, members or
/// ancestry get distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct TypeIdentity {
    key: String,
    shape: [u8; 32],
}

impl TypeIdentity {
    fn of(ty: &TypeSpec) -> Self {
        let mut hasher = blake3::Hasher::new();
        hash_shape(&mut hasher, ty);
        Self {
            key: ty.key().to_string(),
            shape: *hasher.finalize().as_bytes(),
        }
    }
}

fn hash_shape(hasher: &mut blake3::Hasher, ty: &TypeSpec) {
    hasher.update(b"type:").update(ty.key().as_bytes());
    hasher.update(
        format!(
            "{:?}|{:?}|{}|{}",
            ty.kind(),
            ty.accessibility(),
            ty.is_sealed(),
            ty.is_abstract()
        )
        .as_bytes(),
    );
    for ctor in ty.constructors() {
        hasher.update(format!("ctor:{:?}{}", ctor.accessibility(), ctor.signature()).as_bytes());
    }
    for member in ty.members() {
        hasher.update(
            format!(
                "member:{:?}|{}|{}|{}|{}|{}",
                member.member_accessibility(),
                member.signature(),
                member.return_type().map(TypeRef::full_name).unwrap_or_default(),
                member.is_virtual(),
                member.is_overridable(),
                member.is_abstract()
            )
            .as_bytes(),
        );
    }
    if let Some(base) = ty.base_type() {
        hasher.update(b"base:");
        hash_shape(hasher, base);
    }
    for iface in ty.interfaces() {
        hasher.update(b"implements:");
        hash_shape(hasher, iface);
    }
}

impl CacheKey {
    /// Key for proxying `target` with `interfaces` under `options`, for code
    /// generated into `generation_assembly`
    ///
    /// Interface order and duplicates do not matter. Types are told apart by
    /// name and shape, so two same-named specs never share an entry.
    #[must_use]
    pub fn new(
        generation_assembly: &str,
        target: &TypeSpec,
        interfaces: &[TypeHandle],
        options: &ProxyGenerationOptions,
    ) -> Self {
        Self {
            generation_assembly: generation_assembly.to_string(),
            target: TypeIdentity::of(target),
            interfaces: interfaces.iter().map(|i| TypeIdentity::of(i)).collect(),
            options: options.identity(),
        }
    }

    /// Stable digest of this key
    #[must_use]
    pub fn fingerprint(&self) -> SignatureFingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher
            .update(b"assembly:")
            .update(self.generation_assembly.as_bytes());
        hasher
            .update(b"target:")
            .update(self.target.key.as_bytes())
            .update(&self.target.shape);
        for iface in &self.interfaces {
            hasher
                .update(b"interface:")
                .update(iface.key.as_bytes())
                .update(&iface.shape);
        }
        self.options.hash_into(&mut hasher);
        SignatureFingerprint(*hasher.finalize().as_bytes())
    }
}

/// Blake3 digest of a generation signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureFingerprint([u8; 32]);

impl SignatureFingerprint {
    /// Raw bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for SignatureFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of generated types held
    pub entry_count: u64,
    /// Requests answered from the cache, including callers that waited on
    /// a concurrent generation of the same signature and reused its result
    pub hits: u64,
    /// Requests that ran generation (successfully or not)
    pub misses: u64,
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub struct CacheLookup {
    /// The generated proxy type
    pub proxy_type: Arc<GeneratedProxyType>,
    /// Whether it was already cached (or generated by a concurrent caller)
    pub hit: bool,
}

/// Unbounded, concurrent cache of generated proxy types
#[derive(Debug)]
pub struct DescriptorCache {
    inner: Cache<CacheKey, Arc<GeneratedProxyType>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

static GLOBAL: Lazy<Arc<DescriptorCache>> = Lazy::new(|| Arc::new(DescriptorCache::new()));

impl DescriptorCache {
    /// Create empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Process-wide shared cache
    #[must_use]
    pub fn global() -> Arc<Self> {
        GLOBAL.clone()
    }

    /// Get cached proxy type for `key`
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<GeneratedProxyType>> {
        self.inner.get(key)
    }

    /// Get or generate the proxy type for `key`
    ///
    /// `build` runs at most once per key at a time; concurrent callers for
    /// the same key block until it finishes and then share its result.
    ///
    /// # Errors
    /// Propagates the error returned by `build`; nothing is cached then
    pub fn get_or_build<F>(&self, key: CacheKey, build: F) -> Result<CacheLookup, GenerationError>
    where
        F: FnOnce() -> Result<Arc<GeneratedProxyType>, GenerationError>,
    {
        // Fast path
        if let Some(proxy_type) = self.inner.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CacheLookup { proxy_type, hit: true });
        }

        let mut ran = false;
        let result = self.inner.try_get_with(key, || {
            ran = true;
            build()
        });

        if ran {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        result
            .map(|proxy_type| CacheLookup { proxy_type, hit: !ran })
            .map_err(Arc::unwrap_or_clone)
    }

    /// Drop every cached type
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::new()
    }
}
