//! The engine singleton (spec section 5's "one registry, one cache, one
//! resolver driver per process").
//!
//! The original keeps this state as process-global mutable statics guarded
//! by a single giant lock. Grounded on `ytflow::flow::manager::Manager`'s
//! pattern of an `Arc`-shared inner struct behind a cheaply cloneable
//! handle, which gives every `Host` a strong reference to the engine it was
//! built from without reaching for `static`.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::cache::Cache;
use crate::driver::ResolverDriver;
use crate::error::StreamError;
use crate::registry::Registry;

/// Tunables that `original_source`'s `CFHost.c` hard-codes as
/// preprocessor constants (`_kCFHostCacheMaxEntries`,
/// `_kCFHostCacheTimeout`); exposed here instead of baked in, since nothing
/// about them is platform-specific (ambient addition, SPEC_FULL.md
/// "AMBIENT STACK").
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            cache_ttl: Duration::from_secs(30),
        }
    }
}

/// Named so `Engine`'s `Deref::Target` can be public; fields stay
/// crate-private so callers outside this crate only ever reach the engine
/// through `Engine`'s own methods.
pub struct EngineInner {
    pub(crate) driver: Arc<dyn ResolverDriver>,
    pub(crate) cache: Cache,
    pub(crate) registry: Registry,
    /// The dedicated current-thread runtime backing `Host::resolve_blocking`
    /// (spec section 4.7's synchronous bridge). A lookup started from this
    /// runtime still gets a first-class `EventLoop`/`Handle`, so the bridge
    /// needs no special-casing anywhere else in the engine.
    pub(crate) bridge_runtime: Runtime,
}

/// A cheaply cloneable handle to the process-wide engine state. Every
/// `Host` holds one `Arc<EngineInner>` via `Deref`, the same shape
/// `ytflow::flow::manager::Manager` hands its plugins.
#[derive(Clone)]
pub struct Engine(Arc<EngineInner>);

impl std::ops::Deref for Engine {
    type Target = EngineInner;
    fn deref(&self) -> &EngineInner {
        &self.0
    }
}

impl Engine {
    pub fn new(driver: Arc<dyn ResolverDriver>, config: EngineConfig) -> Result<Self, StreamError> {
        let bridge_runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|_| StreamError::posix_no_mem())?;

        Ok(Engine(Arc::new(EngineInner {
            driver,
            cache: Cache::new(config.cache_capacity, config.cache_ttl),
            registry: Registry::new(),
            bridge_runtime,
        })))
    }

    /// Build a production engine wired to the system's own resolver
    /// configuration (grounded on `SystemResolver` in the teacher crate).
    pub fn system() -> Result<Self, StreamError> {
        let driver = crate::driver::TrustDnsDriver::from_system_config()?;
        Self::new(Arc::new(driver), EngineConfig::default())
    }
}
