//! The host state machine (spec section 4.5) — the crate's core type.
//!
//! A `Host` is created from a name or from a literal address (spec section
//! 3's `Host` data model) and independently tracks a forward (`Addresses`)
//! and a reverse (`Names`) resolution, each behind its own generation
//! counter and [`Lookup`]. The generation counter is the direct replacement
//! for the original's "lookup handle is `None`" cancellation check: because
//! Tokio tasks can run on another thread, a stale task completing after a
//! newer one has started must not be allowed to clobber state it no longer
//! owns, so every finalizer compares its own generation against the live one
//! under the host lock before touching anything.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::address::{Address, Family};
use crate::engine::Engine;
use crate::error::{EngineError, StreamError};
use crate::lookup::Lookup;
use crate::schedule::{EventLoop, ScheduleMode, ScheduleSet};

/// Which resolution a `Host` operation concerns (spec section 3's info
/// kinds, `kCFHostAddresses`/`kCFHostNames`/... in the original's naming).
/// `Addresses`, `PrimaryAddresses`, `BypassPrimaryAddresses`,
/// `IPv4OnlyAddresses` and `IPv6OnlyAddresses` are mutually exclusive
/// *strategies* for resolving the same underlying address info — the
/// original's internal `_kCFHostMasterAddressLookup`-style lookup flags are
/// not independently queryable info types either — so they all share one
/// state slot (see `HostState::kind_state`): only one of them can be
/// in flight, or resolved, at a time per `Host`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoKind {
    Addresses,
    Names,
    /// No native reachability probe is bundled (section 1's Non-goals);
    /// resolving this kind always completes with
    /// `StreamError::posix_not_supported()` rather than blocking forever.
    Reachability,
    /// A forward lookup restricted to A records.
    IPv4OnlyAddresses,
    /// A forward lookup restricted to AAAA records.
    IPv6OnlyAddresses,
    /// The primary's own query, issued directly against the resolver driver
    /// with no cache check and no `Registry::obtain_or_join` dedup — this is
    /// the strategy `Registry` itself drives for the process-wide primary
    /// (spec section 4.4 step 3).
    PrimaryAddresses,
    /// A forward lookup that skips the primary-lookup registry's dedup but
    /// still reads and repopulates the cache, for callers that want a fresh
    /// network round-trip without starving themselves behind someone else's
    /// in-flight primary.
    BypassPrimaryAddresses,
}

/// The resolved value for one [`InfoKind`], carried generically so finalize
/// code can handle both kinds uniformly.
#[derive(Debug, Clone)]
pub enum InfoPayload {
    Addresses(Vec<Address>),
    Names(Vec<String>),
}

/// A resolved value, not-yet-resolved (`None`), or a terminal error — the
/// concrete realization of the original's generic `HostInfo<T>` slot.
pub type InfoValue<T> = Option<Result<T, StreamError>>;

/// Delivered once per completed, cancelled, or failed resolution. `None`
/// in the error slot means success; this mirrors the `{domain, code}` pair
/// only ever being meaningful alongside a non-success status (spec
/// section 6).
pub type ClientCallback = Arc<dyn Fn(&Arc<Host>, InfoKind, Option<StreamError>) + Send + Sync>;

#[derive(Clone)]
enum Origin {
    Name(String),
    Address(SocketAddr),
}

#[derive(Default)]
struct KindState {
    generation: u64,
    payload: Option<Result<InfoPayload, StreamError>>,
    lookup: Option<Lookup>,
}

struct HostState {
    addresses: KindState,
    names: KindState,
    reachability: KindState,
    client: Option<ClientCallback>,
    schedule: ScheduleSet,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            addresses: KindState::default(),
            names: KindState::default(),
            reachability: KindState::default(),
            client: None,
            schedule: ScheduleSet::new(),
        }
    }
}

impl HostState {
    fn kind_state_mut(&mut self, kind: InfoKind) -> &mut KindState {
        match kind {
            InfoKind::Addresses
            | InfoKind::PrimaryAddresses
            | InfoKind::BypassPrimaryAddresses
            | InfoKind::IPv4OnlyAddresses
            | InfoKind::IPv6OnlyAddresses => &mut self.addresses,
            InfoKind::Names => &mut self.names,
            InfoKind::Reachability => &mut self.reachability,
        }
    }

    fn kind_state(&self, kind: InfoKind) -> &KindState {
        match kind {
            InfoKind::Addresses
            | InfoKind::PrimaryAddresses
            | InfoKind::BypassPrimaryAddresses
            | InfoKind::IPv4OnlyAddresses
            | InfoKind::IPv6OnlyAddresses => &self.addresses,
            InfoKind::Names => &self.names,
            InfoKind::Reachability => &self.reachability,
        }
    }
}

pub struct Host {
    origin: Origin,
    engine: Engine,
    state: Mutex<HostState>,
}

impl Host {
    pub fn with_name(name: impl Into<String>, engine: Engine) -> Arc<Host> {
        Arc::new(Host {
            origin: Origin::Name(name.into()),
            engine,
            state: Mutex::new(HostState::default()),
        })
    }

    pub fn with_address(addr: SocketAddr, engine: Engine) -> Arc<Host> {
        Arc::new(Host {
            origin: Origin::Address(addr),
            engine,
            state: Mutex::new(HostState::default()),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn name(&self) -> Option<&str> {
        match &self.origin {
            Origin::Name(name) => Some(name),
            Origin::Address(_) => None,
        }
    }

    /// An independent copy carrying the origin and whatever has already
    /// resolved, but none of the first host's client callback, scheduled
    /// event loops, or in-flight lookups (spec section 6 `create_copy`).
    pub fn create_copy(&self) -> Arc<Host> {
        let state = self.state.lock();
        Arc::new(Host {
            origin: self.origin.clone(),
            engine: self.engine.clone(),
            state: Mutex::new(HostState {
                addresses: KindState {
                    generation: 0,
                    payload: state.addresses.payload.clone(),
                    lookup: None,
                },
                names: KindState {
                    generation: 0,
                    payload: state.names.payload.clone(),
                    lookup: None,
                },
                reachability: KindState {
                    generation: 0,
                    payload: state.reachability.payload.clone(),
                    lookup: None,
                },
                client: None,
                schedule: ScheduleSet::new(),
            }),
        })
    }

    pub fn set_client(&self, callback: Option<ClientCallback>) {
        self.state.lock().client = callback;
    }

    /// Returns `true` if this pair was newly added.
    pub fn schedule_on(&self, event_loop: EventLoop, mode: ScheduleMode) -> bool {
        self.state.lock().schedule.add(event_loop, mode)
    }

    /// Returns `true` if a matching pair was present and removed.
    pub fn unschedule_from(&self, event_loop: &EventLoop, mode: ScheduleMode) -> bool {
        self.state.lock().schedule.remove(event_loop, mode)
    }

    pub fn get_addresses(&self) -> InfoValue<Vec<Address>> {
        match &self.state.lock().addresses.payload {
            None => None,
            Some(Err(e)) => Some(Err(*e)),
            Some(Ok(InfoPayload::Addresses(v))) => Some(Ok(v.clone())),
            Some(Ok(InfoPayload::Names(_))) => unreachable!("addresses slot never holds names"),
        }
    }

    pub fn get_names(&self) -> InfoValue<Vec<String>> {
        match &self.state.lock().names.payload {
            None => None,
            Some(Err(e)) => Some(Err(*e)),
            Some(Ok(InfoPayload::Names(v))) => Some(Ok(v.clone())),
            Some(Ok(InfoPayload::Addresses(_))) => unreachable!("names slot never holds addresses"),
        }
    }

    /// Always settles to `Err(StreamError::posix_not_supported())`: this
    /// crate bundles no native reachability probe (section 1's Non-goals).
    /// Exposed so callers that exercise all three `InfoKind`s against the
    /// same `Host` get a real, if terminal, answer instead of a missing API.
    pub fn get_reachability(&self) -> Option<Result<(), StreamError>> {
        match &self.state.lock().reachability.payload {
            None => None,
            Some(Err(e)) => Some(Err(*e)),
            Some(Ok(_)) => Some(Ok(())),
        }
    }

    /// Start an asynchronous resolution, delivered to the client callback on
    /// a scheduled event loop (or the engine's bridge loop if none is
    /// scheduled). Fails with `AlreadyResolving` if one is already in
    /// flight for this `kind` (spec section 8).
    pub fn start_info_resolution(self: &Arc<Self>, kind: InfoKind) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let handle = state
            .schedule
            .first_handle()
            .unwrap_or_else(|| self.engine.bridge_runtime.handle().clone());
        self.try_start_locked(&mut state, kind, handle)
    }

    /// Cancel any in-flight resolution for `kind`. The client callback still
    /// fires exactly once more, with `StreamError::cancelled()`, unless
    /// nothing was in flight (spec section 8's "cancel is a no-op if
    /// nothing is running").
    pub fn cancel_info_resolution(self: &Arc<Self>, kind: InfoKind) {
        let (generation, handle) = {
            let mut state = self.state.lock();
            let fallback = self.engine.bridge_runtime.handle().clone();
            let handle = state.schedule.first_handle().unwrap_or(fallback);
            let kind_state = state.kind_state_mut(kind);
            let Some(lookup) = kind_state.lookup.take() else {
                return;
            };
            lookup.invalidate();
            kind_state.generation += 1;
            let generation = kind_state.generation;
            // Committed in the same critical section as the generation bump
            // and the old lookup's invalidation, before anything is spawned:
            // nothing can observe `lookup.is_none()` in between and race a
            // fresh `try_start_locked` call into overwriting this slot.
            kind_state.lookup = Some(Lookup::CancelSignal);
            (generation, handle)
        };

        let this = Arc::clone(self);
        handle.spawn(async move {
            this.finalize_cancelled(kind, generation);
        });
    }

    /// Run a resolution to completion on the engine's dedicated bridge
    /// runtime and return its result directly, without registering a
    /// lookup or touching the client callback (spec section 4.7's
    /// synchronous bridge). Host state (`get_addresses`/`get_names`) is
    /// still updated as if the call had gone through the async path.
    pub fn resolve_blocking(self: &Arc<Self>, kind: InfoKind) -> Result<InfoPayload, StreamError> {
        let this = Arc::clone(self);
        let handle = self.engine.bridge_runtime.handle().clone();
        let _private = self.schedule_on(EventLoop::new(handle.clone()), ScheduleMode::Private);
        handle.block_on(async move {
            let result = this.resolve_one(kind).await;
            let mut state = this.state.lock();
            let kind_state = state.kind_state_mut(kind);
            kind_state.payload = Some(result.clone());
            result
        })
    }

    fn try_start_locked(
        self: &Arc<Self>,
        state: &mut HostState,
        kind: InfoKind,
        handle: Handle,
    ) -> Result<(), EngineError> {
        {
            let kind_state = state.kind_state(kind);
            if kind_state.lookup.is_some() {
                return Err(EngineError::AlreadyResolving);
            }
        }

        let is_fast = self.would_resolve_from_cache(kind);
        let kind_state = state.kind_state_mut(kind);
        kind_state.generation += 1;
        let generation = kind_state.generation;

        let this = Arc::clone(self);
        let join = handle.spawn(async move {
            let result = this.resolve_one(kind).await;
            this.finalize(kind, generation, result);
        });

        kind_state.lookup = Some(if is_fast {
            Lookup::CachedSignal(join)
        } else {
            Lookup::ResolverRequest(join)
        });
        Ok(())
    }

    /// Whether `kind`'s resolution would complete without a network
    /// round-trip: a literal-address host's own address, or a name whose
    /// forward answer is already cached. Used only to label the spawned
    /// [`Lookup`] for observability; the resolution path itself is
    /// identical either way.
    fn would_resolve_from_cache(&self, kind: InfoKind) -> bool {
        match (&self.origin, kind) {
            (Origin::Address(_), InfoKind::Addresses | InfoKind::PrimaryAddresses | InfoKind::BypassPrimaryAddresses | InfoKind::IPv4OnlyAddresses | InfoKind::IPv6OnlyAddresses) => true,
            (Origin::Name(name), InfoKind::Addresses | InfoKind::BypassPrimaryAddresses) => self.engine.cache.get(name).is_some(),
            // Never consult the cache: these strategies exist precisely to
            // bypass it (the primary's own query) or to avoid polluting the
            // bare-name-keyed cache with a family-filtered partial result.
            (Origin::Name(_), InfoKind::PrimaryAddresses | InfoKind::IPv4OnlyAddresses | InfoKind::IPv6OnlyAddresses) => false,
            (_, InfoKind::Reachability) => true,
            _ => false,
        }
    }

    async fn resolve_one(self: &Arc<Self>, kind: InfoKind) -> Result<InfoPayload, StreamError> {
        match (&self.origin, kind) {
            (_, InfoKind::Reachability) => Err(StreamError::posix_not_supported()),

            (Origin::Address(addr), InfoKind::Addresses | InfoKind::PrimaryAddresses | InfoKind::BypassPrimaryAddresses) => {
                let family = Family::of(addr).expect("SocketAddr is always v4 or v6");
                Ok(InfoPayload::Addresses(vec![Address {
                    family,
                    addr: *addr,
                    canonical_name: None,
                }]))
            }
            (Origin::Address(addr), InfoKind::IPv4OnlyAddresses | InfoKind::IPv6OnlyAddresses) => {
                let family = Family::of(addr).expect("SocketAddr is always v4 or v6");
                let wanted = if kind == InfoKind::IPv4OnlyAddresses {
                    Family::Ipv4
                } else {
                    Family::Ipv6
                };
                if family != wanted {
                    return Err(StreamError::no_data());
                }
                Ok(InfoPayload::Addresses(vec![Address {
                    family,
                    addr: *addr,
                    canonical_name: None,
                }]))
            }

            (Origin::Name(name), InfoKind::Addresses) => {
                let addrs = match self.engine.cache.get(name) {
                    Some(addrs) => addrs,
                    None => self.engine.registry.obtain_or_join(&self.engine, name.clone()).await?,
                };
                Ok(InfoPayload::Addresses(addrs))
            }
            // The registry's own primary: a direct driver call, no cache
            // check, no `obtain_or_join` (which would recurse back into this
            // very strategy forever).
            (Origin::Name(name), InfoKind::PrimaryAddresses) => {
                let addrs = self.engine.driver.forward(name, crate::driver::FamilyFilter::Unspec).await?;
                Ok(InfoPayload::Addresses(addrs.into_vec()))
            }
            // Skips the registry's dedup but still reads/repopulates the
            // cache, since `fan_out` never runs for this path.
            (Origin::Name(name), InfoKind::BypassPrimaryAddresses) => {
                if let Some(addrs) = self.engine.cache.get(name) {
                    return Ok(InfoPayload::Addresses(addrs));
                }
                let addrs = self
                    .engine
                    .driver
                    .forward(name, crate::driver::FamilyFilter::Unspec)
                    .await?
                    .into_vec();
                self.engine.cache.insert(name.clone(), addrs.clone());
                Ok(InfoPayload::Addresses(addrs))
            }
            // Family-restricted lookups bypass both cache and registry: the
            // cache is keyed by bare name and holds unfiltered answers, and
            // mixing a partial family result into it would corrupt lookups
            // for every other strategy sharing that key.
            (Origin::Name(name), InfoKind::IPv4OnlyAddresses) => {
                let addrs = self
                    .engine
                    .driver
                    .forward(name, crate::driver::FamilyFilter::Ipv4Only)
                    .await?;
                Ok(InfoPayload::Addresses(addrs.into_vec()))
            }
            (Origin::Name(name), InfoKind::IPv6OnlyAddresses) => {
                let addrs = self
                    .engine
                    .driver
                    .forward(name, crate::driver::FamilyFilter::Ipv6Only)
                    .await?;
                Ok(InfoPayload::Addresses(addrs.into_vec()))
            }

            (Origin::Address(addr), InfoKind::Names) => {
                let names = self.engine.driver.reverse(*addr).await?;
                Ok(InfoPayload::Names(names))
            }
            (Origin::Name(name), InfoKind::Names) => {
                let addrs = match self.engine.cache.get(name) {
                    Some(addrs) => addrs,
                    None => self.engine.registry.obtain_or_join(&self.engine, name.clone()).await?,
                };
                let first = addrs.first().ok_or_else(StreamError::host_not_found)?;
                let names = self.engine.driver.reverse(first.addr).await?;
                Ok(InfoPayload::Names(names))
            }
        }
    }

    fn finalize(self: Arc<Self>, kind: InfoKind, generation: u64, result: Result<InfoPayload, StreamError>) {
        let delivery = {
            let mut state = self.state.lock();
            let kind_state = state.kind_state_mut(kind);
            if kind_state.generation != generation {
                log::trace!("dropping superseded {kind:?} result for generation {generation}");
                return;
            }
            kind_state.lookup = None;
            let err = result.as_ref().err().copied();
            kind_state.payload = Some(result);
            state.client.clone().map(|cb| (cb, err))
        };
        if let Some((callback, err)) = delivery {
            callback(&self, kind, err);
        }
    }

    fn finalize_cancelled(self: Arc<Self>, kind: InfoKind, generation: u64) {
        let callback = {
            let mut state = self.state.lock();
            let kind_state = state.kind_state_mut(kind);
            if kind_state.generation != generation {
                return;
            }
            kind_state.lookup = None;
            state.client.clone()
        };
        if let Some(callback) = callback {
            callback(&self, kind, Some(StreamError::cancelled()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeDriver;
    use crate::engine::EngineConfig;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn engine_with(driver: FakeDriver) -> Engine {
        Engine::new(Arc::new(driver), EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn forward_lookup_delivers_exactly_once() {
        let engine = engine_with(FakeDriver::loopback("host.test."));
        let host = Host::with_name("host.test.", engine);
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = calls.clone();
        host.set_client(Some(Arc::new(move |_h, kind, err| {
            calls_cb.fetch_add(1, Ordering::SeqCst);
            assert_eq!(kind, InfoKind::Addresses);
            assert!(err.is_none());
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
        })));

        host.start_info_resolution(InfoKind::Addresses).unwrap();
        rx.await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let addrs = host.get_addresses().unwrap().unwrap();
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].addr.ip(), Ipv4Addr::LOCALHOST);
    }

    #[tokio::test]
    async fn concurrent_hosts_with_same_name_share_one_forward_query() {
        let driver = FakeDriver::loopback("shared.test.");
        let counter = driver.forward_call_counter();
        let engine = engine_with(driver);

        let host_a = Host::with_name("shared.test.", engine.clone());
        let host_b = Host::with_name("shared.test.", engine);

        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let tx_a = Mutex::new(Some(tx_a));
        let tx_b = Mutex::new(Some(tx_b));
        host_a.set_client(Some(Arc::new(move |_h, _k, _e| {
            if let Some(tx) = tx_a.lock().take() {
                let _ = tx.send(());
            }
        })));
        host_b.set_client(Some(Arc::new(move |_h, _k, _e| {
            if let Some(tx) = tx_b.lock().take() {
                let _ = tx.send(());
            }
        })));

        host_a.start_info_resolution(InfoKind::Addresses).unwrap();
        host_b.start_info_resolution(InfoKind::Addresses).unwrap();
        rx_a.await.unwrap();
        rx_b.await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_hit_is_tagged_as_cached_signal() {
        let engine = engine_with(FakeDriver::loopback("warm.test."));
        engine.cache.insert(
            "warm.test.".into(),
            vec![Address {
                family: Family::Ipv4,
                addr: SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0),
                canonical_name: None,
            }],
        );
        let host = Host::with_name("warm.test.", engine);
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        host.set_client(Some(Arc::new(move |_h, _k, _e| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
        })));
        assert!(host.would_resolve_from_cache(InfoKind::Addresses));
        host.start_info_resolution(InfoKind::Addresses).unwrap();
        rx.await.unwrap();
        assert!(host.get_addresses().unwrap().is_ok());
    }

    #[tokio::test]
    async fn second_start_while_in_flight_is_rejected() {
        let engine = engine_with(FakeDriver::loopback("busy.test."));
        let host = Host::with_name("busy.test.", engine);
        host.start_info_resolution(InfoKind::Addresses).unwrap();
        let err = host.start_info_resolution(InfoKind::Addresses).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyResolving));
    }

    #[tokio::test]
    async fn cancel_before_completion_delivers_cancelled_exactly_once() {
        let engine = engine_with(FakeDriver::loopback("cancel.test."));
        let host = Host::with_name("cancel.test.", engine);
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = calls.clone();
        host.set_client(Some(Arc::new(move |_h, _k, err| {
            calls_cb.fetch_add(1, Ordering::SeqCst);
            assert!(matches!(err, Some(e) if e.code() == StreamError::cancelled().code()));
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
        })));

        host.start_info_resolution(InfoKind::Addresses).unwrap();
        host.cancel_info_resolution(InfoKind::Addresses);
        rx.await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_with_nothing_in_flight_is_a_no_op() {
        let engine = engine_with(FakeDriver::loopback("idle.test."));
        let host = Host::with_name("idle.test.", engine);
        host.cancel_info_resolution(InfoKind::Addresses);
        assert!(host.get_addresses().is_none());
    }

    #[tokio::test]
    async fn reverse_lookup_on_address_origin_host() {
        let addr = SocketAddr::new(Ipv4Addr::new(203, 0, 113, 5).into(), 0);
        let driver = FakeDriver::new().with_reverse(addr, vec!["host.example.".into()]);
        let engine = engine_with(driver);
        let host = Host::with_address(addr, engine);

        let addrs = host.get_addresses();
        assert!(addrs.is_none());

        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        host.set_client(Some(Arc::new(move |_h, kind, err| {
            assert_eq!(kind, InfoKind::Names);
            assert!(err.is_none());
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
        })));
        host.start_info_resolution(InfoKind::Names).unwrap();
        rx.await.unwrap();
        assert_eq!(host.get_names().unwrap().unwrap(), vec!["host.example.".to_string()]);
    }

    #[tokio::test]
    async fn address_origin_resolves_its_own_address_without_a_driver_call() {
        let addr = SocketAddr::new(Ipv4Addr::new(198, 51, 100, 9).into(), 0);
        let driver = FakeDriver::new();
        let counter = driver.forward_call_counter();
        let engine = engine_with(driver);
        let host = Host::with_address(addr, engine);

        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        host.set_client(Some(Arc::new(move |_h, _k, err| {
            assert!(err.is_none());
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
        })));
        host.start_info_resolution(InfoKind::Addresses).unwrap();
        rx.await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(host.get_addresses().unwrap().unwrap()[0].addr, addr);
    }

    // `resolve_blocking` drives the engine's own current-thread runtime via
    // `Handle::block_on`, which Tokio forbids from inside another runtime's
    // worker thread. These two are plain synchronous tests, the way a real
    // caller of the blocking bridge would use it.

    #[test]
    fn resolve_blocking_drives_to_completion_without_a_client() {
        let engine = engine_with(FakeDriver::loopback("blocking.test."));
        let host = Host::with_name("blocking.test.", engine);
        let payload = host.resolve_blocking(InfoKind::Addresses).unwrap();
        match payload {
            InfoPayload::Addresses(addrs) => assert_eq!(addrs.len(), 1),
            InfoPayload::Names(_) => panic!("expected addresses"),
        }
        assert!(host.get_addresses().unwrap().is_ok());
    }

    #[tokio::test]
    async fn reachability_always_settles_to_not_supported() {
        let engine = engine_with(FakeDriver::loopback("probe.test."));
        let host = Host::with_name("probe.test.", engine);
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        host.set_client(Some(Arc::new(move |_h, kind, err| {
            assert_eq!(kind, InfoKind::Reachability);
            assert_eq!(err.unwrap().code(), StreamError::posix_not_supported().code());
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
        })));
        host.start_info_resolution(InfoKind::Reachability).unwrap();
        rx.await.unwrap();
        assert!(host.get_reachability().unwrap().is_err());
    }

    #[test]
    fn create_copy_carries_resolved_payload_but_not_client_or_schedule() {
        let engine = engine_with(FakeDriver::loopback("copy.test."));
        let host = Host::with_name("copy.test.", engine);
        host.resolve_blocking(InfoKind::Addresses).unwrap();

        let copy = host.create_copy();
        assert!(copy.get_addresses().unwrap().is_ok());
        assert!(copy.state.lock().client.is_none());
        assert!(copy.state.lock().schedule.is_empty());
    }

    #[tokio::test]
    async fn ipv4_only_on_mismatched_literal_address_yields_no_data() {
        use std::net::Ipv6Addr;
        let addr = SocketAddr::new(Ipv6Addr::LOCALHOST.into(), 0);
        let engine = engine_with(FakeDriver::new());
        let host = Host::with_address(addr, engine);

        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        host.set_client(Some(Arc::new(move |_h, kind, err| {
            assert_eq!(kind, InfoKind::IPv4OnlyAddresses);
            assert_eq!(err.unwrap().code(), StreamError::no_data().code());
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
        })));
        host.start_info_resolution(InfoKind::IPv4OnlyAddresses).unwrap();
        rx.await.unwrap();
        assert!(host.get_addresses().unwrap().is_err());
    }

    #[tokio::test]
    async fn ipv6_only_on_name_origin_resolves_through_the_driver() {
        let engine = engine_with(FakeDriver::loopback("v6only.test."));
        let host = Host::with_name("v6only.test.", engine);
        let payload = host.resolve_one(InfoKind::IPv6OnlyAddresses).await.unwrap();
        match payload {
            InfoPayload::Addresses(addrs) => assert_eq!(addrs.len(), 1),
            InfoPayload::Names(_) => panic!("expected addresses"),
        }
    }

    #[tokio::test]
    async fn bypass_primary_addresses_skips_registry_dedup() {
        let driver = FakeDriver::loopback("bypass.test.");
        let counter = driver.forward_call_counter();
        let engine = engine_with(driver);

        let host_a = Host::with_name("bypass.test.", engine.clone());
        let host_b = Host::with_name("bypass.test.", engine);

        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let tx_a = Mutex::new(Some(tx_a));
        let tx_b = Mutex::new(Some(tx_b));
        host_a.set_client(Some(Arc::new(move |_h, _k, _e| {
            if let Some(tx) = tx_a.lock().take() {
                let _ = tx.send(());
            }
        })));
        host_b.set_client(Some(Arc::new(move |_h, _k, _e| {
            if let Some(tx) = tx_b.lock().take() {
                let _ = tx.send(());
            }
        })));

        host_a.start_info_resolution(InfoKind::BypassPrimaryAddresses).unwrap();
        host_b.start_info_resolution(InfoKind::BypassPrimaryAddresses).unwrap();
        rx_a.await.unwrap();
        rx_b.await.unwrap();

        // Unlike `Addresses`, each bypasses the registry's dedup and issues
        // its own query (modulo whichever one lost the race to populate the
        // cache first).
        assert!(counter.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn primary_addresses_is_a_real_host_with_generation_bookkeeping() {
        let engine = engine_with(FakeDriver::loopback("primary.test."));
        let host = Host::with_name("primary.test.", engine);
        host.start_info_resolution(InfoKind::PrimaryAddresses).unwrap();
        let err = host.start_info_resolution(InfoKind::Addresses).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyResolving));
    }
}
