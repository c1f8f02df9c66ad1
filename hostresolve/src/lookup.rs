//! The tagged `Lookup` variant (REDESIGN FLAGS in spec section 9).
//!
//! The original engine's lookup handle could be a port-like resolver
//! request, a descriptor wrapper, a reachability probe, a user-signalled
//! source, or a sentinel null object, all behind one opaque pointer. This
//! collapses that into an explicit three-way tag, each backed by exactly
//! one Tokio task:
//!
//! - `ResolverRequest` / `CachedSignal` carry the [`tokio::task::JoinHandle`]
//!   of the task driving the resolution (a live resolver-driver call, or an
//!   immediately-ready cache-hit delivery, respectively); both support
//!   `invalidate` via `JoinHandle::abort`.
//! - `CancelSignal` carries no handle: by the time one is constructed, the
//!   lookup it replaces has already been invalidated and a brand new
//!   generation has been committed under the host lock (see `host.rs`), so
//!   there is nothing left that a later cancellation would need to abort.
//!
//! The original's fourth tag, a "null" sentinel for a resolver completion
//! that raced ahead of file-descriptor registration, has no counterpart
//! here: `async fn` and `tokio::spawn` give every lookup a handle before its
//! task can possibly run, so the race that sentinel guarded against cannot
//! occur (see `host.rs`'s generation counter for the general form of this
//! argument).

use tokio::task::JoinHandle;

pub enum Lookup {
    ResolverRequest(JoinHandle<()>),
    CachedSignal(JoinHandle<()>),
    CancelSignal,
}

impl Lookup {
    /// Abort the backing task, if any. Mirrors the original's `invalidate`
    /// capability common to every lookup tag.
    pub fn invalidate(&self) {
        match self {
            Lookup::ResolverRequest(handle) | Lookup::CachedSignal(handle) => handle.abort(),
            Lookup::CancelSignal => {}
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Lookup::ResolverRequest(_) => "resolver-request",
            Lookup::CachedSignal(_) => "cached-signal",
            Lookup::CancelSignal => "cancel-signal",
        }
    }
}
