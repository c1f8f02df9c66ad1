//! Schedule Set (spec section 4's component 7, and section 4.6 of
//! SPEC_FULL.md).
//!
//! A "schedule pair" is an `(event-loop, mode)` tuple. Grounded on
//! `ytflow::flow::manager::Manager`'s one-runtime-per-manager shape, but an
//! event loop here is a [`tokio::runtime::Handle`] rather than an owned
//! `Runtime`, since a host may be scheduled on loops it does not own.
//! `tokio::runtime::Handle` has no stable identity of its own, so
//! [`EventLoop`] pairs a handle with a process-unique id purely so
//! `schedule_on`/`unschedule_from` can satisfy the "pairs are unique,
//! duplicate additions are idempotent" invariant (spec section 3).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct EventLoop {
    id: u64,
    handle: Handle,
}

impl EventLoop {
    pub fn new(handle: Handle) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            handle,
        }
    }

    /// An `EventLoop` wrapping the handle of the runtime the caller is
    /// currently executing on. Panics outside a Tokio runtime, same as
    /// `Handle::current`.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for EventLoop {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for EventLoop {}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop").field("id", &self.id).finish()
    }
}

/// The synchronous bridge's private mode (spec section 4.5/4.7) versus the
/// ordinary mode a client callback is delivered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    Default,
    Private,
}

#[derive(Default)]
pub struct ScheduleSet {
    entries: Vec<(EventLoop, ScheduleMode)>,
}

impl ScheduleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this pair was not already present.
    pub fn add(&mut self, event_loop: EventLoop, mode: ScheduleMode) -> bool {
        if self
            .entries
            .iter()
            .any(|(l, m)| *l == event_loop && *m == mode)
        {
            false
        } else {
            self.entries.push((event_loop, mode));
            true
        }
    }

    /// Returns `true` if a matching pair was present and removed.
    pub fn remove(&mut self, event_loop: &EventLoop, mode: ScheduleMode) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(l, m)| !(l == event_loop && *m == mode));
        self.entries.len() != before
    }

    /// The handle a freshly-built lookup should be spawned on. Every other
    /// scheduled pair is still recorded for cancellation bookkeeping and
    /// idempotence, but Tokio's scheduler needs no explicit per-loop wake
    /// broadcast the way a platform run loop does, so only one loop ever
    /// actually drives the task (see `host.rs` module docs).
    pub fn first_handle(&self) -> Option<Handle> {
        self.entries.first().map(|(l, _)| l.handle().clone())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
