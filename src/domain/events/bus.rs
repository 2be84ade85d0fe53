//! In-process event bus.
//!
//! Handlers are registered per [`EventKind`] and invoked synchronously, in
//! registration order, on the thread that raises the event. Dispatch depth is
//! bounded to one per kind: a handler that raises an event of the kind it is
//! currently handling has that nested event dropped.

use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{DomainEvent, EventKind};

pub type EventHandler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    handler: EventHandler,
    once: bool,
}

#[derive(Default)]
struct Inner {
    handlers: RwLock<HashMap<EventKind, Vec<Registration>>>,
    next_id: AtomicU64,
}

thread_local! {
    static DISPATCHING: RefCell<Vec<EventKind>> = const { RefCell::new(Vec::new()) };
}

struct DispatchGuard;

impl DispatchGuard {
    fn enter(kind: EventKind) -> Option<Self> {
        DISPATCHING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&kind) { return None; }
            stack.push(kind);
            Some(DispatchGuard)
        })
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|stack| { stack.borrow_mut().pop(); });
    }
}

/// Cheap to clone; clones share the same handler table.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub fn new() -> Self { Self::default() }

    /// Registers `handler` for `kind`. Registering the same handler again is a no-op
    /// returning the original id.
    pub fn register(&self, kind: EventKind, handler: EventHandler) -> HandlerId {
        self.insert(kind, handler, false)
    }

    /// Registers a handler that is removed as soon as the next event of `kind` is dispatched.
    pub fn register_once(&self, kind: EventKind, handler: EventHandler) -> HandlerId {
        self.insert(kind, handler, true)
    }

    /// Returns whether a registration was removed; unknown ids are ignored.
    pub fn unregister(&self, kind: EventKind, id: HandlerId) -> bool {
        let removed = self.detach(kind, |r| r.id == id);
        // dropped after the lock is released: a handler may own the last
        // reference to a service whose own Drop unregisters from this bus
        let found = !removed.is_empty();
        drop(removed);
        found
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Dispatches `event` to every handler currently registered for its kind and
    /// returns how many were invoked.
    pub fn raise(&self, event: &DomainEvent) -> usize {
        let kind = event.kind();
        let Some(_guard) = DispatchGuard::enter(kind) else {
            tracing::warn!(kind = ?kind, "Re-entrant raise of the event kind being dispatched, dropping it");
            return 0;
        };
        let (snapshot, spent) = {
            let mut handlers = self.inner.handlers.write();
            let Some(list) = handlers.get(&kind) else { return 0 };
            let snapshot: Vec<EventHandler> = list.iter().map(|r| r.handler.clone()).collect();
            (snapshot, Self::split_off(&mut handlers, kind, |r| r.once))
        };
        for handler in &snapshot {
            handler(event);
        }
        drop(spent);
        snapshot.len()
    }

    /// Removes the matching registrations of `kind` and hands them back so the
    /// caller drops them outside the lock.
    fn detach(&self, kind: EventKind, matches: impl Fn(&Registration) -> bool) -> Vec<Registration> {
        Self::split_off(&mut self.inner.handlers.write(), kind, matches)
    }

    fn split_off(
        handlers: &mut HashMap<EventKind, Vec<Registration>>,
        kind: EventKind,
        matches: impl Fn(&Registration) -> bool,
    ) -> Vec<Registration> {
        let Some(list) = handlers.get_mut(&kind) else { return Vec::new() };
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(list).into_iter().partition(|r| matches(r));
        if kept.is_empty() { handlers.remove(&kind); } else { *list = kept; }
        removed
    }

    fn insert(&self, kind: EventKind, handler: EventHandler, once: bool) -> HandlerId {
        let mut handlers = self.inner.handlers.write();
        let list = handlers.entry(kind).or_default();
        if let Some(existing) = list.iter().find(|r| same_handler(&r.handler, &handler)) {
            return existing.id;
        }
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        list.push(Registration { id, handler, once });
        id
    }
}

fn same_handler(a: &EventHandler, b: &EventHandler) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.inner.handlers.read();
        let counts: HashMap<_, _> = handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
