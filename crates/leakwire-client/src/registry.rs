use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::event::EventPayload;

/// Capability handed to handlers: requests that the session stop accepting
/// further frames.
///
/// Invoking [`StopHandle::stop`] never interrupts the dispatch pass already
/// in flight; it only prevents subsequent frames and run-loop polls from
/// being processed.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub(crate) fn new(running: Arc<AtomicBool>) -> Self {
        Self(running)
    }

    /// Request session termination.
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether the session is still accepting frames.
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An event handler: `(event name, payload, stop capability)`.
pub type Handler = Arc<dyn Fn(&str, &EventPayload, &StopHandle) + Send + Sync>;

/// Token returned by handler registration; used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Slot {
    id: u64,
    handler: Handler,
}

/// Ordered per-event and global handler lists.
///
/// Registration order is invocation order. Dispatch works on a snapshot of
/// the lists, so handlers may register or unregister freely without
/// corrupting an in-flight pass; the change takes effect from the next
/// frame on.
#[derive(Default)]
pub struct HandlerRegistry {
    by_event: HashMap<String, Vec<Slot>>,
    global: Vec<Slot>,
    last_id: u64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one or more event names. The returned id
    /// covers every listed event.
    pub fn register<I, S>(&mut self, events: I, handler: Handler) -> HandlerId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.next_id();
        for event in events {
            self.by_event.entry(event.into()).or_default().push(Slot {
                id,
                handler: handler.clone(),
            });
        }
        HandlerId(id)
    }

    /// Register a handler invoked for every non-interception event.
    pub fn register_global(&mut self, handler: Handler) -> HandlerId {
        let id = self.next_id();
        self.global.push(Slot { id, handler });
        HandlerId(id)
    }

    /// Remove a previously registered handler everywhere it appears.
    pub fn unregister(&mut self, id: HandlerId) {
        for slots in self.by_event.values_mut() {
            slots.retain(|slot| slot.id != id.0);
        }
        self.by_event.retain(|_, slots| !slots.is_empty());
        self.global.retain(|slot| slot.id != id.0);
    }

    /// Snapshot the dispatch list for an event: exact-name handlers in
    /// registration order, then global handlers in registration order.
    pub fn snapshot(&self, event: &str) -> Vec<Handler> {
        self.by_event
            .get(event)
            .into_iter()
            .flatten()
            .chain(self.global.iter())
            .map(|slot| slot.handler.clone())
            .collect()
    }

    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}
