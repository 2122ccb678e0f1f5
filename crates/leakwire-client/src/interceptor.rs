use std::collections::HashMap;
use std::sync::Arc;

use crate::event::EventPayload;

/// Outcome of one interceptor invocation.
pub enum Outcome {
    /// Veto the event; the engine receives a null-params reply and no
    /// later interceptor in the chain runs.
    Suppress,
    /// Overwrite the listed keys in the running payload (adding new keys,
    /// never removing any) and continue down the chain.
    Replace(EventPayload),
    /// Leave the payload as-is and continue.
    NoChange,
}

/// An interception transform: `(event name, payload so far) -> Outcome`.
pub type Interceptor = Arc<dyn Fn(&str, &EventPayload) -> Outcome + Send + Sync>;

/// Token returned by interceptor registration; used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

struct Slot {
    id: u64,
    interceptor: Interceptor,
}

/// Ordered per-event interceptor lists. Registration order is invocation
/// order.
#[derive(Default)]
pub struct InterceptorRegistry {
    by_event: HashMap<String, Vec<Slot>>,
    last_id: u64,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interceptor for one or more event names. The returned
    /// id covers every listed event.
    pub fn register<I, S>(&mut self, events: I, interceptor: Interceptor) -> InterceptorId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.last_id += 1;
        let id = self.last_id;
        for event in events {
            self.by_event.entry(event.into()).or_default().push(Slot {
                id,
                interceptor: interceptor.clone(),
            });
        }
        InterceptorId(id)
    }

    /// Remove a previously registered interceptor everywhere it appears.
    pub fn unregister(&mut self, id: InterceptorId) {
        for slots in self.by_event.values_mut() {
            slots.retain(|slot| slot.id != id.0);
        }
        self.by_event.retain(|_, slots| !slots.is_empty());
    }

    /// Snapshot the chain for an event name; empty when none registered.
    pub fn chain(&self, event: &str) -> Vec<Interceptor> {
        self.by_event
            .get(event)
            .into_iter()
            .flatten()
            .map(|slot| slot.interceptor.clone())
            .collect()
    }
}

/// Run an interceptor chain over a payload.
///
/// Interceptors run strictly in registration order, each seeing the payload
/// as mutated by its predecessors. Returns `None` when an interceptor
/// suppressed the event, otherwise the final payload to reply with.
pub fn run_chain(
    chain: &[Interceptor],
    event: &str,
    mut payload: EventPayload,
) -> Option<EventPayload> {
    for interceptor in chain {
        match interceptor(event, &payload) {
            Outcome::Suppress => return None,
            Outcome::Replace(partial) => {
                for (key, value) in partial {
                    payload.insert(key, value);
                }
            }
            Outcome::NoChange => {}
        }
    }
    Some(payload)
}
