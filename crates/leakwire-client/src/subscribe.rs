use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::event::EventPayload;

/// Secondary notification path: per-event-name broadcast to channel
/// receivers, equivalent to the handler registry for consumers that prefer
/// pulling events instead of registering callbacks.
#[derive(Default)]
pub struct Subscriptions {
    by_event: HashMap<String, Vec<Sender<(String, EventPayload)>>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription for one event name.
    pub fn subscribe(&mut self, event: impl Into<String>) -> Receiver<(String, EventPayload)> {
        let (tx, rx) = channel();
        self.by_event.entry(event.into()).or_default().push(tx);
        rx
    }

    /// Publish an event to its subscribers. Subscriptions whose receiver
    /// was dropped are pruned here.
    pub fn publish(&mut self, event: &str, payload: &EventPayload) {
        let Some(senders) = self.by_event.get_mut(event) else {
            return;
        };
        senders.retain(|tx| tx.send((event.to_string(), payload.clone())).is_ok());
        if senders.is_empty() {
            self.by_event.remove(event);
        }
    }
}
