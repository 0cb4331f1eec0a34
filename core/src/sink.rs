//! Outbound notification surface consumed by presentation collaborators.

use std::{collections::BTreeMap, fmt};

use crate::Event;

/// Receives every event the simulation publishes.
pub trait EventSink {
    /// Delivers a single event to the sink.
    fn publish(&mut self, event: &Event);
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn publish(&mut self, event: &Event) {
        (**self).publish(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn publish(&mut self, event: &Event) {
        (**self).publish(event);
    }
}

type Handler = Box<dyn FnMut(&Event)>;

/// Dispatches events to handlers subscribed by tag.
///
/// Handlers registered under the same tag run in subscription order.
#[derive(Default)]
pub struct EventBus {
    handlers: BTreeMap<&'static str, Vec<Handler>>,
}

impl EventBus {
    /// Creates a bus without subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for every event whose [`Event::tag`] equals `tag`.
    pub fn subscribe(&mut self, tag: &'static str, handler: impl FnMut(&Event) + 'static) {
        self.handlers
            .entry(tag)
            .or_default()
            .push(Box::new(handler));
    }

    /// Number of handlers subscribed to the tag.
    #[must_use]
    pub fn subscriber_count(&self, tag: &str) -> usize {
        self.handlers.get(tag).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.handlers
                    .iter()
                    .map(|(tag, handlers)| (tag, handlers.len())),
            )
            .finish()
    }
}

impl EventSink for EventBus {
    fn publish(&mut self, event: &Event) {
        if let Some(handlers) = self.handlers.get_mut(event.tag()) {
            for handler in handlers {
                handler(event);
            }
        }
    }
}

/// Sink that stores every event it receives, in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    events: Vec<Event>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of recorded events carrying the tag.
    #[must_use]
    pub fn count(&self, tag: &str) -> usize {
        self.events.iter().filter(|event| event.tag() == tag).count()
    }

    /// Drains the recorded events.
    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for RecordingSink {
    fn publish(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}
