use serde::Serialize;

/// An engine event tagged with the frame it was observed in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event<E> {
    pub frame_index: u64,
    pub payload: E,
}

/// Event log drained by the host.
///
/// A bounded bus keeps only the newest `capacity` events, so a host that never
/// drains does not grow it without limit.
#[derive(Debug)]
pub struct EventBus<E> {
    events: Vec<Event<E>>,
    capacity: Option<usize>,
    dropped: u64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            capacity: None,
            dropped: 0,
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn emit(&mut self, frame_index: u64, payload: E) {
        self.events.push(Event {
            frame_index,
            payload,
        });
        if let Some(capacity) = self.capacity {
            let overflow = self.events.len().saturating_sub(capacity);
            if overflow > 0 {
                self.events.drain(..overflow);
                self.dropped += overflow as u64;
            }
        }
    }

    /// Events discarded because the bus was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }
}
