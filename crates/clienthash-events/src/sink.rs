use std::sync::mpsc::{self, Receiver, Sender};

use crate::HashEvent;

/// Trait for consuming events.
///
/// Each frontend provides its own implementation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: HashEvent);
}

/// Channel-based event sink.
///
/// Sends events through a standard mpsc channel. The receiver end
/// can be polled by any consumer (console renderer, test harness, etc.).
pub struct ChannelSink {
    sender: Sender<HashEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<HashEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender,
            },
            receiver,
        )
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: HashEvent) {
        let _ = self.sender.send(event);
    }
}

/// No-op event sink for tests or headless operation.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: HashEvent) {}
}

/// Collector sink that stores all events for inspection.
#[derive(Default)]
pub struct CollectorSink {
    events: std::sync::Mutex<Vec<HashEvent>>,
}

impl CollectorSink {
    pub fn events(&self) -> Vec<HashEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: HashEvent) {
        self.events.lock().unwrap().push(event);
    }
}
