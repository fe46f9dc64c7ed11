use std::sync::{Arc, Mutex};

use crate::error::{ErrorKind, RelayError};
use crate::tracker::Tracker;

/// An event recorded by a [`MemoryTracker`].
#[derive(Debug, Clone)]
pub struct TrackedEvent {
    pub event: &'static str,
    pub error: RelayError,
}

/// Tracker keeping every event in memory, cloning it shares the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryTracker {
    events: Arc<Mutex<Vec<TrackedEvent>>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrackedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns how many events named `event` were tracked.
    pub fn count(&self, event: &str) -> usize {
        self.events()
            .iter()
            .filter(|tracked| tracked.event == event)
            .count()
    }

    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.events()
            .iter()
            .filter(|tracked| tracked.error.kind() == kind)
            .count()
    }
}

impl Tracker for MemoryTracker {
    fn track_error(&self, event: &'static str, error: &RelayError) {
        if let Ok(mut events) = self.events.lock() {
            events.push(TrackedEvent {
                event,
                error: error.clone(),
            });
        }
    }
}
