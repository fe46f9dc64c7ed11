use std::sync::Mutex;
use tracing::warn;

use docrelay_config::shared::TrackerConfig;

use crate::error::RelayError;
use crate::metrics::DOCRELAY_TRACKER_EVENTS_DROPPED_TOTAL;
use crate::tracker::{TokenBucket, Tracker};

/// Tracker emitting events as `tracing` warnings, rate limited by a [`TokenBucket`].
///
/// Events over the limit are dropped and only counted.
#[derive(Debug)]
pub struct TracingTracker {
    bucket: Mutex<TokenBucket>,
}

impl TracingTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(config.max_events_per_second)),
        }
    }
}

impl Tracker for TracingTracker {
    fn track_error(&self, event: &'static str, error: &RelayError) {
        let allowed = self
            .bucket
            .lock()
            .map(|mut bucket| bucket.try_acquire())
            // A poisoned bucket only means another thread panicked while tracking.
            .unwrap_or(true);

        if !allowed {
            metrics::counter!(DOCRELAY_TRACKER_EVENTS_DROPPED_TOTAL, "event" => event).increment(1);
            return;
        }

        warn!(event, error_kind = ?error.kind(), %error, "tracked error");
    }
}
