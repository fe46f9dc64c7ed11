//! Sinks for non-fatal errors.
//!
//! Tracked errors are observational signals: a tracker never fails and never influences
//! control flow. Decode errors are always tracked, cache-layer errors only when sampled.

mod log_tracker;
mod memory;
mod rate_limiter;
mod sampler;

pub use log_tracker::TracingTracker;
pub use memory::{MemoryTracker, TrackedEvent};
pub use rate_limiter::TokenBucket;
pub use sampler::Sampler;

use std::fmt;

use crate::error::RelayError;

/// Event name of a raw document that failed decoding.
pub const DECODE_ERROR_EVENT: &str = "docrelay.decode.failure";

/// Event name of a token cache read failure.
pub const CACHE_READ_ERROR_EVENT: &str = "docrelay.cache.read.failure";

/// Event name of a token cache write failure.
pub const CACHE_WRITE_ERROR_EVENT: &str = "docrelay.cache.write.failure";

/// Event name of a cached token which could not be used.
pub const CACHE_INVALID_VALUE_EVENT: &str = "docrelay.cache.invalid_value";

/// Receives non-fatal errors.
pub trait Tracker: fmt::Debug + Send + Sync {
    fn track_error(&self, event: &'static str, error: &RelayError);
}
