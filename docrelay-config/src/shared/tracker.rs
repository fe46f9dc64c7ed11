use serde::{Deserialize, Serialize};

/// Default maximum number of tracked events per second.
pub const DEFAULT_TRACKER_MAX_EVENTS_PER_SECOND: u32 = 100;

/// Settings of the error tracker.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrackerConfig {
    /// Maximum events emitted per second, `0` disables rate limiting.
    #[serde(default = "default_max_events_per_second")]
    pub max_events_per_second: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_events_per_second: DEFAULT_TRACKER_MAX_EVENTS_PER_SECOND,
        }
    }
}

fn default_max_events_per_second() -> u32 {
    DEFAULT_TRACKER_MAX_EVENTS_PER_SECOND
}
