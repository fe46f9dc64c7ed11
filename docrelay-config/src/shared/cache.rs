use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Default ttl of a cached token: 30 days.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Default ratio of cache-layer errors reported to the tracker.
pub const DEFAULT_CACHE_ERROR_SAMPLE_RATE: f64 = 0.1;

/// Settings of the token cache used by the cache-aside tokenizer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Prefix prepended to every cache key.
    pub key_prefix: String,
    /// Time to live of a written token.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Fraction of cache-layer errors which are reported to the tracker.
    #[serde(default = "default_error_sample_rate")]
    pub error_sample_rate: f64,
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ttl_secs == 0 {
            return Err(ValidationError::CacheTtlZero);
        }

        if !(0.0..=1.0).contains(&self.error_sample_rate) {
            return Err(ValidationError::InvalidSampleRate(
                self.error_sample_rate.to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            error_sample_rate: DEFAULT_CACHE_ERROR_SAMPLE_RATE,
        }
    }
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_error_sample_rate() -> f64 {
    DEFAULT_CACHE_ERROR_SAMPLE_RATE
}
