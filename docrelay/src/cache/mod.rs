//! Key-value cache used by the cache-aside tokenizer.
//!
//! The relay never manages eviction itself, entries are written with a TTL and expire
//! passively in the backing store.

mod memory;

pub use memory::MemoryCache;

use std::future::Future;
use std::time::Duration;

use crate::error::RelayResult;

/// Client of an external key-value cache.
///
/// Implementations are shared by every concurrent resolution and must be safe to use
/// concurrently.
pub trait CacheClient: Send + Sync {
    /// Returns the value stored under `key`, or `None` if it is absent or expired.
    fn get(&self, key: &str) -> impl Future<Output = RelayResult<Option<String>>> + Send;

    /// Stores `value` under `key`, expiring it after `ttl`.
    fn set_ex(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> impl Future<Output = RelayResult<()>> + Send;
}
