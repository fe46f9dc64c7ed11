use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::bail;
use crate::cache::CacheClient;
use crate::error::{ErrorKind, RelayResult};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    fail_reads: bool,
    fail_writes: bool,
    write_delay: Option<Duration>,
    reads: usize,
    writes: usize,
    writes_in_flight: usize,
    max_writes_in_flight: usize,
}

/// In-memory [`CacheClient`] with passive TTL expiry.
///
/// Reads and writes can be made to fail to exercise the degraded paths of the tokenizer,
/// and writes can be slowed down to observe how many of them overlap. Cloning shares the
/// same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` without going through [`CacheClient::set_ex`].
    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        let mut inner = self.inner.lock().await;
        inner.entries.insert(
            key.into(),
            Entry {
                value: value.into(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Returns the live value stored under `key`, if any.
    pub async fn peek(&self, key: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let inner = self.inner.lock().await;
        inner
            .entries
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().await.fail_reads = fail;
    }

    pub async fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().await.fail_writes = fail;
    }

    /// Delays every write by `delay` before it is applied.
    pub async fn set_write_delay(&self, delay: Duration) {
        self.inner.lock().await.write_delay = Some(delay);
    }

    /// Number of reads served, including failed ones.
    pub async fn reads(&self) -> usize {
        self.inner.lock().await.reads
    }

    /// Number of writes received, including failed ones.
    pub async fn writes(&self) -> usize {
        self.inner.lock().await.writes
    }

    /// Highest number of writes observed running at the same time.
    pub async fn max_concurrent_writes(&self) -> usize {
        self.inner.lock().await.max_writes_in_flight
    }
}

impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> RelayResult<Option<String>> {
        let mut inner = self.inner.lock().await;
        inner.reads += 1;

        if inner.fail_reads {
            bail!(
                ErrorKind::CacheReadFailed,
                "Cache read failed",
                format!("read of key '{key}' was refused")
            );
        }

        let now = Instant::now();
        let expired = inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= now);
        if expired {
            inner.entries.remove(key);
        }

        Ok(inner.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> RelayResult<()> {
        let delay = {
            let mut inner = self.inner.lock().await;
            inner.writes += 1;
            inner.writes_in_flight += 1;
            inner.max_writes_in_flight = inner.max_writes_in_flight.max(inner.writes_in_flight);
            inner.write_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().await;
        inner.writes_in_flight -= 1;

        if inner.fail_writes {
            bail!(
                ErrorKind::CacheWriteFailed,
                "Cache write failed",
                format!("write of key '{key}' was refused")
            );
        }

        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );

        Ok(())
    }
}
