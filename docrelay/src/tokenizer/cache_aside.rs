use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

use docrelay_config::shared::CacheConfig;

use crate::cache::CacheClient;
use crate::concurrency::run_bounded;
use crate::error::{ErrorKind, RelayError, RelayResult};
use crate::metrics::{DOCRELAY_TOKENIZER_CACHE_TOTAL, HIT, MISS, RESULT};
use crate::relay_error;
use crate::tokenizer::TokenizerApi;
use crate::tracker::{
    CACHE_INVALID_VALUE_EVENT, CACHE_READ_ERROR_EVENT, CACHE_WRITE_ERROR_EVENT, Sampler, Tracker,
};

/// Resolves identifiers to tokens, looking them up in a cache before calling the service.
///
/// A cache hit never reaches the service. On a miss the service is called and the token
/// is written back in a detached task, so the resolution does not wait for the write.
/// Cache failures never fail a resolution: a failed read behaves like a miss and a failed
/// write is only tracked, both through a [`Sampler`] to bound the number of events.
///
/// Concurrent misses on the same identifier each call the service.
#[derive(Debug)]
pub struct CacheAsideTokenizer<C, A> {
    cache: Arc<C>,
    api: Arc<A>,
    key_prefix: String,
    ttl: Duration,
    chunk_size: usize,
    sampler: Sampler,
    tracker: Arc<dyn Tracker>,
    write_permits: Arc<Semaphore>,
    write_capacity: u32,
}

impl<C, A> CacheAsideTokenizer<C, A>
where
    C: CacheClient + 'static,
    A: TokenizerApi,
{
    /// Creates a tokenizer resolving batches `chunk_size` identifiers at a time.
    ///
    /// At most `chunk_size` cache writes are in flight at any time.
    pub fn new(
        cache: Arc<C>,
        api: Arc<A>,
        config: &CacheConfig,
        chunk_size: usize,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        let write_capacity = u32::try_from(chunk_size).unwrap_or(u32::MAX);

        Self {
            cache,
            api,
            key_prefix: config.key_prefix.clone(),
            ttl: Duration::from_secs(config.ttl_secs),
            chunk_size,
            sampler: Sampler::new(config.error_sample_rate),
            tracker,
            write_permits: Arc::new(Semaphore::new(write_capacity as usize)),
            write_capacity,
        }
    }

    /// Replaces the sampler gating cache error events.
    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Returns the cache key of `identifier`.
    ///
    /// Identifiers are hashed so that the cache never stores them in clear.
    pub fn cache_key(&self, identifier: &str) -> String {
        format!(
            "{}{:x}",
            self.key_prefix,
            Sha256::digest(identifier.as_bytes())
        )
    }

    /// Resolves the token of `identifier`.
    pub async fn resolve(&self, identifier: &str) -> RelayResult<String> {
        let key = self.cache_key(identifier);

        if let Some(token) = self.read_cached(&key).await {
            metrics::counter!(DOCRELAY_TOKENIZER_CACHE_TOTAL, RESULT => HIT).increment(1);
            return Ok(token);
        }
        metrics::counter!(DOCRELAY_TOKENIZER_CACHE_TOTAL, RESULT => MISS).increment(1);

        let token = self.api.tokenize(identifier).await?;
        self.spawn_write(key, token.clone()).await;

        Ok(token)
    }

    /// Resolves every identifier, at most `chunk_size` at a time.
    ///
    /// The result at index `i` belongs to the identifier at index `i`.
    pub async fn resolve_many(&self, identifiers: Vec<String>) -> Vec<RelayResult<String>> {
        run_bounded(identifiers, self.chunk_size, |identifier| async move {
            self.resolve(&identifier).await
        })
        .await
    }

    /// Waits until every detached cache write has completed.
    pub async fn wait_for_pending_writes(&self) {
        // All permits are only available once every write released its own.
        if let Ok(permits) = self.write_permits.acquire_many(self.write_capacity).await {
            drop(permits);
        }
    }

    async fn read_cached(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(Some(token)) if !token.trim().is_empty() => Some(token),
            Ok(Some(_)) => {
                let error = relay_error!(
                    ErrorKind::CacheReadFailed,
                    "Cached token is empty",
                    key
                );
                self.track_sampled(CACHE_INVALID_VALUE_EVENT, &error);

                None
            }
            Ok(None) => None,
            Err(err) => {
                debug!(error = %err, "token cache read failed, treating it as a miss");
                self.track_sampled(CACHE_READ_ERROR_EVENT, &err);

                None
            }
        }
    }

    /// Writes the token back in a detached task once a write permit is available.
    ///
    /// Only the permit acquisition is awaited, bounding in-flight writes to `chunk_size`.
    async fn spawn_write(&self, key: String, token: String) {
        let Ok(permit) = self.write_permits.clone().acquire_owned().await else {
            return;
        };

        let cache = self.cache.clone();
        let tracker = self.tracker.clone();
        let sampler = self.sampler;
        let ttl = self.ttl;
        tokio::spawn(async move {
            if let Err(err) = cache.set_ex(&key, ttl, &token).await
                && sampler.should_sample()
            {
                tracker.track_error(CACHE_WRITE_ERROR_EVENT, &err);
            }

            drop(permit);
        });
    }

    fn track_sampled(&self, event: &'static str, error: &RelayError) {
        if self.sampler.should_sample() {
            self.tracker.track_error(event, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::test_utils::tokenizer::MockTokenizerApi;
    use crate::tracker::MemoryTracker;

    fn cache_config() -> CacheConfig {
        CacheConfig {
            key_prefix: "tokens:".to_string(),
            ..Default::default()
        }
    }

    fn tokenizer(
        cache: &MemoryCache,
        api: &MockTokenizerApi,
        tracker: &MemoryTracker,
    ) -> CacheAsideTokenizer<MemoryCache, MockTokenizerApi> {
        CacheAsideTokenizer::new(
            Arc::new(cache.clone()),
            Arc::new(api.clone()),
            &cache_config(),
            4,
            Arc::new(tracker.clone()),
        )
        .with_sampler(Sampler::always())
    }

    #[test]
    fn cache_keys_are_prefixed_hashes() {
        let tokenizer = tokenizer(
            &MemoryCache::new(),
            &MockTokenizerApi::new(),
            &MemoryTracker::new(),
        );

        let key = tokenizer.cache_key("AAAAAA00A00A000A");

        assert!(key.starts_with("tokens:"));
        assert!(!key.contains("AAAAAA00A00A000A"));
        assert_eq!(key.len(), "tokens:".len() + 64);
        assert_eq!(key, tokenizer.cache_key("AAAAAA00A00A000A"));
    }

    #[tokio::test(start_paused = true)]
    async fn misses_are_resolved_one_chunk_at_a_time() {
        let cache = MemoryCache::new();
        let api = MockTokenizerApi::new().with_delay(Duration::from_millis(100));
        let tokenizer = tokenizer(&cache, &api, &MemoryTracker::new());
        let identifiers: Vec<String> = (0..8).map(|i| format!("PII{i}")).collect();

        let started_at = tokio::time::Instant::now();
        let tokens = tokenizer.resolve_many(identifiers.clone()).await;
        let elapsed = started_at.elapsed();

        // Two chunks of four, each waiting for its slowest request.
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
        assert_eq!(api.calls(), 8);
        for (identifier, token) in identifiers.iter().zip(tokens) {
            assert_eq!(token.unwrap(), api.token_of(identifier));
        }
    }

    #[tokio::test]
    async fn second_resolution_is_served_from_cache() {
        let cache = MemoryCache::new();
        let api = MockTokenizerApi::new();
        let tracker = MemoryTracker::new();
        let tokenizer = tokenizer(&cache, &api, &tracker);

        let first = tokenizer.resolve("AAAAAA00A00A000A").await.unwrap();
        tokenizer.wait_for_pending_writes().await;
        let second = tokenizer.resolve("AAAAAA00A00A000A").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(api.calls(), 1);
        assert_eq!(
            cache
                .peek(&tokenizer.cache_key("AAAAAA00A00A000A"))
                .await
                .as_deref(),
            Some(first.as_str())
        );
        assert!(tracker.events().is_empty());
    }

    #[tokio::test]
    async fn cache_read_failure_behaves_like_a_miss() {
        let cache = MemoryCache::new();
        cache.set_fail_reads(true).await;
        let api = MockTokenizerApi::new();
        let tracker = MemoryTracker::new();
        let tokenizer = tokenizer(&cache, &api, &tracker);

        let token = tokenizer.resolve("AAAAAA00A00A000A").await;

        assert!(token.is_ok());
        assert_eq!(api.calls(), 1);
        assert_eq!(tracker.count(CACHE_READ_ERROR_EVENT), 1);
    }

    #[tokio::test]
    async fn cache_write_failure_keeps_the_token() {
        let cache = MemoryCache::new();
        cache.set_fail_writes(true).await;
        let api = MockTokenizerApi::new();
        let tracker = MemoryTracker::new();
        let tokenizer = tokenizer(&cache, &api, &tracker);

        let token = tokenizer.resolve("AAAAAA00A00A000A").await;
        tokenizer.wait_for_pending_writes().await;

        assert!(token.is_ok());
        assert!(cache.is_empty().await);
        assert_eq!(tracker.count(CACHE_WRITE_ERROR_EVENT), 1);
    }

    #[tokio::test]
    async fn unsampled_cache_errors_are_not_tracked() {
        let cache = MemoryCache::new();
        cache.set_fail_reads(true).await;
        cache.set_fail_writes(true).await;
        let api = MockTokenizerApi::new();
        let tracker = MemoryTracker::new();
        let tokenizer = tokenizer(&cache, &api, &tracker).with_sampler(Sampler::never());

        assert!(tokenizer.resolve("AAAAAA00A00A000A").await.is_ok());
        tokenizer.wait_for_pending_writes().await;

        assert!(tracker.events().is_empty());
    }

    #[tokio::test]
    async fn empty_cached_token_is_refreshed() {
        let cache = MemoryCache::new();
        let api = MockTokenizerApi::new();
        let tracker = MemoryTracker::new();
        let tokenizer = tokenizer(&cache, &api, &tracker);
        let key = tokenizer.cache_key("AAAAAA00A00A000A");
        cache.insert(key.clone(), "", Duration::from_secs(60)).await;

        let token = tokenizer.resolve("AAAAAA00A00A000A").await.unwrap();
        tokenizer.wait_for_pending_writes().await;

        assert_eq!(api.calls(), 1);
        assert_eq!(cache.peek(&key).await, Some(token));
        assert_eq!(tracker.count(CACHE_INVALID_VALUE_EVENT), 1);
    }

    #[tokio::test]
    async fn service_failures_are_not_cached() {
        let cache = MemoryCache::new();
        let api = MockTokenizerApi::new().failing_for(["BBBBBB00B00B000B"]);
        let tracker = MemoryTracker::new();
        let tokenizer = tokenizer(&cache, &api, &tracker);

        let error = tokenizer.resolve("BBBBBB00B00B000B").await.unwrap_err();
        tokenizer.wait_for_pending_writes().await;

        assert_eq!(error.kind(), ErrorKind::TokenizerRequestFailed);
        assert!(cache.is_empty().await);
        assert_eq!(cache.writes().await, 0);
    }

    #[tokio::test]
    async fn resolve_many_keeps_positions() {
        let cache = MemoryCache::new();
        let api = MockTokenizerApi::new().failing_for(["B"]);
        let tracker = MemoryTracker::new();
        let tokenizer = tokenizer(&cache, &api, &tracker);

        let results = tokenizer
            .resolve_many(
                ["A", "B", "C", "D", "E", "F"]
                    .map(String::from)
                    .to_vec(),
            )
            .await;

        assert_eq!(results.len(), 6);
        assert!(results[1].is_err());
        assert_eq!(results[0].as_deref().ok(), Some(api.token_of("A").as_str()));
        assert_eq!(results[5].as_deref().ok(), Some(api.token_of("F").as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_does_not_wait_for_the_cache_write() {
        let cache = MemoryCache::new();
        cache.set_write_delay(Duration::from_secs(5)).await;
        let api = MockTokenizerApi::new();
        let tokenizer = tokenizer(&cache, &api, &MemoryTracker::new());
        let key = tokenizer.cache_key("AAAAAA00A00A000A");

        let started_at = tokio::time::Instant::now();
        let token = tokenizer.resolve("AAAAAA00A00A000A").await.unwrap();

        assert!(started_at.elapsed() < Duration::from_secs(5));
        assert_eq!(cache.peek(&key).await, None);

        tokenizer.wait_for_pending_writes().await;

        assert!(started_at.elapsed() >= Duration::from_secs(5));
        assert_eq!(cache.peek(&key).await, Some(token));
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_cache_writes_are_bounded_by_the_chunk_size() {
        let cache = MemoryCache::new();
        cache.set_write_delay(Duration::from_millis(100)).await;
        let api = MockTokenizerApi::new();
        let tokenizer = tokenizer(&cache, &api, &MemoryTracker::new());
        let identifiers: Vec<String> = (0..12).map(|i| format!("PII{i}")).collect();

        let tokens = tokenizer.resolve_many(identifiers).await;
        tokenizer.wait_for_pending_writes().await;

        assert!(tokens.iter().all(Result::is_ok));
        assert_eq!(cache.writes().await, 12);
        assert_eq!(cache.len().await, 12);
        assert!(cache.max_concurrent_writes().await <= 4);
    }
}
