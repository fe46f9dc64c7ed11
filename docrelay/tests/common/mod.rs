#![allow(dead_code)]

use std::sync::Arc;

use docrelay::cache::MemoryCache;
use docrelay::documents::Profile;
use docrelay::enricher::TokenizeEnricher;
use docrelay::pipeline::DocumentPipeline;
use docrelay::publisher::{
    BrokerPublisher, DualTierPublisher, MemoryBroker, MemoryQueue, QueuePublisher,
};
use docrelay::test_utils::tokenizer::MockTokenizerApi;
use docrelay::tokenizer::CacheAsideTokenizer;
use docrelay::tracker::{MemoryTracker, Sampler};
use docrelay::types::Document;
use docrelay_config::shared::{CacheConfig, ConcurrencyConfig, PipelineConfig};

pub const TOPIC: &str = "documents";

pub type MemoryPublisher<T> =
    DualTierPublisher<T, BrokerPublisher<T, MemoryBroker>, QueuePublisher<T, MemoryQueue>>;

pub type MemoryPipeline<T> =
    DocumentPipeline<T, BrokerPublisher<T, MemoryBroker>, QueuePublisher<T, MemoryQueue>>;

pub type ProfileTokenizer = CacheAsideTokenizer<MemoryCache, MockTokenizerApi>;

/// In-memory adapters behind a relay, shared with the pipelines built from it.
#[derive(Debug, Clone)]
pub struct TestRelay {
    pub broker: MemoryBroker,
    pub queue: MemoryQueue,
    pub cache: MemoryCache,
    pub api: MockTokenizerApi,
    pub tracker: MemoryTracker,
    pub concurrency: ConcurrencyConfig,
}

impl TestRelay {
    pub fn new() -> Self {
        Self::with_api(MockTokenizerApi::new())
    }

    pub fn with_api(api: MockTokenizerApi) -> Self {
        Self {
            broker: MemoryBroker::new(),
            queue: MemoryQueue::new(),
            cache: MemoryCache::new(),
            api,
            tracker: MemoryTracker::new(),
            concurrency: ConcurrencyConfig {
                enrich_chunk_size: 4,
                tokenize_chunk_size: 3,
                publish_chunk_size: 2,
                broker_batch_size: 5,
            },
        }
    }

    pub fn publisher<T: Document>(&self) -> MemoryPublisher<T> {
        DualTierPublisher::new(
            BrokerPublisher::new(Arc::new(self.broker.clone()), TOPIC, &self.concurrency),
            QueuePublisher::new(Arc::new(self.queue.clone()), &self.concurrency),
        )
    }

    pub fn pipeline<T: Document>(&self) -> MemoryPipeline<T> {
        DocumentPipeline::new(
            PipelineConfig {
                name: "test".to_string(),
                concurrency: self.concurrency.clone(),
            },
            self.publisher(),
            Arc::new(self.tracker.clone()),
        )
    }

    pub fn tokenizer(&self) -> Arc<ProfileTokenizer> {
        let tokenizer = CacheAsideTokenizer::new(
            Arc::new(self.cache.clone()),
            Arc::new(self.api.clone()),
            &CacheConfig {
                key_prefix: "test:".to_string(),
                ..Default::default()
            },
            self.concurrency.tokenize_chunk_size,
            Arc::new(self.tracker.clone()),
        )
        .with_sampler(Sampler::always());

        Arc::new(tokenizer)
    }

    /// A profile pipeline tokenizing fiscal codes through `tokenizer`.
    pub fn profile_pipeline(&self, tokenizer: Arc<ProfileTokenizer>) -> MemoryPipeline<Profile> {
        self.pipeline()
            .with_enricher(Arc::new(TokenizeEnricher::<Profile, _, _>::new(tokenizer)))
    }

    pub async fn published<T: serde::de::DeserializeOwned>(&self) -> Vec<T> {
        self.broker.documents(TOPIC).await
    }

    pub async fn fallen_back<T: serde::de::DeserializeOwned>(&self) -> Vec<T> {
        self.queue.documents().await
    }
}
