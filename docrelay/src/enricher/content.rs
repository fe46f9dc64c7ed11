use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::bail;
use crate::concurrency::run_bounded;
use crate::enricher::Enricher;
use crate::error::{ErrorKind, RelayResult};
use crate::relay_error;
use crate::types::{ContentBearing, ItemResult};

/// Store holding the content of documents that are published without it.
pub trait ContentStore: Send + Sync {
    /// Returns the content stored under `key`, or `None` if there is none.
    fn fetch(
        &self,
        key: &str,
    ) -> impl Future<Output = RelayResult<Option<serde_json::Value>>> + Send;
}

#[derive(Debug, Default)]
struct Inner {
    contents: HashMap<String, serde_json::Value>,
    unavailable: bool,
}

/// In-memory [`ContentStore`], clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: impl Into<String>, content: serde_json::Value) {
        self.inner.write().await.contents.insert(key.into(), content);
    }

    /// Makes every fetch fail while `unavailable` is set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.write().await.unavailable = unavailable;
    }
}

impl ContentStore for MemoryContentStore {
    async fn fetch(&self, key: &str) -> RelayResult<Option<serde_json::Value>> {
        let inner = self.inner.read().await;
        if inner.unavailable {
            bail!(
                ErrorKind::ContentFetchFailed,
                "Content store is unavailable",
                key
            );
        }

        Ok(inner.contents.get(key).cloned())
    }
}

/// Fetches the content of each document from a [`ContentStore`].
///
/// Missing content is a failure, a document is never published with its content absent.
#[derive(Debug)]
pub struct ContentEnricher<T, S> {
    store: Arc<S>,
    chunk_size: usize,
    _document: PhantomData<fn() -> T>,
}

impl<T, S> ContentEnricher<T, S> {
    pub fn new(store: Arc<S>, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size,
            _document: PhantomData,
        }
    }
}

#[async_trait]
impl<T, S> Enricher<T> for ContentEnricher<T, S>
where
    T: ContentBearing + Send + Sync + 'static,
    S: ContentStore + 'static,
{
    async fn enrich(&self, document: T) -> ItemResult<T> {
        let key = document.content_key();
        match self.store.fetch(&key).await {
            Ok(Some(content)) => ItemResult::Success(document.with_content(content)),
            Ok(None) => ItemResult::failure(
                document,
                relay_error!(ErrorKind::ContentNotFound, "Document content not found", key),
            ),
            Err(error) => ItemResult::failure(document, error),
        }
    }

    async fn enrich_batch(&self, documents: Vec<T>) -> Vec<ItemResult<T>> {
        run_bounded(documents, self.chunk_size, |document| self.enrich(document)).await
    }
}
