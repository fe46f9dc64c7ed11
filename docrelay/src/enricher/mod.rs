//! Per-document decoration applied before publishing.
//!
//! Enrichers never fail a batch: each document comes back as an [`ItemResult`], and a
//! failed document keeps flowing so that it can be delivered through the fallback tier.

mod chain;
mod content;
mod tokenize;

pub use chain::{EnricherChain, combine};
pub use content::{ContentEnricher, ContentStore, MemoryContentStore};
pub use tokenize::TokenizeEnricher;

use async_trait::async_trait;

use crate::concurrency::run_bounded;
use crate::types::ItemResult;

/// Decorates documents of type `T`.
#[async_trait]
pub trait Enricher<T>: Send + Sync
where
    T: Send + 'static,
{
    async fn enrich(&self, document: T) -> ItemResult<T>;

    /// Enriches a batch, returning one result per document in input order.
    ///
    /// The default implementation enriches documents one at a time, enrichers backed by
    /// external calls fan out within their own chunk size.
    async fn enrich_batch(&self, documents: Vec<T>) -> Vec<ItemResult<T>> {
        run_bounded(documents, 1, |document| self.enrich(document)).await
    }
}

/// Enricher for document types without enrichment, every document succeeds unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

#[async_trait]
impl<T> Enricher<T> for NoopEnricher
where
    T: Send + 'static,
{
    async fn enrich(&self, document: T) -> ItemResult<T> {
        ItemResult::Success(document)
    }

    async fn enrich_batch(&self, documents: Vec<T>) -> Vec<ItemResult<T>> {
        documents.into_iter().map(ItemResult::Success).collect()
    }
}
