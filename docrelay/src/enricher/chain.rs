use async_trait::async_trait;
use std::sync::Arc;

use crate::enricher::Enricher;
use crate::error::ErrorKind;
use crate::relay_error;
use crate::types::{ItemResult, align_results};

/// Runs enrichers left to right, giving each one only the documents that every previous
/// enricher enriched successfully.
///
/// A document failed by an enricher keeps its failure and its position, later enrichers
/// never see it. An enricher is still invoked, with an empty batch, when every document
/// failed before it. A document an enricher returns no result for is failed with
/// [`ErrorKind::EnrichmentFailed`].
pub struct EnricherChain<T> {
    enrichers: Vec<Arc<dyn Enricher<T>>>,
}

impl<T> EnricherChain<T>
where
    T: Send + 'static,
{
    pub fn new(enrichers: Vec<Arc<dyn Enricher<T>>>) -> Self {
        Self { enrichers }
    }

    /// Appends `enricher` at the end of the chain.
    pub fn then(mut self, enricher: Arc<dyn Enricher<T>>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    pub fn len(&self) -> usize {
        self.enrichers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrichers.is_empty()
    }
}

/// Builds the enricher running `first` and then `second` on the documents `first` enriched.
pub fn combine<T>(first: Arc<dyn Enricher<T>>, second: Arc<dyn Enricher<T>>) -> EnricherChain<T>
where
    T: Send + 'static,
{
    EnricherChain::new(vec![first, second])
}

#[async_trait]
impl<T> Enricher<T> for EnricherChain<T>
where
    T: Clone + Send + 'static,
{
    async fn enrich(&self, document: T) -> ItemResult<T> {
        let mut result = ItemResult::Success(document);
        for enricher in &self.enrichers {
            result = match result {
                ItemResult::Success(document) => enricher.enrich(document).await,
                failure => return failure,
            };
        }

        result
    }

    async fn enrich_batch(&self, documents: Vec<T>) -> Vec<ItemResult<T>> {
        let mut results: Vec<ItemResult<T>> =
            documents.into_iter().map(ItemResult::Success).collect();

        for enricher in &self.enrichers {
            // `None` marks the positions handed to the current enricher.
            let mut slots = Vec::with_capacity(results.len());
            let mut pending = Vec::new();
            for result in results {
                match result {
                    ItemResult::Success(document) => {
                        pending.push(document);
                        slots.push(None);
                    }
                    failure => slots.push(Some(failure)),
                }
            }

            let handed = pending.clone();
            let enriched = enricher.enrich_batch(pending).await;
            let mut enriched = align_results(handed, enriched, || {
                relay_error!(
                    ErrorKind::EnrichmentFailed,
                    "Enricher returned no result for the document"
                )
            })
            .into_iter();
            results = slots
                .into_iter()
                .filter_map(|slot| slot.or_else(|| enriched.next()))
                .collect();
        }

        results
    }
}
