use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::enricher::Enricher;
use crate::error::ErrorKind;
use crate::relay_error;
use crate::types::ItemResult;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Enricher failing the documents matching a predicate and recording what it received.
///
/// Clones share the recorded batches.
#[derive(Clone)]
pub struct RecordingEnricher<T> {
    fails: Predicate<T>,
    batches: Arc<Mutex<Vec<Vec<T>>>>,
}

impl<T> RecordingEnricher<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn failing_when<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            fails: Arc::new(predicate),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every batch received, a single document enrichment counts as a batch of one.
    pub fn batches(&self) -> Vec<Vec<T>> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }

    pub fn documents(&self) -> Vec<T> {
        self.batches().into_iter().flatten().collect()
    }

    fn record(&self, batch: &[T]) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch.to_vec());
        }
    }

    fn apply(&self, document: T) -> ItemResult<T> {
        if (self.fails)(&document) {
            ItemResult::failure(
                document,
                relay_error!(ErrorKind::EnrichmentFailed, "Enrichment failed"),
            )
        } else {
            ItemResult::Success(document)
        }
    }
}

#[async_trait]
impl<T> Enricher<T> for RecordingEnricher<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn enrich(&self, document: T) -> ItemResult<T> {
        self.record(std::slice::from_ref(&document));
        self.apply(document)
    }

    async fn enrich_batch(&self, documents: Vec<T>) -> Vec<ItemResult<T>> {
        self.record(&documents);
        documents
            .into_iter()
            .map(|document| self.apply(document))
            .collect()
    }
}
