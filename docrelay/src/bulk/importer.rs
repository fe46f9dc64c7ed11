use std::sync::Arc;
use tracing::{error, info};

use crate::bulk::PagedSource;
use crate::decode::{Decoder, JsonDecoder};
use crate::error::{ErrorKind, RelayResult};
use crate::publisher::{DualTierPublisher, Publisher};
use crate::relay_error;
use crate::tracker::{DECODE_ERROR_EVENT, Tracker};
use crate::types::{Document, Versioned};

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub scanned: usize,
    pub published_primary: usize,
    pub published_fallback: usize,
}

/// Replicates a full scan of a source, publishing documents ordered by entity and version.
///
/// Pages of a scan are not ordered with respect to each other, so the whole scan is loaded
/// in memory and stably sorted by `(entity_id, version)` before anything is published.
/// Unlike [`crate::pipeline::DocumentPipeline`], a single decode error aborts the import,
/// nothing is published from a scan that could not be entirely decoded.
///
/// Both tiers of the publisher are made ordered, so the broker receives the sorted documents
/// one batch at a time whatever the configured concurrency. Documents demoted to the
/// fallback tier are delivered after every primary batch and lose their position.
pub struct OrderedBulkImporter<T, P, F> {
    decoder: Box<dyn Decoder<T>>,
    publisher: DualTierPublisher<T, P, F>,
    tracker: Arc<dyn Tracker>,
}

impl<T, P, F> OrderedBulkImporter<T, P, F>
where
    T: Document + Versioned,
    P: Publisher<T>,
    F: Publisher<T>,
{
    pub fn new(publisher: DualTierPublisher<T, P, F>, tracker: Arc<dyn Tracker>) -> Self {
        Self {
            decoder: Box::new(JsonDecoder::new()),
            publisher: publisher.into_ordered(),
            tracker,
        }
    }

    pub fn with_decoder(mut self, decoder: impl Decoder<T> + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Drains `source`, sorts the decoded documents and publishes them.
    pub async fn import<S: PagedSource>(&self, mut source: S) -> RelayResult<ImportSummary> {
        let mut documents = Vec::new();
        let mut page_index = 0;
        while let Some(page) = source.next_page().await? {
            for (index, raw) in page.iter().enumerate() {
                let document = self.decoder.decode(raw).map_err(|err| {
                    self.tracker.track_error(DECODE_ERROR_EVENT, &err);
                    error!(
                        page = page_index,
                        index,
                        error = %err,
                        "bulk import aborted on decode error"
                    );

                    relay_error!(
                        ErrorKind::DecodeFailed,
                        "Bulk import aborted, a document could not be decoded",
                        format!("page {page_index}, document {index}: {err}")
                    )
                })?;
                documents.push(document);
            }
            page_index += 1;
        }

        let scanned = documents.len();
        info!(scanned, pages = page_index, "scan loaded, sorting documents");

        // Stable, documents sharing entity and version keep their scan order.
        documents.sort_by(|a, b| {
            a.entity_id()
                .cmp(b.entity_id())
                .then_with(|| a.version().cmp(&b.version()))
        });

        let report = self.publisher.deliver(documents, Vec::new()).await?;
        info!(
            scanned,
            published_primary = report.published_primary,
            published_fallback = report.published_fallback,
            "bulk import completed"
        );

        Ok(ImportSummary {
            scanned,
            published_primary: report.published_primary,
            published_fallback: report.published_fallback,
        })
    }
}
