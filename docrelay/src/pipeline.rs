//! Orchestration of a batch of raw documents through every stage of the relay.
//!
//! Contains the [`DocumentPipeline`] entry point, which decodes, filters, enriches and
//! publishes the documents received from the trigger host and decides whether the
//! invocation succeeded or must be retried as a whole.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use docrelay_config::shared::PipelineConfig;

use crate::decode::{Decoder, JsonDecoder, decode_batch};
use crate::enricher::{Enricher, NoopEnricher};
use crate::error::RelayResult;
use crate::filter::{Filter, KeepAll, filter_batch};
use crate::metrics::{
    DOCRELAY_DOCUMENTS_DECODE_FAILED_TOTAL, DOCRELAY_DOCUMENTS_ENRICHMENT_FAILED_TOTAL,
    DOCRELAY_DOCUMENTS_FILTERED_TOTAL, DOCRELAY_DOCUMENTS_RECEIVED_TOTAL,
    DOCRELAY_PROCESS_DURATION_SECONDS, PIPELINE, register_metrics,
};
use crate::publisher::{DualTierPublisher, Publisher};
use crate::tracker::{DECODE_ERROR_EVENT, Tracker};
use crate::types::{Document, RawDocument, partition_results};

/// Stage of a [`DocumentPipeline::process`] invocation.
///
/// Stages always run in this order, an invocation ends either in [`ProcessStage::Done`]
/// or in [`ProcessStage::Fatal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStage {
    Decoding,
    Filtering,
    Enriching,
    PublishingPrimary,
    PublishingFallback,
    Done,
    Fatal,
}

impl fmt::Display for ProcessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            ProcessStage::Decoding => "decoding",
            ProcessStage::Filtering => "filtering",
            ProcessStage::Enriching => "enriching",
            ProcessStage::PublishingPrimary => "publishing_primary",
            ProcessStage::PublishingFallback => "publishing_fallback",
            ProcessStage::Done => "done",
            ProcessStage::Fatal => "fatal",
        };

        f.write_str(stage)
    }
}

/// Outcome of a successful invocation.
///
/// Every received document is accounted for exactly once: it was either dropped by
/// decoding, excluded by the filter, or published by one of the two tiers. Documents which
/// failed enrichment are also counted among the ones published by the fallback tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub received: usize,
    pub decode_failed: usize,
    pub filtered_out: usize,
    pub enrichment_failed: usize,
    pub published_primary: usize,
    pub published_fallback: usize,
}

impl ProcessSummary {
    /// Number of documents whose delivery was confirmed by either tier.
    pub fn published(&self) -> usize {
        self.published_primary + self.published_fallback
    }
}

/// Relays batches of raw documents of type `T` to the publishing tiers.
///
/// Decode errors are tracked and their documents dropped, filtered out documents are
/// dropped silently, documents failing enrichment skip the primary tier and documents
/// failing the primary tier are demoted to the fallback tier. Only a fallback failure
/// makes [`DocumentPipeline::process`] return an error.
pub struct DocumentPipeline<T, P, F> {
    config: Arc<PipelineConfig>,
    decoder: Box<dyn Decoder<T>>,
    filter: Box<dyn Filter<T>>,
    enricher: Arc<dyn Enricher<T>>,
    publisher: DualTierPublisher<T, P, F>,
    tracker: Arc<dyn Tracker>,
}

impl<T, P, F> DocumentPipeline<T, P, F>
where
    T: Document,
    P: Publisher<T>,
    F: Publisher<T>,
{
    /// Creates a pipeline decoding documents as JSON, keeping all of them and publishing
    /// them without enrichment.
    pub fn new(
        config: PipelineConfig,
        publisher: DualTierPublisher<T, P, F>,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        // Metrics registration is idempotent, creating many pipelines is fine.
        register_metrics();

        Self {
            config: Arc::new(config),
            decoder: Box::new(JsonDecoder::new()),
            filter: Box::new(KeepAll),
            enricher: Arc::new(NoopEnricher),
            publisher,
            tracker,
        }
    }

    pub fn with_decoder(mut self, decoder: impl Decoder<T> + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn with_filter(mut self, filter: impl Filter<T> + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher<T>>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Processes a batch of raw documents.
    ///
    /// Returning `Ok` acknowledges the batch, every document was either intentionally
    /// dropped or delivered. An `Err` aggregates the documents that neither tier
    /// delivered, in which case the caller is expected to retry the whole batch.
    pub async fn process(&self, raw_documents: Vec<RawDocument>) -> RelayResult<ProcessSummary> {
        let started_at = Instant::now();
        let pipeline = self.config.name.clone();
        let mut summary = ProcessSummary {
            received: raw_documents.len(),
            ..Default::default()
        };
        metrics::counter!(DOCRELAY_DOCUMENTS_RECEIVED_TOTAL, PIPELINE => pipeline.clone())
            .increment(summary.received as u64);

        self.enter(ProcessStage::Decoding);
        let (documents, decode_errors) = decode_batch(self.decoder.as_ref(), &raw_documents);
        summary.decode_failed = decode_errors.len();
        for error in &decode_errors {
            self.tracker.track_error(DECODE_ERROR_EVENT, error);
        }
        metrics::counter!(DOCRELAY_DOCUMENTS_DECODE_FAILED_TOTAL, PIPELINE => pipeline.clone())
            .increment(summary.decode_failed as u64);

        self.enter(ProcessStage::Filtering);
        let (documents, filtered_out) = filter_batch(self.filter.as_ref(), documents);
        summary.filtered_out = filtered_out;
        metrics::counter!(DOCRELAY_DOCUMENTS_FILTERED_TOTAL, PIPELINE => pipeline.clone())
            .increment(filtered_out as u64);

        self.enter(ProcessStage::Enriching);
        let (enriched, failed_enrichment) =
            partition_results(self.enricher.enrich_batch(documents).await);
        summary.enrichment_failed = failed_enrichment.len();
        metrics::counter!(DOCRELAY_DOCUMENTS_ENRICHMENT_FAILED_TOTAL, PIPELINE => pipeline.clone())
            .increment(summary.enrichment_failed as u64);

        self.enter(ProcessStage::PublishingPrimary);
        let (published_primary, mut demoted) = self.publisher.publish_primary(enriched).await;
        summary.published_primary = published_primary;
        // Documents failing enrichment go straight to the fallback tier.
        demoted.extend(failed_enrichment);

        self.enter(ProcessStage::PublishingFallback);
        let result = self.publisher.publish_fallback(demoted).await;

        metrics::histogram!(DOCRELAY_PROCESS_DURATION_SECONDS, PIPELINE => pipeline)
            .record(started_at.elapsed().as_secs_f64());

        match result {
            Ok(published_fallback) => {
                summary.published_fallback = published_fallback;
                self.enter(ProcessStage::Done);
                info!(
                    pipeline = %self.config.name,
                    received = summary.received,
                    decode_failed = summary.decode_failed,
                    filtered_out = summary.filtered_out,
                    enrichment_failed = summary.enrichment_failed,
                    published_primary = summary.published_primary,
                    published_fallback = summary.published_fallback,
                    "batch processed"
                );

                Ok(summary)
            }
            Err(err) => {
                self.enter(ProcessStage::Fatal);
                error!(
                    pipeline = %self.config.name,
                    received = summary.received,
                    failed = err.len(),
                    error = %err,
                    "batch could not be delivered, it must be retried"
                );

                Err(err)
            }
        }
    }

    fn enter(&self, stage: ProcessStage) {
        debug!(pipeline = %self.config.name, %stage, "entering stage");
    }
}
