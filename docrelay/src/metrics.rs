use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

pub const DOCRELAY_DOCUMENTS_RECEIVED_TOTAL: &str = "docrelay_documents_received_total";
pub const DOCRELAY_DOCUMENTS_DECODE_FAILED_TOTAL: &str = "docrelay_documents_decode_failed_total";
pub const DOCRELAY_DOCUMENTS_FILTERED_TOTAL: &str = "docrelay_documents_filtered_total";
pub const DOCRELAY_DOCUMENTS_ENRICHMENT_FAILED_TOTAL: &str =
    "docrelay_documents_enrichment_failed_total";
pub const DOCRELAY_DOCUMENTS_PUBLISHED_TOTAL: &str = "docrelay_documents_published_total";
pub const DOCRELAY_DOCUMENTS_FALLBACK_FAILED_TOTAL: &str =
    "docrelay_documents_fallback_failed_total";
pub const DOCRELAY_TOKENIZER_CACHE_TOTAL: &str = "docrelay_tokenizer_cache_total";
pub const DOCRELAY_TRACKER_EVENTS_DROPPED_TOTAL: &str = "docrelay_tracker_events_dropped_total";
pub const DOCRELAY_PROCESS_DURATION_SECONDS: &str = "docrelay_process_duration_seconds";
pub const PIPELINE: &str = "pipeline";
pub const TIER: &str = "tier";
pub const PRIMARY: &str = "primary";
pub const FALLBACK: &str = "fallback";
pub const RESULT: &str = "result";
pub const HIT: &str = "hit";
pub const MISS: &str = "miss";

/// Registers the descriptions of the metrics emitted by the relay.
///
/// Safe to call multiple times, registration happens only once.
pub(crate) fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            DOCRELAY_DOCUMENTS_RECEIVED_TOTAL,
            Unit::Count,
            "Total number of raw documents received by the pipeline"
        );

        describe_counter!(
            DOCRELAY_DOCUMENTS_DECODE_FAILED_TOTAL,
            Unit::Count,
            "Total number of raw documents dropped because they failed decoding"
        );

        describe_counter!(
            DOCRELAY_DOCUMENTS_FILTERED_TOTAL,
            Unit::Count,
            "Total number of decoded documents excluded by the filter"
        );

        describe_counter!(
            DOCRELAY_DOCUMENTS_ENRICHMENT_FAILED_TOTAL,
            Unit::Count,
            "Total number of documents which failed enrichment and were demoted to the fallback tier"
        );

        describe_counter!(
            DOCRELAY_DOCUMENTS_PUBLISHED_TOTAL,
            Unit::Count,
            "Total number of documents delivered, labeled by tier"
        );

        describe_counter!(
            DOCRELAY_DOCUMENTS_FALLBACK_FAILED_TOTAL,
            Unit::Count,
            "Total number of documents that could not be delivered by either tier"
        );

        describe_counter!(
            DOCRELAY_TOKENIZER_CACHE_TOTAL,
            Unit::Count,
            "Total number of token cache lookups, labeled by hit or miss"
        );

        describe_counter!(
            DOCRELAY_TRACKER_EVENTS_DROPPED_TOTAL,
            Unit::Count,
            "Total number of tracked events dropped by the rate limiter"
        );

        describe_histogram!(
            DOCRELAY_PROCESS_DURATION_SECONDS,
            Unit::Seconds,
            "Time taken in seconds to process a batch of raw documents"
        );
    });
}
