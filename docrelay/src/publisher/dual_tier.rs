use std::marker::PhantomData;
use tracing::{error, info, warn};

use crate::error::{ErrorKind, RelayError, RelayResult};
#[cfg(feature = "failpoints")]
use crate::failpoints::{PUBLISHER_BEFORE_FALLBACK, PUBLISHER_BEFORE_PRIMARY, relay_fail_point};
use crate::metrics::{
    DOCRELAY_DOCUMENTS_FALLBACK_FAILED_TOTAL, DOCRELAY_DOCUMENTS_PUBLISHED_TOTAL, FALLBACK,
    PRIMARY, TIER,
};
use crate::publisher::Publisher;
use crate::relay_error;
use crate::types::{Document, ItemResult, align_results, partition_results};

/// Number of documents delivered by each tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub published_primary: usize,
    pub published_fallback: usize,
}

/// Delivers documents to a primary publisher, demoting every failure to a fallback one.
///
/// A document is delivered once either tier accepted it. Failing the fallback tier is the
/// only fatal outcome: the failed documents are returned as a single aggregated error so
/// that the whole batch can be retried by the caller.
#[derive(Debug)]
pub struct DualTierPublisher<T, P, F> {
    primary: P,
    fallback: F,
    _document: PhantomData<fn() -> T>,
}

impl<T, P, F> DualTierPublisher<T, P, F>
where
    T: Document,
    P: Publisher<T>,
    F: Publisher<T>,
{
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            _document: PhantomData,
        }
    }

    /// Makes both tiers deliver the documents of a batch in input order.
    pub fn into_ordered(self) -> Self {
        Self {
            primary: self.primary.into_ordered(),
            fallback: self.fallback.into_ordered(),
            _document: PhantomData,
        }
    }

    /// Publishes `documents` through the primary tier.
    ///
    /// Returns the number of delivered documents and the documents to demote, with the
    /// error that made the primary tier fail them.
    pub async fn publish_primary(&self, documents: Vec<T>) -> (usize, Vec<(T, RelayError)>) {
        if documents.is_empty() {
            return (0, Vec::new());
        }

        #[cfg(feature = "failpoints")]
        if let Err(err) = relay_fail_point(PUBLISHER_BEFORE_PRIMARY) {
            return (
                0,
                documents
                    .into_iter()
                    .map(|document| (document, err.clone()))
                    .collect(),
            );
        }

        let handed = documents.clone();
        let results = self.primary.publish_batch(documents).await;
        let results = align_results(handed, results, || {
            relay_error!(
                ErrorKind::PrimaryPublishFailed,
                "Primary publisher returned no result for the document"
            )
        });
        let (published, failed) = partition_results(results);
        metrics::counter!(DOCRELAY_DOCUMENTS_PUBLISHED_TOTAL, TIER => PRIMARY)
            .increment(published.len() as u64);

        if !failed.is_empty() {
            warn!(
                published = published.len(),
                failed = failed.len(),
                "primary tier failed some documents, demoting them to the fallback tier"
            );
        }

        (published.len(), failed)
    }

    /// Publishes demoted documents through the fallback tier.
    ///
    /// Returns the number of delivered documents, or an error aggregating one
    /// [`ErrorKind::FallbackPublishFailed`] per document that neither tier delivered.
    pub async fn publish_fallback(&self, demoted: Vec<(T, RelayError)>) -> RelayResult<usize> {
        if demoted.is_empty() {
            return Ok(0);
        }

        let (documents, causes): (Vec<T>, Vec<RelayError>) = demoted.into_iter().unzip();
        let handed = documents.clone();

        #[cfg(feature = "failpoints")]
        let results = match relay_fail_point(PUBLISHER_BEFORE_FALLBACK) {
            Ok(()) => self.fallback.publish_batch(documents).await,
            Err(err) => documents
                .into_iter()
                .map(|document| ItemResult::failure(document, err.clone()))
                .collect(),
        };
        #[cfg(not(feature = "failpoints"))]
        let results = self.fallback.publish_batch(documents).await;
        let results = align_results(handed, results, || {
            relay_error!(
                ErrorKind::FallbackPublishFailed,
                "Fallback publisher returned no result for the document"
            )
        });

        let mut published = 0;
        let mut errors = Vec::new();
        for (result, cause) in results.into_iter().zip(causes) {
            match result {
                ItemResult::Success(_) => published += 1,
                ItemResult::Failure { document, error } => {
                    errors.push(undeliverable_error(&document, &cause, &error));
                }
            }
        }

        metrics::counter!(DOCRELAY_DOCUMENTS_PUBLISHED_TOTAL, TIER => FALLBACK)
            .increment(published as u64);

        if !errors.is_empty() {
            metrics::counter!(DOCRELAY_DOCUMENTS_FALLBACK_FAILED_TOTAL)
                .increment(errors.len() as u64);
            error!(
                failed = errors.len(),
                published, "fallback tier failed, documents could not be delivered"
            );

            return Err(RelayError::many(errors));
        }

        info!(published, "demoted documents delivered through the fallback tier");

        Ok(published)
    }

    /// Delivers `ready` through the primary tier and demotes its failures, together with
    /// the documents in `failed_upstream`, to the fallback tier.
    ///
    /// Documents in `failed_upstream` never reach the primary tier.
    pub async fn deliver(
        &self,
        ready: Vec<T>,
        failed_upstream: Vec<(T, RelayError)>,
    ) -> RelayResult<DeliveryReport> {
        let (published_primary, mut demoted) = self.publish_primary(ready).await;
        demoted.extend(failed_upstream);
        let published_fallback = self.publish_fallback(demoted).await?;

        Ok(DeliveryReport {
            published_primary,
            published_fallback,
        })
    }
}

/// Builds the fatal error of a document, embedding its body so it can be recovered by hand.
fn undeliverable_error<T: Document>(
    document: &T,
    cause: &RelayError,
    error: &RelayError,
) -> RelayError {
    let body = serde_json::to_string(document)
        .unwrap_or_else(|err| format!("<document could not be serialized: {err}>"));

    relay_error!(
        ErrorKind::FallbackPublishFailed,
        "Document could not be delivered by either tier",
        format!("document: {body}; primary failure: {cause}; fallback failure: {error}")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrelay_config::shared::ConcurrencyConfig;
    use std::sync::Arc;

    use crate::documents::Profile;
    use crate::publisher::{
        BrokerFailure, BrokerPublisher, MemoryBroker, MemoryQueue, QueuePublisher,
    };
    use crate::test_utils::documents::profile;

    /// Publisher delivering only the first `answered` documents of every batch.
    struct ShortPublisher {
        answered: usize,
        delivered: std::sync::Mutex<Vec<Profile>>,
    }

    impl ShortPublisher {
        fn new(answered: usize) -> Self {
            Self {
                answered,
                delivered: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn delivered(&self) -> Vec<Profile> {
            self.delivered.lock().unwrap().clone()
        }
    }

    impl Publisher<Profile> for ShortPublisher {
        async fn publish(&self, document: Profile) -> ItemResult<Profile> {
            self.delivered.lock().unwrap().push(document.clone());
            ItemResult::Success(document)
        }

        async fn publish_batch(&self, documents: Vec<Profile>) -> Vec<ItemResult<Profile>> {
            let mut results = Vec::new();
            for document in documents.into_iter().take(self.answered) {
                results.push(self.publish(document).await);
            }
            results
        }

        fn into_ordered(self) -> Self {
            self
        }
    }

    type TestPublisher = DualTierPublisher<
        Profile,
        BrokerPublisher<Profile, MemoryBroker>,
        QueuePublisher<Profile, MemoryQueue>,
    >;

    fn publisher(broker: &MemoryBroker, queue: &MemoryQueue) -> TestPublisher {
        let concurrency = ConcurrencyConfig::default();
        DualTierPublisher::new(
            BrokerPublisher::new(Arc::new(broker.clone()), "profiles", &concurrency),
            QueuePublisher::new(Arc::new(queue.clone()), &concurrency),
        )
    }

    #[tokio::test]
    async fn primary_success_never_touches_fallback() {
        let broker = MemoryBroker::new();
        let queue = MemoryQueue::new();

        let report = publisher(&broker, &queue)
            .deliver(vec![profile("A", 1), profile("B", 1)], Vec::new())
            .await
            .unwrap();

        assert_eq!(
            report,
            DeliveryReport {
                published_primary: 2,
                published_fallback: 0
            }
        );
        assert_eq!(queue.attempts().await, 0);
    }

    #[tokio::test]
    async fn upstream_failures_skip_the_primary_tier() {
        let broker = MemoryBroker::new();
        let queue = MemoryQueue::new();
        let cause = relay_error!(ErrorKind::EnrichmentFailed, "Enrichment failed");

        let report = publisher(&broker, &queue)
            .deliver(vec![profile("A", 1)], vec![(profile("B", 1), cause)])
            .await
            .unwrap();

        assert_eq!(report.published_primary, 1);
        assert_eq!(report.published_fallback, 1);
        assert_eq!(broker.documents::<Profile>("profiles").await, vec![profile("A", 1)]);
        assert_eq!(queue.documents::<Profile>().await, vec![profile("B", 1)]);
    }

    #[tokio::test]
    async fn fallback_failure_is_fatal_and_embeds_the_document() {
        let broker = MemoryBroker::new();
        broker.set_failure(BrokerFailure::Unavailable).await;
        let queue = MemoryQueue::new();
        queue
            .fail_when(|document| document["fiscal_code"] == "B")
            .await;

        let error = publisher(&broker, &queue)
            .deliver(vec![profile("A", 1), profile("B", 1)], Vec::new())
            .await
            .unwrap_err();

        assert_eq!(error.kinds(), vec![ErrorKind::FallbackPublishFailed]);
        let detail = error.detail().unwrap();
        assert!(detail.contains(r#""fiscal_code":"B""#));
        assert!(detail.contains("Broker is unavailable"));
        assert_eq!(queue.documents::<Profile>().await, vec![profile("A", 1)]);
    }

    #[tokio::test]
    async fn documents_without_a_primary_result_are_demoted() {
        let queue = MemoryQueue::new();
        let publisher = DualTierPublisher::new(
            ShortPublisher::new(1),
            QueuePublisher::<Profile, _>::new(
                Arc::new(queue.clone()),
                &ConcurrencyConfig::default(),
            ),
        );

        let report = publisher
            .deliver(vec![profile("A", 1), profile("B", 1), profile("C", 1)], Vec::new())
            .await
            .unwrap();

        assert_eq!(
            report,
            DeliveryReport {
                published_primary: 1,
                published_fallback: 2
            }
        );
        assert_eq!(
            queue.documents::<Profile>().await,
            vec![profile("B", 1), profile("C", 1)]
        );
    }

    #[tokio::test]
    async fn documents_without_a_fallback_result_are_undeliverable() {
        let broker = MemoryBroker::new();
        broker.set_failure(BrokerFailure::Unavailable).await;
        let fallback = ShortPublisher::new(1);
        let publisher = DualTierPublisher::new(
            BrokerPublisher::<Profile, _>::new(
                Arc::new(broker.clone()),
                "profiles",
                &ConcurrencyConfig::default(),
            ),
            fallback,
        );

        let error = publisher
            .deliver(vec![profile("A", 1), profile("B", 1)], Vec::new())
            .await
            .unwrap_err();

        assert_eq!(error.kinds(), vec![ErrorKind::FallbackPublishFailed]);
        let detail = error.detail().unwrap();
        assert!(detail.contains(r#""fiscal_code":"B""#));
        assert!(detail.contains("Fallback publisher returned no result"));
        assert_eq!(publisher.fallback.delivered(), vec![profile("A", 1)]);
    }
}
