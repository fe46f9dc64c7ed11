use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use docrelay::bulk::{ImportSummary, OrderedBulkImporter, PagedSource, VecPagedSource};
use docrelay::documents::{MessageStatus, MessageStatusValue, Profile};
use docrelay::error::{ErrorKind, RelayResult};
use docrelay::publisher::{
    Ack, BrokerClient, BrokerFailure, BrokerPublisher, DualTierPublisher, FormattedRecord,
    MemoryQueue, QueuePublisher,
};
use docrelay::relay_error;
use docrelay::test_utils::documents::{message_status, raw_profile};
use docrelay::tracker::MemoryTracker;
use docrelay::types::RawDocument;
use docrelay_config::shared::ConcurrencyConfig;
use docrelay_telemetry::init_test_tracing;

mod common;

use common::TestRelay;

/// A relay splitting imports in several broker batches.
fn small_batch_relay() -> TestRelay {
    let mut relay = TestRelay::new();
    relay.concurrency.broker_batch_size = 2;
    relay
}

fn raw_profile_with_email(fiscal_code: &str, version: u64, email: &str) -> RawDocument {
    json!({
        "fiscal_code": fiscal_code,
        "email": email,
        "is_email_enabled": true,
        "version": version
    })
}

#[tokio::test]
async fn documents_are_published_sorted_by_entity_and_version() {
    init_test_tracing();
    let relay = small_batch_relay();
    let importer =
        OrderedBulkImporter::new(relay.publisher::<Profile>(), Arc::new(relay.tracker.clone()));
    let source = VecPagedSource::new(vec![
        vec![raw_profile("BBBB", 2), raw_profile("AAAA", 3)],
        vec![raw_profile("BBBB", 1), raw_profile("CCCC", 0)],
        vec![raw_profile("AAAA", 1)],
    ]);

    let summary = importer.import(source).await.unwrap();

    assert_eq!(
        summary,
        ImportSummary {
            scanned: 5,
            published_primary: 5,
            published_fallback: 0,
        }
    );
    let published: Vec<(String, u64)> = relay
        .published::<Profile>()
        .await
        .into_iter()
        .map(|profile| (profile.fiscal_code, profile.version))
        .collect();
    assert_eq!(
        published,
        vec![
            ("AAAA".to_string(), 1),
            ("AAAA".to_string(), 3),
            ("BBBB".to_string(), 1),
            ("BBBB".to_string(), 2),
            ("CCCC".to_string(), 0),
        ]
    );
}

#[tokio::test]
async fn equal_keys_keep_their_scan_order() {
    init_test_tracing();
    let relay = small_batch_relay();
    let importer =
        OrderedBulkImporter::new(relay.publisher::<Profile>(), Arc::new(relay.tracker.clone()));
    let source = VecPagedSource::paginated(
        vec![
            raw_profile_with_email("AAAA", 1, "first@example.com"),
            raw_profile_with_email("AAAA", 0, "zero@example.com"),
            raw_profile_with_email("AAAA", 1, "second@example.com"),
        ],
        2,
    );

    importer.import(source).await.unwrap();

    let emails: Vec<String> = relay
        .published::<Profile>()
        .await
        .into_iter()
        .filter_map(|profile| profile.email)
        .collect();
    assert_eq!(
        emails,
        vec![
            "zero@example.com".to_string(),
            "first@example.com".to_string(),
            "second@example.com".to_string()
        ]
    );
}

#[tokio::test]
async fn decode_error_aborts_the_whole_import() {
    init_test_tracing();
    let relay = small_batch_relay();
    let importer =
        OrderedBulkImporter::new(relay.publisher::<Profile>(), Arc::new(relay.tracker.clone()));
    let source = VecPagedSource::new(vec![
        vec![raw_profile("AAAA", 1)],
        vec![raw_profile("BBBB", 1), json!({ "fiscal_code": "CCCC" })],
    ]);

    let error = importer.import(source).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::DecodeFailed);
    assert!(error.detail().unwrap().contains("page 1, document 1"));
    assert_eq!(relay.broker.sends().await, 0);
    assert_eq!(relay.queue.attempts().await, 0);
}

#[tokio::test]
async fn primary_failures_fall_back_during_import() {
    init_test_tracing();
    let relay = small_batch_relay();
    relay.broker.set_failure(BrokerFailure::Unavailable).await;
    let importer = OrderedBulkImporter::new(
        relay.publisher::<MessageStatus>(),
        Arc::new(relay.tracker.clone()),
    );
    let statuses = vec![
        message_status("m2", MessageStatusValue::Processed, 1),
        message_status("m1", MessageStatusValue::Accepted, 0),
    ];
    let source = VecPagedSource::new(vec![
        statuses
            .iter()
            .map(|status| serde_json::to_value(status).unwrap())
            .collect(),
    ]);

    let summary = importer.import(source).await.unwrap();

    assert_eq!(summary.published_fallback, 2);
    let fallen_back: Vec<MessageStatus> = relay.fallen_back().await;
    assert_eq!(fallen_back.len(), 2);
}

#[derive(Debug)]
struct BrokenSource {
    served: bool,
}

impl PagedSource for BrokenSource {
    async fn next_page(&mut self) -> RelayResult<Option<Vec<RawDocument>>> {
        if self.served {
            return Err(relay_error!(
                ErrorKind::SourceReadFailed,
                "Source cursor was closed"
            ));
        }

        self.served = true;
        Ok(Some(vec![raw_profile("AAAA", 1)]))
    }
}

#[tokio::test]
async fn source_errors_abort_the_import() {
    init_test_tracing();
    let relay = small_batch_relay();
    let importer =
        OrderedBulkImporter::new(relay.publisher::<Profile>(), Arc::new(relay.tracker.clone()));

    let error = importer
        .import(BrokenSource { served: false })
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::SourceReadFailed);
    assert_eq!(relay.broker.sends().await, 0);
}

/// Broker whose first send is slower than the following ones, recording keys as they land.
#[derive(Debug, Default)]
struct SlowFirstSendBroker {
    sends: AtomicUsize,
    keys: Mutex<Vec<String>>,
}

impl BrokerClient for SlowFirstSendBroker {
    async fn send(&self, _topic: &str, records: Vec<FormattedRecord>) -> RelayResult<Vec<Ack>> {
        let delay = if self.sends.fetch_add(1, Ordering::SeqCst) == 0 {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(1)
        };
        tokio::time::sleep(delay).await;

        let mut keys = self.keys.lock().await;
        keys.extend(records.iter().map(|record| record.key.clone()));

        Ok(records.iter().map(|_| Ack::ok()).collect())
    }
}

#[tokio::test(start_paused = true)]
async fn default_concurrency_keeps_the_broker_order() {
    init_test_tracing();
    let broker = Arc::new(SlowFirstSendBroker::default());
    let concurrency = ConcurrencyConfig::default();
    let publisher = DualTierPublisher::new(
        BrokerPublisher::<Profile, _>::new(broker.clone(), "profiles", &concurrency),
        QueuePublisher::new(Arc::new(MemoryQueue::new()), &concurrency),
    );
    let importer = OrderedBulkImporter::new(publisher, Arc::new(MemoryTracker::new()));
    let raw: Vec<RawDocument> = (0..1000)
        .rev()
        .map(|i| raw_profile(&format!("E{i:04}"), 0))
        .collect();

    let summary = importer
        .import(VecPagedSource::paginated(raw, 100))
        .await
        .unwrap();

    assert_eq!(summary.published_primary, 1000);
    assert!(broker.sends.load(Ordering::SeqCst) > 1);
    let keys = broker.keys.lock().await.clone();
    let expected: Vec<String> = (0..1000).map(|i| format!("E{i:04}")).collect();
    assert_eq!(keys, expected);
}
