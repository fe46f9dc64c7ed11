use fail::FailScenario;

use docrelay::documents::Profile;
use docrelay::error::ErrorKind;
use docrelay::failpoints::{PUBLISHER_BEFORE_FALLBACK, PUBLISHER_BEFORE_PRIMARY};
use docrelay::publisher::BrokerFailure;
use docrelay::test_utils::documents::raw_profiles;
use docrelay_telemetry::init_test_tracing;

#[path = "../common/mod.rs"]
mod common;

use common::TestRelay;

#[tokio::test(flavor = "multi_thread")]
async fn failing_primary_tier_delivers_through_fallback() {
    let _scenario = FailScenario::setup();
    fail::cfg(PUBLISHER_BEFORE_PRIMARY, "return").unwrap();

    init_test_tracing();
    let relay = TestRelay::new();
    let pipeline = relay.pipeline::<Profile>();

    let summary = pipeline.process(raw_profiles(6)).await.unwrap();

    assert_eq!(summary.published_primary, 0);
    assert_eq!(summary.published_fallback, 6);
    assert_eq!(relay.broker.sends().await, 0);
    assert_eq!(relay.fallen_back::<Profile>().await.len(), 6);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_fallback_tier_rejects_the_batch() {
    let _scenario = FailScenario::setup();
    fail::cfg(PUBLISHER_BEFORE_FALLBACK, "return(queue down)").unwrap();

    init_test_tracing();
    let relay = TestRelay::new();
    relay.broker.set_failure(BrokerFailure::Unavailable).await;
    let pipeline = relay.pipeline::<Profile>();

    let error = pipeline.process(raw_profiles(3)).await.unwrap_err();

    assert_eq!(error.len(), 3);
    assert!(
        error
            .kinds()
            .iter()
            .all(|kind| *kind == ErrorKind::FallbackPublishFailed)
    );
    assert!(error.detail().unwrap().contains("queue down"));
    assert_eq!(relay.queue.attempts().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_fallback_tier_is_harmless_when_nothing_is_demoted() {
    let _scenario = FailScenario::setup();
    fail::cfg(PUBLISHER_BEFORE_FALLBACK, "return").unwrap();

    init_test_tracing();
    let relay = TestRelay::new();
    let pipeline = relay.pipeline::<Profile>();

    let summary = pipeline.process(raw_profiles(3)).await.unwrap();

    assert_eq!(summary.published_primary, 3);
}
