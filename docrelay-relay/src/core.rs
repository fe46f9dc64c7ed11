use std::future::Future;
use std::sync::Arc;

use docrelay::cache::{CacheClient, MemoryCache};
use docrelay::documents::Profile;
use docrelay::enricher::TokenizeEnricher;
use docrelay::pipeline::{DocumentPipeline, ProcessSummary};
use docrelay::publisher::{
    BrokerClient, BrokerPublisher, DualTierPublisher, MemoryBroker, MemoryQueue, PgQueueClient,
    Publisher, QueuePublisher,
};
use docrelay::tokenizer::{CacheAsideTokenizer, HttpTokenizerClient, TokenizerApi};
use docrelay::tracker::{Tracker, TracingTracker};
use docrelay::types::RawDocument;
use docrelay_config::shared::{
    BrokerConfig, CacheConfig, FallbackConfig, PipelineConfig, RelayConfig,
};
use docrelay_telemetry::init_metrics;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info};

/// Number of input lines handed to the pipeline in a single invocation.
const INPUT_BATCH_SIZE: usize = 1_000;

type RelayTokenizer = CacheAsideTokenizer<MemoryCache, HttpTokenizerClient>;

/// Starts the relay with the provided configuration.
///
/// Profiles are read from stdin as newline delimited json and relayed in batches until
/// the input ends or a shutdown signal is received. Lines which are not valid json are
/// handed to the pipeline as json strings, so that they are tracked as decode failures.
pub async fn start_relay_with_config(relay_config: RelayConfig) -> anyhow::Result<()> {
    info!("starting relay service");

    log_config(&relay_config);

    if let Some(listen_address) = relay_config.metrics_listen_address {
        init_metrics(listen_address, Some(env!("CARGO_BIN_NAME").to_string()))?;
    }

    let tracker: Arc<dyn Tracker> = Arc::new(TracingTracker::new(&relay_config.tracker));
    let tokenizer = Arc::new(CacheAsideTokenizer::new(
        Arc::new(MemoryCache::new()),
        Arc::new(HttpTokenizerClient::new(&relay_config.tokenizer)?),
        &relay_config.cache,
        relay_config.pipeline.concurrency.tokenize_chunk_size,
        tracker.clone(),
    ));

    let relay = relay_with_config(&relay_config, tokenizer.clone(), tracker);
    let summary = drain_cache_writes_after(&tokenizer, relay).await?;

    info!(
        received = summary.received,
        decode_failed = summary.decode_failed,
        filtered_out = summary.filtered_out,
        enrichment_failed = summary.enrichment_failed,
        published_primary = summary.published_primary,
        published_fallback = summary.published_fallback,
        "relay service completed"
    );

    Ok(())
}

async fn relay_with_config(
    relay_config: &RelayConfig,
    tokenizer: Arc<RelayTokenizer>,
    tracker: Arc<dyn Tracker>,
) -> anyhow::Result<ProcessSummary> {
    let topic = relay_config.broker.topic();
    match &relay_config.broker {
        BrokerConfig::Memory { .. } => {
            let broker = Arc::new(MemoryBroker::new());
            start_with_broker(relay_config, topic, broker, tokenizer, tracker).await
        }
        #[cfg(feature = "kafka")]
        BrokerConfig::Kafka { .. } => {
            let broker = Arc::new(docrelay::publisher::KafkaBrokerClient::new(
                &relay_config.broker,
            )?);
            start_with_broker(relay_config, topic, broker, tokenizer, tracker).await
        }
        #[cfg(not(feature = "kafka"))]
        BrokerConfig::Kafka { .. } => {
            anyhow::bail!("the kafka broker requires building the relay with the `kafka` feature");
        }
    }
}

/// Awaits `relay` and then the token cache writes it left in flight, also when it failed.
async fn drain_cache_writes_after<C, A, T>(
    tokenizer: &CacheAsideTokenizer<C, A>,
    relay: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T>
where
    C: CacheClient + 'static,
    A: TokenizerApi,
{
    let result = relay.await;
    tokenizer.wait_for_pending_writes().await;
    debug!(failed = result.is_err(), "pending token cache writes completed");

    result
}

async fn start_with_broker<B>(
    relay_config: &RelayConfig,
    topic: &str,
    broker: Arc<B>,
    tokenizer: Arc<RelayTokenizer>,
    tracker: Arc<dyn Tracker>,
) -> anyhow::Result<ProcessSummary>
where
    B: BrokerClient + 'static,
{
    let concurrency = &relay_config.pipeline.concurrency;
    let primary = BrokerPublisher::<Profile, _>::new(broker, topic, concurrency);

    match &relay_config.fallback {
        FallbackConfig::Memory => {
            let queue = Arc::new(MemoryQueue::new());
            let fallback = QueuePublisher::<Profile, _>::new(queue, concurrency);
            let pipeline =
                build_pipeline(&relay_config.pipeline, primary, fallback, tokenizer, tracker);

            relay_stdin(&pipeline).await
        }
        FallbackConfig::Postgres {
            connection,
            table_name,
        } => {
            let queue = PgQueueClient::connect(connection, table_name).await?;
            queue.ensure_table().await?;
            let fallback = QueuePublisher::<Profile, _>::new(Arc::new(queue), concurrency);
            let pipeline =
                build_pipeline(&relay_config.pipeline, primary, fallback, tokenizer, tracker);

            relay_stdin(&pipeline).await
        }
    }
}

fn build_pipeline<P, F>(
    pipeline_config: &PipelineConfig,
    primary: P,
    fallback: F,
    tokenizer: Arc<RelayTokenizer>,
    tracker: Arc<dyn Tracker>,
) -> DocumentPipeline<Profile, P, F>
where
    P: Publisher<Profile>,
    F: Publisher<Profile>,
{
    DocumentPipeline::new(
        pipeline_config.clone(),
        DualTierPublisher::new(primary, fallback),
        tracker,
    )
    .with_enricher(Arc::new(TokenizeEnricher::<Profile, _, _>::new(tokenizer)))
}

/// Relays stdin until it ends or SIGINT/SIGTERM is received.
///
/// Documents buffered when a signal arrives are still relayed. A batch which was not
/// delivered by either tier stops the relay with its aggregated error.
#[tracing::instrument(skip(pipeline), fields(pipeline = pipeline.name()))]
async fn relay_stdin<P, F>(
    pipeline: &DocumentPipeline<Profile, P, F>,
) -> anyhow::Result<ProcessSummary>
where
    P: Publisher<Profile>,
    F: Publisher<Profile>,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sigterm = signal(SignalKind::terminate())?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut totals = ProcessSummary::default();
    let mut batch = Vec::with_capacity(INPUT_BATCH_SIZE);

    loop {
        tokio::select! {
            biased;

            _ = &mut ctrl_c => {
                info!("SIGINT (Ctrl+C) received, shutting down relay");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down relay");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("input ended");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                batch.push(parse_line(line));
                if batch.len() >= INPUT_BATCH_SIZE {
                    let summary = pipeline.process(std::mem::take(&mut batch)).await?;
                    accumulate(&mut totals, &summary);
                }
            }
        }
    }

    if !batch.is_empty() {
        let summary = pipeline.process(batch).await?;
        accumulate(&mut totals, &summary);
    }

    Ok(totals)
}

fn parse_line(line: String) -> RawDocument {
    match serde_json::from_str(&line) {
        Ok(raw_document) => raw_document,
        Err(_) => RawDocument::String(line),
    }
}

fn accumulate(totals: &mut ProcessSummary, summary: &ProcessSummary) {
    totals.received += summary.received;
    totals.decode_failed += summary.decode_failed;
    totals.filtered_out += summary.filtered_out;
    totals.enrichment_failed += summary.enrichment_failed;
    totals.published_primary += summary.published_primary;
    totals.published_fallback += summary.published_fallback;
}

fn log_config(config: &RelayConfig) {
    log_pipeline_config(&config.pipeline);
    log_cache_config(&config.cache);
    log_broker_config(&config.broker);
    log_fallback_config(&config.fallback);
}

fn log_pipeline_config(config: &PipelineConfig) {
    debug!(
        name = config.name,
        enrich_chunk_size = config.concurrency.enrich_chunk_size,
        tokenize_chunk_size = config.concurrency.tokenize_chunk_size,
        publish_chunk_size = config.concurrency.publish_chunk_size,
        broker_batch_size = config.concurrency.broker_batch_size,
        "pipeline config"
    );
}

fn log_cache_config(config: &CacheConfig) {
    debug!(
        key_prefix = config.key_prefix,
        ttl_secs = config.ttl_secs,
        error_sample_rate = config.error_sample_rate,
        "token cache config"
    );
}

fn log_broker_config(config: &BrokerConfig) {
    match config {
        BrokerConfig::Memory { topic } => {
            debug!(topic, "using memory broker config");
        }
        BrokerConfig::Kafka {
            bootstrap_servers,
            topic,
            client_id,
            message_timeout_ms,
            sasl_username,
            sasl_password: _,
        } => {
            debug!(
                bootstrap_servers,
                topic,
                client_id,
                message_timeout_ms,
                sasl_enabled = sasl_username.is_some(),
                "using kafka broker config"
            );
        }
    }
}

fn log_fallback_config(config: &FallbackConfig) {
    match config {
        FallbackConfig::Memory => {
            debug!("using memory fallback queue config");
        }
        FallbackConfig::Postgres {
            connection,
            table_name,
        } => {
            debug!(
                host = connection.host,
                port = connection.port,
                dbname = connection.name,
                username = connection.username,
                tls_enabled = connection.tls.enabled,
                table_name,
                "using postgres fallback queue config"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrelay::test_utils::tokenizer::MockTokenizerApi;
    use docrelay::tracker::MemoryTracker;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn cache_writes_are_drained_when_the_relay_fails() {
        let cache = MemoryCache::new();
        cache.set_write_delay(Duration::from_secs(1)).await;
        let tokenizer = CacheAsideTokenizer::new(
            Arc::new(cache.clone()),
            Arc::new(MockTokenizerApi::new()),
            &CacheConfig::default(),
            2,
            Arc::new(MemoryTracker::new()),
        );
        let key = tokenizer.cache_key("AAAAAA00A00A000A");

        let relay = async {
            let token = tokenizer.resolve("AAAAAA00A00A000A").await;
            assert!(token.is_ok());
            Err::<(), _>(anyhow::anyhow!("fallback tier failed"))
        };
        let result = drain_cache_writes_after(&tokenizer, relay).await;

        assert!(result.is_err());
        assert_eq!(
            cache.peek(&key).await,
            Some("token-AAAAAA00A00A000A".to_string())
        );
    }

    #[test]
    fn invalid_json_lines_are_kept_as_strings() {
        assert_eq!(
            parse_line(r#"{"fiscal_code": "AAAAAA00A00A000A"}"#.to_string()),
            serde_json::json!({ "fiscal_code": "AAAAAA00A00A000A" })
        );
        assert_eq!(
            parse_line("{not json".to_string()),
            RawDocument::String("{not json".to_string())
        );
    }

    #[test]
    fn summaries_are_summed_field_by_field() {
        let mut totals = ProcessSummary::default();
        let summary = ProcessSummary {
            received: 5,
            decode_failed: 1,
            filtered_out: 1,
            enrichment_failed: 1,
            published_primary: 2,
            published_fallback: 1,
        };

        accumulate(&mut totals, &summary);
        accumulate(&mut totals, &summary);

        assert_eq!(totals.received, 10);
        assert_eq!(totals.published(), 6);
        assert_eq!(totals.decode_failed + totals.filtered_out, 4);
    }
}
