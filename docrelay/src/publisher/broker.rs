use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

use docrelay_config::shared::ConcurrencyConfig;

use crate::concurrency::run_bounded;
use crate::error::{ErrorKind, RelayError, RelayResult};
use crate::publisher::{FormattedRecord, Formatter, JsonFormatter, Publisher};
use crate::relay_error;
use crate::types::{Document, ItemResult};

/// Acknowledgement of a single record, an `error_code` of zero means the record was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub error_code: i32,
}

impl Ack {
    pub fn ok() -> Self {
        Self { error_code: 0 }
    }

    pub fn is_ok(&self) -> bool {
        self.error_code == 0
    }
}

/// Client of the primary message broker.
pub trait BrokerClient: Send + Sync {
    /// Sends `records` to `topic`, returning one [`Ack`] per record in input order.
    fn send(
        &self,
        topic: &str,
        records: Vec<FormattedRecord>,
    ) -> impl Future<Output = RelayResult<Vec<Ack>>> + Send;
}

/// [`Publisher`] delivering documents to a broker topic.
///
/// Documents are sent in batches of `broker_batch_size` records, with at most
/// `publish_chunk_size` batches in flight. A batch answered without acknowledgements is
/// failed as a whole rather than treated as delivered.
#[derive(Debug)]
pub struct BrokerPublisher<T, B, F = JsonFormatter<T>> {
    client: Arc<B>,
    formatter: F,
    topic: String,
    batch_size: usize,
    chunk_size: usize,
    _document: PhantomData<fn() -> T>,
}

impl<T, B> BrokerPublisher<T, B>
where
    T: Document,
{
    pub fn new(client: Arc<B>, topic: impl Into<String>, concurrency: &ConcurrencyConfig) -> Self {
        Self::with_formatter(client, JsonFormatter::new(), topic, concurrency)
    }
}

impl<T, B, F> BrokerPublisher<T, B, F> {
    pub fn with_formatter(
        client: Arc<B>,
        formatter: F,
        topic: impl Into<String>,
        concurrency: &ConcurrencyConfig,
    ) -> Self {
        Self {
            client,
            formatter,
            topic: topic.into(),
            batch_size: concurrency.broker_batch_size.max(1),
            chunk_size: concurrency.publish_chunk_size.max(1),
            _document: PhantomData,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl<T, B, F> BrokerPublisher<T, B, F>
where
    T: Document,
    B: BrokerClient,
    F: Formatter<T>,
{
    async fn send_batch(
        &self,
        batch: Vec<(usize, T, FormattedRecord)>,
    ) -> Vec<(usize, ItemResult<T>)> {
        let (entries, records): (Vec<(usize, T)>, Vec<FormattedRecord>) = batch
            .into_iter()
            .map(|(index, document, record)| ((index, document), record))
            .unzip();
        let expected = records.len();

        let error = match self.client.send(&self.topic, records).await {
            Ok(acks) if acks.len() == expected => {
                return entries
                    .into_iter()
                    .zip(acks)
                    .map(|((index, document), ack)| (index, ack_result(document, ack)))
                    .collect();
            }
            Ok(acks) if acks.is_empty() => zero_ack_error(expected),
            Ok(acks) => ack_count_error(expected, acks.len()),
            Err(error) => error,
        };

        warn!(
            topic = %self.topic,
            records = expected,
            %error,
            "broker batch failed"
        );

        entries
            .into_iter()
            .map(|(index, document)| (index, ItemResult::failure(document, error.clone())))
            .collect()
    }
}

impl<T, B, F> Publisher<T> for BrokerPublisher<T, B, F>
where
    T: Document,
    B: BrokerClient,
    F: Formatter<T>,
{
    async fn publish(&self, document: T) -> ItemResult<T> {
        let record = match self.formatter.format(&document) {
            Ok(record) => record,
            Err(error) => return ItemResult::failure(document, error),
        };

        match self.client.send(&self.topic, vec![record]).await {
            Ok(acks) => match acks.as_slice() {
                [] => ItemResult::failure(document, zero_ack_error(1)),
                [ack] => ack_result(document, *ack),
                _ => ItemResult::failure(document, ack_count_error(1, acks.len())),
            },
            Err(error) => ItemResult::failure(document, error),
        }
    }

    async fn publish_batch(&self, documents: Vec<T>) -> Vec<ItemResult<T>> {
        let mut results: Vec<Option<ItemResult<T>>> = (0..documents.len()).map(|_| None).collect();

        let mut formatted = Vec::with_capacity(documents.len());
        for (index, document) in documents.into_iter().enumerate() {
            match self.formatter.format(&document) {
                Ok(record) => formatted.push((index, document, record)),
                Err(error) => results[index] = Some(ItemResult::failure(document, error)),
            }
        }

        let mut batches = Vec::new();
        let mut formatted = formatted.into_iter().peekable();
        while formatted.peek().is_some() {
            batches.push(formatted.by_ref().take(self.batch_size).collect::<Vec<_>>());
        }

        let sent = run_bounded(batches, self.chunk_size, |batch| self.send_batch(batch)).await;
        for (index, result) in sent.into_iter().flatten() {
            results[index] = Some(result);
        }

        results.into_iter().flatten().collect()
    }

    fn into_ordered(mut self) -> Self {
        self.chunk_size = 1;
        self
    }
}

fn ack_result<T>(document: T, ack: Ack) -> ItemResult<T> {
    if ack.is_ok() {
        ItemResult::Success(document)
    } else {
        ItemResult::failure(
            document,
            relay_error!(
                ErrorKind::PrimaryRecordRejected,
                "Broker rejected the record",
                format!("error code {}", ack.error_code)
            ),
        )
    }
}

fn zero_ack_error(records: usize) -> RelayError {
    relay_error!(
        ErrorKind::PrimaryPublishZeroAck,
        "Broker returned no acknowledgement",
        format!("{records} records were sent")
    )
}

fn ack_count_error(records: usize, acks: usize) -> RelayError {
    relay_error!(
        ErrorKind::PrimaryPublishFailed,
        "Broker acknowledgements do not match the records sent",
        format!("{records} records were sent, {acks} acknowledgements were received")
    )
}
