//! Delivery of documents to the primary broker and to the durable fallback queue.

mod broker;
mod dual_tier;
mod formatter;
#[cfg(feature = "kafka")]
mod kafka;
mod memory;
mod postgres;
mod queue;

pub use broker::{Ack, BrokerClient, BrokerPublisher};
pub use dual_tier::{DeliveryReport, DualTierPublisher};
pub use formatter::{FormattedRecord, Formatter, JsonFormatter};
#[cfg(feature = "kafka")]
pub use kafka::KafkaBrokerClient;
pub use memory::{BrokerFailure, MemoryBroker, MemoryQueue};
pub use postgres::PgQueueClient;
pub use queue::{QueueClient, QueuePublisher, decode_message, encode_message};

use std::future::Future;

use crate::types::ItemResult;

/// Delivers documents to a single transport.
///
/// Publishers never fail a batch, each document comes back as an [`ItemResult`] in input
/// order and the caller decides how failures are recovered.
pub trait Publisher<T>: Send + Sync {
    fn publish(&self, document: T) -> impl Future<Output = ItemResult<T>> + Send;

    fn publish_batch(
        &self,
        documents: Vec<T>,
    ) -> impl Future<Output = Vec<ItemResult<T>>> + Send;

    /// Returns a publisher handing the documents of a batch to its transport in input
    /// order, one request at a time.
    fn into_ordered(self) -> Self
    where
        Self: Sized;
}
