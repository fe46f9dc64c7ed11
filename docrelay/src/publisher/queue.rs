use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use docrelay_config::shared::ConcurrencyConfig;

use crate::concurrency::run_bounded;
use crate::error::{ErrorKind, RelayResult};
use crate::publisher::Publisher;
use crate::relay_error;
use crate::types::{Document, ItemResult};

/// Client of the durable fallback queue.
pub trait QueueClient: Send + Sync {
    fn send_message(&self, message: String) -> impl Future<Output = RelayResult<()>> + Send;
}

/// Encodes a document as the base64 text of its JSON representation.
pub fn encode_message<T: Serialize>(document: &T) -> RelayResult<String> {
    let json = serde_json::to_vec(document).map_err(|err| {
        relay_error!(ErrorKind::FormatFailed, "Queue message encoding failed", err)
    })?;

    Ok(STANDARD.encode(json))
}

/// Decodes a message produced by [`encode_message`].
pub fn decode_message<T: DeserializeOwned>(message: &str) -> RelayResult<T> {
    let json = STANDARD.decode(message).map_err(|err| {
        relay_error!(
            ErrorKind::DeserializationError,
            "Queue message is not valid base64",
            err
        )
    })?;

    Ok(serde_json::from_slice(&json)?)
}

/// [`Publisher`] delivering documents to the fallback queue, one message per document.
#[derive(Debug)]
pub struct QueuePublisher<T, Q> {
    client: Arc<Q>,
    chunk_size: usize,
    _document: PhantomData<fn() -> T>,
}

impl<T, Q> QueuePublisher<T, Q> {
    pub fn new(client: Arc<Q>, concurrency: &ConcurrencyConfig) -> Self {
        Self {
            client,
            chunk_size: concurrency.publish_chunk_size.max(1),
            _document: PhantomData,
        }
    }
}

impl<T, Q> Publisher<T> for QueuePublisher<T, Q>
where
    T: Document,
    Q: QueueClient,
{
    async fn publish(&self, document: T) -> ItemResult<T> {
        let message = match encode_message(&document) {
            Ok(message) => message,
            Err(error) => return ItemResult::failure(document, error),
        };

        match self.client.send_message(message).await {
            Ok(()) => ItemResult::Success(document),
            Err(error) => ItemResult::failure(document, error),
        }
    }

    async fn publish_batch(&self, documents: Vec<T>) -> Vec<ItemResult<T>> {
        run_bounded(documents, self.chunk_size, |document| self.publish(document)).await
    }

    fn into_ordered(mut self) -> Self {
        self.chunk_size = 1;
        self
    }
}
