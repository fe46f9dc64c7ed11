use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, RelayResult};
use crate::publisher::{Ack, BrokerClient, FormattedRecord, QueueClient, decode_message};

/// Error code acknowledging a record the broker refused to store.
const REJECTED_ERROR_CODE: i32 = 10;

/// Failure mode of a [`MemoryBroker`].
#[derive(Debug, Clone, Default)]
pub enum BrokerFailure {
    #[default]
    None,
    /// Every send fails.
    Unavailable,
    /// Every send returns no acknowledgement.
    ZeroAck,
    /// Records with these keys are acknowledged with an error code.
    RejectKeys(HashSet<String>),
}

#[derive(Debug, Default)]
struct BrokerInner {
    records: Vec<(String, FormattedRecord)>,
    failure: BrokerFailure,
    sends: usize,
}

/// In-memory [`BrokerClient`], clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Mutex<BrokerInner>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failure(&self, failure: BrokerFailure) {
        self.inner.lock().await.failure = failure;
    }

    /// Number of send calls received, including failed ones.
    pub async fn sends(&self) -> usize {
        self.inner.lock().await.sends
    }

    /// Records stored in `topic`, in arrival order.
    pub async fn records(&self, topic: &str) -> Vec<FormattedRecord> {
        let inner = self.inner.lock().await;
        inner
            .records
            .iter()
            .filter(|(record_topic, _)| record_topic == topic)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Records stored in `topic` decoded as JSON documents.
    pub async fn documents<T: DeserializeOwned>(&self, topic: &str) -> Vec<T> {
        self.records(topic)
            .await
            .iter()
            .filter_map(|record| serde_json::from_slice(&record.value).ok())
            .collect()
    }
}

impl BrokerClient for MemoryBroker {
    async fn send(&self, topic: &str, records: Vec<FormattedRecord>) -> RelayResult<Vec<Ack>> {
        let mut inner = self.inner.lock().await;
        inner.sends += 1;
        debug!(topic, records = records.len(), "sending records to memory broker");

        let rejected = match &inner.failure {
            BrokerFailure::None => HashSet::new(),
            BrokerFailure::Unavailable => {
                bail!(
                    ErrorKind::PrimaryPublishFailed,
                    "Broker is unavailable",
                    format!("send of {} records to '{topic}' failed", records.len())
                );
            }
            BrokerFailure::ZeroAck => return Ok(Vec::new()),
            BrokerFailure::RejectKeys(keys) => keys.clone(),
        };

        let mut acks = Vec::with_capacity(records.len());
        for record in records {
            if rejected.contains(&record.key) {
                acks.push(Ack {
                    error_code: REJECTED_ERROR_CODE,
                });
            } else {
                inner.records.push((topic.to_string(), record));
                acks.push(Ack::ok());
            }
        }

        Ok(acks)
    }
}

type MessagePredicate = Arc<dyn Fn(&serde_json::Value) -> bool + Send + Sync>;

#[derive(Default)]
struct QueueInner {
    messages: Vec<String>,
    unavailable: bool,
    fail_when: Option<MessagePredicate>,
    attempts: usize,
}

impl fmt::Debug for QueueInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueInner")
            .field("messages", &self.messages)
            .field("unavailable", &self.unavailable)
            .field("fail_when", &self.fail_when.is_some())
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// In-memory [`QueueClient`], clones share the same messages.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    inner: Arc<Mutex<QueueInner>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send fail while `unavailable` is set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// Fails the messages whose decoded document matches `predicate`.
    pub async fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&serde_json::Value) -> bool + Send + Sync + 'static,
    {
        self.inner.lock().await.fail_when = Some(Arc::new(predicate));
    }

    pub async fn messages(&self) -> Vec<String> {
        self.inner.lock().await.messages.clone()
    }

    pub async fn documents<T: DeserializeOwned>(&self) -> Vec<T> {
        self.messages()
            .await
            .iter()
            .filter_map(|message| decode_message(message).ok())
            .collect()
    }

    /// Number of send attempts, including failed ones.
    pub async fn attempts(&self) -> usize {
        self.inner.lock().await.attempts
    }
}

impl QueueClient for MemoryQueue {
    async fn send_message(&self, message: String) -> RelayResult<()> {
        let mut inner = self.inner.lock().await;
        inner.attempts += 1;

        if inner.unavailable {
            bail!(ErrorKind::FallbackPublishFailed, "Fallback queue is unavailable");
        }

        if let Some(predicate) = &inner.fail_when {
            let document: serde_json::Value = decode_message(&message)?;
            if predicate(&document) {
                bail!(
                    ErrorKind::FallbackPublishFailed,
                    "Fallback queue refused the message"
                );
            }
        }

        inner.messages.push(message);

        Ok(())
    }
}
