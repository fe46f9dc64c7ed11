use futures::future::join_all;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::info;

use docrelay_config::shared::BrokerConfig;

use crate::bail;
use crate::error::{ErrorKind, RelayResult};
use crate::publisher::{Ack, BrokerClient, FormattedRecord};

/// Error code used when librdkafka does not report one.
const UNKNOWN_ERROR_CODE: i32 = -1;

/// [`BrokerClient`] producing records to Kafka.
///
/// Records of a batch are enqueued together and acknowledged once delivered or failed.
pub struct KafkaBrokerClient {
    producer: FutureProducer,
    queue_timeout: Duration,
}

impl KafkaBrokerClient {
    pub fn new(config: &BrokerConfig) -> RelayResult<Self> {
        let BrokerConfig::Kafka {
            bootstrap_servers,
            client_id,
            message_timeout_ms,
            sasl_username,
            sasl_password,
            ..
        } = config
        else {
            bail!(
                ErrorKind::ConfigError,
                "Kafka client requires a Kafka broker configuration"
            );
        };

        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", bootstrap_servers)
            .set("client.id", client_id)
            .set("message.timeout.ms", message_timeout_ms.to_string());

        if let (Some(username), Some(password)) = (sasl_username, sasl_password) {
            client_config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", username)
                .set("sasl.password", password.expose_secret());
        }

        let producer: FutureProducer = client_config.create()?;
        info!(%bootstrap_servers, %client_id, "kafka producer created");

        Ok(Self {
            producer,
            queue_timeout: Duration::from_millis(*message_timeout_ms),
        })
    }
}

impl BrokerClient for KafkaBrokerClient {
    async fn send(&self, topic: &str, records: Vec<FormattedRecord>) -> RelayResult<Vec<Ack>> {
        let deliveries = records.iter().map(|record| {
            let future_record = FutureRecord::to(topic)
                .key(record.key.as_str())
                .payload(record.value.as_slice());
            self.producer.send(future_record, self.queue_timeout)
        });

        let acks = join_all(deliveries)
            .await
            .into_iter()
            .map(|delivery| match delivery {
                Ok(_) => Ack::ok(),
                Err((error, _)) => Ack {
                    error_code: error
                        .rdkafka_error_code()
                        .map(|code| code as i32)
                        .unwrap_or(UNKNOWN_ERROR_CODE),
                },
            })
            .collect();

        Ok(acks)
    }
}
