use serde::{Deserialize, Serialize};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Default time a produced message may wait for delivery.
pub const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 30_000;

/// Primary transport the pipeline publishes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerConfig {
    /// In-memory broker, used for local runs and tests.
    Memory { topic: String },
    /// Kafka compatible broker.
    Kafka {
        /// Comma separated list of `host:port` pairs.
        bootstrap_servers: String,
        /// Topic receiving the encoded documents.
        topic: String,
        /// Client id reported to the brokers.
        client_id: String,
        /// Delivery timeout of a single message.
        #[serde(default = "default_message_timeout_ms")]
        message_timeout_ms: u64,
        /// SASL/PLAIN username, enables `SASL_SSL` when set together with the password.
        #[serde(skip_serializing_if = "Option::is_none")]
        sasl_username: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sasl_password: Option<SerializableSecretString>,
    },
}

impl BrokerConfig {
    /// Returns the topic documents are published to.
    pub fn topic(&self) -> &str {
        match self {
            BrokerConfig::Memory { topic } | BrokerConfig::Kafka { topic, .. } => topic,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic().is_empty() {
            return Err(ValidationError::EmptyField("topic"));
        }

        if let BrokerConfig::Kafka {
            bootstrap_servers, ..
        } = self
            && bootstrap_servers.is_empty()
        {
            return Err(ValidationError::EmptyField("bootstrap_servers"));
        }

        Ok(())
    }
}

fn default_message_timeout_ms() -> u64 {
    DEFAULT_MESSAGE_TIMEOUT_MS
}
