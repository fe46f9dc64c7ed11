use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::shared::{
    BrokerConfig, CacheConfig, FallbackConfig, PipelineConfig, TokenizerConfig, TrackerConfig,
    ValidationError,
};

/// Complete configuration of a relay deployment.
///
/// Typically loaded once at startup with [`crate::load_config`] and then handed to the
/// constructors of the pipeline and its adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RelayConfig {
    pub pipeline: PipelineConfig,
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub broker: BrokerConfig,
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Address of the prometheus `/metrics` listener, metrics are not exported when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_listen_address: Option<SocketAddr>,
}

impl RelayConfig {
    /// Validates every section of the configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pipeline.validate()?;
        self.tokenizer.validate()?;
        self.cache.validate()?;
        self.broker.validate()?;
        self.fallback.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay_config_json(topic: &str) -> String {
        format!(
            r#"{{
                "pipeline": {{ "name": "profiles" }},
                "tokenizer": {{ "base_url": "http://tokenizer.local", "api_key": "secret" }},
                "broker": {{ "kafka": {{
                    "bootstrap_servers": "localhost:9092",
                    "topic": "{topic}",
                    "client_id": "docrelay"
                }} }},
                "fallback": "memory"
            }}"#
        )
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: RelayConfig = serde_json::from_str(&relay_config_json("profiles")).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.cache.ttl_secs, 30 * 24 * 60 * 60);
        assert_eq!(config.tracker.max_events_per_second, 100);
        assert_eq!(config.broker.topic(), "profiles");
        assert!(config.metrics_listen_address.is_none());
        assert!(matches!(
            config.broker,
            BrokerConfig::Kafka {
                message_timeout_ms: 30_000,
                ..
            }
        ));
    }

    #[test]
    fn empty_topic_fails_validation() {
        let config: RelayConfig = serde_json::from_str(&relay_config_json("")).unwrap();

        assert_eq!(config.validate(), Err(ValidationError::EmptyField("topic")));
    }
}
