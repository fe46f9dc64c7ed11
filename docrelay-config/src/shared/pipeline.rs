use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Default number of documents enriched concurrently.
pub const DEFAULT_ENRICH_CHUNK_SIZE: usize = 100;

/// Default number of identifiers resolved concurrently against the tokenizer.
pub const DEFAULT_TOKENIZE_CHUNK_SIZE: usize = 50;

/// Default number of documents published concurrently to the fallback queue.
pub const DEFAULT_PUBLISH_CHUNK_SIZE: usize = 100;

/// Default maximum number of records sent to the broker in a single request.
pub const DEFAULT_BROKER_BATCH_SIZE: usize = 500;

/// Configuration of the document pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Name of the pipeline, used in logs and metrics.
    pub name: String,
    /// Bounds applied to every fan-out stage.
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
}

impl PipelineConfig {
    /// Validates the pipeline configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }

        self.concurrency.validate()
    }
}

/// Chunk sizes of the bounded-concurrency executor for each fan-out stage.
///
/// Each value is the maximum number of in-flight operations of that stage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ConcurrencyConfig {
    #[serde(default = "default_enrich_chunk_size")]
    pub enrich_chunk_size: usize,
    #[serde(default = "default_tokenize_chunk_size")]
    pub tokenize_chunk_size: usize,
    #[serde(default = "default_publish_chunk_size")]
    pub publish_chunk_size: usize,
    #[serde(default = "default_broker_batch_size")]
    pub broker_batch_size: usize,
}

impl ConcurrencyConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enrich_chunk_size == 0 {
            return Err(ValidationError::ChunkSizeZero("enrich_chunk_size"));
        }
        if self.tokenize_chunk_size == 0 {
            return Err(ValidationError::ChunkSizeZero("tokenize_chunk_size"));
        }
        if self.publish_chunk_size == 0 {
            return Err(ValidationError::ChunkSizeZero("publish_chunk_size"));
        }
        if self.broker_batch_size == 0 {
            return Err(ValidationError::ChunkSizeZero("broker_batch_size"));
        }

        Ok(())
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            enrich_chunk_size: DEFAULT_ENRICH_CHUNK_SIZE,
            tokenize_chunk_size: DEFAULT_TOKENIZE_CHUNK_SIZE,
            publish_chunk_size: DEFAULT_PUBLISH_CHUNK_SIZE,
            broker_batch_size: DEFAULT_BROKER_BATCH_SIZE,
        }
    }
}

fn default_enrich_chunk_size() -> usize {
    DEFAULT_ENRICH_CHUNK_SIZE
}

fn default_tokenize_chunk_size() -> usize {
    DEFAULT_TOKENIZE_CHUNK_SIZE
}

fn default_publish_chunk_size() -> usize {
    DEFAULT_PUBLISH_CHUNK_SIZE
}

fn default_broker_batch_size() -> usize {
    DEFAULT_BROKER_BATCH_SIZE
}
