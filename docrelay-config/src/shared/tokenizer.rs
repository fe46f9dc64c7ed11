use serde::{Deserialize, Serialize};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Default timeout of a single tokenizer request.
pub const DEFAULT_TOKENIZER_TIMEOUT_MS: u64 = 5_000;

/// Connection settings of the external tokenization service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TokenizerConfig {
    /// Base url of the service, tokens are requested at `{base_url}/tokens`.
    pub base_url: String,
    /// Api key sent in the `x-api-key` header.
    pub api_key: SerializableSecretString,
    /// Timeout, in milliseconds, applied to every request.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl TokenizerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::EmptyField("base_url"));
        }

        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TOKENIZER_TIMEOUT_MS
}
