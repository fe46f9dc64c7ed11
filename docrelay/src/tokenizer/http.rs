use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docrelay_config::SerializableSecretString;
use docrelay_config::shared::TokenizerConfig;

use crate::bail;
use crate::error::{ErrorKind, RelayResult};
use crate::tokenizer::TokenizerApi;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Serialize)]
struct TokenizeRequest<'a> {
    pii: &'a str,
}

#[derive(Deserialize)]
struct TokenizeResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Error body returned by the service for non successful responses.
#[derive(Deserialize, Default)]
struct Problem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// [`TokenizerApi`] backed by the tokenization HTTP service.
///
/// Tokens are requested with `PUT {base_url}/tokens`. The request timeout is set on the
/// underlying client, so a slow service surfaces as an ordinary request failure.
#[derive(Debug, Clone)]
pub struct HttpTokenizerClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: SerializableSecretString,
}

impl HttpTokenizerClient {
    pub fn new(config: &TokenizerConfig) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/tokens", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }
}

impl TokenizerApi for HttpTokenizerClient {
    async fn tokenize(&self, pii: &str) -> RelayResult<String> {
        let response = self
            .client
            .put(&self.endpoint)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&TokenizeRequest { pii })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            // The problem body is best effort, the status alone is enough to fail.
            let problem = response.json::<Problem>().await.unwrap_or_default();
            debug!(%status, "tokenizer rejected the request");

            bail!(
                ErrorKind::TokenizerResponseRejected,
                "Tokenizer rejected the request",
                format!(
                    "status {}: {}: {}",
                    status.as_u16(),
                    problem.title.as_deref().unwrap_or("unknown"),
                    problem.detail.as_deref().unwrap_or("no detail provided")
                )
            );
        }

        let body = response.json::<TokenizeResponse>().await?;
        match body.token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => bail!(
                ErrorKind::TokenizerResponseMalformed,
                "Tokenizer returned an empty token"
            ),
        }
    }
}
