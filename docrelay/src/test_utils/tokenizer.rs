use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bail;
use crate::error::{ErrorKind, RelayResult};
use crate::tokenizer::TokenizerApi;

/// Deterministic [`TokenizerApi`] recording every request it receives.
///
/// Clones share the recorded requests.
#[derive(Debug, Clone, Default)]
pub struct MockTokenizerApi {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
    failing: Arc<HashSet<String>>,
    delay: Option<Duration>,
}

impl MockTokenizerApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes requests for the given identifiers fail as transport errors.
    pub fn failing_for<I, S>(mut self, piis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing = Arc::new(piis.into_iter().map(Into::into).collect());
        self
    }

    /// Delays every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The token returned for `pii`.
    pub fn token_of(&self, pii: &str) -> String {
        format!("token-{pii}")
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl TokenizerApi for MockTokenizerApi {
    async fn tokenize(&self, pii: &str) -> RelayResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(pii.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(pii) {
            bail!(
                ErrorKind::TokenizerRequestFailed,
                "Tokenizer request failed",
                format!("connection reset while tokenizing '{pii}'")
            );
        }

        Ok(self.token_of(pii))
    }
}
