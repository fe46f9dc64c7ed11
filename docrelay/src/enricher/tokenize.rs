use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::cache::CacheClient;
use crate::enricher::Enricher;
use crate::tokenizer::{CacheAsideTokenizer, TokenizerApi};
use crate::types::{ItemResult, Tokenizable};

/// Replaces the sensitive identifier of each document with its token.
#[derive(Debug)]
pub struct TokenizeEnricher<T, C, A> {
    tokenizer: Arc<CacheAsideTokenizer<C, A>>,
    _document: PhantomData<fn() -> T>,
}

impl<T, C, A> TokenizeEnricher<T, C, A> {
    pub fn new(tokenizer: Arc<CacheAsideTokenizer<C, A>>) -> Self {
        Self {
            tokenizer,
            _document: PhantomData,
        }
    }
}

#[async_trait]
impl<T, C, A> Enricher<T> for TokenizeEnricher<T, C, A>
where
    T: Tokenizable + Send + Sync + 'static,
    C: CacheClient + 'static,
    A: TokenizerApi + 'static,
{
    async fn enrich(&self, document: T) -> ItemResult<T> {
        let token = self.tokenizer.resolve(document.pii()).await;
        match token {
            Ok(token) => ItemResult::Success(document.with_token(token)),
            Err(error) => ItemResult::failure(document, error),
        }
    }

    async fn enrich_batch(&self, documents: Vec<T>) -> Vec<ItemResult<T>> {
        let identifiers = documents
            .iter()
            .map(|document| document.pii().to_string())
            .collect();
        let tokens = self.tokenizer.resolve_many(identifiers).await;

        documents
            .into_iter()
            .zip(tokens)
            .map(|(document, token)| match token {
                Ok(token) => ItemResult::Success(document.with_token(token)),
                Err(error) => ItemResult::failure(document, error),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrelay_config::shared::CacheConfig;

    use crate::cache::MemoryCache;
    use crate::documents::Profile;
    use crate::error::ErrorKind;
    use crate::test_utils::documents::profile;
    use crate::test_utils::tokenizer::MockTokenizerApi;
    use crate::tracker::MemoryTracker;

    #[tokio::test]
    async fn tokens_are_attached_and_failures_kept_in_place() {
        let api = MockTokenizerApi::new().failing_for(["BBBBBB00B00B000B"]);
        let tokenizer = CacheAsideTokenizer::new(
            Arc::new(MemoryCache::new()),
            Arc::new(api.clone()),
            &CacheConfig::default(),
            2,
            Arc::new(MemoryTracker::new()),
        );
        let enricher: TokenizeEnricher<Profile, _, _> = TokenizeEnricher::new(Arc::new(tokenizer));

        let results = enricher
            .enrich_batch(vec![
                profile("AAAAAA00A00A000A", 1),
                profile("BBBBBB00B00B000B", 1),
                profile("CCCCCC00C00C000C", 1),
            ])
            .await;

        assert_eq!(
            results[0].document().tokenized_fiscal_code.as_deref(),
            Some(api.token_of("AAAAAA00A00A000A").as_str())
        );
        assert_eq!(
            results[1].error().map(|error| error.kind()),
            Some(ErrorKind::TokenizerRequestFailed)
        );
        assert_eq!(results[1].document().tokenized_fiscal_code, None);
        assert!(results[2].is_success());
    }
}
