//! Exchange of sensitive identifiers for opaque tokens.

mod cache_aside;
mod http;

pub use cache_aside::CacheAsideTokenizer;
pub use http::HttpTokenizerClient;

use std::future::Future;

use crate::error::RelayResult;

/// Client of the external tokenization service.
///
/// The call is expected to be idempotent, tokenizing the same identifier twice yields the
/// same token.
pub trait TokenizerApi: Send + Sync {
    /// Returns the token of `pii`, failing if the service cannot produce a usable one.
    fn tokenize(&self, pii: &str) -> impl Future<Output = RelayResult<String>> + Send;
}
