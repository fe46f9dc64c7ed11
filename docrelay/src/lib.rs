pub mod bulk;
pub mod cache;
pub mod concurrency;
pub mod decode;
pub mod documents;
pub mod enricher;
pub mod error;
#[cfg(feature = "failpoints")]
pub mod failpoints;
pub mod filter;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod publisher;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod tokenizer;
pub mod tracker;
pub mod types;
