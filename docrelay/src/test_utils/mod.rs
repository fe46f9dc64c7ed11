//! Helpers shared by unit and integration tests.

pub mod documents;
pub mod enricher;
pub mod tokenizer;
