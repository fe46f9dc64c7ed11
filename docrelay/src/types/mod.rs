//! Core types flowing through the relay.

mod document;
mod result;

pub use document::{ContentBearing, Document, RawDocument, Tokenizable, Versioned};
pub use result::{ItemResult, align_results, partition_results};
