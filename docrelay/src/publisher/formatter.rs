use std::marker::PhantomData;

use crate::error::{ErrorKind, RelayResult};
use crate::relay_error;
use crate::types::Document;

/// A document encoded for the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedRecord {
    pub key: String,
    pub value: Vec<u8>,
}

/// Encodes documents into broker records.
pub trait Formatter<T>: Send + Sync {
    fn format(&self, document: &T) -> RelayResult<FormattedRecord>;
}

/// Keys records by [`Document::key`] and encodes their value as JSON.
#[derive(Debug)]
pub struct JsonFormatter<T> {
    _document: PhantomData<fn() -> T>,
}

impl<T> JsonFormatter<T> {
    pub fn new() -> Self {
        Self {
            _document: PhantomData,
        }
    }
}

impl<T> Default for JsonFormatter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Document> Formatter<T> for JsonFormatter<T> {
    fn format(&self, document: &T) -> RelayResult<FormattedRecord> {
        let value = serde_json::to_vec(document).map_err(|err| {
            relay_error!(ErrorKind::FormatFailed, "Record encoding failed", err)
        })?;

        Ok(FormattedRecord {
            key: document.key(),
            value,
        })
    }
}
