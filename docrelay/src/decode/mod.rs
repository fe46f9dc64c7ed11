//! Decoding of raw payloads into typed documents.

use std::marker::PhantomData;

use crate::error::{ErrorKind, RelayError, RelayResult};
use crate::relay_error;
use crate::types::{Document, RawDocument};

/// Validates a raw payload against the schema of document type `T`.
pub trait Decoder<T>: Send + Sync {
    fn decode(&self, raw: &RawDocument) -> RelayResult<T>;
}

/// Decodes documents with `serde` and then runs [`Document::validate`].
///
/// Every failure, whether structural or semantic, is reported as
/// [`ErrorKind::DecodeFailed`].
#[derive(Debug)]
pub struct JsonDecoder<T> {
    _document: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _document: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Document> Decoder<T> for JsonDecoder<T> {
    fn decode(&self, raw: &RawDocument) -> RelayResult<T> {
        // `T::deserialize` borrows the value instead of cloning the whole payload.
        let document = T::deserialize(raw).map_err(|err| {
            relay_error!(
                ErrorKind::DecodeFailed,
                "Document does not match the expected schema",
                err
            )
        })?;

        document.validate().map_err(|err| {
            relay_error!(
                ErrorKind::DecodeFailed,
                "Document failed validation",
                err
            )
        })?;

        Ok(document)
    }
}

/// Decodes every raw document, splitting valid documents from decode errors.
///
/// Both sides keep the relative order of the input.
pub fn decode_batch<T, D>(decoder: &D, raw_documents: &[RawDocument]) -> (Vec<T>, Vec<RelayError>)
where
    D: Decoder<T> + ?Sized,
{
    let mut documents = Vec::with_capacity(raw_documents.len());
    let mut errors = Vec::new();

    for raw in raw_documents {
        match decoder.decode(raw) {
            Ok(document) => documents.push(document),
            Err(err) => errors.push(err),
        }
    }

    (documents, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Profile;
    use serde_json::json;

    #[test]
    fn decodes_valid_profile() {
        let decoder = JsonDecoder::<Profile>::new();

        let profile = decoder
            .decode(&json!({
                "fiscal_code": "AAAAAA00A00A000A",
                "is_email_enabled": true,
                "version": 3
            }))
            .unwrap();

        assert_eq!(profile.fiscal_code, "AAAAAA00A00A000A");
        assert_eq!(profile.version, 3);
    }

    #[test]
    fn shape_and_validation_failures_are_decode_errors() {
        let decoder = JsonDecoder::<Profile>::new();

        let missing_field = decoder.decode(&json!({ "version": 1 })).unwrap_err();
        let empty_identifier = decoder
            .decode(&json!({ "fiscal_code": "", "is_email_enabled": false, "version": 1 }))
            .unwrap_err();

        assert_eq!(missing_field.kind(), ErrorKind::DecodeFailed);
        assert_eq!(empty_identifier.kind(), ErrorKind::DecodeFailed);
    }

    #[test]
    fn decode_batch_splits_documents_and_errors() {
        let decoder = JsonDecoder::<Profile>::new();
        let raw = vec![
            json!({ "fiscal_code": "A", "is_email_enabled": true, "version": 1 }),
            json!("not a profile"),
            json!({ "fiscal_code": "B", "is_email_enabled": false, "version": 2 }),
        ];

        let (documents, errors) = decode_batch(&decoder, &raw);

        assert_eq!(
            documents
                .iter()
                .map(|profile| profile.fiscal_code.as_str())
                .collect::<Vec<_>>(),
            vec!["A", "B"]
        );
        assert_eq!(errors.len(), 1);
    }
}
