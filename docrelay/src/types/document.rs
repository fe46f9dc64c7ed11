use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

use crate::error::RelayResult;

/// Untyped payload received from the trigger host.
pub type RawDocument = serde_json::Value;

/// A typed document handled by the relay.
///
/// A document is decoded from a [`RawDocument`], validated, optionally enriched and finally
/// encoded for the broker or serialized for the fallback queue.
pub trait Document:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Key under which the document is published, used for broker partitioning.
    fn key(&self) -> String;

    /// Domain validation applied after the payload has been deserialized.
    fn validate(&self) -> RelayResult<()> {
        Ok(())
    }
}

/// A document whose updates must be replayed in version order per entity.
pub trait Versioned {
    fn entity_id(&self) -> &str;

    fn version(&self) -> u64;
}

/// A document carrying a sensitive identifier which is replaced by an opaque token.
pub trait Tokenizable {
    /// The sensitive identifier to tokenize.
    fn pii(&self) -> &str;

    /// Returns the document decorated with the resolved token.
    fn with_token(self, token: String) -> Self;
}

/// A document whose content lives in an external store and is fetched during enrichment.
pub trait ContentBearing {
    /// Key of the content in the content store.
    fn content_key(&self) -> String;

    /// Returns the document decorated with the fetched content.
    fn with_content(self, content: serde_json::Value) -> Self;
}
