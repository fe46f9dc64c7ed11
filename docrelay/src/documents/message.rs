use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{ErrorKind, RelayResult};
use crate::types::{ContentBearing, Document, Tokenizable};

/// A message sent by a service to a citizen.
///
/// The message body is stored apart and fetched from the content store during enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub fiscal_code: String,
    pub sender_service_id: String,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenized_fiscal_code: Option<String>,
}

impl Document for Message {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn validate(&self) -> RelayResult<()> {
        if self.id.is_empty() {
            bail!(ErrorKind::DecodeFailed, "Message has an empty id");
        }
        if self.fiscal_code.is_empty() {
            bail!(ErrorKind::DecodeFailed, "Message has an empty fiscal code");
        }

        Ok(())
    }
}

impl ContentBearing for Message {
    fn content_key(&self) -> String {
        self.id.clone()
    }

    fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = Some(content);
        self
    }
}

impl Tokenizable for Message {
    fn pii(&self) -> &str {
        &self.fiscal_code
    }

    fn with_token(mut self, token: String) -> Self {
        self.tokenized_fiscal_code = Some(token);
        self
    }
}

/// Keeps messages whose processing has completed, pending messages have no content yet.
pub fn processed_messages(message: &Message) -> bool {
    !message.is_pending
}
