use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{ErrorKind, RelayResult};
use crate::filter::Filter;
use crate::types::{Document, Versioned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatusValue {
    Accepted,
    Throttled,
    Failed,
    Processed,
    Rejected,
}

/// A versioned status update of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStatus {
    pub message_id: String,
    pub status: MessageStatusValue,
    pub version: u64,
    pub fiscal_code: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_archived: bool,
}

impl Document for MessageStatus {
    fn key(&self) -> String {
        self.message_id.clone()
    }

    fn validate(&self) -> RelayResult<()> {
        if self.message_id.is_empty() {
            bail!(ErrorKind::DecodeFailed, "Message status has an empty message id");
        }

        Ok(())
    }
}

impl Versioned for MessageStatus {
    fn entity_id(&self) -> &str {
        &self.message_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Keeps the statuses whose value is one of `statuses`.
pub fn status_in(statuses: &[MessageStatusValue]) -> impl Filter<MessageStatus> + use<> {
    let statuses = statuses.to_vec();
    move |status: &MessageStatus| statuses.contains(&status.status)
}
