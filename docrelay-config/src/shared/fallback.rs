use serde::{Deserialize, Serialize};

use crate::shared::{PgConnectionConfig, ValidationError};

/// Durable transport used when the broker does not accept a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackConfig {
    /// In-memory queue, used for local runs and tests.
    Memory,
    /// Queue table stored in Postgres.
    Postgres {
        connection: PgConnectionConfig,
        /// Table receiving one row per queued message.
        table_name: String,
    },
}

impl FallbackConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            FallbackConfig::Memory => Ok(()),
            FallbackConfig::Postgres {
                connection,
                table_name,
            } => {
                if table_name.is_empty() {
                    return Err(ValidationError::EmptyField("table_name"));
                }

                connection.validate()
            }
        }
    }
}
