use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{ErrorKind, RelayResult};
use crate::types::{Document, Versioned};

/// A service able to send messages, published without enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub service_id: String,
    pub service_name: String,
    pub organization_fiscal_code: String,
    pub version: u64,
    #[serde(default = "default_is_visible")]
    pub is_visible: bool,
}

impl Document for Service {
    fn key(&self) -> String {
        self.service_id.clone()
    }

    fn validate(&self) -> RelayResult<()> {
        if self.service_id.is_empty() {
            bail!(ErrorKind::DecodeFailed, "Service has an empty id");
        }

        Ok(())
    }
}

impl Versioned for Service {
    fn entity_id(&self) -> &str {
        &self.service_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

pub fn visible_services(service: &Service) -> bool {
    service.is_visible
}

fn default_is_visible() -> bool {
    true
}
