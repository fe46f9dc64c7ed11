use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::bail;
use crate::error::{ErrorKind, RelayResult};
use crate::filter::{Filter, exclude_identities};
use crate::types::{Document, Tokenizable, Versioned};

/// A citizen profile, tokenized on its fiscal code before being published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub fiscal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_email_enabled: bool,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenized_fiscal_code: Option<String>,
}

impl Document for Profile {
    /// The token once available, so that the broker key never carries the fiscal code.
    fn key(&self) -> String {
        self.tokenized_fiscal_code
            .clone()
            .unwrap_or_else(|| self.fiscal_code.clone())
    }

    fn validate(&self) -> RelayResult<()> {
        if self.fiscal_code.trim().is_empty() {
            bail!(ErrorKind::DecodeFailed, "Profile has an empty fiscal code");
        }

        Ok(())
    }
}

impl Versioned for Profile {
    fn entity_id(&self) -> &str {
        &self.fiscal_code
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Tokenizable for Profile {
    fn pii(&self) -> &str {
        &self.fiscal_code
    }

    fn with_token(mut self, token: String) -> Self {
        self.tokenized_fiscal_code = Some(token);
        self
    }
}

/// Drops the profiles of internal test users.
pub fn exclude_test_profiles(test_fiscal_codes: HashSet<String>) -> impl Filter<Profile> {
    exclude_identities(test_fiscal_codes, |profile: &Profile| {
        profile.fiscal_code.as_str()
    })
}
