use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::ops::Deref;

/// A [`SecretString`] which can be read from and written to configuration files.
///
/// `Debug` output is redacted, the value is only exposed through [`ExposeSecret`] or when
/// the configuration is serialized again.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "String")]
pub struct SerializableSecretString(SecretString);

impl Deref for SerializableSecretString {
    type Target = SecretString;

    fn deref(&self) -> &SecretString {
        &self.0
    }
}

impl From<String> for SerializableSecretString {
    fn from(value: String) -> Self {
        Self(SecretString::from(value))
    }
}

impl Serialize for SerializableSecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_the_secret() {
        let secret: SerializableSecretString = serde_json::from_str(r#""api-key-123""#).unwrap();

        assert_eq!(secret.expose_secret(), "api-key-123");
        assert!(!format!("{secret:?}").contains("api-key-123"));
        assert_eq!(serde_json::to_string(&secret).unwrap(), r#""api-key-123""#);
    }
}
