use std::fmt;
use std::io::Error;
use std::str::FromStr;

/// Variable selecting the environment the relay runs in.
const APP_ENVIRONMENT_ENV_NAME: &str = "APP_ENVIRONMENT";

/// Runtime environment for the relay.
///
/// Selects the environment-specific configuration file and the log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Prod,
    Staging,
    Dev,
}

impl Environment {
    /// Reads `APP_ENVIRONMENT`, an unset variable selects [`Environment::Prod`].
    pub fn load() -> Result<Environment, Error> {
        match std::env::var(APP_ENVIRONMENT_ENV_NAME) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Environment::default()),
        }
    }

    /// Exports this environment through `APP_ENVIRONMENT`.
    pub fn set(&self) {
        // The variable is only written during single threaded startup or test setup.
        unsafe { std::env::set_var(APP_ENVIRONMENT_ENV_NAME, self.as_str()) }
    }

    /// Staging is deployed like production and logs the same way.
    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod | Self::Staging)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => "prod",
            Environment::Staging => "staging",
            Environment::Dev => "dev",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [Self::Prod, Self::Staging, Self::Dev]
            .into_iter()
            .find(|environment| environment.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                Error::other(format!(
                    "`{value}` is not a supported environment, expected one of `prod`, `staging` or `dev`"
                ))
            })
    }
}
