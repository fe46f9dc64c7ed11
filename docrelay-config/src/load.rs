use serde::de::DeserializeOwned;
use std::path::Path;

use crate::environment::Environment;

/// Directory, relative to the working directory, holding the configuration files.
const CONFIGURATION_DIR: &str = "configuration";

/// Prefix of environment variables overriding file values, `APP_PIPELINE__NAME` sets
/// `pipeline.name`.
const ENV_PREFIX: &str = "APP";

/// Separates the segments of a nested key in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Loads the configuration of the current environment from the working directory.
///
/// Values are layered, later sources overriding earlier ones:
/// 1. `configuration/base.yaml`
/// 2. `configuration/{environment}.yaml`, optional
/// 3. `APP_` prefixed environment variables
pub fn load_config<T: DeserializeOwned>() -> Result<T, config::ConfigError> {
    let working_directory = std::env::current_dir().map_err(|err| {
        config::ConfigError::Message(format!("failed to determine the current directory: {err}"))
    })?;
    let environment = Environment::load().map_err(|err| {
        config::ConfigError::Message(format!("failed to parse APP_ENVIRONMENT: {err}"))
    })?;

    load_config_from(&working_directory.join(CONFIGURATION_DIR), environment)
}

/// Loads the configuration of `environment` from `directory`.
pub fn load_config_from<T: DeserializeOwned>(
    directory: &Path,
    environment: Environment,
) -> Result<T, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::from(directory.join("base.yaml")))
        .add_source(
            config::File::from(directory.join(format!("{environment}.yaml"))).required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR),
        )
        .build()?
        .try_deserialize()
}
