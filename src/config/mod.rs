mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{
    LogSettings, PartialSettings, ServerSettings, Settings, StorageSettings, StreamSettings,
};

/// Prefix for environment overrides, e.g. `RELAY_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "RELAY";

/// Loads configuration from `config/default.*` and the environment.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Loads configuration from the file at `path` (extension optional, the file
/// may be absent) with environment variables layered on top, then merges the
/// result over the defaults.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merged(partial))
}

#[cfg(test)]
mod tests;
