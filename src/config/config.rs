use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::destinations::DestinationConfig;
use super::logging::LoggingConfig;

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "AIBACKEND_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: logging, the flush ingress and the destinations.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct ConfigV1 {
    pub logging: LoggingConfig,
    pub bind_address: String,
    #[serde(default)]
    pub flush: FlushConfig,
    /// Shared default for destinations that don't set `compressed_properties`.
    #[serde(default = "default_true")]
    pub compress_properties: bool,
    pub appinsights: Vec<DestinationConfig>,
}

/// Bounds on how long a single flush may spend delivering telemetry.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct FlushConfig {
    #[serde(default = "default_flush_timeout")]
    pub timeout_in_ms: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        FlushConfig {
            timeout_in_ms: default_flush_timeout(),
        }
    }
}

fn default_flush_timeout() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

/// Builds the figment used for loading: the YAML file at `path`, then
/// `AIBACKEND_*` environment overrides (nested keys split on `__`).
pub fn config_figment(path: &str) -> Figment {
    Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed("AIBACKEND_").ignore(&["config"]).split("__"))
}

/// Extracts a `ConfigV1` out of any figment, migrating older versions if needed.
pub fn extract_config(source: &Figment) -> Result<ConfigV1, figment::Error> {
    match source.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Load config from the YAML file named by `AIBACKEND_CONFIG`, or "./config.yaml".
pub fn load_config() -> ConfigV1 {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    match extract_config(&config_figment(&path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration from '{}': {}", path, e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
