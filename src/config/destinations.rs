use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default Application Insights ingestion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://dc.services.visualstudio.com/v2/track";

/// One configured Application Insights destination.
///
/// `prefix` scopes which metric keys reach this destination; when absent every
/// key is forwarded (internal `statsd.` keys still need `track_statsd_metrics`).
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct DestinationConfig {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub role_instance: Option<String>,
    pub instrumentation_key: String,
    #[serde(default)]
    pub track_statsd_metrics: bool,
    /// Falls back to the top-level `compress_properties` when unset.
    #[serde(default)]
    pub compressed_properties: Option<bool>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl DestinationConfig {
    /// Minimal config for a destination with the given key and nothing else set.
    pub fn new(instrumentation_key: impl Into<String>) -> Self {
        DestinationConfig {
            prefix: None,
            role_name: None,
            role_instance: None,
            instrumentation_key: instrumentation_key.into(),
            track_statsd_metrics: false,
            compressed_properties: None,
            endpoint: None,
        }
    }

    /// The routing prefix, with an empty string treated as no prefix.
    pub fn routing_prefix(&self) -> Option<&str> {
        self.prefix.as_deref().filter(|p| !p.is_empty())
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prefix_means_no_prefix() {
        let mut config = DestinationConfig::new("key");
        config.prefix = Some(String::new());
        assert_eq!(config.routing_prefix(), None);

        config.prefix = Some("app1.".to_string());
        assert_eq!(config.routing_prefix(), Some("app1."));
    }

    #[test]
    fn endpoint_defaults_to_public_ingestion() {
        let mut config = DestinationConfig::new("key");
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);

        config.endpoint = Some("http://localhost:9999/v2/track".to_string());
        assert_eq!(config.endpoint(), "http://localhost:9999/v2/track");
    }
}
