use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::config::{ConfigV1, DestinationConfig};
use crate::telemetry::{tag_keys, AppInsightsClient, TelemetryClient};

#[derive(Error, Debug)]
pub enum InitError {
    #[error("Destination #{index} ({label}) failed to initialize: {reason}")]
    Client {
        index: usize,
        label: String,
        reason: String,
    },

    #[error("Destination #{index} ({label}) is not initialized")]
    NotInitialized { index: usize, label: String },
}

/// Builds the telemetry client for a destination.
pub type ClientFactory =
    dyn Fn(&DestinationConfig) -> Result<Arc<dyn TelemetryClient>, String> + Send + Sync;

/// Creates an Application Insights client for the destination's key and endpoint.
pub fn appinsights_client(
    config: &DestinationConfig,
) -> Result<Arc<dyn TelemetryClient>, String> {
    let client = AppInsightsClient::new(&config.instrumentation_key, config.endpoint())?;
    Ok(Arc::new(client))
}

/// One configured telemetry sink.
///
/// The client handle only exists once `init` has succeeded.
pub struct Destination {
    config: DestinationConfig,
    compress_properties: bool,
    client: Option<Arc<dyn TelemetryClient>>,
}

impl Destination {
    pub fn new(config: DestinationConfig, default_compress_properties: bool) -> Self {
        let compress_properties = config
            .compressed_properties
            .unwrap_or(default_compress_properties);
        Destination {
            config,
            compress_properties,
            client: None,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.config.routing_prefix()
    }

    pub fn role_name(&self) -> Option<&str> {
        self.config.role_name.as_deref()
    }

    pub fn role_instance(&self) -> Option<&str> {
        self.config.role_instance.as_deref()
    }

    pub fn forwards_internal_metrics(&self) -> bool {
        self.config.track_statsd_metrics
    }

    pub fn compress_properties(&self) -> bool {
        self.compress_properties
    }

    pub fn is_initialized(&self) -> bool {
        self.client.is_some()
    }

    pub fn client(&self) -> Option<&Arc<dyn TelemetryClient>> {
        self.client.as_ref()
    }

    /// Name used in logs and metric labels: the prefix, or `*` for catch-all destinations.
    pub fn label(&self) -> &str {
        self.prefix().unwrap_or("*")
    }

    /// Creates the client and tags it with the configured role identity.
    /// Calling it again on an initialized destination is a no-op.
    pub fn init(&mut self, factory: &ClientFactory) -> Result<(), String> {
        if self.is_initialized() {
            return Ok(());
        }

        let client = factory(&self.config)?;
        if let Some(role_name) = self.role_name().filter(|r| !r.is_empty()) {
            client.set_tag(tag_keys::ROLE_NAME, role_name);
        }
        if let Some(role_instance) = self.role_instance().filter(|r| !r.is_empty()) {
            client.set_tag(tag_keys::ROLE_INSTANCE, role_instance);
        }
        self.client = Some(client);
        Ok(())
    }
}

/// Ordered set of destinations built from configuration.
pub struct BackendRegistry {
    destinations: Vec<Destination>,
}

impl BackendRegistry {
    pub fn new(configs: &[DestinationConfig], default_compress_properties: bool) -> Self {
        let destinations = configs
            .iter()
            .cloned()
            .map(|cfg| Destination::new(cfg, default_compress_properties))
            .collect();
        BackendRegistry { destinations }
    }

    pub fn from_config(config: &ConfigV1) -> Self {
        Self::new(&config.appinsights, config.compress_properties)
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Initializes every destination with Application Insights clients.
    pub fn initialize(&mut self) -> Result<(), InitError> {
        self.initialize_with(&appinsights_client)
    }

    /// Initializes every destination in order, stopping at the first failure.
    pub fn initialize_with(&mut self, factory: &ClientFactory) -> Result<(), InitError> {
        for (index, destination) in self.destinations.iter_mut().enumerate() {
            if let Err(reason) = destination.init(factory) {
                error!(
                    event_name = "backends.destination.init.failed",
                    event_domain = "backends",
                    destination = destination.label(),
                    "Failed to initialize destination #{}: {}",
                    index,
                    reason
                );
                return Err(InitError::Client {
                    index,
                    label: destination.label().to_string(),
                    reason,
                });
            }
            info!(
                event_name = "backends.destination.init",
                event_domain = "backends",
                destination = destination.label(),
                role_name = destination.role_name().unwrap_or_default(),
                role_instance = destination.role_instance().unwrap_or_default(),
                track_statsd_metrics = destination.forwards_internal_metrics(),
                compress_properties = destination.compress_properties(),
                "Initialized destination #{}",
                index
            );
        }
        Ok(())
    }

    /// Fails with the first destination that has no client yet.
    pub fn ensure_initialized(&self) -> Result<(), InitError> {
        match self
            .destinations
            .iter()
            .enumerate()
            .find(|(_, d)| !d.is_initialized())
        {
            Some((index, destination)) => Err(InitError::NotInitialized {
                index,
                label: destination.label().to_string(),
            }),
            None => Ok(()),
        }
    }
}
