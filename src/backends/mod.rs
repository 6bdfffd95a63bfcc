//! The set of configured destinations and their one-time initialization.

mod registry;

pub use registry::{appinsights_client, BackendRegistry, ClientFactory, Destination, InitError};
