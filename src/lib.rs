//! Library exports for aibackend, shared between the binary and tests.

pub mod backends;
pub mod config;
pub mod flush;
pub mod metrics;
pub mod routes;
pub mod startup;
pub mod state;
pub mod telemetry;
pub mod utils;
