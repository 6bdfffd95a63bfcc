#![allow(dead_code)]

use std::sync::Arc;

use aibackend::config::{extract_config, ConfigV1};
use aibackend::routes::create_router;
use aibackend::startup::build_state;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, Response};
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde_json::Value;

pub const APP1_KEY: &str = "4e2a7c1b-0d1f-4a5e-9c3b-8f6d2e1a0b9c";
pub const CATCH_ALL_KEY: &str = "0b9c8f6d-2e1a-4a5e-9c3b-4e2a7c1b0d1f";

/// Test configuration with every destination pointed at `endpoint`.
pub fn load_test_config(endpoint: &str) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "json"
bind_address: 127.0.0.1:8126
flush:
  timeout_in_ms: 2000
appinsights:
  - prefix: "app1."
    role_name: "frontend"
    role_instance: "fe-01"
    instrumentation_key: "{app1}"
    endpoint: "{endpoint}"
  - instrumentation_key: "{catch_all}"
    endpoint: "{endpoint}"
"#,
        app1 = APP1_KEY,
        catch_all = CATCH_ALL_KEY,
        endpoint = endpoint,
    );
    extract_config(&Figment::new().merge(Yaml::string(&yaml)))
        .expect("Failed to parse test config YAML")
}

pub fn build_app(config: ConfigV1) -> Router {
    let state = build_state(Arc::new(config)).expect("state should build");
    create_router(state)
}

pub fn flush_request(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/flush")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn get_request(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("body should be JSON")
}
