mod common;

use std::sync::Arc;

use aibackend::startup::build_state;
use axum::http::StatusCode;
use base64::{engine::general_purpose, Engine as _};
use common::*;
use mockito::{Matcher, Server};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn prefixed_counter_reaches_its_destination() {
    let mut server = Server::new_async().await;
    let app1 = server
        .mock("POST", "/v2/track")
        .match_body(Matcher::PartialJson(json!([{
            "iKey": APP1_KEY,
            "tags": { "ai.cloud.role": "frontend", "ai.cloud.roleInstance": "fe-01" },
            "data": {
                "baseType": "MetricData",
                "baseData": { "metrics": [{ "name": "hits", "kind": 0, "value": 5.0 }] }
            }
        }])))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let catch_all = server
        .mock("POST", "/v2/track")
        .match_body(Matcher::PartialJson(json!([{
            "iKey": CATCH_ALL_KEY,
            "data": { "baseData": { "metrics": [{ "name": "app1.hits", "value": 5.0 }] } }
        }])))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let app = build_app(load_test_config(&format!("{}/v2/track", server.url())));
    let response = app
        .oneshot(flush_request(
            r#"{"timestamp": 1718000000, "metrics": {"counters": {"app1.hits": 5}}}"#,
        ))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    app1.assert_async().await;
    catch_all.assert_async().await;
}

#[tokio::test]
async fn internal_metrics_are_not_forwarded() {
    let mut server = Server::new_async().await;
    let ingestion = server
        .mock("POST", "/v2/track")
        .expect(0)
        .create_async()
        .await;

    let app = build_app(load_test_config(&format!("{}/v2/track", server.url())));
    let response = app
        .oneshot(flush_request(
            r#"{"timestamp": 1718000000, "metrics": {"gauges": {"statsd.numStats": 3}}}"#,
        ))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    ingestion.assert_async().await;
}

#[tokio::test]
async fn timer_aggregates_carry_all_fields() {
    let mut server = Server::new_async().await;
    let app1 = server
        .mock("POST", "/v2/track")
        .match_body(Matcher::PartialJson(json!([{
            "iKey": APP1_KEY,
            "data": {
                "baseData": {
                    "metrics": [{
                        "name": "latency", "kind": 1, "value": 30.0,
                        "count": 3.0, "min": 5.0, "max": 20.0, "stdDev": 6.5
                    }],
                    "properties": { "host": "a" }
                }
            }
        }])))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let catch_all = server
        .mock("POST", "/v2/track")
        .match_body(Matcher::PartialJson(json!([{ "iKey": CATCH_ALL_KEY }])))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let key = format!(
        "app1.latency__{}",
        general_purpose::STANDARD.encode(r#"{"host":"a"}"#)
    );
    let body = format!(
        r#"{{"timestamp": "1718000000", "metrics": {{"timer_data": {{"{}": {{"sum": 30, "count": 3, "lower": 5, "upper": 20, "std": 6.5, "mean": 10}}}}}}}}"#,
        key
    );

    let app = build_app(load_test_config(&format!("{}/v2/track", server.url())));
    let response = app
        .oneshot(flush_request(&body))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    app1.assert_async().await;
    catch_all.assert_async().await;
}

#[tokio::test]
async fn undecodable_properties_become_an_exception() {
    let mut server = Server::new_async().await;
    let catch_all = server
        .mock("POST", "/v2/track")
        .match_body(Matcher::PartialJson(json!([
            {
                "iKey": CATCH_ALL_KEY,
                "data": {
                    "baseType": "ExceptionData",
                    "baseData": {
                        "exceptions": [{ "typeName": "Error", "hasFullStack": false }],
                        "properties": { "statsd.key": "latency__####notbase64" }
                    }
                }
            },
            {
                "iKey": CATCH_ALL_KEY,
                "data": {
                    "baseType": "MetricData",
                    "baseData": { "metrics": [{ "name": "latency", "value": 12.0 }] }
                }
            }
        ])))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let app = build_app(load_test_config(&format!("{}/v2/track", server.url())));
    let response = app
        .oneshot(flush_request(
            r#"{"timestamp": 1718000000, "metrics": {"gauges": {"latency__####notbase64": 12}}}"#,
        ))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    catch_all.assert_async().await;
}

#[tokio::test]
async fn failed_delivery_still_completes_the_flush() {
    let mut server = Server::new_async().await;
    let ingestion = server
        .mock("POST", "/v2/track")
        .with_status(500)
        .with_body("ingestion unavailable")
        .expect(2)
        .create_async()
        .await;

    let app = build_app(load_test_config(&format!("{}/v2/track", server.url())));
    let response = app
        .clone()
        .oneshot(flush_request(
            r#"{"timestamp": 1718000000, "metrics": {"counters": {"app1.hits": 1}}}"#,
        ))
        .await
        .expect("request should complete");
    assert_eq!(response.status(), StatusCode::OK);
    ingestion.assert_async().await;

    let response = app
        .oneshot(get_request("/metrics"))
        .await
        .expect("request should complete");
    let text = body_text(response).await;
    assert!(text.contains(
        r#"aibackend_delivery_failures_total{destination="app1.",reason="error"} 1"#
    ));
    assert!(text.contains("aibackend_flushes_total 1"));
}

#[tokio::test]
async fn malformed_flush_is_rejected() {
    let app = build_app(load_test_config("http://127.0.0.1:9/v2/track"));

    let response = app
        .clone()
        .oneshot(flush_request("{not json"))
        .await
        .expect("request should complete");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = app
        .oneshot(flush_request(
            r#"{"timestamp": 1, "metrics": {"counters": {"hits": "many"}}}"#,
        ))
        .await
        .expect("request should complete");
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn health_reports_destinations() {
    let app = build_app(load_test_config("http://127.0.0.1:9/v2/track"));
    let response = app
        .oneshot(get_request("/health"))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["destinations"], 2);
}

#[tokio::test]
async fn invalid_instrumentation_key_fails_startup() {
    let mut config = load_test_config("http://127.0.0.1:9/v2/track");
    config.appinsights[1].instrumentation_key = "not-a-key".to_string();

    let error = match build_state(Arc::new(config)) {
        Ok(_) => panic!("startup should fail"),
        Err(e) => e.to_string(),
    };
    assert!(error.contains("Destination #1"));
    assert!(error.contains("not-a-key"));
}
