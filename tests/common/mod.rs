//! Shared helpers for router-level tests

#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;
use wordpress_fingerprint::{AppState, Scanner, Summarizer, SummaryConfig, router};

/// Router scanning mock sites, with lookups against a mock registry
pub fn scrape_app(registry: &MockServer) -> Router {
    let scanner = Scanner::builder()
        .allow_private(true)
        .registry_url(registry.uri())
        .build()
        .unwrap();
    let summarizer = Summarizer::new(SummaryConfig::default()).unwrap();
    router(AppState::new(scanner, summarizer))
}

/// Router whose summarizer talks to `summary`
pub fn analyze_app(summary: SummaryConfig) -> Router {
    let scanner = Scanner::builder().build().unwrap();
    let summarizer = Summarizer::new(summary).unwrap();
    router(AppState::new(scanner, summarizer))
}

/// POST a JSON body and decode the JSON response
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Find a plugin entry by slug
pub fn plugin<'a>(report: &'a Value, slug: &str) -> &'a Value {
    report["plugins"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["slug"] == slug)
        .unwrap_or_else(|| panic!("plugin {slug} missing from {report}"))
}
