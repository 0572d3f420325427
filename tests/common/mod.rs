//! Shared utilities for router integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use switchyard::routing::Router;
use switchyard::{wire, Value};

/// Build a request with an optional JSON body.
pub fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send `request` through the router and decode the wire body.
pub async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value, Response<()>) {
    let response = router.handle(request).await;
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let value = wire::from_slice(&bytes).unwrap();
    (parts.status, value, Response::from_parts(parts, ()))
}

pub fn error_message(body: &Value) -> &str {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

pub fn error_key(body: &Value) -> &str {
    body.get("error")
        .and_then(|e| e.get("key"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}
