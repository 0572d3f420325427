//! Inbound channel extraction.
//!
//! # Responsibilities
//! - Resolve the request id (set by the request-id layer, or generated here)
//! - Read the body under a size limit
//! - Turn headers, cookies, query string and body into [`Value`] channels
//!
//! # Design Decisions
//! - Header names are lowercase; repeated headers are joined with `", "`
//! - Repeated query keys become arrays, single keys stay strings
//! - Cookies come only from the `Cookie` header; the last duplicate wins

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::{HeaderMap, Request};
use futures_util::StreamExt;
use thiserror::Error;
use uuid::Uuid;

use crate::value::{Map, Value};
use crate::wire;

pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("failed to read body: {0}")]
    Read(#[source] axum::Error),

    #[error("body is malformed: {0}")]
    Malformed(String),
}

/// The id from `x-request-id`, or a fresh UUID v4.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Buffer the body, failing as soon as it grows past `limit`.
pub async fn read_body(body: Body, limit: usize) -> Result<Vec<u8>, BodyError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyError::Read)?;
        if buf.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge(limit));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Decode a buffered body according to its content type.
///
/// Empty bodies are `null`. Form bodies become string-valued objects.
/// Everything else is read as JSON, tagged or plain.
pub fn decode_body(headers: &HeaderMap, bytes: &[u8]) -> Result<Value, BodyError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");
    if content_type.starts_with("application/x-www-form-urlencoded") {
        return Ok(form_to_value(bytes));
    }
    wire::decode_lenient(bytes).map_err(|e| BodyError::Malformed(e.to_string()))
}

pub fn headers_to_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_string(), Value::String(joined));
    }
    Value::Object(map)
}

pub fn cookies_to_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for header in headers.get_all(COOKIE).iter().filter_map(|v| v.to_str().ok()) {
        for pair in header.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next().unwrap_or("").trim();
            if name.is_empty() {
                continue;
            }
            let value = parts.next().unwrap_or("").trim();
            map.insert(name.to_string(), Value::from(value));
        }
    }
    Value::Object(map)
}

pub fn query_to_value(query: Option<&str>) -> Value {
    query.map(|q| form_to_value(q.as_bytes())).unwrap_or_else(|| Value::Object(Map::new()))
}

fn form_to_value(bytes: &[u8]) -> Value {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_repeated_query_keys_become_arrays() {
        let query = query_to_value(Some("tag=a&tag=b&tag=c&page=2&q=hello%20world"));
        assert_eq!(
            query.get("tag"),
            Some(&Value::Array(vec!["a".into(), "b".into(), "c".into()]))
        );
        assert_eq!(query.get("page").and_then(Value::as_str), Some("2"));
        assert_eq!(query.get("q").and_then(Value::as_str), Some("hello world"));
        assert_eq!(query_to_value(None), Value::Object(Map::new()));
    }

    #[test]
    fn test_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session=abc; theme=dark;  ; flag"));
        let cookies = cookies_to_value(&headers);
        assert_eq!(cookies.get("session").and_then(Value::as_str), Some("abc"));
        assert_eq!(cookies.get("theme").and_then(Value::as_str), Some("dark"));
        assert_eq!(cookies.get("flag").and_then(Value::as_str), Some(""));
    }

    #[test]
    fn test_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        assert_eq!(
            headers_to_value(&headers).get("x-tag").and_then(Value::as_str),
            Some("a, b")
        );
    }

    #[test]
    fn test_decode_body_by_content_type() {
        let mut headers = HeaderMap::new();
        assert_eq!(decode_body(&headers, b"").unwrap(), Value::Null);
        assert_eq!(
            decode_body(&headers, br#"{"a":1}"#).unwrap().get("a").and_then(Value::as_i64),
            Some(1)
        );
        assert!(matches!(decode_body(&headers, b"{nope"), Err(BodyError::Malformed(_))));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        assert_eq!(
            decode_body(&headers, b"name=ada").unwrap().get("name").and_then(Value::as_str),
            Some("ada")
        );
    }

    #[tokio::test]
    async fn test_read_body_limit() {
        assert_eq!(read_body(Body::from("hello"), 5).await.unwrap(), b"hello");
        assert!(matches!(
            read_body(Body::from("hello!"), 5).await,
            Err(BodyError::TooLarge(5))
        ));
    }
}
