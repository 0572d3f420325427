//! Per-request context handed to middleware and handlers.
//!
//! # Responsibilities
//! - Carry the validated input channels
//! - Carry the data accumulated by earlier middleware
//! - Expose the raw request and a handle for response headers and cookies
//! - Construct result envelopes
//!
//! A context is built once per inbound request. Each pipeline step receives
//! its own copy with `data` replaced by the accumulation so far, so nothing a
//! step does to its copy leaks into the next one.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::header::{HeaderName, HeaderValue, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::envelope::Envelope;
use crate::http::response::SetCookie;
use crate::status::StatusKey;
use crate::value::{Map, Value};

/// An input channel of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Headers,
    Body,
    Path,
    Query,
    Cookies,
}

impl Channel {
    /// Order in which channels are validated; the first failure wins.
    pub const VALIDATION_ORDER: [Channel; 5] = [
        Channel::Headers,
        Channel::Body,
        Channel::Path,
        Channel::Query,
        Channel::Cookies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Headers => "headers",
            Channel::Body => "body",
            Channel::Path => "path",
            Channel::Query => "query",
            Channel::Cookies => "cookies",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("route declares no schema for the {0} channel")]
    Undeclared(Channel),

    #[error("{channel} does not fit the requested type: {source}")]
    Deserialize {
        channel: Channel,
        #[source]
        source: serde_json::Error,
    },
}

/// Validated input, keyed by channel.
///
/// Only channels the route declared a schema for are present. `path` is
/// always present because its schema is derived from the template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Input {
    headers: Option<Value>,
    body: Option<Value>,
    path: Value,
    query: Option<Value>,
    cookies: Option<Value>,
}

impl Input {
    pub fn get(&self, channel: Channel) -> Option<&Value> {
        match channel {
            Channel::Headers => self.headers.as_ref(),
            Channel::Body => self.body.as_ref(),
            Channel::Path => Some(&self.path),
            Channel::Query => self.query.as_ref(),
            Channel::Cookies => self.cookies.as_ref(),
        }
    }

    pub fn headers(&self) -> Option<&Value> {
        self.headers.as_ref()
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn path(&self) -> &Value {
        &self.path
    }

    pub fn query(&self) -> Option<&Value> {
        self.query.as_ref()
    }

    pub fn cookies(&self) -> Option<&Value> {
        self.cookies.as_ref()
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path.get(name).and_then(Value::as_str)
    }

    /// Deserialize a validated channel into a serde type.
    pub fn parse<T: DeserializeOwned>(&self, channel: Channel) -> Result<T, InputError> {
        let value = self.get(channel).ok_or(InputError::Undeclared(channel))?;
        value
            .deserialize_into()
            .map_err(|source| InputError::Deserialize { channel, source })
    }

    pub(crate) fn set(&mut self, channel: Channel, value: Value) {
        match channel {
            Channel::Headers => self.headers = Some(value),
            Channel::Body => self.body = Some(value),
            Channel::Path => self.path = value,
            Channel::Query => self.query = Some(value),
            Channel::Cookies => self.cookies = Some(value),
        }
    }
}

/// Headers to add to the outgoing response.
///
/// Applied whatever envelope the pipeline returns, so a handler can set a
/// cookie and still answer with an error.
#[derive(Debug, Clone, Default)]
pub struct ResponseHandle {
    headers: Arc<Mutex<HeaderMap>>,
}

impl ResponseHandle {
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().insert(name, value);
    }

    pub fn append_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().append(name, value);
    }

    /// Queue a `Set-Cookie` header. Cookies that cannot form a header value
    /// are dropped with a warning.
    pub fn set_cookie(&self, cookie: SetCookie) {
        match HeaderValue::try_from(cookie.to_string()) {
            Ok(value) => self.append_header(SET_COOKIE, value),
            Err(_) => tracing::warn!(cookie = %cookie.name(), "Dropping cookie with invalid characters"),
        }
    }

    pub(crate) fn take_headers(&self) -> HeaderMap {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HeaderMap> {
        self.headers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What a middleware or handler sees.
#[derive(Debug, Clone)]
pub struct RequestContext {
    input: Arc<Input>,
    data: Map,
    request: Arc<Parts>,
    response: ResponseHandle,
    request_id: Arc<str>,
}

impl RequestContext {
    pub(crate) fn new(input: Input, request: Parts, response: ResponseHandle, request_id: &str) -> Self {
        Self {
            input: Arc::new(input),
            data: Map::new(),
            request: Arc::new(request),
            response,
            request_id: Arc::from(request_id),
        }
    }

    /// Same request, different accumulated data.
    pub(crate) fn with_data(&self, data: Map) -> Self {
        Self {
            data,
            ..self.clone()
        }
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Data contributed by the middleware that ran before this step.
    pub fn data(&self) -> &Map {
        &self.data
    }

    pub fn request(&self) -> &Parts {
        &self.request
    }

    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn success(&self, data: Map) -> Envelope {
        Envelope::success(data)
    }

    pub fn ok(&self) -> Envelope {
        Envelope::ok()
    }

    pub fn error(&self, key: StatusKey, message: Option<&str>) -> Envelope {
        Envelope::error(key, message)
    }
}
