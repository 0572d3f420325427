//! Request construction.
//!
//! ```text
//! CallInput { path, query, body, headers, cookies }
//!     → substitute path params into the template
//!     → append query pairs
//!     → headers: content-type default → base headers → cookies → request headers
//!     → body (wire encoded, never for GET / HEAD)
//!     → RequestConfig
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use http::{Extensions, HeaderMap};
use switchyard::path::PathTemplate;
use switchyard::routing::Method;
use switchyard::{wire, Value};
use url::Url;

use crate::error::{ClientError, ProtocolError};

/// Everything a call may supply.
///
/// ```
/// use switchyard_client::CallInput;
///
/// let input = CallInput::new()
///     .path("chatId", 42)
///     .query("page", 1)
///     .cookie("session", "abc");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallInput {
    path: BTreeMap<String, String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
}

impl CallInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path.insert(name.into(), value.to_string());
        self
    }

    /// Append a query pair. Repeating a key sends it more than once.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }
}

/// The outgoing request, as request interceptors see and replace it.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
    /// Set on the copy a [`Retry`](crate::Retry) replays.
    pub retried: bool,
    /// Per-call scratch space for interceptors.
    pub extensions: Extensions,
}

pub type HeaderProvider = Arc<dyn Fn() -> BoxFuture<'static, Option<String>> + Send + Sync>;

/// A header added to every request.
#[derive(Clone)]
pub enum BaseHeader {
    Literal(String),
    /// Called for every request; `None` leaves the header out.
    Provider(HeaderProvider),
}

impl std::fmt::Debug for BaseHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaseHeader::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            BaseHeader::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl BaseHeader {
    async fn resolve(&self) -> Option<String> {
        match self {
            BaseHeader::Literal(value) => Some(value.clone()),
            BaseHeader::Provider(provider) => provider().await,
        }
    }
}

pub(crate) fn header_name(name: &str) -> Result<HeaderName, ClientError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| ClientError::InvalidHeader(name.to_string()))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(name.to_string()))
}

pub(crate) async fn build(
    base_url: &Url,
    base_headers: &[(HeaderName, BaseHeader)],
    timeout: Option<Duration>,
    method: Method,
    template: &PathTemplate,
    input: CallInput,
) -> Result<RequestConfig, ClientError> {
    let path = template.substitute(&input.path)?;
    let mut url = base_url.join(path.trim_start_matches('/'))?;
    if !input.query.is_empty() {
        url.query_pairs_mut().extend_pairs(&input.query);
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, header) in base_headers {
        if let Some(value) = header.resolve().await {
            headers.insert(name.clone(), header_value(name.as_str(), &value)?);
        }
    }
    if !input.cookies.is_empty() {
        let cookie = input
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        headers.insert(COOKIE, header_value("cookie", &cookie)?);
    }
    for (name, value) in &input.headers {
        headers.insert(header_name(name)?, header_value(name, value)?);
    }

    let body = match input.body {
        Some(body) if method.allows_body() => {
            Some(wire::to_vec(&body).map_err(ProtocolError::Body)?)
        }
        _ => None,
    };

    Ok(RequestConfig {
        method,
        url,
        headers,
        body,
        timeout,
        retried: false,
        extensions: Extensions::new(),
    })
}

/// Base URLs are directories, so a path prefix on them is kept when
/// joining route paths.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
