//! Envelope to HTTP response.
//!
//! The status code comes from the envelope's status key, the body is the
//! wire encoding of [`Envelope::to_body`], and headers queued on the
//! [`ResponseHandle`](crate::context::ResponseHandle) are added on top.

use std::fmt;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, Response, StatusCode};

use crate::envelope::Envelope;
use crate::wire;

/// Build the response for an envelope.
pub fn envelope_response(envelope: &Envelope, headers: HeaderMap) -> Response<Body> {
    let (status, body) = match wire::to_vec(&envelope.to_body()) {
        Ok(body) => (envelope.status().http_status(), body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode envelope");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"json":{"error":{"key":"INTERNAL_SERVER_ERROR","code":500,"label":"Internal Server Error","message":"An unexpected error occurred."}}}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    // Queued headers replace defaults of the same name; repeated values
    // (Set-Cookie) are all kept.
    for name in headers.keys() {
        response.headers_mut().remove(name);
    }
    for (name, value) in headers.iter() {
        response.headers_mut().append(name.clone(), value.clone());
    }
    response
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

/// A `Set-Cookie` header value.
///
/// ```
/// use std::time::Duration;
/// use switchyard::http::{SameSite, SetCookie};
///
/// let cookie = SetCookie::new("session", "abc")
///     .http_only()
///     .secure()
///     .same_site(SameSite::Lax)
///     .max_age(Duration::from_secs(3600));
/// assert_eq!(
///     cookie.to_string(),
///     "session=abc; Path=/; Max-Age=3600; HttpOnly; Secure; SameSite=Lax"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    path: String,
    max_age: Option<Duration>,
    http_only: bool,
    secure: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            max_age: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    /// Expire the cookie immediately.
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age(Duration::ZERO)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.as_secs())?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        Ok(())
    }
}
