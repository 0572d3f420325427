//! Route registry and request dispatch.
//!
//! # Responsibilities
//! - Register routes, rejecting duplicate `(method, path)` pairs
//! - Compose sub-routers under a prefix
//! - Match incoming requests, validate their input, run the pipeline
//! - Turn the resulting envelope into an HTTP response
//!
//! # Design Decisions
//! - Routes are checked in registration order; the first match wins
//! - A path that matches with the wrong verb is `METHOD_NOT_ALLOWED`
//! - Channels are validated in a fixed order and the first failure is final

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::request::Parts;
use axum::http::{Request, Response};
use thiserror::Error;

use super::manifest::{RouteManifest, RouteSignature};
use super::method::Method;
use super::pipeline;
use super::route::Route;
use crate::context::{Channel, Input, RequestContext, ResponseHandle};
use crate::envelope::Envelope;
use crate::http::request::{self as inbound, BodyError, X_REQUEST_ID};
use crate::http::response::envelope_response;
use crate::observability::metrics;
use crate::path::{PathError, PathTemplate};
use crate::schema::{describe, Coercion, Field, ObjectSchema, Schema};
use crate::status::StatusKey;
use crate::value::Value;

/// Default body size limit: 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    #[error(transparent)]
    InvalidTemplate(#[from] PathError),
}

#[derive(Debug, Clone)]
struct RouteEntry {
    method: Method,
    template: PathTemplate,
    /// Normalized template, used as the metrics and log label.
    label: Arc<str>,
    path_schema: Arc<ObjectSchema>,
    route: Arc<Route>,
}

impl RouteEntry {
    fn new(method: Method, template: PathTemplate, route: Arc<Route>) -> Self {
        let path_schema = template
            .params()
            .fold(ObjectSchema::new(), |schema, name| schema.field(name, Field::string()));
        Self {
            method,
            label: Arc::from(template.to_string()),
            template,
            path_schema: Arc::new(path_schema),
            route,
        }
    }
}

enum Lookup<'a> {
    Found(&'a RouteEntry, Value),
    WrongMethod,
    Missing,
}

#[derive(Debug, Clone)]
pub struct Router {
    entries: Vec<RouteEntry>,
    body_limit: usize,
    request_timeout: Option<Duration>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            body_limit: DEFAULT_BODY_LIMIT,
            request_timeout: None,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Answer `REQUEST_TIMEOUT` when input reading, middleware and handler
    /// together take longer than `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn register(self, method: Method, path: &str, route: Route) -> Result<Self, RouterError> {
        let template = PathTemplate::parse(path)?;
        self.insert(RouteEntry::new(method, template, Arc::new(route)))
    }

    pub fn get(self, path: &str, route: Route) -> Result<Self, RouterError> {
        self.register(Method::Get, path, route)
    }

    pub fn post(self, path: &str, route: Route) -> Result<Self, RouterError> {
        self.register(Method::Post, path, route)
    }

    pub fn put(self, path: &str, route: Route) -> Result<Self, RouterError> {
        self.register(Method::Put, path, route)
    }

    pub fn patch(self, path: &str, route: Route) -> Result<Self, RouterError> {
        self.register(Method::Patch, path, route)
    }

    pub fn delete(self, path: &str, route: Route) -> Result<Self, RouterError> {
        self.register(Method::Delete, path, route)
    }

    pub fn options(self, path: &str, route: Route) -> Result<Self, RouterError> {
        self.register(Method::Options, path, route)
    }

    pub fn head(self, path: &str, route: Route) -> Result<Self, RouterError> {
        self.register(Method::Head, path, route)
    }

    /// Register every route of `sub` under `prefix`.
    pub fn mount(mut self, prefix: &str, sub: Router) -> Result<Self, RouterError> {
        let prefix = PathTemplate::parse(prefix)?;
        for entry in sub.entries {
            let template = prefix.join(&entry.template)?;
            self = self.insert(RouteEntry::new(entry.method, template, entry.route))?;
        }
        Ok(self)
    }

    fn insert(mut self, entry: RouteEntry) -> Result<Self, RouterError> {
        if self
            .entries
            .iter()
            .any(|e| e.method == entry.method && e.template == entry.template)
        {
            return Err(RouterError::DuplicateRoute {
                method: entry.method,
                path: entry.label.to_string(),
            });
        }
        tracing::debug!(method = %entry.method, path = %entry.label, "Route registered");
        self.entries.push(entry);
        Ok(self)
    }

    pub fn manifest(&self) -> RouteManifest {
        RouteManifest {
            routes: self
                .entries
                .iter()
                .map(|e| RouteSignature {
                    method: e.method,
                    path: e.label.to_string(),
                })
                .collect(),
        }
    }

    fn lookup(&self, method: Option<Method>, path: &str) -> Lookup<'_> {
        let mut path_matched = false;
        for entry in &self.entries {
            if let Some(params) = entry.template.match_path(path) {
                if Some(entry.method) == method {
                    let params = Value::object(params.into_iter().map(|(k, v)| (k, Value::String(v))));
                    return Lookup::Found(entry, params);
                }
                path_matched = true;
            }
        }
        if path_matched {
            Lookup::WrongMethod
        } else {
            Lookup::Missing
        }
    }

    /// Dispatch one request.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let started = Instant::now();
        let request_id = inbound::request_id(&request);
        let (parts, body) = request.into_parts();
        let method_label = parts.method.as_str().to_string();
        let path = parts.uri.path().to_string();
        let response = ResponseHandle::default();

        let (envelope, route_label) = match self.lookup(Method::from_http(&parts.method), &path) {
            Lookup::Found(entry, params) => {
                tracing::debug!(request_id = %request_id, method = %entry.method, route = %entry.label, "Matched route");
                let run = self.run(entry, params, parts, body, &request_id, response.clone());
                let envelope = match self.request_timeout {
                    Some(limit) => tokio::time::timeout(limit, run).await.unwrap_or_else(|_| {
                        tracing::warn!(request_id = %request_id, route = %entry.label, timeout_ms = limit.as_millis() as u64, "Request timed out");
                        Envelope::error(
                            StatusKey::RequestTimeout,
                            Some(&format!("request took longer than {}ms", limit.as_millis())),
                        )
                    }),
                    None => run.await,
                };
                (envelope, entry.label.to_string())
            }
            Lookup::WrongMethod => {
                let message = format!("{method_label} is not allowed on {path}");
                (
                    Envelope::error(StatusKey::MethodNotAllowed, Some(&message)),
                    "unmatched".to_string(),
                )
            }
            Lookup::Missing => {
                let message = format!("no route for {method_label} {path}");
                tracing::debug!(request_id = %request_id, path = %path, "No route matched");
                (
                    Envelope::error(StatusKey::NotFound, Some(&message)),
                    "unmatched".to_string(),
                )
            }
        };

        let status = envelope.status();
        metrics::record_request(&method_label, &route_label, status.code(), started);

        let mut http_response = envelope_response(&envelope, response.take_headers());
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            http_response.headers_mut().insert(X_REQUEST_ID, value);
        }
        http_response
    }

    async fn run(
        &self,
        entry: &RouteEntry,
        params: Value,
        parts: Parts,
        body: Body,
        request_id: &str,
        response: ResponseHandle,
    ) -> Envelope {
        let route = entry.route.as_ref();
        let mut input = Input::default();
        let mut body = Some(body);

        for channel in Channel::VALIDATION_ORDER {
            let schema: &dyn Schema = match channel {
                Channel::Path => &*entry.path_schema,
                _ => match route.schema(channel) {
                    Some(schema) => &**schema,
                    None => continue,
                },
            };
            let coercion = match channel {
                Channel::Body => Coercion::Strict,
                _ => Coercion::FromStrings,
            };

            let raw = match channel {
                Channel::Headers => inbound::headers_to_value(&parts.headers),
                Channel::Body => {
                    let decoded = inbound::read_body(body.take().unwrap_or_default(), self.body_limit)
                        .await
                        .and_then(|bytes| inbound::decode_body(&parts.headers, &bytes));
                    match decoded {
                        Ok(value) => value,
                        Err(e) => {
                            tracing::warn!(request_id = %request_id, route = %entry.label, error = %e, "Rejected request body");
                            return body_failure(&e);
                        }
                    }
                }
                Channel::Path => params.clone(),
                Channel::Query => inbound::query_to_value(parts.uri.query()),
                Channel::Cookies => inbound::cookies_to_value(&parts.headers),
            };

            match schema.parse(&raw, coercion) {
                Ok(value) => input.set(channel, value),
                Err(issues) => {
                    let message = describe(channel.as_str(), &issues);
                    tracing::warn!(request_id = %request_id, route = %entry.label, %message, "Input validation failed");
                    return Envelope::error(StatusKey::BadRequest, Some(&message));
                }
            }
        }

        let ctx = RequestContext::new(input, parts, response, request_id);
        pipeline::run(route, ctx, &entry.label).await
    }

    /// An axum router that sends every request to [`Router::handle`].
    pub fn into_axum(self) -> axum::Router {
        let router = Arc::new(self);
        axum::Router::new().fallback(move |request: Request<Body>| {
            let router = Arc::clone(&router);
            async move { router.handle(request).await }
        })
    }
}

fn body_failure(error: &BodyError) -> Envelope {
    let key = match error {
        BodyError::TooLarge(_) => StatusKey::PayloadTooLarge,
        BodyError::Read(_) | BodyError::Malformed(_) => StatusKey::BadRequest,
    };
    Envelope::error(key, Some(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(ctx: RequestContext) -> crate::routing::HandlerResult {
        Ok(ctx.ok())
    }

    #[test]
    fn test_duplicate_route() {
        let err = Router::new()
            .get("/chat/:chatId", Route::new(noop))
            .and_then(|r| r.get("/chat/:chatId/", Route::new(noop)))
            .unwrap_err();
        assert!(matches!(
            err,
            RouterError::DuplicateRoute { method: Method::Get, ref path } if path == "/chat/:chatId"
        ));

        // Same path, different verb is fine.
        assert!(Router::new()
            .get("/chat", Route::new(noop))
            .and_then(|r| r.post("/chat", Route::new(noop)))
            .is_ok());
    }

    #[test]
    fn test_mount_concatenates_templates() {
        let chat = Router::new()
            .get("/:chatId", Route::new(noop))
            .and_then(|r| r.delete("/:chatId", Route::new(noop)))
            .unwrap();
        let api = Router::new().mount("/org/:orgId/chat", chat).unwrap();
        let manifest = api.manifest();
        assert_eq!(
            manifest.routes,
            vec![
                RouteSignature { method: Method::Get, path: "/org/:orgId/chat/:chatId".into() },
                RouteSignature { method: Method::Delete, path: "/org/:orgId/chat/:chatId".into() },
            ]
        );
        assert_eq!(
            api.entries[0].path_schema.field_names().collect::<Vec<_>>(),
            vec!["orgId", "chatId"]
        );
    }

    #[test]
    fn test_mount_rejects_collisions() {
        let sub = Router::new().get("/health", Route::new(noop)).unwrap();
        let root = Router::new().get("/api/health", Route::new(noop)).unwrap();
        assert!(matches!(
            root.mount("/api", sub),
            Err(RouterError::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn test_lookup_order() {
        let router = Router::new()
            .get("/chat/:chatId", Route::new(noop))
            .and_then(|r| r.get("/chat/latest", Route::new(noop)))
            .unwrap();
        match router.lookup(Some(Method::Get), "/chat/latest") {
            Lookup::Found(entry, params) => {
                assert_eq!(&*entry.label, "/chat/:chatId");
                assert_eq!(params.get("chatId").and_then(Value::as_str), Some("latest"));
            }
            _ => panic!("expected a match"),
        }
        assert!(matches!(router.lookup(Some(Method::Post), "/chat/1"), Lookup::WrongMethod));
        assert!(matches!(router.lookup(None, "/chat/1"), Lookup::WrongMethod));
        assert!(matches!(router.lookup(Some(Method::Get), "/nope"), Lookup::Missing));
    }
}
