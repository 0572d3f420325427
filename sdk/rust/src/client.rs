//! The client dispatcher.
//!
//! A [`Client`] is built once from [`ClientOptions`] and the server's
//! [`RouteManifest`], then addressed through [`CallNode`]s. Clones share
//! the transport, cookie jar and interceptor chains.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use http::HeaderName;
use serde::{Deserialize, Serialize};
use switchyard::path::PathTemplate;
use switchyard::routing::{Method, RouteManifest};
use tracing::debug;
use url::Url;

use crate::error::ClientError;
use crate::interceptor::{
    ErrorInterceptor, Exchange, RequestInterceptor, RequestOutcome, ResponseInterceptor, Retry,
};
use crate::node::{CallNode, CallTree};
use crate::refresh::RefreshOnUnauthorized;
use crate::request::{self, header_name, BaseHeader, CallInput, HeaderProvider, RequestConfig};
use crate::response::{ClientResponse, RawResponse};

/// Whether the transport keeps and replays cookies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Credentials {
    /// Cookies set by the server are stored and sent back.
    Include,
    #[default]
    Omit,
}

/// Construction options, loadable from TOML.
///
/// ```toml
/// base_url = "http://localhost:5000"
/// timeout_ms = 5000
/// credentials = "include"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    pub base_url: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub credentials: Credentials,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: None,
            credentials: Credentials::default(),
        }
    }
}

struct Inner {
    http: reqwest::Client,
    base_url: Url,
    base_headers: Vec<(HeaderName, BaseHeader)>,
    timeout: Option<Duration>,
    tree: CallTree,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    error_interceptors: Vec<Arc<dyn ErrorInterceptor>>,
}

#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder(options: ClientOptions, manifest: RouteManifest) -> ClientBuilder {
        ClientBuilder::new(options, manifest)
    }

    /// Address a node of the route tree, e.g. `client.at("chat/:chatId")`.
    pub fn at(&self, path: &str) -> CallNode {
        CallNode::root(self.clone()).at(path)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub(crate) fn tree(&self) -> &CallTree {
        &self.inner.tree
    }

    pub(crate) async fn execute(
        &self,
        method: Method,
        template: &PathTemplate,
        input: CallInput,
    ) -> Result<ClientResponse, ClientError> {
        let config = request::build(
            &self.inner.base_url,
            &self.inner.base_headers,
            self.inner.timeout,
            method,
            template,
            input,
        )
        .await?;
        debug!(method = %method, path = %template, url = %config.url, "Dispatching call");
        self.dispatch(template, config).await
    }

    async fn dispatch(
        &self,
        template: &PathTemplate,
        mut config: RequestConfig,
    ) -> Result<ClientResponse, ClientError> {
        let mut failure = None;
        for interceptor in &self.inner.request_interceptors {
            match interceptor.on_request(template, &config).await {
                Ok(RequestOutcome::Continue) => {}
                Ok(RequestOutcome::Replace(next)) => config = next,
                Ok(RequestOutcome::Respond(response)) => return Ok(response),
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }

        let retry = Retry::new(self.clone(), config);
        let exchange = Exchange {
            path: template,
            config: retry.config(),
            retry: &retry,
        };
        let error = match failure {
            Some(error) => error,
            None => match self.respond(&exchange).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            },
        };

        debug!(error = %error, path = %template, "Call failed");
        for interceptor in &self.inner.error_interceptors {
            if let Some(response) = interceptor.on_error(&exchange, &error).await? {
                return Ok(response);
            }
        }
        Err(error)
    }

    async fn respond(&self, exchange: &Exchange<'_>) -> Result<ClientResponse, ClientError> {
        let raw = self.exchange(exchange.config).await?;
        for interceptor in &self.inner.response_interceptors {
            if let Some(response) = interceptor.on_response(exchange, &raw).await? {
                return Ok(response);
            }
        }
        raw.decode()
    }

    /// One network round trip.
    pub(crate) async fn exchange(&self, config: &RequestConfig) -> Result<RawResponse, ClientError> {
        let mut request = self
            .inner
            .http
            .request(config.method.to_http(), config.url.clone())
            .headers(config.headers.clone());
        if let Some(body) = &config.body {
            request = request.body(body.clone());
        }
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, config.timeout))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(e, config.timeout))?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

pub struct ClientBuilder {
    options: ClientOptions,
    manifest: RouteManifest,
    base_headers: Vec<(String, BaseHeader)>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    error_interceptors: Vec<Arc<dyn ErrorInterceptor>>,
}

impl ClientBuilder {
    fn new(options: ClientOptions, manifest: RouteManifest) -> Self {
        Self {
            options,
            manifest,
            base_headers: Vec::new(),
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
            error_interceptors: Vec::new(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.options.credentials = credentials;
        self
    }

    /// Send `name: value` on every request unless the call overrides it.
    pub fn base_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.base_headers
            .push((name.into(), BaseHeader::Literal(value.into())));
        self
    }

    /// Resolve `name` before every request; `None` omits the header.
    pub fn base_header_with<F, Fut>(mut self, name: impl Into<String>, provider: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        let provider: HeaderProvider =
            Arc::new(move || -> BoxFuture<'static, Option<String>> { Box::pin(provider()) });
        self.base_headers
            .push((name.into(), BaseHeader::Provider(provider)));
        self
    }

    pub fn on_request(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request_interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn on_response(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response_interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn on_error(mut self, interceptor: impl ErrorInterceptor + 'static) -> Self {
        self.error_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Install refresh-and-retry in both the request and response chains.
    pub fn refresh_on_unauthorized(mut self, refresh: Arc<RefreshOnUnauthorized>) -> Self {
        self.request_interceptors.push(refresh.clone());
        self.response_interceptors.push(refresh);
        self
    }

    pub fn build(self) -> Result<Client, ClientError> {
        let base_url = request::normalize_base_url(&self.options.base_url)?;
        let tree = CallTree::from_manifest(&self.manifest)?;
        let base_headers = self
            .base_headers
            .into_iter()
            .map(|(name, value)| Ok((header_name(&name)?, value)))
            .collect::<Result<Vec<_>, ClientError>>()?;

        let mut http = reqwest::Client::builder();
        if self.options.credentials == Credentials::Include {
            http = http.cookie_store(true);
        }
        let http = http.build()?;

        Ok(Client {
            inner: Arc::new(Inner {
                http,
                base_url,
                base_headers,
                timeout: self.options.timeout_ms.map(Duration::from_millis),
                tree,
                request_interceptors: self.request_interceptors,
                response_interceptors: self.response_interceptors,
                error_interceptors: self.error_interceptors,
            }),
        })
    }
}
