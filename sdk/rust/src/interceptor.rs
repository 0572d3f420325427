//! Interceptor chains.
//!
//! Each call runs three sequential phases:
//!
//! ```text
//! on_request*  ──▶ exchange ──▶ on_response* ──▶ decode
//!     │                │              │             │
//!     └──── Err ───────┴──── Err ─────┴──── Err ────┴──▶ on_error* ──▶ Err
//! ```
//!
//! Any interceptor may short-circuit its phase with a complete response.
//! Response and error interceptors receive a [`Retry`] that replays the
//! exchange (never the request phase) at most once per call.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use switchyard::path::PathTemplate;
use tracing::info;

use crate::client::Client;
use crate::error::ClientError;
use crate::request::RequestConfig;
use crate::response::{ClientResponse, RawResponse};

/// What a request interceptor decided.
#[derive(Debug)]
pub enum RequestOutcome {
    Continue,
    /// Continue with a rewritten request.
    Replace(RequestConfig),
    /// Answer the call without touching the network.
    Respond(ClientResponse),
}

#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn on_request(
        &self,
        path: &PathTemplate,
        config: &RequestConfig,
    ) -> Result<RequestOutcome, ClientError>;
}

#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// `Some` ends the phase with that response.
    async fn on_response(
        &self,
        exchange: &Exchange<'_>,
        response: &RawResponse,
    ) -> Result<Option<ClientResponse>, ClientError>;
}

#[async_trait]
pub trait ErrorInterceptor: Send + Sync {
    /// `Some` resolves the error; `Err` replaces it.
    async fn on_error(
        &self,
        exchange: &Exchange<'_>,
        error: &ClientError,
    ) -> Result<Option<ClientResponse>, ClientError>;
}

/// The call in flight, as response and error interceptors see it.
pub struct Exchange<'a> {
    /// Route template the call was addressed to.
    pub path: &'a PathTemplate,
    /// The request as sent, after the request phase.
    pub config: &'a RequestConfig,
    pub retry: &'a Retry,
}

impl Exchange<'_> {
    /// The client that made the call, for side calls such as a refresh.
    pub fn client(&self) -> &Client {
        &self.retry.client
    }
}

/// One replay of a call's network exchange.
pub struct Retry {
    client: Client,
    config: RequestConfig,
    spent: AtomicBool,
}

impl Retry {
    pub(crate) fn new(client: Client, config: RequestConfig) -> Self {
        Self {
            client,
            config,
            spent: AtomicBool::new(false),
        }
    }

    pub(crate) fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Whether this call's retry has been used.
    pub fn is_spent(&self) -> bool {
        self.config.retried || self.spent.load(Ordering::SeqCst)
    }

    /// Replay the exchange with the original request.
    pub async fn run(&self) -> Result<ClientResponse, ClientError> {
        self.run_with(self.config.clone()).await
    }

    /// Replay the exchange with a modified request.
    ///
    /// Fails with [`ClientError::RetryExhausted`] on second use, or when the
    /// call being replayed is itself a retry.
    pub async fn run_with(&self, mut config: RequestConfig) -> Result<ClientResponse, ClientError> {
        if self.config.retried || self.spent.swap(true, Ordering::SeqCst) {
            return Err(ClientError::RetryExhausted);
        }
        config.retried = true;
        info!(method = %config.method, url = %config.url, "Retrying request");
        self.client.exchange(&config).await?.decode()
    }
}
