//! Refresh-and-retry on `UNAUTHORIZED`.
//!
//! A 401 from any route other than the refresh route triggers one refresh
//! call, then a replay of the original exchange. Refreshes are single-flight:
//! every request is stamped with the number of refresh attempts finished
//! before it was sent. A 401 only refreshes when no attempt has finished
//! since its stamp; otherwise the caller reuses the outcome of the latest attempt,
//! replaying on success and keeping its own 401 on failure.
//!
//! A failed refresh only settles the calls that were in flight during it.
//! Requests sent afterwards carry a fresh stamp and try again.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use switchyard::path::{PathError, PathTemplate};
use switchyard::routing::Method;
use switchyard::StatusKey;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::interceptor::{Exchange, RequestInterceptor, RequestOutcome, ResponseInterceptor};
use crate::request::{CallInput, RequestConfig};
use crate::response::{ClientResponse, RawResponse};

/// Refresh attempts finished before a request was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attempts(u64);

#[derive(Debug)]
pub struct RefreshOnUnauthorized {
    path: PathTemplate,
    method: Method,
    attempts: AtomicU64,
    /// Whether the latest attempt succeeded.
    last_succeeded: Mutex<bool>,
}

impl RefreshOnUnauthorized {
    /// Refresh by calling `POST refresh_path`.
    pub fn new(refresh_path: &str) -> Result<Self, PathError> {
        Ok(Self {
            path: PathTemplate::parse(refresh_path)?,
            method: Method::Post,
            attempts: AtomicU64::new(0),
            last_succeeded: Mutex::new(false),
        })
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn refresh_path(&self) -> &PathTemplate {
        &self.path
    }

    /// Refresh calls completed so far.
    pub fn refreshes(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Returns whether the credentials are worth a replay for `stamp`.
    async fn refresh(&self, exchange: &Exchange<'_>, stamp: Option<u64>) -> bool {
        let mut last_succeeded = self.last_succeeded.lock().await;
        let current = self.attempts.load(Ordering::SeqCst);
        if stamp.is_some_and(|s| s < current) {
            debug!(stamp, current, succeeded = *last_succeeded, "Reusing concurrent refresh");
            return *last_succeeded;
        }

        let refreshed = exchange
            .client()
            .at(&self.path.to_string())
            .call(self.method, CallInput::new())
            .await;
        *last_succeeded = match refreshed {
            Ok(response) if response.is_ok() => true,
            Ok(response) => {
                warn!(status = %response.status(), path = %self.path, "Refresh rejected");
                false
            }
            Err(error) => {
                warn!(error = %error, path = %self.path, "Refresh failed");
                false
            }
        };
        self.attempts.fetch_add(1, Ordering::SeqCst);
        *last_succeeded
    }
}

#[async_trait]
impl RequestInterceptor for RefreshOnUnauthorized {
    async fn on_request(
        &self,
        _path: &PathTemplate,
        config: &RequestConfig,
    ) -> Result<RequestOutcome, ClientError> {
        let mut stamped = config.clone();
        stamped
            .extensions
            .insert(Attempts(self.attempts.load(Ordering::SeqCst)));
        Ok(RequestOutcome::Replace(stamped))
    }
}

#[async_trait]
impl ResponseInterceptor for RefreshOnUnauthorized {
    async fn on_response(
        &self,
        exchange: &Exchange<'_>,
        response: &RawResponse,
    ) -> Result<Option<ClientResponse>, ClientError> {
        if response.status != StatusKey::Unauthorized.code()
            || *exchange.path == self.path
            || exchange.retry.is_spent()
        {
            return Ok(None);
        }
        let stamp = exchange.config.extensions.get::<Attempts>().map(|a| a.0);
        if !self.refresh(exchange, stamp).await {
            return Ok(None);
        }
        exchange.retry.run().await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_parses_refresh_path() {
        let refresh = RefreshOnUnauthorized::new("auth/refresh-token/").unwrap();
        assert_eq!(refresh.refresh_path().to_string(), "/auth/refresh-token");
        assert_eq!(refresh.refreshes(), 0);
        assert!(RefreshOnUnauthorized::new("/auth/:").is_err());
    }
}
