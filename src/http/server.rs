//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the [`Router`] in an axum app
//! - Wire up middleware (tracing, request ID) and the router's request timeout
//! - Bind server to listener and stop on the shutdown signal

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::routing::Router;

/// HTTP server hosting one route tree.
pub struct HttpServer {
    app: axum::Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let router = router
            .with_body_limit(config.limits.max_body_bytes)
            .with_request_timeout(Duration::from_secs(config.timeouts.request_secs));
        let app = Self::build_app(router);
        Self { app, config }
    }

    /// Build the axum app with all middleware layers.
    fn build_app(router: Router) -> axum::Router {
        router
            .into_axum()
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::lifecycle::Shutdown;
    use crate::routing::{HandlerResult, Route};
    use crate::{data, RequestContext};

    async fn ping(ctx: RequestContext) -> HandlerResult {
        Ok(ctx.success(data! { "pong" => true }))
    }

    #[tokio::test]
    async fn test_serves_and_shuts_down() {
        let router = Router::new().get("/ping", Route::new(ping)).unwrap();
        let server = HttpServer::new(ServerConfig::default(), router);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /ping HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.to_ascii_lowercase().contains("x-request-id:"));
        assert!(response.contains(r#"{"json":{"pong":true}}"#), "{response}");

        shutdown.trigger();
        handle.await.unwrap().unwrap();
    }
}
