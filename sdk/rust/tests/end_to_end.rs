//! Client calls against a real server on an ephemeral port.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use switchyard::envelope::Envelope;
use switchyard::path::PathTemplate;
use switchyard::{data, StatusKey, Value};

use switchyard_client::{
    CallInput, Client, ClientError, ClientOptions, ClientResponse, Credentials, ErrorInterceptor,
    Exchange, RefreshOnUnauthorized, RequestConfig, RequestInterceptor, RequestOutcome,
};

mod common;
use common::{routes, serve, Sessions};

async fn client_with_refresh(sessions: Arc<Sessions>) -> (Client, Arc<RefreshOnUnauthorized>) {
    let (base_url, manifest) = serve(routes(sessions)).await;
    let refresh = Arc::new(RefreshOnUnauthorized::new("/auth/refresh-token").unwrap());
    let client = Client::builder(ClientOptions::new(base_url), manifest)
        .credentials(Credentials::Include)
        .refresh_on_unauthorized(refresh.clone())
        .build()
        .unwrap();
    (client, refresh)
}

#[tokio::test]
async fn test_expired_session_is_refreshed_and_retried() {
    let sessions = Sessions::new();
    let (client, refresh) = client_with_refresh(sessions.clone()).await;

    let response = client
        .at("chat/:chatId")
        .get(CallInput::new().path("chatId", "c1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusKey::Ok);
    let data = response.data().unwrap();
    assert_eq!(data.get("chatId").and_then(Value::as_str), Some("c1"));
    assert_eq!(data.get("userId").and_then(Value::as_str), Some("u1"));
    assert_eq!(sessions.refreshes(), 1);
    assert_eq!(refresh.refreshes(), 1);

    // The refreshed cookie is now in the jar.
    let again = client
        .at("chat/:chatId")
        .get(CallInput::new().path("chatId", "c2"))
        .await
        .unwrap();
    assert!(again.is_ok());
    assert_eq!(sessions.refreshes(), 1);
}

#[tokio::test]
async fn test_rejected_refresh_does_not_loop() {
    let sessions = Sessions::rejecting();
    let (client, refresh) = client_with_refresh(sessions.clone()).await;

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        client.at("chat/:chatId").get(CallInput::new().path("chatId", "c1")),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(response.status(), StatusKey::Unauthorized);
    assert_eq!(response.error().unwrap().message, "Session expired");
    assert_eq!(sessions.refreshes(), 1);
    assert_eq!(refresh.refreshes(), 1);

    // A later call tries again, once.
    let second = client
        .at("chat/:chatId")
        .get(CallInput::new().path("chatId", "c1"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusKey::Unauthorized);
    assert_eq!(sessions.refreshes(), 2);
}

#[tokio::test]
async fn test_later_call_recovers_after_failed_refresh() {
    let sessions = Sessions::flaky();
    let (client, refresh) = client_with_refresh(sessions.clone()).await;

    let first = client
        .at("chat/:chatId")
        .get(CallInput::new().path("chatId", "c1"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusKey::Unauthorized);
    assert_eq!(sessions.refreshes(), 1);

    let second = client
        .at("chat/:chatId")
        .get(CallInput::new().path("chatId", "c1"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusKey::Ok);
    assert_eq!(sessions.refreshes(), 2);
    assert_eq!(refresh.refreshes(), 2);
}

#[tokio::test]
async fn test_concurrent_unauthorized_calls_share_one_refresh() {
    let sessions = Sessions::new();
    let (client, _refresh) = client_with_refresh(sessions.clone()).await;

    let calls = (0..5).map(|i| {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .at("chat/:chatId")
                .get(CallInput::new().path("chatId", i))
                .await
        })
    });
    let results = futures_util::future::join_all(calls).await;

    for result in results {
        assert!(result.unwrap().unwrap().is_ok());
    }
    assert_eq!(sessions.refreshes(), 1);
}

#[tokio::test]
async fn test_timeout_surfaces_as_error() {
    let (base_url, manifest) = serve(routes(Sessions::new())).await;
    let client = Client::builder(ClientOptions::new(base_url), manifest)
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let err = client.at("slow").get(CallInput::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_millis(100)));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_dates_round_trip() {
    let (base_url, manifest) = serve(routes(Sessions::new())).await;
    let client = Client::builder(ClientOptions::new(base_url), manifest)
        .build()
        .unwrap();
    let at = Utc.with_ymd_and_hms(2024, 2, 28, 12, 30, 0).unwrap();

    let response = client
        .at("schedule")
        .post(CallInput::new().body(data! { "at" => at }))
        .await
        .unwrap();

    let data = response.data().unwrap();
    assert_eq!(data.get("at").and_then(Value::as_date), Some(&at));
    assert_eq!(
        data.get("nextDay").and_then(Value::as_date),
        Some(&Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap())
    );
    assert_eq!(response.raw().unwrap().status, 200);
}

#[tokio::test]
async fn test_unknown_route_is_rejected_before_io() {
    let (base_url, manifest) = serve(routes(Sessions::new())).await;
    let client = Client::builder(ClientOptions::new(base_url), manifest)
        .build()
        .unwrap();

    let err = client.at("chat/:chatId").delete(CallInput::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::UnknownRoute { .. }));

    let err = client.at("chat/:chatId").get(CallInput::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Path(_)));
}

struct Canned(Arc<AtomicUsize>);

#[async_trait]
impl RequestInterceptor for Canned {
    async fn on_request(
        &self,
        _path: &PathTemplate,
        _config: &RequestConfig,
    ) -> Result<RequestOutcome, ClientError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(RequestOutcome::Respond(ClientResponse::new(Envelope::success(
            data! { "cached" => true },
        ))))
    }
}

#[tokio::test]
async fn test_request_interceptor_short_circuits() {
    let seen = Arc::new(AtomicUsize::new(0));
    let sessions = Sessions::new();
    let (base_url, manifest) = serve(routes(sessions.clone())).await;
    let client = Client::builder(ClientOptions::new(base_url), manifest)
        .on_request(Canned(seen.clone()))
        .build()
        .unwrap();

    let response = client
        .at("auth/refresh-token")
        .post(CallInput::new())
        .await
        .unwrap();
    assert_eq!(response.data().and_then(|d| d.get("cached")), Some(&Value::Bool(true)));
    assert!(response.raw().is_none());
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(sessions.refreshes(), 0);
}

#[tokio::test]
async fn test_server_timeout_arrives_as_envelope() {
    let router = routes(Sessions::new()).with_request_timeout(Duration::from_millis(50));
    let (base_url, manifest) = serve(router).await;
    let client = Client::builder(ClientOptions::new(base_url), manifest)
        .build()
        .unwrap();

    let response = client.at("slow").get(CallInput::new()).await.unwrap();
    assert_eq!(response.status(), StatusKey::RequestTimeout);
    assert_eq!(response.raw().unwrap().status, 408);
}

/// Resolves transport failures with a `TOO_MANY_REQUESTS` envelope.
struct Fallback;

#[async_trait]
impl ErrorInterceptor for Fallback {
    async fn on_error(
        &self,
        exchange: &Exchange<'_>,
        error: &ClientError,
    ) -> Result<Option<ClientResponse>, ClientError> {
        assert!(!exchange.retry.is_spent());
        Ok(error.is_transport().then(|| {
            ClientResponse::new(Envelope::error(StatusKey::TooManyRequests, Some("busy")))
        }))
    }
}

#[tokio::test]
async fn test_error_interceptor_resolves_timeout() {
    let (base_url, manifest) = serve(routes(Sessions::new())).await;
    let client = Client::builder(ClientOptions::new(base_url), manifest)
        .timeout(Duration::from_millis(50))
        .on_error(Fallback)
        .build()
        .unwrap();

    let response = client.at("slow").get(CallInput::new()).await.unwrap();
    assert_eq!(response.status(), StatusKey::TooManyRequests);
    assert_eq!(response.error().unwrap().message, "busy");
}
