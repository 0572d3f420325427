//! Shared utilities for end-to-end tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::net::TcpListener;

use switchyard::http::SetCookie;
use switchyard::routing::{HandlerResult, RouteManifest, Route, Router};
use switchyard::schema::{Field, ObjectSchema};
use switchyard::{data, RequestContext, StatusKey, Value};

pub const SESSION_COOKIE: &str = "session";

/// Session state behind the test route tree.
#[derive(Debug)]
pub struct Sessions {
    current: Mutex<Option<String>>,
    refreshes: AtomicUsize,
    /// Refresh calls still to be answered with `failure`.
    failing_refreshes: AtomicUsize,
    failure: StatusKey,
}

impl Sessions {
    fn with_failures(failing_refreshes: usize, failure: StatusKey) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(None),
            refreshes: AtomicUsize::new(0),
            failing_refreshes: AtomicUsize::new(failing_refreshes),
            failure,
        })
    }

    pub fn new() -> Arc<Self> {
        Self::with_failures(0, StatusKey::Unauthorized)
    }

    /// A store whose refresh route always answers `UNAUTHORIZED`.
    pub fn rejecting() -> Arc<Self> {
        Self::with_failures(usize::MAX, StatusKey::Unauthorized)
    }

    /// A store whose first refresh fails with `INTERNAL_SERVER_ERROR`.
    pub fn flaky() -> Arc<Self> {
        Self::with_failures(1, StatusKey::InternalServerError)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn is_current(&self, token: &str) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            == Some(token)
    }

    fn rotate(&self) -> String {
        let n = self.refreshes.load(Ordering::SeqCst);
        let token = format!("session-{n}");
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        token
    }
}

async fn require_session(sessions: Arc<Sessions>, ctx: RequestContext) -> HandlerResult {
    let token = ctx
        .input()
        .cookies()
        .and_then(|c| c.get(SESSION_COOKIE))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if sessions.is_current(token) {
        Ok(ctx.success(data! { "userId" => "u1" }))
    } else {
        Ok(ctx.error(StatusKey::Unauthorized, Some("Session expired")))
    }
}

async fn refresh(sessions: Arc<Sessions>, ctx: RequestContext) -> HandlerResult {
    sessions.refreshes.fetch_add(1, Ordering::SeqCst);
    // Widen the window in which concurrent 401s pile up.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let failing = sessions
        .failing_refreshes
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return Ok(ctx.error(sessions.failure, Some("Refresh failed")));
    }
    let token = sessions.rotate();
    ctx.response().set_cookie(SetCookie::new(SESSION_COOKIE, token).http_only());
    Ok(ctx.ok())
}

async fn chat(ctx: RequestContext) -> HandlerResult {
    let chat_id = ctx.input().path_param("chatId").unwrap_or_default().to_string();
    let user_id = ctx.data().get("userId").cloned().unwrap_or_default();
    Ok(ctx.success(data! { "chatId" => chat_id, "userId" => user_id }))
}

async fn schedule(ctx: RequestContext) -> HandlerResult {
    let at: Option<DateTime<Utc>> = ctx
        .input()
        .body()
        .and_then(|b| b.get("at"))
        .and_then(Value::as_date)
        .copied();
    match at {
        Some(at) => Ok(ctx.success(data! { "at" => at, "nextDay" => at + chrono::Duration::days(1) })),
        None => Ok(ctx.error(StatusKey::BadRequest, Some("no date"))),
    }
}

async fn slow(ctx: RequestContext) -> HandlerResult {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Ok(ctx.ok())
}

/// `/auth/refresh-token`, `/chat/:chatId` (session required), `/schedule`
/// (date echo) and `/slow`.
pub fn routes(sessions: Arc<Sessions>) -> Router {
    let guard = {
        let sessions = sessions.clone();
        move |ctx: RequestContext| require_session(sessions.clone(), ctx)
    };
    let refresher = {
        let sessions = sessions.clone();
        move |ctx: RequestContext| refresh(sessions.clone(), ctx)
    };

    Router::new()
        .post("/auth/refresh-token", Route::new(refresher))
        .and_then(|r| {
            r.get(
                "/chat/:chatId",
                Route::new(chat)
                    .cookies(ObjectSchema::new().field(SESSION_COOKIE, Field::string().optional()))
                    .middleware(guard),
            )
        })
        .and_then(|r| {
            r.post(
                "/schedule",
                Route::new(schedule).body(ObjectSchema::new().field("at", Field::date())),
            )
        })
        .and_then(|r| r.get("/slow", Route::new(slow)))
        .unwrap()
}

/// Serve `router` on an ephemeral port; returns the base URL and manifest.
pub async fn serve(router: Router) -> (String, RouteManifest) {
    let manifest = router.manifest();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_axum()).await.unwrap();
    });
    (format!("http://{addr}"), manifest)
}
