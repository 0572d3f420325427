//! Demonstration route tree served by the `switchyard` binary.
//!
//! Sessions live in memory: `POST /auth/session` issues a short-lived
//! session cookie and a refresh cookie, `POST /auth/refresh-token` trades
//! the refresh cookie for a new session, and `/chat/:chatId` requires a
//! live session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use switchyard::http::{SameSite, SetCookie};
use switchyard::routing::{HandlerResult, Route, Router, RouterError};
use switchyard::schema::{Field, ObjectSchema};
use switchyard::{data, RequestContext, StatusKey, Value};

const SESSION_COOKIE: &str = "session";
const REFRESH_COOKIE: &str = "refresh";
const SESSION_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Store {
    sessions: HashMap<String, Session>,
    refresh_tokens: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<Store>>,
}

impl SessionStore {
    fn with<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Issue a session for `user_id`; returns `(session, expiry)`.
    /// Expired sessions are evicted on the way.
    fn open(&self, user_id: &str) -> (String, DateTime<Utc>) {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + SESSION_TTL;
        self.with(|store| {
            store.sessions.retain(|_, s| s.expires_at > now);
            store.sessions.insert(
                token.clone(),
                Session {
                    user_id: user_id.to_string(),
                    expires_at,
                },
            )
        });
        (token, expires_at)
    }

    fn issue_refresh(&self, user_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.with(|store| store.refresh_tokens.insert(token.clone(), user_id.to_string()));
        token
    }

    fn user_for_session(&self, token: &str) -> Option<String> {
        self.with(|store| {
            store
                .sessions
                .get(token)
                .filter(|s| s.expires_at > Utc::now())
                .map(|s| s.user_id.clone())
        })
    }

    fn user_for_refresh(&self, token: &str) -> Option<String> {
        self.with(|store| store.refresh_tokens.get(token).cloned())
    }
}

fn session_cookie(token: &str) -> SetCookie {
    SetCookie::new(SESSION_COOKIE, token)
        .http_only()
        .same_site(SameSite::Lax)
        .max_age(SESSION_TTL)
}

async fn health(ctx: RequestContext) -> HandlerResult {
    Ok(ctx.success(data! { "status" => "ok", "time" => Utc::now() }))
}

/// Resolves the session cookie to `userId`, or answers `UNAUTHORIZED`.
fn require_session(
    store: SessionStore,
) -> impl Fn(RequestContext) -> futures_util::future::Ready<HandlerResult> + Send + Sync + 'static {
    move |ctx: RequestContext| {
        let user = ctx
            .input()
            .cookies()
            .and_then(|c| c.get(SESSION_COOKIE))
            .and_then(Value::as_str)
            .and_then(|token| store.user_for_session(token));
        futures_util::future::ready(Ok(match user {
            Some(user_id) => ctx.success(data! { "userId" => user_id }),
            None => ctx.error(StatusKey::Unauthorized, Some("Session expired")),
        }))
    }
}

pub fn routes() -> Result<Router, RouterError> {
    let store = SessionStore::default();

    let login = {
        let store = store.clone();
        move |ctx: RequestContext| {
            let store = store.clone();
            async move {
                let phone = ctx
                    .input()
                    .body()
                    .and_then(|b| b.get("phoneNumber"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let user_id = format!("user-{}", phone.chars().rev().take(4).collect::<String>());
                let (session, expires_at) = store.open(&user_id);
                let refresh = store.issue_refresh(&user_id);
                ctx.response().set_cookie(session_cookie(&session));
                ctx.response()
                    .set_cookie(SetCookie::new(REFRESH_COOKIE, refresh).http_only().same_site(SameSite::Strict));
                Ok::<_, tower::BoxError>(ctx.success(data! { "userId" => user_id, "expiresAt" => expires_at }))
            }
        }
    };

    let refresh = {
        let store = store.clone();
        move |ctx: RequestContext| {
            let store = store.clone();
            async move {
                let token = ctx
                    .input()
                    .cookies()
                    .and_then(|c| c.get(REFRESH_COOKIE))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let Some(user_id) = store.user_for_refresh(token) else {
                    return Ok::<_, tower::BoxError>(
                        ctx.error(StatusKey::Unauthorized, Some("Refresh token is not valid")),
                    );
                };
                let (session, expires_at) = store.open(&user_id);
                ctx.response().set_cookie(session_cookie(&session));
                Ok(ctx.success(data! { "expiresAt" => expires_at }))
            }
        }
    };

    let chat = |ctx: RequestContext| async move {
        let chat_id = ctx.input().path_param("chatId").unwrap_or_default().to_string();
        let page = ctx
            .input()
            .query()
            .and_then(|q| q.get("page"))
            .and_then(Value::as_i64)
            .unwrap_or(1);
        let user_id = ctx.data().get("userId").cloned().unwrap_or_default();
        let messages = Value::Array(vec![Value::object([
            ("from", user_id.clone()),
            ("text", Value::from("hello")),
            ("sentAt", Value::from(Utc::now())),
        ])]);
        Ok::<_, tower::BoxError>(ctx.success(data! {
            "chatId" => chat_id,
            "page" => page,
            "userId" => user_id,
            "messages" => messages,
        }))
    };

    let auth = Router::new()
        .post(
            "/session",
            Route::new(login).body(ObjectSchema::new().field("phoneNumber", Field::string().min_len(10).max_len(15))),
        )?
        .post(
            "/refresh-token",
            Route::new(refresh).cookies(ObjectSchema::new().field(REFRESH_COOKIE, Field::string().optional())),
        )?;

    let chats = Router::new().get(
        "/:chatId",
        Route::new(chat)
            .cookies(ObjectSchema::new().field(SESSION_COOKIE, Field::string().optional()))
            .query(ObjectSchema::new().field("page", Field::int().min(1.0).optional()))
            .middleware(require_session(store)),
    )?;

    Router::new()
        .get("/health", Route::new(health))?
        .mount("/auth", auth)?
        .mount("/chat", chats)
}
