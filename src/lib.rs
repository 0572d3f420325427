//! Switchyard: a typed request/response RPC router.
//!
//! Routes pair a path template and verb with per-channel input schemas, an
//! ordered middleware chain and a handler. Every middleware and handler
//! answers with an [`Envelope`] keyed by a closed [`StatusKey`] vocabulary,
//! and bodies travel in a JSON encoding that keeps dates as dates.
//!
//! ```
//! use switchyard::routing::{HandlerResult, Route, Router};
//! use switchyard::schema::{Field, ObjectSchema};
//! use switchyard::{data, RequestContext};
//!
//! async fn get_chat(ctx: RequestContext) -> HandlerResult {
//!     let id = ctx.input().path_param("chatId").unwrap_or_default().to_string();
//!     Ok(ctx.success(data! { "chatId" => id }))
//! }
//!
//! let router = Router::new()
//!     .get(
//!         "/chat/:chatId",
//!         Route::new(get_chat).query(ObjectSchema::new().field("page", Field::int())),
//!     )
//!     .unwrap();
//! assert_eq!(router.manifest().routes.len(), 1);
//! ```

// Shared contracts
pub mod envelope;
pub mod path;
pub mod status;
pub mod value;
pub mod wire;

// Server
pub mod context;
pub mod http;
pub mod routing;
pub mod schema;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use context::{Channel, Input, RequestContext, ResponseHandle};
pub use envelope::{Envelope, ErrorBody};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use status::StatusKey;
pub use value::{Map, Value};
