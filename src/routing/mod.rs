//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, headers, body)
//!     → router.rs (route lookup, 404 / 405)
//!     → input validation (headers → body → path → query → cookies)
//!     → pipeline.rs (middleware in order, then handler)
//!     → Envelope → HTTP response
//!
//! Route Registration (at startup):
//!     Route { schemas, middlewares, handler }
//!     → register(method, template) / mount(prefix, sub)
//!     → Freeze as an immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - Deterministic: same input always matches the same route
//! - First match wins (registration order)

pub mod handler;
pub mod manifest;
pub mod method;
mod pipeline;
pub mod route;
pub mod router;

pub use handler::{BoxedHandler, Handler, HandlerResult};
pub use manifest::{RouteManifest, RouteSignature};
pub use method::Method;
pub use route::Route;
pub use router::{Router, RouterError, DEFAULT_BODY_LIMIT};
