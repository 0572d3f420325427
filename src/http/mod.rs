//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request id, timeout, tracing)
//!     → routing::Router::handle
//!         → request.rs (body limit, headers / cookies / query / body channels)
//!         → response.rs (envelope → status + wire body + queued headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{SameSite, SetCookie};
pub use server::HttpServer;
