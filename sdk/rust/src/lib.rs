//! Client dispatcher for switchyard route trees.
//!
//! The client mirrors a server's route tree from its [`RouteManifest`]
//! (`Router::manifest()` on the server side). Calls are addressed by path
//! segments and a verb, run through request, response and error
//! interceptor chains, and come back as envelopes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use switchyard::routing::RouteManifest;
//! use switchyard_client::{CallInput, Client, ClientOptions, Credentials, RefreshOnUnauthorized};
//!
//! # async fn run(manifest: RouteManifest) -> Result<(), switchyard_client::ClientError> {
//! let refresh = Arc::new(RefreshOnUnauthorized::new("/auth/refresh-token")?);
//! let client = Client::builder(ClientOptions::new("http://localhost:5000"), manifest)
//!     .credentials(Credentials::Include)
//!     .refresh_on_unauthorized(refresh)
//!     .build()?;
//!
//! let chat = client
//!     .at("chat/:chatId")
//!     .get(CallInput::new().path("chatId", 7).query("page", 1))
//!     .await?;
//! if chat.is_ok() {
//!     println!("{:?}", chat.data());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`RouteManifest`]: switchyard::routing::RouteManifest

pub mod client;
pub mod error;
pub mod interceptor;
pub mod node;
pub mod refresh;
pub mod request;
pub mod response;

pub use client::{Client, ClientBuilder, ClientOptions, Credentials};
pub use error::{ClientError, ProtocolError};
pub use interceptor::{
    ErrorInterceptor, Exchange, RequestInterceptor, RequestOutcome, ResponseInterceptor, Retry,
};
pub use node::{CallNode, CallTree};
pub use refresh::RefreshOnUnauthorized;
pub use request::{BaseHeader, CallInput, HeaderProvider, RequestConfig};
pub use response::{ClientResponse, RawResponse};
