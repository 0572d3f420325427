//! The function shape shared by middleware and handlers.
//!
//! Both receive a [`RequestContext`] and resolve to an [`Envelope`]. An
//! `Err` is an unexpected fault and becomes `INTERNAL_SERVER_ERROR`;
//! expected failures are `Ok(Envelope::Failure(..))`.
//!
//! ```
//! use switchyard::routing::HandlerResult;
//! use switchyard::{data, RequestContext};
//!
//! async fn whoami(ctx: RequestContext) -> HandlerResult {
//!     let user = ctx.data().get("userId").cloned().unwrap_or_default();
//!     Ok(ctx.success(data! { "userId" => user }))
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tower::BoxError;

use crate::context::RequestContext;
use crate::envelope::Envelope;

pub type HandlerResult = Result<Envelope, BoxError>;

pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut, E> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, HandlerResult> {
        let fut = (self)(ctx);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

pub type BoxedHandler = Arc<dyn Handler>;
