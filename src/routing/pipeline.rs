//! Middleware pipeline.
//!
//! ```text
//! data = {}
//! for each middleware, in order:
//!     Success(d)  → data = {..data, ..d}
//!     Failure(e)  → return Failure(e) unchanged
//!     Err / panic → return INTERNAL_SERVER_ERROR
//! handler(ctx with data)
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use super::handler::Handler;
use super::route::Route;
use crate::context::RequestContext;
use crate::envelope::{Envelope, DEFAULT_ERROR_MESSAGE};
use crate::observability::metrics;
use crate::status::StatusKey;
use crate::value::Map;

pub(crate) async fn run(route: &Route, ctx: RequestContext, route_label: &str) -> Envelope {
    let mut data = Map::new();
    for middleware in &route.middlewares {
        match invoke(middleware.as_ref(), ctx.with_data(data.clone()), route_label).await {
            Envelope::Success(contributed) => data.extend(contributed),
            failure => return failure,
        }
    }
    invoke(route.handler.as_ref(), ctx.with_data(data), route_label).await
}

/// Call one step, turning faults into an `INTERNAL_SERVER_ERROR` envelope.
async fn invoke(step: &dyn Handler, ctx: RequestContext, route_label: &str) -> Envelope {
    let request_id = ctx.request_id().to_string();

    // The call itself may panic before a future exists.
    let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| step.call(ctx))) {
        Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
        Err(payload) => Err(payload),
    };

    let message = match outcome {
        Ok(Ok(envelope)) => {
            if let Envelope::Failure(body) = &envelope {
                debug_assert!(!body.key.is_success(), "failure envelope carries the success key");
            }
            return envelope;
        }
        Ok(Err(error)) => {
            let message = error.to_string();
            tracing::error!(request_id = %request_id, route = %route_label, error = %message, "Unhandled error");
            message
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(request_id = %request_id, route = %route_label, panic = %message, "Handler panicked");
            message
        }
    };

    metrics::record_unhandled(route_label);
    let message = if message.is_empty() {
        DEFAULT_ERROR_MESSAGE
    } else {
        message.as_str()
    };
    Envelope::error(StatusKey::InternalServerError, Some(message))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::new()
    }
}
