//! Route definitions.

use std::sync::Arc;

use crate::context::Channel;
use crate::schema::{BoxedSchema, Schema};

use super::handler::{BoxedHandler, Handler};

/// Input schemas, middleware chain and handler for one `(method, path)`.
///
/// ```
/// use switchyard::routing::{HandlerResult, Route};
/// use switchyard::schema::{Field, ObjectSchema};
/// use switchyard::RequestContext;
///
/// async fn list(ctx: RequestContext) -> HandlerResult {
///     Ok(ctx.ok())
/// }
///
/// let route = Route::new(list).query(
///     ObjectSchema::new()
///         .field("page", Field::int())
///         .field("limit", Field::int()),
/// );
/// ```
#[derive(Clone)]
pub struct Route {
    pub(crate) headers: Option<BoxedSchema>,
    pub(crate) body: Option<BoxedSchema>,
    pub(crate) query: Option<BoxedSchema>,
    pub(crate) cookies: Option<BoxedSchema>,
    pub(crate) middlewares: Vec<BoxedHandler>,
    pub(crate) handler: BoxedHandler,
}

impl Route {
    pub fn new(handler: impl Handler) -> Self {
        Self {
            headers: None,
            body: None,
            query: None,
            cookies: None,
            middlewares: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn headers(mut self, schema: impl Schema + 'static) -> Self {
        self.headers = Some(Arc::new(schema));
        self
    }

    pub fn body(mut self, schema: impl Schema + 'static) -> Self {
        self.body = Some(Arc::new(schema));
        self
    }

    pub fn query(mut self, schema: impl Schema + 'static) -> Self {
        self.query = Some(Arc::new(schema));
        self
    }

    pub fn cookies(mut self, schema: impl Schema + 'static) -> Self {
        self.cookies = Some(Arc::new(schema));
        self
    }

    /// Append a middleware. Middleware run in the order they are added.
    pub fn middleware(mut self, middleware: impl Handler) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// The declared schema for a channel. Path schemas are derived by the
    /// router and never stored here.
    pub(crate) fn schema(&self, channel: Channel) -> Option<&BoxedSchema> {
        match channel {
            Channel::Headers => self.headers.as_ref(),
            Channel::Body => self.body.as_ref(),
            Channel::Query => self.query.as_ref(),
            Channel::Cookies => self.cookies.as_ref(),
            Channel::Path => None,
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("headers", &self.headers.is_some())
            .field("body", &self.body.is_some())
            .field("query", &self.query.is_some())
            .field("cookies", &self.cookies.is_some())
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}
