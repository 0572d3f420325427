//! Schemas backed by serde types.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Coercion, Issue, Schema};
use crate::value::Value;

/// Validates a channel by deserializing it into `T`.
///
/// The validated value is `T` serialized back, so defaults and renames
/// applied by serde show up in the handler's input. Dates come back as
/// RFC 3339 strings. Coercion does not apply: text channels only fit
/// `T` if its fields are strings.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use switchyard::routing::Route;
/// use switchyard::schema::Typed;
/// # use switchyard::{routing::HandlerResult, RequestContext};
/// # async fn login(ctx: RequestContext) -> HandlerResult { Ok(ctx.ok()) }
///
/// #[derive(Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Login {
///     phone_number: String,
///     code: String,
/// }
///
/// let route = Route::new(login).body(Typed::<Login>::new());
/// ```
pub struct Typed<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Typed<T> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned + Serialize> Schema for Typed<T> {
    fn parse(&self, input: &Value, _coercion: Coercion) -> Result<Value, Vec<Issue>> {
        let typed: T = input
            .deserialize_into()
            .map_err(|e| vec![Issue::new(e.to_string())])?;
        Value::from_serialize(&typed).map_err(|e| vec![Issue::new(e.to_string())])
    }
}
