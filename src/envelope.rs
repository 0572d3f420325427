//! Response envelope.
//!
//! Every middleware and handler produces an [`Envelope`]:
//!
//! ```text
//! success: status OK,        body {..data}
//! failure: status ERROR_KEY, body {"error": {"key", "code", "label", "message"}}
//! ```
//!
//! The status travels as the HTTP code; the body is the wire encoding of
//! [`Envelope::to_body`].

use thiserror::Error;

use crate::status::{StatusError, StatusKey};
use crate::value::{Map, Value};

/// Message used when a failure is constructed without one.
pub const DEFAULT_ERROR_MESSAGE: &str = "An unexpected error occurred.";

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Map),
    Failure(ErrorBody),
}

/// The fixed `error` shape of a failure envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub key: StatusKey,
    pub code: u16,
    pub label: String,
    pub message: String,
}

impl ErrorBody {
    /// Code and label come from the status table.
    pub fn new(key: StatusKey, message: impl Into<String>) -> Self {
        debug_assert!(!key.is_success(), "failure envelope built with the success key");
        Self {
            key,
            code: key.code(),
            label: key.label().to_string(),
            message: message.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::object([(
            "error",
            Value::object([
                ("key", Value::from(self.key.as_str())),
                ("code", Value::from(self.code)),
                ("label", Value::from(self.label.as_str())),
                ("message", Value::from(self.message.as_str())),
            ]),
        )])
    }
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("success body must be an object, got {0}")]
    NonObjectData(&'static str),

    #[error("error body is missing `error.{0}`")]
    MissingErrorField(&'static str),
}

impl Envelope {
    /// Empty success.
    pub fn ok() -> Self {
        Envelope::Success(Map::new())
    }

    pub fn success(data: Map) -> Self {
        Envelope::Success(data)
    }

    /// Failure with the given message, or [`DEFAULT_ERROR_MESSAGE`].
    pub fn error(key: StatusKey, message: Option<&str>) -> Self {
        Envelope::Failure(ErrorBody::new(key, message.unwrap_or(DEFAULT_ERROR_MESSAGE)))
    }

    pub fn status(&self) -> StatusKey {
        match self {
            Envelope::Success(_) => StatusKey::Ok,
            Envelope::Failure(body) => body.key,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn data(&self) -> Option<&Map> {
        match self {
            Envelope::Success(data) => Some(data),
            Envelope::Failure(_) => None,
        }
    }

    pub fn error_body(&self) -> Option<&ErrorBody> {
        match self {
            Envelope::Success(_) => None,
            Envelope::Failure(body) => Some(body),
        }
    }

    /// The value written to the wire.
    pub fn to_body(&self) -> Value {
        match self {
            Envelope::Success(data) => Value::Object(data.clone()),
            Envelope::Failure(body) => body.to_value(),
        }
    }

    /// Rebuild an envelope from a received status and decoded body.
    ///
    /// A `null` body is accepted as an empty success, or as a failure with an
    /// empty message. Error fields missing from an otherwise well-formed body
    /// fall back to the table, except `message`, which is required.
    pub fn from_wire(status: StatusKey, body: Value) -> Result<Self, EnvelopeError> {
        if status.is_success() {
            return match body {
                Value::Object(data) => Ok(Envelope::Success(data)),
                Value::Null => Ok(Envelope::ok()),
                other => Err(EnvelopeError::NonObjectData(other.kind())),
            };
        }

        if body.is_null() {
            return Ok(Envelope::Failure(ErrorBody::new(status, "")));
        }

        let error = body
            .get("error")
            .and_then(Value::as_object)
            .ok_or(EnvelopeError::MissingErrorField("key"))?;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MissingErrorField("message"))?;
        let label = error
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_else(|| status.label());
        let code = error
            .get("code")
            .and_then(Value::as_i64)
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or_else(|| status.code());

        Ok(Envelope::Failure(ErrorBody {
            key: status,
            code,
            label: label.to_string(),
            message: message.to_string(),
        }))
    }
}

impl From<ErrorBody> for Envelope {
    fn from(body: ErrorBody) -> Self {
        Envelope::Failure(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;

    #[test]
    fn test_error_shape() {
        let envelope = Envelope::error(StatusKey::TooManyRequests, Some("slow down"));
        let body = envelope.to_body();
        let error = body.get("error").unwrap();
        assert_eq!(error.get("key").and_then(Value::as_str), Some("TOO_MANY_REQUESTS"));
        assert_eq!(error.get("code").and_then(Value::as_i64), Some(429));
        assert_eq!(error.get("label").and_then(Value::as_str), Some("Too Many Requests"));
        assert_eq!(error.get("message").and_then(Value::as_str), Some("slow down"));
    }

    #[test]
    fn test_default_message() {
        let envelope = Envelope::error(StatusKey::NotFound, None);
        assert_eq!(envelope.error_body().unwrap().message, DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn test_from_wire_matches_to_body() {
        let ok = Envelope::success(data! { "id" => 9 });
        assert_eq!(Envelope::from_wire(StatusKey::Ok, ok.to_body()).unwrap(), ok);

        let failure = Envelope::error(StatusKey::Unauthorized, Some("expired"));
        assert_eq!(
            Envelope::from_wire(StatusKey::Unauthorized, failure.to_body()).unwrap(),
            failure
        );
    }

    #[test]
    fn test_from_wire_rejects_malformed_bodies() {
        assert!(matches!(
            Envelope::from_wire(StatusKey::Ok, Value::from("nope")),
            Err(EnvelopeError::NonObjectData("string"))
        ));
        assert!(matches!(
            Envelope::from_wire(StatusKey::BadRequest, Value::object([("oops", Value::Null)])),
            Err(EnvelopeError::MissingErrorField(_))
        ));
    }

    #[test]
    fn test_empty_bodies() {
        assert_eq!(Envelope::from_wire(StatusKey::Ok, Value::Null).unwrap(), Envelope::ok());
        let failure = Envelope::from_wire(StatusKey::NotFound, Value::Null).unwrap();
        assert_eq!(failure.status(), StatusKey::NotFound);
        assert_eq!(failure.error_body().unwrap().message, "");
    }

    #[test]
    #[should_panic(expected = "success key")]
    #[cfg(debug_assertions)]
    fn test_success_key_failure_asserts() {
        let _ = ErrorBody::new(StatusKey::Ok, "impossible");
    }
}
