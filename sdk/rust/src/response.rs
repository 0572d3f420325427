//! Call results.

use http::HeaderMap;
use serde::de::DeserializeOwned;
use switchyard::envelope::{Envelope, ErrorBody};
use switchyard::{wire, Map, StatusKey, Value};

use crate::error::{ClientError, ProtocolError};

/// What came back over the wire, before decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Decode into an envelope.
    ///
    /// Unknown status codes are protocol errors. An empty body is an empty
    /// success, or a failure with an empty message.
    pub fn decode(self) -> Result<ClientResponse, ClientError> {
        let key = StatusKey::from_code(self.status)
            .map_err(|_| ProtocolError::UnknownStatus(self.status))?;
        let body = if self.body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            wire::from_slice(&self.body).map_err(ProtocolError::Body)?
        };
        let envelope = Envelope::from_wire(key, body).map_err(ProtocolError::Envelope)?;
        Ok(ClientResponse {
            envelope,
            raw: Some(self),
        })
    }
}

/// An envelope plus, when a network exchange produced it, the raw response.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    envelope: Envelope,
    raw: Option<RawResponse>,
}

impl ClientResponse {
    /// A response built without a network exchange (interceptor short-circuit).
    pub fn new(envelope: Envelope) -> Self {
        Self { envelope, raw: None }
    }

    pub fn status(&self) -> StatusKey {
        self.envelope.status()
    }

    pub fn is_ok(&self) -> bool {
        self.envelope.is_success()
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn into_envelope(self) -> Envelope {
        self.envelope
    }

    pub fn data(&self) -> Option<&Map> {
        self.envelope.data()
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        self.envelope.error_body()
    }

    pub fn raw(&self) -> Option<&RawResponse> {
        self.raw.as_ref()
    }

    /// Deserialize the success data into a serde type.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        match self.data() {
            Some(data) => Ok(Value::Object(data.clone()).deserialize_into()?),
            None => Err(ClientError::NotSuccess(self.status())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_decode_success_and_failure() {
        #[derive(Deserialize)]
        struct Chat {
            id: i64,
        }

        let ok = raw(200, r#"{"json":{"id":4}}"#).decode().unwrap();
        assert!(ok.is_ok());
        assert_eq!(ok.parse::<Chat>().unwrap().id, 4);

        let failure = raw(
            401,
            r#"{"json":{"error":{"key":"UNAUTHORIZED","code":401,"label":"Unauthorized","message":"expired"}}}"#,
        )
        .decode()
        .unwrap();
        assert_eq!(failure.status(), StatusKey::Unauthorized);
        assert_eq!(failure.error().unwrap().message, "expired");
        assert!(matches!(
            failure.parse::<Chat>(),
            Err(ClientError::NotSuccess(StatusKey::Unauthorized))
        ));
    }

    #[test]
    fn test_unknown_status_is_protocol_error() {
        assert!(matches!(
            raw(418, "").decode(),
            Err(ClientError::Protocol(ProtocolError::UnknownStatus(418)))
        ));
    }

    #[test]
    fn test_empty_bodies() {
        assert!(raw(200, "").decode().unwrap().is_ok());
        let not_found = raw(404, "").decode().unwrap();
        assert_eq!(not_found.error().unwrap().message, "");
        assert_eq!(not_found.error().unwrap().label, "Not Found");
    }

    #[test]
    fn test_plain_json_is_protocol_error() {
        assert!(matches!(
            raw(200, "<html>").decode(),
            Err(ClientError::Protocol(ProtocolError::Body(_)))
        ));
    }
}
