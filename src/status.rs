//! Status vocabulary shared by the router and the client.
//!
//! # Responsibilities
//! - Enumerate the closed set of status keys
//! - Map each key to exactly one HTTP status code and label
//! - Map a received HTTP code back to its key
//!
//! # Design Decisions
//! - The table is a static array; there is nothing to initialize or lock
//! - `OK` is the only success key; every other key is an error key
//! - Lookups by key are total (the enum is closed); lookups by code or by
//!   string are fallible because they come from outside the process

use std::fmt;
use std::str::FromStr;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A member of the closed status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKey {
    Ok,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    RequestTimeout,
    Conflict,
    PayloadTooLarge,
    UnprocessableEntity,
    TooManyRequests,
    InternalServerError,
    ServiceUnavailable,
}

/// One row of the status table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
    pub key: StatusKey,
    pub status: StatusCode,
    pub label: &'static str,
}

impl StatusEntry {
    /// Numeric HTTP code.
    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }
}

/// Lookup failures. Producers draw from [`StatusKey`], so these only fire on
/// values that crossed a process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("no status entry for HTTP code {0}")]
    UnknownCode(u16),

    #[error("unknown status key `{0}`")]
    UnknownKey(String),
}

const fn entry(key: StatusKey, status: StatusCode, label: &'static str) -> StatusEntry {
    StatusEntry { key, status, label }
}

/// The full table, in enum declaration order.
pub static STATUS_TABLE: [StatusEntry; 13] = [
    entry(StatusKey::Ok, StatusCode::OK, "OK"),
    entry(StatusKey::BadRequest, StatusCode::BAD_REQUEST, "Bad Request"),
    entry(StatusKey::Unauthorized, StatusCode::UNAUTHORIZED, "Unauthorized"),
    entry(StatusKey::Forbidden, StatusCode::FORBIDDEN, "Forbidden"),
    entry(StatusKey::NotFound, StatusCode::NOT_FOUND, "Not Found"),
    entry(
        StatusKey::MethodNotAllowed,
        StatusCode::METHOD_NOT_ALLOWED,
        "Method Not Allowed",
    ),
    entry(
        StatusKey::RequestTimeout,
        StatusCode::REQUEST_TIMEOUT,
        "Request Timeout",
    ),
    entry(StatusKey::Conflict, StatusCode::CONFLICT, "Conflict"),
    entry(
        StatusKey::PayloadTooLarge,
        StatusCode::PAYLOAD_TOO_LARGE,
        "Payload Too Large",
    ),
    entry(
        StatusKey::UnprocessableEntity,
        StatusCode::UNPROCESSABLE_ENTITY,
        "Unprocessable Entity",
    ),
    entry(
        StatusKey::TooManyRequests,
        StatusCode::TOO_MANY_REQUESTS,
        "Too Many Requests",
    ),
    entry(
        StatusKey::InternalServerError,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
    ),
    entry(
        StatusKey::ServiceUnavailable,
        StatusCode::SERVICE_UNAVAILABLE,
        "Service Unavailable",
    ),
];

impl StatusKey {
    /// Every key, in table order.
    pub const ALL: [StatusKey; 13] = [
        StatusKey::Ok,
        StatusKey::BadRequest,
        StatusKey::Unauthorized,
        StatusKey::Forbidden,
        StatusKey::NotFound,
        StatusKey::MethodNotAllowed,
        StatusKey::RequestTimeout,
        StatusKey::Conflict,
        StatusKey::PayloadTooLarge,
        StatusKey::UnprocessableEntity,
        StatusKey::TooManyRequests,
        StatusKey::InternalServerError,
        StatusKey::ServiceUnavailable,
    ];

    /// The table row for this key.
    pub fn entry(self) -> &'static StatusEntry {
        // Enum discriminants follow table order.
        &STATUS_TABLE[self as usize]
    }

    pub fn code(self) -> u16 {
        self.entry().code()
    }

    pub fn http_status(self) -> StatusCode {
        self.entry().status
    }

    pub fn label(self) -> &'static str {
        self.entry().label
    }

    pub fn is_success(self) -> bool {
        self == StatusKey::Ok
    }

    /// Wire spelling, e.g. `"TOO_MANY_REQUESTS"`.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusKey::Ok => "OK",
            StatusKey::BadRequest => "BAD_REQUEST",
            StatusKey::Unauthorized => "UNAUTHORIZED",
            StatusKey::Forbidden => "FORBIDDEN",
            StatusKey::NotFound => "NOT_FOUND",
            StatusKey::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            StatusKey::RequestTimeout => "REQUEST_TIMEOUT",
            StatusKey::Conflict => "CONFLICT",
            StatusKey::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            StatusKey::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            StatusKey::TooManyRequests => "TOO_MANY_REQUESTS",
            StatusKey::InternalServerError => "INTERNAL_SERVER_ERROR",
            StatusKey::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// Reverse lookup from a numeric HTTP code.
    pub fn from_code(code: u16) -> Result<StatusKey, StatusError> {
        STATUS_TABLE
            .iter()
            .find(|e| e.code() == code)
            .map(|e| e.key)
            .ok_or(StatusError::UnknownCode(code))
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusKey {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StatusError::UnknownKey(s.to_string()))
    }
}

impl TryFrom<StatusCode> for StatusKey {
    type Error = StatusError;

    fn try_from(status: StatusCode) -> Result<Self, Self::Error> {
        StatusKey::from_code(status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_order_matches_enum() {
        for (i, key) in StatusKey::ALL.iter().enumerate() {
            assert_eq!(STATUS_TABLE[i].key, *key);
        }
    }

    #[test]
    fn test_table_is_bijective() {
        let codes: HashSet<u16> = STATUS_TABLE.iter().map(|e| e.code()).collect();
        let keys: HashSet<StatusKey> = STATUS_TABLE.iter().map(|e| e.key).collect();
        assert_eq!(codes.len(), STATUS_TABLE.len());
        assert_eq!(keys.len(), STATUS_TABLE.len());

        for key in StatusKey::ALL {
            assert_eq!(StatusKey::from_code(key.code()), Ok(key));
        }
    }

    #[test]
    fn test_documented_codes() {
        assert_eq!(StatusKey::Ok.code(), 200);
        assert_eq!(StatusKey::BadRequest.code(), 400);
        assert_eq!(StatusKey::Unauthorized.code(), 401);
        assert_eq!(StatusKey::NotFound.code(), 404);
        assert_eq!(StatusKey::RequestTimeout.code(), 408);
        assert_eq!(StatusKey::TooManyRequests.code(), 429);
        assert_eq!(StatusKey::InternalServerError.code(), 500);
        assert_eq!(StatusKey::InternalServerError.label(), "Internal Server Error");
    }

    #[test]
    fn test_unknown_lookups_fail() {
        assert_eq!(StatusKey::from_code(418), Err(StatusError::UnknownCode(418)));
        assert!(matches!(
            "TEAPOT".parse::<StatusKey>(),
            Err(StatusError::UnknownKey(k)) if k == "TEAPOT"
        ));
    }

    #[test]
    fn test_string_forms_agree_with_serde() {
        for key in StatusKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
            assert_eq!(key.as_str().parse::<StatusKey>(), Ok(key));
        }
    }
}
