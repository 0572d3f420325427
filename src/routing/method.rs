//! Route verbs.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Options,
        Method::Head,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
        }
    }

    /// GET and HEAD requests carry no body.
    pub fn allows_body(self) -> bool {
        !matches!(self, Method::Get | Method::Head)
    }

    pub fn to_http(self) -> axum::http::Method {
        match self {
            Method::Get => axum::http::Method::GET,
            Method::Post => axum::http::Method::POST,
            Method::Put => axum::http::Method::PUT,
            Method::Patch => axum::http::Method::PATCH,
            Method::Delete => axum::http::Method::DELETE,
            Method::Options => axum::http::Method::OPTIONS,
            Method::Head => axum::http::Method::HEAD,
        }
    }

    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        Method::ALL.into_iter().find(|m| m.to_http() == *method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown method `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_conversion() {
        for method in Method::ALL {
            assert_eq!(Method::from_http(&method.to_http()), Some(method));
        }
        assert_eq!(Method::from_http(&axum::http::Method::TRACE), None);
        assert_eq!("POST".parse::<Method>(), Ok(Method::Post));
        assert!("fetch".parse::<Method>().is_err());
    }
}
