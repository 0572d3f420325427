//! Route manifest.
//!
//! The list of `(method, path)` pairs a router serves. The client builds its
//! call tree from it, so the two sides agree on the route tree at runtime.

use serde::{Deserialize, Serialize};

use super::method::Method;
use crate::path::{PathError, PathTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteSignature {
    pub method: Method,
    /// Normalized template, e.g. `/api/v1/chat/:chatId`.
    pub path: String,
}

impl RouteSignature {
    pub fn template(&self) -> Result<PathTemplate, PathError> {
        PathTemplate::parse(&self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifest {
    pub routes: Vec<RouteSignature>,
}

impl RouteManifest {
    pub fn contains(&self, method: Method, path: &str) -> bool {
        self.routes.iter().any(|r| r.method == method && r.path == path)
    }

    /// Routes in `self` that `other` does not serve.
    pub fn missing_from(&self, other: &RouteManifest) -> Vec<RouteSignature> {
        self.routes
            .iter()
            .filter(|r| !other.contains(r.method, &r.path))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(method: Method, path: &str) -> RouteSignature {
        RouteSignature { method, path: path.to_string() }
    }

    #[test]
    fn test_missing_from() {
        let client = RouteManifest {
            routes: vec![sig(Method::Get, "/chat/:chatId"), sig(Method::Post, "/chat")],
        };
        let server = RouteManifest {
            routes: vec![sig(Method::Get, "/chat/:chatId")],
        };
        assert_eq!(client.missing_from(&server), vec![sig(Method::Post, "/chat")]);
        assert!(server.missing_from(&client).is_empty());
    }

    #[test]
    fn test_serde_shape() {
        let manifest = RouteManifest { routes: vec![sig(Method::Delete, "/a/:b")] };
        assert_eq!(
            serde_json::to_value(&manifest).unwrap(),
            serde_json::json!({ "routes": [{ "method": "delete", "path": "/a/:b" }] })
        );
    }
}
