//! Route-tree addressing.
//!
//! [`CallTree`] mirrors the server's route tree: one node per path segment,
//! keyed by template spelling (`chat`, `:chatId`), each holding the verbs
//! registered at that node. [`CallNode`] walks the tree segment by segment
//! and performs calls at its position.
//!
//! ```text
//! client.at("chat").at(":chatId").get(input)
//!        └─ "/chat/:chatId" must be in the manifest, else UnknownRoute
//! ```

use std::collections::{BTreeMap, BTreeSet};

use switchyard::path::{PathError, PathTemplate};
use switchyard::routing::{Method, RouteManifest};

use crate::client::Client;
use crate::error::ClientError;
use crate::request::CallInput;
use crate::response::ClientResponse;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallTree {
    methods: BTreeSet<Method>,
    children: BTreeMap<String, CallTree>,
}

impl CallTree {
    pub fn from_manifest(manifest: &RouteManifest) -> Result<Self, PathError> {
        let mut tree = CallTree::default();
        for route in &manifest.routes {
            let template = route.template()?;
            let mut node = &mut tree;
            for segment in template.segments() {
                node = node.children.entry(segment.as_template()).or_default();
            }
            node.methods.insert(route.method);
        }
        Ok(tree)
    }

    fn node(&self, segments: &[String]) -> Option<&CallTree> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.children.get(segment))
    }

    pub fn contains(&self, segments: &[String], method: Method) -> bool {
        self.node(segments)
            .is_some_and(|node| node.methods.contains(&method))
    }

    /// Verbs registered at `segments`.
    pub fn methods(&self, segments: &[String]) -> Vec<Method> {
        self.node(segments)
            .map(|node| node.methods.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Segment spellings directly below `segments`.
    pub fn children(&self, segments: &[String]) -> Vec<String> {
        self.node(segments)
            .map(|node| node.children.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// A position in the route tree.
#[derive(Debug, Clone)]
pub struct CallNode {
    client: Client,
    segments: Vec<String>,
}

impl CallNode {
    pub(crate) fn root(client: Client) -> Self {
        Self {
            client,
            segments: Vec::new(),
        }
    }

    /// Descend by one or more `/`-separated segments.
    pub fn at(&self, path: &str) -> CallNode {
        let mut segments = self.segments.clone();
        segments.extend(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        CallNode {
            client: self.client.clone(),
            segments,
        }
    }

    /// Normalized template of this position, e.g. `/chat/:chatId`.
    pub fn template(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments.iter().map(|s| format!("/{s}")).collect()
    }

    pub fn methods(&self) -> Vec<Method> {
        self.client.tree().methods(&self.segments)
    }

    pub fn children(&self) -> Vec<String> {
        self.client.tree().children(&self.segments)
    }

    pub async fn call(&self, method: Method, input: CallInput) -> Result<ClientResponse, ClientError> {
        if !self.client.tree().contains(&self.segments, method) {
            return Err(ClientError::UnknownRoute {
                method,
                path: self.template(),
            });
        }
        let template = PathTemplate::parse(&self.template())?;
        self.client.execute(method, &template, input).await
    }

    pub async fn get(&self, input: CallInput) -> Result<ClientResponse, ClientError> {
        self.call(Method::Get, input).await
    }

    pub async fn post(&self, input: CallInput) -> Result<ClientResponse, ClientError> {
        self.call(Method::Post, input).await
    }

    pub async fn put(&self, input: CallInput) -> Result<ClientResponse, ClientError> {
        self.call(Method::Put, input).await
    }

    pub async fn patch(&self, input: CallInput) -> Result<ClientResponse, ClientError> {
        self.call(Method::Patch, input).await
    }

    pub async fn delete(&self, input: CallInput) -> Result<ClientResponse, ClientError> {
        self.call(Method::Delete, input).await
    }

    pub async fn options(&self, input: CallInput) -> Result<ClientResponse, ClientError> {
        self.call(Method::Options, input).await
    }

    pub async fn head(&self, input: CallInput) -> Result<ClientResponse, ClientError> {
        self.call(Method::Head, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard::routing::RouteSignature;

    fn manifest(routes: &[(Method, &str)]) -> RouteManifest {
        RouteManifest {
            routes: routes
                .iter()
                .map(|(method, path)| RouteSignature {
                    method: *method,
                    path: path.to_string(),
                })
                .collect(),
        }
    }

    fn segs(path: &str) -> Vec<String> {
        path.split('/').filter(|s| !s.is_empty()).map(String::from).collect()
    }

    #[test]
    fn test_tree_mirrors_manifest() {
        let tree = CallTree::from_manifest(&manifest(&[
            (Method::Get, "/chat/:chatId"),
            (Method::Delete, "/chat/:chatId"),
            (Method::Post, "/chat"),
            (Method::Get, "/"),
        ]))
        .unwrap();

        assert!(tree.contains(&segs("chat/:chatId"), Method::Get));
        assert!(tree.contains(&segs("chat"), Method::Post));
        assert!(tree.contains(&[], Method::Get));
        assert!(!tree.contains(&segs("chat"), Method::Get));
        assert!(!tree.contains(&segs("chat/:id"), Method::Get));
        assert_eq!(tree.methods(&segs("chat/:chatId")), vec![Method::Get, Method::Delete]);
        assert_eq!(tree.children(&segs("chat")), vec![":chatId".to_string()]);
        assert!(tree.children(&segs("missing")).is_empty());
    }

    #[test]
    fn test_invalid_manifest_template() {
        assert!(CallTree::from_manifest(&manifest(&[(Method::Get, "/a/:")])).is_err());
    }
}
