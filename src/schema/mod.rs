//! Input validation.
//!
//! # Data Flow
//! ```text
//! raw channel value (headers / body / path / query / cookies)
//!     → Schema::parse(value, coercion)
//!     → Ok(validated value)         handed to middleware and handler
//!     → Err(Vec<Issue>)             rendered into one BAD_REQUEST message
//! ```
//!
//! # Design Decisions
//! - Channels that arrive as text (path, query, headers, cookies) are parsed
//!   with [`Coercion::FromStrings`], so `"2"` satisfies an integer field
//! - The body is parsed strictly; only dates also accept RFC 3339 strings
//! - Unknown object keys are dropped unless the schema is strict

mod object;
mod typed;

pub use object::{Field, ObjectSchema};
pub use typed::Typed;

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// How leniently scalar fields read their input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Strict,
    FromStrings,
}

/// One validation failure, located by its path inside the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub path: Vec<String>,
    pub message: String,
}

impl Issue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    pub fn at(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is {}", self.path.join("."), self.message)
    }
}

/// Validates one input channel.
pub trait Schema: Send + Sync {
    fn parse(&self, input: &Value, coercion: Coercion) -> Result<Value, Vec<Issue>>;
}

pub type BoxedSchema = Arc<dyn Schema>;

impl<S: Schema + ?Sized> Schema for Arc<S> {
    fn parse(&self, input: &Value, coercion: Coercion) -> Result<Value, Vec<Issue>> {
        (**self).parse(input, coercion)
    }
}

/// Render issues as `"<channel>.<path> is <reason>, ..."`.
pub fn describe(channel: &str, issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| issue.clone().at(channel).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
