//! Path templates.
//!
//! A template is a `/`-separated list of literal segments and `:name`
//! parameter segments, e.g. `/chat/:chatId/messages`. The router uses
//! [`PathTemplate::match_path`] to extract parameters from a concrete path;
//! the client uses [`PathTemplate::substitute`] to build one. Both derive the
//! parameter set from the same parse, so they always agree.
//!
//! # Design Decisions
//! - Empty segments are dropped: `/a//b/` and `/a/b` are the same template
//! - Literal matching is case-sensitive
//! - Parameter values are percent-encoded on substitution and decoded on
//!   extraction

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("template `{0}` has a parameter segment with no name")]
    EmptyParameterName(String),

    #[error("template `{template}` declares `:{name}` more than once")]
    DuplicateParameter { template: String, name: String },

    #[error("no value supplied for `:{name}` in `{template}`")]
    MissingParameter { template: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    /// Template spelling: `chat` or `:chatId`.
    pub fn as_template(&self) -> String {
        match self {
            Segment::Literal(s) => s.clone(),
            Segment::Param(name) => format!(":{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for part in template.split('/').filter(|p| !p.is_empty()) {
            match part.strip_prefix(':') {
                Some("") => return Err(PathError::EmptyParameterName(template.to_string())),
                Some(name) => {
                    if segments.contains(&Segment::Param(name.to_string())) {
                        return Err(PathError::DuplicateParameter {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }
        Ok(Self { segments })
    }

    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names in template order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// `prefix.join(child)` is the template of `child` mounted under `prefix`.
    pub fn join(&self, child: &PathTemplate) -> Result<Self, PathError> {
        // Re-parse so a parameter repeated across the two halves is caught.
        PathTemplate::parse(&format!("{self}{child}"))
    }

    /// Extract parameters from a concrete path, or `None` if it does not fit.
    pub fn match_path(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let mut params = BTreeMap::new();
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = urlencoding::decode(part).ok()?;
                    params.insert(name.clone(), value.into_owned());
                }
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }

    /// Build a concrete path from parameter values.
    pub fn substitute(&self, values: &BTreeMap<String, String>) -> Result<String, PathError> {
        if self.segments.is_empty() {
            return Ok("/".to_string());
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Param(name) => {
                    // An empty value would collapse the segment.
                    let value = values
                        .get(name)
                        .filter(|v| !v.is_empty())
                        .ok_or_else(|| PathError::MissingParameter {
                            template: self.to_string(),
                            name: name.clone(),
                        })?;
                    out.push_str(&urlencoding::encode(value));
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for PathTemplate {
    /// Normalized form: leading slash, no trailing slash, `/` for the root.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment.as_template())?;
        }
        Ok(())
    }
}

impl std::str::FromStr for PathTemplate {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathTemplate::parse(s)
    }
}
