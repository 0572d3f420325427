//! Wire body codec.
//!
//! A body is a JSON document `{"json": <plain>, "meta": {"values": <annotations>}}`.
//! `<plain>` is the payload with every date rendered as an RFC 3339 string;
//! the annotations record which paths held dates so the decoder can restore
//! them. `meta` is omitted when nothing needs annotating.
//!
//! ```text
//! {"sentAt": Date, "tags": ["a"]}
//!     → {"json": {"sentAt": "2024-03-01T12:00:00Z", "tags": ["a"]},
//!        "meta": {"values": {"sentAt": ["Date"]}}}
//! ```
//!
//! Annotation paths are dotted; `.` and `\` inside keys are escaped with `\`
//! and array positions are decimal indices. The decoder also accepts nested
//! annotation trees (`{"a": {"b": ["Date"]}}`).

use serde_json::{Map as JsonMap, Number, Value as Json};
use thiserror::Error;

use crate::value::{format_date, parse_date, Value};

const DATE: &str = "Date";
const UNDEFINED: &str = "undefined";
const BIGINT: &str = "bigint";

#[derive(Debug, Error)]
pub enum WireError {
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tagged document has no `json` member")]
    MissingPayload,

    #[error("malformed annotation at `{0}`")]
    MalformedAnnotation(String),

    #[error("annotation `{0}` does not point into the payload")]
    DanglingAnnotation(String),

    #[error("unsupported annotation type `{kind}` at `{path}`")]
    UnsupportedAnnotation { kind: String, path: String },

    #[error("invalid date `{value}` at `{path}`")]
    InvalidDate { value: String, path: String },

    #[error("invalid bigint `{value}` at `{path}`")]
    InvalidBigInt { value: String, path: String },
}

/// Encode a value into a tagged document.
pub fn encode(value: &Value) -> Json {
    let mut annotations = Vec::new();
    let plain = flatten(value, &mut Vec::new(), &mut annotations);

    let mut doc = JsonMap::new();
    doc.insert("json".into(), plain);
    if !annotations.is_empty() {
        let values = if annotations.len() == 1 && annotations[0].0.is_empty() {
            // A bare date at the top level.
            Json::Array(vec![Json::String(annotations[0].1.into())])
        } else {
            Json::Object(
                annotations
                    .into_iter()
                    .map(|(path, kind)| {
                        (join_path(&path), Json::Array(vec![Json::String(kind.into())]))
                    })
                    .collect(),
            )
        };
        let mut meta = JsonMap::new();
        meta.insert("values".into(), values);
        doc.insert("meta".into(), Json::Object(meta));
    }
    Json::Object(doc)
}

pub fn to_vec(value: &Value) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(&encode(value))?)
}

/// Decode a tagged document.
pub fn decode(doc: Json) -> Result<Value, WireError> {
    let Json::Object(mut doc) = doc else {
        return Err(WireError::MissingPayload);
    };
    let plain = doc.remove("json").ok_or(WireError::MissingPayload)?;
    let mut value = Value::from_json(plain);

    let annotations = match doc.remove("meta") {
        Some(Json::Object(mut meta)) => meta.remove("values"),
        Some(Json::Null) | None => None,
        Some(_) => return Err(WireError::MalformedAnnotation("meta".into())),
    };
    if let Some(tree) = annotations {
        apply_tree(&mut value, &mut Vec::new(), tree)?;
    }
    Ok(value)
}

pub fn from_slice(bytes: &[u8]) -> Result<Value, WireError> {
    decode(serde_json::from_slice(bytes)?)
}

/// Decode either a tagged document or plain JSON.
///
/// A top-level object whose keys are exactly `json` (and optionally `meta`)
/// is treated as tagged; anything else is taken as plain JSON.
pub fn decode_lenient(bytes: &[u8]) -> Result<Value, WireError> {
    let json: Json = serde_json::from_slice(bytes)?;
    if is_tagged(&json) {
        decode(json)
    } else {
        Ok(Value::from_json(json))
    }
}

fn is_tagged(json: &Json) -> bool {
    match json {
        Json::Object(map) => {
            map.contains_key("json") && map.keys().all(|k| k == "json" || k == "meta")
        }
        _ => false,
    }
}

fn flatten(value: &Value, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, &'static str)>) -> Json {
    match value {
        Value::Date(d) => {
            out.push((path.clone(), DATE));
            Json::String(format_date(d))
        }
        Value::Array(items) => {
            let mut plain = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push(i.to_string());
                plain.push(flatten(item, path, out));
                path.pop();
            }
            Json::Array(plain)
        }
        Value::Object(map) => {
            let mut plain = JsonMap::new();
            for (k, v) in map {
                path.push(k.clone());
                plain.insert(k.clone(), flatten(v, path, out));
                path.pop();
            }
            Json::Object(plain)
        }
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => Json::Number(n.clone()),
        Value::String(s) => Json::String(s.clone()),
    }
}

fn escape_key(key: &str) -> String {
    key.replace('\\', "\\\\").replace('.', "\\.")
}

fn join_path(path: &[String]) -> String {
    path.iter()
        .map(|k| escape_key(k))
        .collect::<Vec<_>>()
        .join(".")
}

fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

fn apply_tree(root: &mut Value, prefix: &mut Vec<String>, tree: Json) -> Result<(), WireError> {
    match tree {
        Json::Array(mut items) => {
            let children = if items.len() == 2 { items.pop() } else { None };
            let kind = match items.into_iter().next() {
                Some(Json::String(kind)) => kind,
                _ => return Err(WireError::MalformedAnnotation(join_path(prefix))),
            };
            // Children first: their paths refer to the untransformed value.
            if let Some(children) = children {
                apply_tree(root, prefix, children)?;
            }
            let target = locate(root, prefix)?;
            transform(target, &kind, prefix)
        }
        Json::Object(map) => {
            for (key, subtree) in map {
                let added = split_path(&key);
                let depth = added.len();
                prefix.extend(added);
                let result = apply_tree(root, prefix, subtree);
                prefix.truncate(prefix.len() - depth);
                result?;
            }
            Ok(())
        }
        _ => Err(WireError::MalformedAnnotation(join_path(prefix))),
    }
}

fn locate<'a>(root: &'a mut Value, path: &[String]) -> Result<&'a mut Value, WireError> {
    let mut current = root;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| WireError::DanglingAnnotation(join_path(path)))?;
    }
    Ok(current)
}

fn transform(target: &mut Value, kind: &str, path: &[String]) -> Result<(), WireError> {
    match kind {
        DATE => {
            let text = target.as_str().unwrap_or_default();
            let date = parse_date(text).ok_or_else(|| WireError::InvalidDate {
                value: text.to_string(),
                path: join_path(path),
            })?;
            *target = Value::Date(date);
        }
        UNDEFINED => *target = Value::Null,
        BIGINT => {
            let text = target.as_str().unwrap_or_default();
            let number = text
                .parse::<i64>()
                .map(Number::from)
                .or_else(|_| text.parse::<u64>().map(Number::from))
                .map_err(|_| WireError::InvalidBigInt {
                    value: text.to_string(),
                    path: join_path(path),
                })?;
            *target = Value::Number(number);
        }
        other => {
            return Err(WireError::UnsupportedAnnotation {
                kind: other.to_string(),
                path: join_path(path),
            })
        }
    }
    Ok(())
}
