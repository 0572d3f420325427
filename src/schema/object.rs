//! Declarative object schemas.
//!
//! ```
//! use switchyard::schema::{Field, ObjectSchema};
//!
//! let query = ObjectSchema::new()
//!     .field("page", Field::int().min(1.0))
//!     .field("limit", Field::int().min(1.0).max(100.0))
//!     .field("search", Field::string().optional());
//! ```

use super::{Coercion, Issue, Schema};
use crate::value::{parse_date, Map, Value};

#[derive(Debug, Clone)]
enum Kind {
    Any,
    String { min_len: Option<usize>, max_len: Option<usize> },
    Int { min: Option<f64>, max: Option<f64> },
    Number { min: Option<f64>, max: Option<f64> },
    Bool,
    Date,
    OneOf(Vec<String>),
    Array(Box<Field>),
    Object(ObjectSchema),
}

/// Schema for a single value.
#[derive(Debug, Clone)]
pub struct Field {
    kind: Kind,
    optional: bool,
}

impl Field {
    fn of(kind: Kind) -> Self {
        Self { kind, optional: false }
    }

    pub fn any() -> Self {
        Self::of(Kind::Any)
    }

    pub fn string() -> Self {
        Self::of(Kind::String { min_len: None, max_len: None })
    }

    pub fn int() -> Self {
        Self::of(Kind::Int { min: None, max: None })
    }

    pub fn number() -> Self {
        Self::of(Kind::Number { min: None, max: None })
    }

    pub fn boolean() -> Self {
        Self::of(Kind::Bool)
    }

    pub fn date() -> Self {
        Self::of(Kind::Date)
    }

    pub fn one_of<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(Kind::OneOf(choices.into_iter().map(Into::into).collect()))
    }

    pub fn array(item: Field) -> Self {
        Self::of(Kind::Array(Box::new(item)))
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::of(Kind::Object(schema))
    }

    /// Absent (or `null`) is accepted and left out of the output.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Minimum string length in characters. Ignored for other kinds.
    pub fn min_len(mut self, n: usize) -> Self {
        if let Kind::String { min_len, .. } = &mut self.kind {
            *min_len = Some(n);
        }
        self
    }

    /// Maximum string length in characters. Ignored for other kinds.
    pub fn max_len(mut self, n: usize) -> Self {
        if let Kind::String { max_len, .. } = &mut self.kind {
            *max_len = Some(n);
        }
        self
    }

    /// Inclusive lower bound for numeric kinds.
    pub fn min(mut self, n: f64) -> Self {
        match &mut self.kind {
            Kind::Int { min, .. } | Kind::Number { min, .. } => *min = Some(n),
            _ => {}
        }
        self
    }

    /// Inclusive upper bound for numeric kinds.
    pub fn max(mut self, n: f64) -> Self {
        match &mut self.kind {
            Kind::Int { max, .. } | Kind::Number { max, .. } => *max = Some(n),
            _ => {}
        }
        self
    }

    fn parse_present(&self, input: &Value, coercion: Coercion) -> Result<Value, Vec<Issue>> {
        match &self.kind {
            Kind::Any => Ok(input.clone()),
            Kind::String { min_len, max_len } => {
                let s = input.as_str().ok_or_else(|| mismatch("a string", input))?;
                let len = s.chars().count();
                if let Some(min) = min_len.filter(|min| len < *min) {
                    return Err(vec![Issue::new(format!("shorter than {min} characters"))]);
                }
                if let Some(max) = max_len.filter(|max| len > *max) {
                    return Err(vec![Issue::new(format!("longer than {max} characters"))]);
                }
                Ok(input.clone())
            }
            Kind::Int { min, max } => {
                let n = read_number(input, coercion)
                    .filter(|n| n.fract() == 0.0)
                    .ok_or_else(|| mismatch("an integer", input))?;
                check_bounds(n, *min, *max)?;
                // Integers beyond 2^53 are not exact as f64.
                Ok(exact_integer(input, coercion).unwrap_or_else(|| {
                    if n.abs() < 9.007_199_254_740_992e15 {
                        Value::from(n as i64)
                    } else {
                        Value::from(n)
                    }
                }))
            }
            Kind::Number { min, max } => {
                let n = read_number(input, coercion).ok_or_else(|| mismatch("a number", input))?;
                check_bounds(n, *min, *max)?;
                Ok(match input {
                    Value::Number(_) => input.clone(),
                    _ => Value::from(n),
                })
            }
            Kind::Bool => match (input, coercion) {
                (Value::Bool(_), _) => Ok(input.clone()),
                (Value::String(s), Coercion::FromStrings) if s == "true" => Ok(Value::Bool(true)),
                (Value::String(s), Coercion::FromStrings) if s == "false" => Ok(Value::Bool(false)),
                _ => Err(mismatch("a boolean", input)),
            },
            Kind::Date => match input {
                Value::Date(_) => Ok(input.clone()),
                Value::String(s) => parse_date(s)
                    .map(Value::Date)
                    .ok_or_else(|| mismatch("a date", input)),
                _ => Err(mismatch("a date", input)),
            },
            Kind::OneOf(choices) => match input.as_str() {
                Some(s) if choices.iter().any(|c| c == s) => Ok(input.clone()),
                _ => {
                    let expected = choices
                        .iter()
                        .map(|c| format!("'{c}'"))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    Err(mismatch(&format!("one of {expected}"), input))
                }
            },
            Kind::Array(item) => {
                let items = match (input, coercion) {
                    (Value::Array(items), _) => items.clone(),
                    // A single query value for an array field.
                    (other, Coercion::FromStrings) => vec![other.clone()],
                    (other, Coercion::Strict) => return Err(mismatch("an array", other)),
                };
                let mut out = Vec::with_capacity(items.len());
                let mut issues = Vec::new();
                for (i, value) in items.iter().enumerate() {
                    match item.parse_field(Some(value), coercion) {
                        Ok(Some(v)) => out.push(v),
                        Ok(None) => out.push(Value::Null),
                        Err(errs) => issues.extend(errs.into_iter().map(|e| e.at(i.to_string()))),
                    }
                }
                if issues.is_empty() {
                    Ok(Value::Array(out))
                } else {
                    Err(issues)
                }
            }
            Kind::Object(schema) => schema.parse(input, coercion),
        }
    }

    /// `Ok(None)` means absent and allowed.
    fn parse_field(&self, input: Option<&Value>, coercion: Coercion) -> Result<Option<Value>, Vec<Issue>> {
        match input {
            None | Some(Value::Null) if self.optional => Ok(None),
            None => Err(vec![Issue::new("required")]),
            Some(value) => self.parse_present(value, coercion).map(Some),
        }
    }
}

impl Schema for Field {
    fn parse(&self, input: &Value, coercion: Coercion) -> Result<Value, Vec<Issue>> {
        self.parse_field(Some(input), coercion)
            .map(Option::unwrap_or_default)
    }
}

fn read_number(input: &Value, coercion: Coercion) -> Option<f64> {
    match (input, coercion) {
        (Value::Number(n), _) => n.as_f64(),
        (Value::String(s), Coercion::FromStrings) => {
            s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// The input as an exact integer, when it is written as one.
fn exact_integer(input: &Value, coercion: Coercion) -> Option<Value> {
    match (input, coercion) {
        (Value::Number(n), _) if n.is_i64() || n.is_u64() => Some(input.clone()),
        (Value::String(s), Coercion::FromStrings) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<u64>().map(Value::from))
                .ok()
        }
        _ => None,
    }
}

fn check_bounds(n: f64, min: Option<f64>, max: Option<f64>) -> Result<(), Vec<Issue>> {
    if let Some(min) = min.filter(|min| n < *min) {
        return Err(vec![Issue::new(format!("less than {min}"))]);
    }
    if let Some(max) = max.filter(|max| n > *max) {
        return Err(vec![Issue::new(format!("greater than {max}"))]);
    }
    Ok(())
}

fn mismatch(expected: &str, received: &Value) -> Vec<Issue> {
    let received = match received {
        Value::String(s) => format!("\"{s}\""),
        other => other.kind().to_string(),
    };
    vec![Issue::new(format!("expected {expected}, received {received}"))]
}

/// Schema for an object with named fields.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, Field)>,
    strict: bool,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Reject keys that are not declared.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

impl Schema for ObjectSchema {
    fn parse(&self, input: &Value, coercion: Coercion) -> Result<Value, Vec<Issue>> {
        let empty = Map::new();
        let map = match input {
            Value::Object(map) => map,
            // Text channels with nothing in them arrive as null.
            Value::Null if coercion == Coercion::FromStrings => &empty,
            other => return Err(mismatch("an object", other)),
        };

        let mut out = Map::new();
        let mut issues = Vec::new();
        for (name, field) in &self.fields {
            match field.parse_field(map.get(name), coercion) {
                Ok(Some(value)) => {
                    out.insert(name.clone(), value);
                }
                Ok(None) => {}
                Err(errs) => issues.extend(errs.into_iter().map(|e| e.at(name.clone()))),
            }
        }
        if self.strict {
            for key in map.keys() {
                if !self.fields.iter().any(|(name, _)| name == key) {
                    issues.push(Issue::new("not an allowed key").at(key.clone()));
                }
            }
        }

        if issues.is_empty() {
            Ok(Value::Object(out))
        } else {
            Err(issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::describe;

    fn query(pairs: &[(&str, &str)]) -> Value {
        Value::object(pairs.iter().map(|(k, v)| (*k, Value::from(*v))))
    }

    #[test]
    fn test_coerces_query_strings() {
        let schema = ObjectSchema::new()
            .field("page", Field::int())
            .field("limit", Field::int().max(100.0))
            .field("archived", Field::boolean().optional());
        let out = schema
            .parse(&query(&[("page", "2"), ("limit", "20"), ("extra", "x")]), Coercion::FromStrings)
            .unwrap();
        assert_eq!(out.get("page").and_then(Value::as_i64), Some(2));
        assert_eq!(out.get("limit").and_then(Value::as_i64), Some(20));
        assert!(out.get("archived").is_none());
        assert!(out.get("extra").is_none(), "unknown keys are stripped");
    }

    #[test]
    fn test_large_integers_stay_exact() {
        let schema = ObjectSchema::new().field("id", Field::int());
        let big = 9_007_199_254_740_993_i64;

        let body = Value::object([("id", Value::from(big))]);
        let out = schema.parse(&body, Coercion::Strict).unwrap();
        assert_eq!(out.get("id").and_then(Value::as_i64), Some(big));

        let out = schema
            .parse(&query(&[("id", "9007199254740993")]), Coercion::FromStrings)
            .unwrap();
        assert_eq!(out.get("id").and_then(Value::as_i64), Some(big));

        let whole_float = Value::object([("id", Value::from(3.0))]);
        let out = schema.parse(&whole_float, Coercion::Strict).unwrap();
        assert_eq!(out.get("id").and_then(Value::as_i64), Some(3));
    }

    #[test]
    fn test_reports_every_failing_field() {
        let schema = ObjectSchema::new()
            .field("page", Field::int())
            .field("limit", Field::int());
        let issues = schema
            .parse(&query(&[("page", "abc")]), Coercion::FromStrings)
            .unwrap_err();
        assert_eq!(
            describe("query", &issues),
            "query.page is expected an integer, received \"abc\", query.limit is required"
        );
    }

    #[test]
    fn test_strict_body_does_not_coerce() {
        let schema = ObjectSchema::new().field("count", Field::int());
        let body = Value::object([("count", Value::from("3"))]);
        assert!(schema.parse(&body, Coercion::Strict).is_err());

        let body = Value::object([("count", Value::from(3))]);
        assert!(schema.parse(&body, Coercion::Strict).is_ok());
    }

    #[test]
    fn test_string_lengths_and_enums() {
        let schema = ObjectSchema::new()
            .field("phoneNumber", Field::string().min_len(10).max_len(15))
            .field("kind", Field::one_of(["private", "group"]));
        let body = Value::object([
            ("phoneNumber", Value::from("555")),
            ("kind", Value::from("broadcast")),
        ]);
        let msg = describe("body", &schema.parse(&body, Coercion::Strict).unwrap_err());
        assert_eq!(
            msg,
            "body.phoneNumber is shorter than 10 characters, \
             body.kind is expected one of 'private' | 'group', received \"broadcast\""
        );
    }

    #[test]
    fn test_nested_paths() {
        let schema = ObjectSchema::new().field(
            "members",
            Field::array(Field::object(ObjectSchema::new().field("id", Field::int()))),
        );
        let body = Value::object([(
            "members",
            Value::Array(vec![
                Value::object([("id", Value::from(1))]),
                Value::object([("id", Value::from(true))]),
            ]),
        )]);
        let issues = schema.parse(&body, Coercion::Strict).unwrap_err();
        assert_eq!(issues[0].path, vec!["members", "1", "id"]);
    }

    #[test]
    fn test_strict_object_rejects_unknown_keys() {
        let schema = ObjectSchema::new().field("a", Field::any()).strict();
        let issues = schema
            .parse(&Value::object([("a", Value::Null), ("b", Value::Null)]), Coercion::Strict)
            .unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, vec!["b"]);
    }

    #[test]
    fn test_dates_accept_rfc3339_strings() {
        let schema = ObjectSchema::new().field("since", Field::date());
        let out = schema
            .parse(&query(&[("since", "2024-05-01T00:00:00Z")]), Coercion::FromStrings)
            .unwrap();
        assert!(out.get("since").and_then(Value::as_date).is_some());
    }
}
