//! Path expressions over JSON values
//!
//! Plain dotted paths (`$.data.items`, `meta.next[0]`) are walked directly.
//! Anything using wildcards, filters or recursive descent goes through
//! `jsonpath-rust`.

use crate::error::{Error, Result};
use jsonpath_rust::JsonPath;
use serde_json::Value;

/// One step of a plain dotted path
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A validated path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    raw: String,
    /// `None` when the expression needs the full JSONPath engine
    segments: Option<Vec<Segment>>,
}

impl PathExpr {
    /// Parse and validate an expression
    pub fn parse(path: &str) -> Result<Self> {
        let raw = path.trim();
        if raw.is_empty() {
            return Err(Error::json_path("Path expression cannot be empty"));
        }

        if let Some(segments) = parse_simple(raw) {
            return Ok(Self {
                raw: raw.to_string(),
                segments: Some(segments),
            });
        }

        let normalized = normalize(raw);
        let compiled: std::result::Result<JsonPath, _> = JsonPath::try_from(normalized.as_str());
        compiled.map_err(|e| Error::JsonPath {
            message: format!("Invalid JSONPath '{raw}': {e}"),
        })?;

        Ok(Self {
            raw: raw.to_string(),
            segments: None,
        })
    }

    /// The expression as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Every value the expression matches, in document order
    pub fn find(&self, value: &Value) -> Vec<Value> {
        match &self.segments {
            Some(segments) => walk(value, segments).into_iter().cloned().collect(),
            None => find_with_jsonpath(value, &normalize(&self.raw)),
        }
    }

    /// The first match, if any
    pub fn find_first(&self, value: &Value) -> Option<Value> {
        match &self.segments {
            Some(segments) => walk(value, segments).cloned(),
            None => self.find(value).into_iter().next(),
        }
    }
}

/// Render a matched value as a request parameter
///
/// Falsy values (`null`, `false`, `""`, `0`, empty containers) yield `None`,
/// which continuation strategies treat as "no more pages".
pub fn value_as_param(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(a) if !a.is_empty() => serde_json::to_string(a).ok(),
        Value::Object(o) if !o.is_empty() => serde_json::to_string(o).ok(),
        _ => None,
    }
}

/// Accept `data.items` as shorthand for `$.data.items`
fn normalize(path: &str) -> String {
    if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{path}")
    }
}

fn parse_simple(path: &str) -> Option<Vec<Segment>> {
    if path.contains(['*', '?', '@', '(', ':', ',', '\'', '"']) || path.contains("..") {
        return None;
    }

    let body = path
        .strip_prefix("$.")
        .or_else(|| path.strip_prefix('$'))
        .unwrap_or(path);
    if body.is_empty() {
        return Some(Vec::new());
    }

    let mut segments = Vec::new();
    for part in body.split('.') {
        let (name, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !name.is_empty() {
            segments.push(Segment::Key(name.to_string()));
        } else if rest.is_empty() {
            return None;
        }
        while !rest.is_empty() {
            let close = rest.find(']')?;
            let index = rest[1..close].trim().parse::<usize>().ok()?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return None;
            }
        }
    }

    Some(segments)
}

fn walk<'a>(value: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

fn find_with_jsonpath(value: &Value, path: &str) -> Vec<Value> {
    let Ok(jp) = JsonPath::try_from(path) else {
        return Vec::new();
    };

    match jp.find(value) {
        Value::Array(matches) => matches,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
