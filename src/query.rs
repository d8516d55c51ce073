//! Typed JSON query paths
//!
//! A restricted jq-style syntax: `.` is the document itself, `.name` a field,
//! `[0]` an array index, `["odd key"]` a quoted field. Segments chain freely,
//! so `.[0].id`, `.data[2].attributes.name` and `.data.id` are all valid.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query path must start with '.': {0}")]
    MissingLeadingDot(String),

    #[error("empty field name at offset {offset} in {path}")]
    EmptyField { path: String, offset: usize },

    #[error("unterminated '[' in {0}")]
    UnterminatedBracket(String),

    #[error("invalid array index '{index}' in {path}")]
    InvalidIndex { path: String, index: String },
}

/// One step into a JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// A parsed query path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryPath {
    segments: Vec<Segment>,
}

impl QueryPath {
    /// The identity path `.`
    pub fn root() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.segments.push(Segment::Field(name.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    /// Walk the document. Returns `None` when any step is missing or
    /// applied to the wrong kind of value.
    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(doc, |current, segment| match segment {
                Segment::Field(name) => current.as_object()?.get(name),
                Segment::Index(i) => current.as_array()?.get(*i),
            })
    }

    /// Whether the path resolves to a non-null value
    pub fn exists(&self, doc: &Value) -> bool {
        self.get(doc).is_some_and(|v| !v.is_null())
    }
}

impl FromStr for QueryPath {
    type Err = QueryError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let path_owned = || path.to_string();
        let trimmed = path.trim();
        let rest = trimmed
            .strip_prefix('.')
            .ok_or_else(|| QueryError::MissingLeadingDot(path_owned()))?;

        let chars: Vec<char> = rest.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;
        // A bare field may appear right after the leading dot or after a '.'
        let mut expect_field = true;

        while i < chars.len() {
            match chars[i] {
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|&c| c == ']')
                        .map(|p| p + i)
                        .ok_or_else(|| QueryError::UnterminatedBracket(path_owned()))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    let inner = inner.trim();

                    if let Some(quoted) = inner
                        .strip_prefix('"')
                        .and_then(|s| s.strip_suffix('"'))
                    {
                        segments.push(Segment::Field(quoted.to_string()));
                    } else {
                        let index = inner.parse::<usize>().map_err(|_| QueryError::InvalidIndex {
                            path: path_owned(),
                            index: inner.to_string(),
                        })?;
                        segments.push(Segment::Index(index));
                    }
                    i = close + 1;
                    expect_field = false;
                }
                '.' => {
                    if expect_field {
                        return Err(QueryError::EmptyField {
                            path: path_owned(),
                            offset: i + 1,
                        });
                    }
                    i += 1;
                    expect_field = true;
                    // `.[0]` style: a bracket may follow the dot directly
                    if chars.get(i) == Some(&'[') {
                        expect_field = false;
                    } else if i == chars.len() {
                        return Err(QueryError::EmptyField {
                            path: path_owned(),
                            offset: i + 1,
                        });
                    }
                }
                _ => {
                    let end = chars[i..]
                        .iter()
                        .position(|&c| c == '.' || c == '[')
                        .map(|p| p + i)
                        .unwrap_or(chars.len());
                    let name: String = chars[i..end].iter().collect();
                    segments.push(Segment::Field(name));
                    i = end;
                    expect_field = false;
                }
            }
        }

        Ok(Self { segments })
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, ".");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name)
                    if !name.is_empty()
                        && name
                            .chars()
                            .all(|c| c.is_alphanumeric() || c == '_' || c == '-') =>
                {
                    write!(f, ".{}", name)?
                }
                Segment::Field(name) => {
                    if i == 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "[{:?}]", name)?
                }
                Segment::Index(index) => {
                    if i == 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "[{}]", index)?
                }
            }
        }
        Ok(())
    }
}
