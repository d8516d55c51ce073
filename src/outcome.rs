//! Classification of failed invocations
//!
//! Authorization and validation-policy rejections mean the environment
//! cannot exercise a step; they are not regressions. The CLI echoes the
//! server's JSON:API error document to stderr, so the status codes in it are
//! read first. Free-text phrases are only consulted when no such document
//! is present.

use crate::invoke::Invocation;
use serde_json::Value;
use std::fmt;

/// Why an invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 422, the service's validation policy refused the request
    Validation,
    /// 5xx
    Server,
    Other,
}

impl FailureKind {
    /// Failures that reflect the environment (permissions, policy) rather
    /// than a defect
    pub fn is_environment_limitation(self) -> bool {
        matches!(
            self,
            FailureKind::Unauthorized | FailureKind::Forbidden | FailureKind::Validation
        )
    }

    fn from_status(status: u16) -> Self {
        match status {
            401 => FailureKind::Unauthorized,
            403 => FailureKind::Forbidden,
            404 => FailureKind::NotFound,
            422 => FailureKind::Validation,
            500..=599 => FailureKind::Server,
            _ => FailureKind::Other,
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().replace(&['-', ' '][..], "_").as_str() {
            "unauthorized" | "not_authorized" | "unauthenticated" => Some(FailureKind::Unauthorized),
            "forbidden" | "access_denied" => Some(FailureKind::Forbidden),
            "not_found" | "record_not_found" => Some(FailureKind::NotFound),
            "unprocessable_entity" | "invalid" | "validation_failed" => {
                Some(FailureKind::Validation)
            }
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::Unauthorized => "not authorized",
            FailureKind::Forbidden => "forbidden",
            FailureKind::NotFound => "not found",
            FailureKind::Validation => "rejected by validation policy",
            FailureKind::Server => "server error",
            FailureKind::Other => "failed",
        };
        write!(f, "{}", text)
    }
}

/// Classify a failed invocation; `None` when it succeeded
pub fn classify(inv: &Invocation) -> Option<FailureKind> {
    if inv.success() {
        return None;
    }
    structured_kind(&inv.stderr)
        .or_else(|| structured_kind(&inv.stdout))
        .or_else(|| phrase_kind(&inv.output()))
        .or(Some(FailureKind::Other))
}

/// Inspect a JSON:API `errors` document embedded in `text`
fn structured_kind(text: &str) -> Option<FailureKind> {
    json_documents(text).find_map(|doc| {
        let errors = doc.get("errors")?.as_array()?;
        errors.iter().find_map(|error| {
            let status = error.get("status").and_then(|s| match s {
                Value::String(s) => s.trim().parse::<u16>().ok(),
                Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
                _ => None,
            });
            status.map(FailureKind::from_status).or_else(|| {
                error
                    .get("code")
                    .and_then(Value::as_str)
                    .and_then(FailureKind::from_code)
            })
        })
    })
}

/// The whole text as one document, or every line that parses on its own
fn json_documents(text: &str) -> impl Iterator<Item = Value> + '_ {
    let whole = serde_json::from_str::<Value>(text.trim()).ok();
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .filter_map(|l| serde_json::from_str::<Value>(l).ok());
    whole.into_iter().chain(lines)
}

/// Fallback for CLIs that only print prose
fn phrase_kind(text: &str) -> Option<FailureKind> {
    let lower = text.to_ascii_lowercase();
    let has_status = |code: &str| {
        text.split(|c: char| !c.is_ascii_digit())
            .any(|token| token == code)
    };

    if lower.contains("not authorized") || lower.contains("unauthorized") || has_status("401") {
        Some(FailureKind::Unauthorized)
    } else if lower.contains("forbidden") || has_status("403") {
        Some(FailureKind::Forbidden)
    } else if lower.contains("unprocessable") || has_status("422") {
        Some(FailureKind::Validation)
    } else if lower.contains("not found") || has_status("404") {
        Some(FailureKind::NotFound)
    } else {
        None
    }
}
