//! Assertion primitives
//!
//! Every assertion returns a [`Verdict`] instead of panicking, so a failed
//! check never stops the steps that follow it.

use crate::invoke::Invocation;
use crate::query::QueryPath;
use serde_json::Value;

/// Result of evaluating one assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(msg) => Some(msg),
        }
    }

    fn check(ok: bool, message: impl FnOnce() -> String) -> Self {
        if ok {
            Verdict::Pass
        } else {
            Verdict::Fail(message())
        }
    }
}

/// Fails when the invocation exited non-zero
pub fn success(inv: &Invocation) -> Verdict {
    Verdict::check(inv.success(), || {
        format!(
            "Expected success (exit 0), got exit {}: {}\nstdout: {}\nstderr: {}",
            inv.exit_code,
            inv.command_line(),
            inv.stdout.trim(),
            inv.stderr.trim()
        )
    })
}

/// Fails when the invocation exited zero
pub fn failure(inv: &Invocation) -> Verdict {
    Verdict::check(!inv.success(), || {
        format!(
            "Expected failure (non-zero exit), got exit 0: {}\nstdout: {}",
            inv.command_line(),
            inv.stdout.trim()
        )
    })
}

/// Fails unless stdout is a JSON array
pub fn json_is_array(inv: &Invocation) -> Verdict {
    match parse(inv) {
        Ok(doc) => Verdict::check(doc.is_array(), || {
            format!("Expected a JSON array, got {}", kind(&doc))
        }),
        Err(v) => v,
    }
}

/// Fails unless `path` resolves to a non-null value
pub fn json_has(inv: &Invocation, path: &str) -> Verdict {
    let query = match path.parse::<QueryPath>() {
        Ok(q) => q,
        Err(e) => return Verdict::Fail(e.to_string()),
    };
    match parse(inv) {
        Ok(doc) => Verdict::check(query.exists(&doc), || {
            format!("Expected {} to be present in output", query)
        }),
        Err(v) => v,
    }
}

/// Fails unless `path` resolves to a value loosely equal to `expected`
pub fn json_equals(inv: &Invocation, path: &str, expected: &str) -> Verdict {
    let query = match path.parse::<QueryPath>() {
        Ok(q) => q,
        Err(e) => return Verdict::Fail(e.to_string()),
    };
    let doc = match parse(inv) {
        Ok(doc) => doc,
        Err(v) => return v,
    };
    match query.get(&doc) {
        Some(actual) => Verdict::check(loosely_equal(actual, expected), || {
            format!(
                "Expected {} to equal '{}', got '{}'",
                query,
                expected,
                text_of(actual)
            )
        }),
        None => Verdict::Fail(format!("Expected {} to be present in output", query)),
    }
}

/// Compare a JSON value to the text a test expects.
///
/// The service is known to vary numeric formatting (`10` vs `"10.0"`), so
/// numbers compare by decimal value and scalars by their text form.
pub fn loosely_equal(actual: &Value, expected: &str) -> bool {
    let expected = expected.trim();
    match actual {
        Value::Null => expected.is_empty() || expected == "null",
        Value::Bool(b) => expected == (if *b { "true" } else { "false" }),
        Value::Number(n) => numbers_equal(&n.to_string(), expected),
        Value::String(s) => s == expected || numbers_equal(s, expected),
        Value::Array(_) | Value::Object(_) => match serde_json::from_str::<Value>(expected) {
            Ok(parsed) => &parsed == actual,
            Err(_) => false,
        },
    }
}

/// Exact decimal comparison; floats only for exponent notation
fn numbers_equal(a: &str, b: &str) -> bool {
    match (canonical_decimal(a), canonical_decimal(b)) {
        (Some(a), Some(b)) => a == b,
        _ => {
            let exponent = |s: &str| s.contains(&['e', 'E'][..]);
            (exponent(a) || exponent(b))
                && matches!(
                    (a.trim().parse::<f64>(), b.trim().parse::<f64>()),
                    (Ok(x), Ok(y)) if x.is_finite() && x == y
                )
        }
    }
}

/// Plain decimal text without redundant zeros or sign (`"+010.50"` is
/// `"10.5"`); `None` when the text is not a plain decimal
fn canonical_decimal(text: &str) -> Option<String> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if int.is_empty() && frac.is_empty() {
        return None;
    }
    if !int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let int = match int.trim_start_matches('0') {
        "" => "0",
        int => int,
    };
    let frac = frac.trim_end_matches('0');

    let mut out = String::new();
    if negative && (int != "0" || !frac.is_empty()) {
        out.push('-');
    }
    out.push_str(int);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    Some(out)
}

/// Text form of a value as a shell script would see it from `jq -r`
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn parse(inv: &Invocation) -> Result<Value, Verdict> {
    inv.json().map_err(|e| Verdict::Fail(e.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
