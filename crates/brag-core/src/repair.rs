//! Tolerant parsing of model output.
//!
//! Text-generation backends routinely wrap JSON in code fences, append prose
//! after the closing brace, leave trailing commas, or stop mid-document when
//! they hit the token budget. Every repair heuristic lives here; callers only
//! see `Some(value)` or `None`, and `None` means "fall back".

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

static TRAILING_COMMA_RE: OnceLock<Regex> = OnceLock::new();

fn trailing_comma_re() -> &'static Regex {
    TRAILING_COMMA_RE.get_or_init(|| Regex::new(r",(\s*[}\]])").unwrap())
}

/// Parse `text` as a JSON object, repairing common defects. Never panics.
pub fn parse_with_recovery(text: &str) -> Option<Value> {
    let body = strip_code_fences(text);
    let start = body.find('{')?;
    let body = &body[start..];

    if let Some(v) = try_parse(body) {
        return Some(v);
    }

    // Trailing prose after the final brace.
    let truncated = match body.rfind('}') {
        Some(end) => &body[..=end],
        None => body,
    };
    if truncated.len() != body.len() {
        debug!("json repair: truncated after last closing brace");
        if let Some(v) = try_parse(truncated) {
            return Some(v);
        }
    }

    let decomma = remove_trailing_commas(truncated);
    if let Some(v) = try_parse(&decomma) {
        debug!("json repair: removed trailing commas");
        return Some(v);
    }

    // Balance the full text first: cutting at the last brace can land
    // inside a string literal and drop real fields.
    let balanced = balance_closers(&remove_trailing_commas(body));
    if let Some(v) = try_parse(&balanced) {
        debug!("json repair: balanced brackets");
        return Some(v);
    }

    let balanced = balance_closers(&decomma);
    if let Some(v) = try_parse(&balanced) {
        debug!("json repair: balanced brackets after truncation");
        return Some(v);
    }

    debug!("json repair: giving up");
    None
}

fn try_parse(s: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(s) {
        Ok(v) if v.is_object() => Some(v),
        _ => None,
    }
}

fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn remove_trailing_commas(s: &str) -> String {
    trailing_comma_re().replace_all(s, "$1").into_owned()
}

/// Close an unterminated string and append the closers still open at the end
/// of `s`, innermost first. Brackets inside string literals are ignored.
fn balance_closers(s: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in s.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = s.to_string();
    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    let trimmed_len = out.trim_end().trim_end_matches(',').trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(':') {
        out.push_str(" null");
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
