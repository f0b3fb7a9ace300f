//! Recovery of structured metadata from malformed provider output.
//!
//! Every stage is a pure `&str -> String` transform and is idempotent on its
//! own output. Stages are applied cumulatively and the text is re-parsed
//! after each one; the first strict parse wins.

use crate::constants::REPAIR_EXCERPT_RADIUS;
use crate::error::{AppError, Result};
use crate::models::EnrichedMetadata;
use serde_json::Value;

pub type RepairStage = fn(&str) -> String;

/// The repair ladder, in application order.
pub const REPAIR_LADDER: [(&str, RepairStage); 3] = [
    ("trailing_separators", remove_trailing_separators),
    ("missing_separators", insert_missing_separators),
    ("balance_brackets", balance_brackets),
];

/// Drop a leading ```` ```json ```` line and a trailing ```` ``` ```` fence.
pub fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim().to_string()
}

/// Cut the text down to the root object: from the first `{` to where that
/// object closes, or to the end when it never does.
pub fn extract_object(text: &str) -> String {
    let Some(start) = text.find('{') else {
        return text.trim().to_string();
    };
    let body = &text[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
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
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return body[..=i].to_string();
                }
            }
            _ => {}
        }
    }

    body.trim_end().to_string()
}

/// Remove commas that are directly followed (ignoring whitespace) by a
/// closing bracket or brace, and collapse runs of commas into one.
pub fn remove_trailing_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
                if !matches!(next, Some('}') | Some(']') | Some(',')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn is_value_start(c: char) -> bool {
    matches!(c, '"' | '{' | '[' | '-' | 't' | 'f' | 'n') || c.is_ascii_digit()
}

fn is_bare_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.')
}

/// Insert a comma between a completed value and a following value or key
/// that has no separator in between, e.g. `"a": "x" "b": 1`. Object keys
/// never count as completed values.
pub fn insert_missing_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut string_is_key = false;
    let mut escaped = false;
    // Byte offset in `out` right after the last completed value.
    let mut value_end: Option<usize> = None;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            if !in_string && !string_is_key {
                value_end = Some(out.len());
            }
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            out.push(c);
            i += 1;
            continue;
        }

        if let Some(end) = value_end.take() {
            if is_value_start(c) {
                out.insert(end, ',');
                if let Some(frame) = stack.last_mut() {
                    frame.expect_key = frame.closer == '}';
                }
            }
        }

        match c {
            '"' => {
                in_string = true;
                string_is_key = stack.last().map(|f| f.expect_key).unwrap_or(false);
                out.push(c);
                i += 1;
            }
            '{' | '[' => {
                stack.push(Frame {
                    closer: if c == '{' { '}' } else { ']' },
                    expect_key: c == '{',
                });
                out.push(c);
                i += 1;
            }
            '}' | ']' => {
                stack.pop();
                out.push(c);
                value_end = Some(out.len());
                i += 1;
            }
            ':' | ',' => {
                if let Some(frame) = stack.last_mut() {
                    frame.expect_key = c == ',' && frame.closer == '}';
                }
                out.push(c);
                i += 1;
            }
            _ if is_bare_token_char(c) => {
                while i < chars.len() && is_bare_token_char(chars[i]) {
                    out.push(chars[i]);
                    i += 1;
                }
                value_end = Some(out.len());
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    closer: char,
    expect_key: bool,
}

/// `-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?`
fn is_json_number(token: &str) -> bool {
    let bytes = token.as_bytes();
    let digits_from = |at: usize| bytes[at..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut i = usize::from(bytes.first() == Some(&b'-'));
    let int = digits_from(i);
    if int == 0 || (int > 1 && bytes[i] == b'0') {
        return false;
    }
    i += int;

    if bytes.get(i) == Some(&b'.') {
        let frac = digits_from(i + 1);
        if frac == 0 {
            return false;
        }
        i += 1 + frac;
    }

    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp = digits_from(i);
        if exp == 0 {
            return false;
        }
        i += exp;
    }

    i == bytes.len()
}

fn is_complete_bare_token(token: &str) -> bool {
    matches!(token, "true" | "false" | "null") || is_json_number(token)
}

/// Drop a dangling backslash or a cut-off `\uXXXX` escape at the end of an
/// unterminated string.
fn trim_partial_escape(out: &mut String) {
    let tail_start = out.len().saturating_sub(6);
    let Some(tail) = out.get(tail_start..) else {
        return;
    };
    if let Some(pos) = tail.rfind("\\u") {
        let hex = &tail[pos + 2..];
        if hex.len() < 4 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            out.truncate(tail_start + pos);
            return;
        }
    }

    let trailing_backslashes = out.chars().rev().take_while(|c| *c == '\\').count();
    if trailing_backslashes % 2 == 1 {
        out.pop();
    }
}

/// Balance brackets and braces while respecting string and escape state.
///
/// Mismatched closers are dropped and anything after the root closes is
/// discarded. When the text ends with open containers, an unterminated
/// value string is closed in place; otherwise the text is cut back to the
/// last position where a value or container opener completed. The missing
/// closers are then appended.
pub fn balance_brackets(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut string_is_key = false;
    let mut escaped = false;
    let mut root_closed = false;
    let mut safe: (usize, Vec<Frame>) = (0, Vec::new());

    let in_value_position =
        |stack: &[Frame]| stack.last().map(|f| !f.expect_key).unwrap_or(false);

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    in_string = false;
                    if !string_is_key {
                        safe = (out.len(), stack.clone());
                    }
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        match c {
            '{' | '[' => {
                if in_value_position(&stack) || stack.is_empty() {
                    stack.push(Frame {
                        closer: if c == '{' { '}' } else { ']' },
                        expect_key: c == '{',
                    });
                    out.push(c);
                    safe = (out.len(), stack.clone());
                }
                i += 1;
            }
            '}' | ']' => {
                if stack.last().map(|f| f.closer) == Some(c) {
                    stack.pop();
                    out.push(c);
                    if stack.is_empty() {
                        root_closed = true;
                        break;
                    }
                    safe = (out.len(), stack.clone());
                }
                i += 1;
            }
            ':' => {
                if let Some(frame) = stack.last_mut() {
                    if frame.closer == '}' {
                        frame.expect_key = false;
                    }
                }
                out.push(c);
                i += 1;
            }
            ',' => {
                if let Some(frame) = stack.last_mut() {
                    if frame.closer == '}' {
                        frame.expect_key = true;
                    }
                }
                out.push(c);
                i += 1;
            }
            '"' => {
                in_string = true;
                string_is_key = stack.last().map(|f| f.expect_key).unwrap_or(false);
                out.push(c);
                i += 1;
            }
            _ if is_bare_token_char(c) => {
                let start = out.len();
                while i < chars.len() && is_bare_token_char(chars[i]) {
                    out.push(chars[i]);
                    i += 1;
                }
                if in_value_position(&stack) && is_complete_bare_token(&out[start..]) {
                    safe = (out.len(), stack.clone());
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    if root_closed || stack.is_empty() {
        return out;
    }

    let closers: Vec<Frame> = if in_string && !string_is_key {
        trim_partial_escape(&mut out);
        out.push('"');
        stack
    } else {
        out.truncate(safe.0);
        safe.1
    };

    let mut balanced = out.trim_end().to_string();
    balanced.extend(closers.iter().rev().map(|f| f.closer));
    balanced
}

/// Byte offset of a serde_json error position, if it lands on a char
/// boundary inside `text`.
fn error_offset(text: &str, err: &serde_json::Error) -> Option<usize> {
    if err.line() == 0 {
        return None;
    }
    let line_start: usize = text
        .split_inclusive('\n')
        .take(err.line() - 1)
        .map(str::len)
        .sum();
    let offset = line_start + err.column().saturating_sub(1);
    (offset <= text.len() && text.is_char_boundary(offset)).then_some(offset)
}

/// The separator the parser was missing when it failed: `:` after an
/// object key, `,` otherwise.
fn expected_separator(err: &serde_json::Error) -> char {
    if err.to_string().starts_with("expected `:`") {
        ':'
    } else {
        ','
    }
}

/// Insert a single `separator` at `offset`.
pub fn insert_separator_at(text: &str, offset: usize, separator: char) -> Option<String> {
    if offset > text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let mut repaired = String::with_capacity(text.len() + 1);
    repaired.push_str(&text[..offset]);
    repaired.push(separator);
    repaired.push_str(&text[offset..]);
    Some(repaired)
}

fn excerpt_around(text: &str, offset: usize) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let center = chars
        .iter()
        .position(|(i, _)| *i >= offset)
        .unwrap_or(chars.len());
    let from = center.saturating_sub(REPAIR_EXCERPT_RADIUS);
    let to = (center + REPAIR_EXCERPT_RADIUS).min(chars.len());
    chars[from..to].iter().map(|(_, c)| c).collect()
}

fn strict_parse(text: &str) -> std::result::Result<Value, serde_json::Error> {
    serde_json::from_str::<Value>(text)
}

fn parses_as_object(text: &str) -> bool {
    matches!(strict_parse(text), Ok(Value::Object(_)))
}

/// Turn raw provider text into strictly valid JSON object text.
///
/// `repair_json(&repair_json(x)?)` yields the same text: the output always
/// parses on the first strict attempt.
pub fn repair_json(raw: &str) -> Result<String> {
    let mut text = extract_object(&strip_code_fences(raw));

    if parses_as_object(&text) {
        return Ok(text);
    }

    for (name, stage) in REPAIR_LADDER {
        text = stage(&text);
        if parses_as_object(&text) {
            tracing::debug!(stage = name, "Metadata response repaired at stage {}", name);
            return Ok(text);
        }
    }

    let err = match strict_parse(&text) {
        Ok(_) => {
            return Err(AppError::EnrichmentParse {
                message: "response is not a JSON object".to_string(),
                excerpt: excerpt_around(&text, 0),
            })
        }
        Err(e) => e,
    };

    let offset = error_offset(&text, &err);
    let separator = expected_separator(&err);
    if let Some(candidate) = offset.and_then(|o| insert_separator_at(&text, o, separator)) {
        if parses_as_object(&candidate) {
            tracing::debug!(stage = "offset_separator", "Metadata response repaired at error offset");
            return Ok(candidate);
        }
    }

    Err(AppError::EnrichmentParse {
        message: err.to_string(),
        excerpt: excerpt_around(&text, offset.unwrap_or(text.len())),
    })
}

/// Repair, parse and validate a provider response into metadata.
pub fn parse_metadata(raw: &str) -> Result<EnrichedMetadata> {
    let repaired = repair_json(raw)?;

    let metadata: EnrichedMetadata =
        serde_json::from_str(&repaired).map_err(|e| AppError::EnrichmentParse {
            message: format!("schema mismatch: {}", e),
            excerpt: excerpt_around(&repaired, 0),
        })?;

    if !metadata.has_content() {
        return Err(AppError::EnrichmentParse {
            message: "response carries neither description nor narrative".to_string(),
            excerpt: excerpt_around(&repaired, 0),
        });
    }

    Ok(metadata)
}
