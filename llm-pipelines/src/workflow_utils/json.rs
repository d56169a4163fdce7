//! JSON extraction and parsing for free-form model output
//!
//! Models wrap JSON in prose or code fences. These helpers locate the first
//! balanced `[...]` or `{...}` structure, honouring string literals, and decode
//! it. Parsing returns `Result<T, ParseError>`; callers decide on a fallback.

use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON structure found in response")]
    NoStructure,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected shape: {0}")]
    Shape(String),
}

/// Returns the body of the first ```json (or bare ```) fence, or the trimmed text.
pub fn strip_code_fence(text: &str) -> &str {
    let (start, skip) = match text.find("```json") {
        Some(pos) => (pos, 7),
        None => match text.find("```") {
            Some(pos) => (pos, 3),
            None => return text.trim(),
        },
    };
    let body_start = start + skip;
    let body_end = text[body_start..]
        .find("```")
        .map(|pos| pos + body_start)
        .unwrap_or(text.len());
    text[body_start..body_end].trim()
}

/// First balanced structure opening with one of `openers`, in text order.
fn find_balanced<'a>(text: &'a str, openers: &[u8]) -> Option<&'a str> {
    let bytes = text.as_bytes();
    (0..bytes.len())
        .filter(|&i| openers.contains(&bytes[i]))
        .find_map(|start| balanced_end(bytes, start).map(|end| &text[start..=end]))
}

/// Index of the byte closing the structure opened at `start`.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => stack.push(b']'),
            b'{' => stack.push(b'}'),
            b']' | b'}' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// First balanced array or object.
pub fn extract_json(text: &str) -> Option<&str> {
    find_balanced(strip_code_fence(text), b"[{")
        .or_else(|| find_balanced(text, b"[{"))
}

pub fn extract_json_object(text: &str) -> Option<&str> {
    find_balanced(strip_code_fence(text), b"{").or_else(|| find_balanced(text, b"{"))
}

pub fn extract_json_array(text: &str) -> Option<&str> {
    find_balanced(strip_code_fence(text), b"[").or_else(|| find_balanced(text, b"["))
}

/// Extracts the first balanced structure and decodes it into `T`.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let raw = extract_json(text).ok_or(ParseError::NoStructure)?;
    decode(raw)
}

/// Like [`parse_json`] but only considers objects.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let raw = extract_json_object(text).ok_or(ParseError::NoStructure)?;
    decode(raw)
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    serde_json::from_str(raw).map_err(|e| {
        tracing::debug!(
            error = %e,
            preview = %raw.chars().take(200).collect::<String>(),
            "JSON decode failed"
        );
        ParseError::Json(e)
    })
}
