//! Text normalization helpers.

/// Collapses all whitespace runs to single spaces and trims the ends.
///
/// Every piece of text lifted out of the DOM goes through this, so downstream
/// matching never has to care about layout-driven whitespace.
pub fn normalize_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_space = true; // leading whitespace is dropped
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Undoes one level of common string escaping: `\"` -> `"` and `\\` -> `\`.
///
/// Activity text sometimes carries values that arrived double-encoded (JSON
/// serialized into a quoted string); this recovers the inner form so the key
/// extractor can match against it.
pub fn unescape_embedded(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('"') => {
                    out.push('"');
                    chars.next();
                }
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                _ => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
