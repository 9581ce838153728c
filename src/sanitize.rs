/// Identifier used when a raw name is empty after trimming.
pub const FALLBACK_ID: &str = "node";

/// Normalize a user-entered name into an identifier: trim, then collapse
/// every whitespace run into a single `_`.
pub fn sanitize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FALLBACK_ID.to_string();
    }
    trimmed.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Backslash-escape `\`, `[` and `]` so a label survives inside `[...]`.
pub fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if matches!(c, '\\' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Inverse of [`escape_label`]. Unknown escapes are kept verbatim.
pub fn unescape_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | '[' | ']')) => out.push(next),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Labels are single-line; fold line breaks into spaces and trim.
pub fn normalize_label(label: &str) -> String {
    label
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
