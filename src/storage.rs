//! Object key construction for uploaded resumes.

use uuid::Uuid;

/// Sanitize a client-supplied filename for use inside an object key.
///
/// Path separators and shell/filesystem metacharacters become underscores,
/// whitespace collapses to underscores, and the result is trimmed and
/// length-limited. An empty result falls back to `"resume"`.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim_matches(|c| c == '_' || c == '.');
    if trimmed.is_empty() {
        "resume".to_string()
    } else {
        trimmed.chars().take(100).collect()
    }
}

/// Build a collision-resistant object key for an upload:
/// `uploads/{uuid}-{sanitized name}`.
pub fn object_key(filename: &str) -> String {
    format!("uploads/{}-{}", Uuid::new_v4(), sanitize_filename(filename))
}
