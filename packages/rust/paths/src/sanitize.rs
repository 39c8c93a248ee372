//! Per-segment path sanitization for disk and zip entry names.

/// Returned when nothing survives sanitization.
pub const FALLBACK_PATH: &str = "file.md";

/// Make a relative path safe for use on disk and as a zip entry name.
///
/// Segments are split on `/` and `\`; empty segments are skipped, every
/// character outside `[A-Za-z0-9._-]` becomes `_`, and the survivors are
/// rejoined with `/`. Returns [`FALLBACK_PATH`] for input with no segments.
///
/// Idempotent: every character of the output is already in the safe class.
pub fn sanitize_path(rel_path: &str) -> String {
    let parts: Vec<String> = rel_path
        .split(['/', '\\'])
        .filter(|part| !part.is_empty())
        .map(sanitize_segment)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        return FALLBACK_PATH.to_string();
    }

    parts.join("/")
}

/// Replace every character of one path component outside `[A-Za-z0-9._-]`
/// with `_`.
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if is_safe(c) { c } else { '_' })
        .collect()
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}
