//! Markdown cleanup passes.
//!
//! Each pass is a function `&str -> String` applied in sequence. The order
//! matters for idempotence: passes that can blank out a line (HTML stripping,
//! whitespace trimming) run before blank-line collapsing, and heading
//! demotion runs after HTML stripping so it sees every heading.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run the normalization passes on Markdown text (no front matter).
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = fix_code_block_languages(md);

    result = strip_leftover_html(&result);
    result = normalize_headings(&result);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

/// Drop blank lines at the very start of a document body.
pub(crate) fn trim_leading_blank_lines(md: &str) -> String {
    md.trim_start_matches('\n').to_string()
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

// ---------------------------------------------------------------------------
// Pass 1: Fix code block language hints
// ---------------------------------------------------------------------------

/// Detect and fix code block language hints from class names.
///
/// Handles patterns like `language-js`, `lang-python`, `highlight-rust`.
fn fix_code_block_languages(md: &str) -> String {
    static LANG_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)(\w+)").expect("valid regex")
    });

    LANG_PREFIX_RE.replace_all(md, "```$1").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Strip leftover HTML tags
// ---------------------------------------------------------------------------

/// Remove stray layout tags that survived the conversion, keeping their text.
/// Code fences are left alone.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary)(?:\s[^>]*)?>",
        )
        .expect("valid regex")
    });

    let mut in_code_block = false;
    md.lines()
        .map(|line| {
            if is_fence(line) {
                in_code_block = !in_code_block;
                return line.to_string();
            }
            if in_code_block {
                return line.to_string();
            }
            HTML_TAG_RE.replace_all(line, "").to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Normalize heading levels
// ---------------------------------------------------------------------------

/// Keep the first H1 and demote every later one to H2. Lines inside code
/// fences (shell comments, for one) are not headings.
fn normalize_headings(md: &str) -> String {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("valid regex"));

    let mut seen_h1 = false;
    let mut in_code_block = false;

    md.lines()
        .map(|line| {
            if is_fence(line) {
                in_code_block = !in_code_block;
                return line.to_string();
            }
            if in_code_block {
                return line.to_string();
            }
            match H1_RE.captures(line) {
                Some(caps) if seen_h1 => format!("## {}", &caps[1]),
                Some(_) => {
                    seen_h1 = true;
                    line.to_string()
                }
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 4: Normalize whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace on every line and normalize line endings.
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: Clean up excessive blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ blank lines into exactly 2.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 6: Ensure trailing newline
// ---------------------------------------------------------------------------

/// Ensure the file ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Link resolution (conversion only)
// ---------------------------------------------------------------------------

/// Resolve relative URLs in Markdown links against a base URL.
///
/// Images, absolute URLs, anchors, and `mailto:` links are left as-is.
pub(crate) fn resolve_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let start = caps.get(0).map_or(0, |m| m.start());
            let text = &caps[1];
            let href = &caps[2];

            if start > 0 && md.as_bytes()[start - 1] == b'!' {
                return caps[0].to_string();
            }

            if href.starts_with("http://")
                || href.starts_with("https://")
                || href.starts_with('#')
                || href.starts_with("mailto:")
            {
                return caps[0].to_string();
            }

            match base.join(href) {
                Ok(resolved) => format!("[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
