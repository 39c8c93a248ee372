//! Core domain types: front matter, skill manifest, converted page records.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delimiter line opening and closing a front-matter block.
pub const FRONT_MATTER_FENCE: &str = "---";

// ---------------------------------------------------------------------------
// FrontMatter
// ---------------------------------------------------------------------------

/// Flat `key: value` front matter at the top of a Markdown file.
///
/// Only the subset written by this tool is understood: one scalar per line,
/// optionally double-quoted with `\"` and `\\` escapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    /// Parsed fields in key order.
    pub fields: BTreeMap<String, String>,
}

impl FrontMatter {
    /// Parse the front matter of `markdown`, if it has any.
    pub fn parse(markdown: &str) -> Option<Self> {
        let (block, _) = split_front_matter(markdown)?;
        let fields = block
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), unquote(value.trim())))
            })
            .collect();
        Some(Self { fields })
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Render a block with quoted values, fences included, in the given order.
    pub fn render(entries: &[(&str, &str)]) -> String {
        let mut fm = format!("{FRONT_MATTER_FENCE}\n");
        for (key, value) in entries {
            fm.push_str(&format!("{key}: \"{}\"\n", escape_value(value)));
        }
        fm.push_str(FRONT_MATTER_FENCE);
        fm.push('\n');
        fm
    }
}

/// Split `markdown` into `(front matter block, body)`.
///
/// The block excludes both fences. Returns `None` when the text does not open
/// with a fence line or the block is never closed. Fence lines may carry
/// trailing whitespace.
pub fn split_front_matter(markdown: &str) -> Option<(&str, &str)> {
    let first = markdown.split_inclusive('\n').next()?;
    if first.trim_end() != FRONT_MATTER_FENCE || !first.ends_with('\n') {
        return None;
    }
    let rest = &markdown[first.len()..];

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn escape_value(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// SkillManifest
// ---------------------------------------------------------------------------

/// The `SKILL.md` front matter that identifies a skill bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillManifest {
    /// Skill identifier (lowercase letters, digits, hyphens).
    pub name: String,
    /// One-line description shown to the assistant.
    pub description: String,
}

impl SkillManifest {
    /// Default manifest for a freshly generated skill.
    pub fn for_skill(skill_name: &str) -> Self {
        Self {
            name: skill_name.to_string(),
            description: format!("{} documentation assistant", skill_name.to_uppercase()),
        }
    }

    /// Read `name` and `description` out of parsed front matter.
    pub fn from_front_matter(fm: &FrontMatter) -> Option<Self> {
        Some(Self {
            name: fm.get("name")?.to_string(),
            description: fm.get("description")?.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// PageRecord
// ---------------------------------------------------------------------------

/// One HTML file converted during a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// Crawl-relative input path (e.g. `docs.example.com/a/index.html`).
    pub crawl_path: String,
    /// Sanitized Markdown path relative to the staging root.
    pub output_path: String,
    /// Reconstructed source URL.
    pub source_url: String,
    /// Page title written to the front matter.
    pub title: String,
    /// Approximate body word count.
    pub word_count: usize,
    /// Run timestamp written as `fetched_at`.
    pub fetched_at: DateTime<Utc>,
    /// Absolute path of the written file.
    #[serde(skip)]
    pub written_to: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_then_parse_front_matter() {
        let rendered = FrontMatter::render(&[
            ("source_url", "https://example.com/a"),
            ("title", "Say \"hi\" \\ bye"),
        ]);
        assert!(rendered.starts_with("---\n"));
        assert!(rendered.contains("title: \"Say \\\"hi\\\" \\\\ bye\""));

        let doc = format!("{rendered}\n# Body\n");
        let fm = FrontMatter::parse(&doc).expect("front matter");
        assert_eq!(fm.get("source_url"), Some("https://example.com/a"));
        assert_eq!(fm.get("title"), Some("Say \"hi\" \\ bye"));
    }

    #[test]
    fn parse_unquoted_values() {
        let doc = "---\nname: payjp\ndescription: PAYJP documentation assistant\n---\n\n# PAYJP\n";
        let fm = FrontMatter::parse(doc).unwrap();
        let manifest = SkillManifest::from_front_matter(&fm).unwrap();
        assert_eq!(manifest, SkillManifest::for_skill("payjp"));
    }

    #[test]
    fn url_values_keep_colons() {
        let doc = "---\nsource_url: https://example.com:8080/x\n---\n";
        let fm = FrontMatter::parse(doc).unwrap();
        assert_eq!(fm.get("source_url"), Some("https://example.com:8080/x"));
    }

    #[test]
    fn split_requires_opening_and_closing_fence() {
        assert!(split_front_matter("# No front matter\n").is_none());
        assert!(split_front_matter("---\ntitle: x\nno close\n").is_none());

        let (block, body) = split_front_matter("---\ntitle: x\n---\nbody\n").unwrap();
        assert_eq!(block, "title: x\n");
        assert_eq!(body, "body\n");
    }

    #[test]
    fn split_handles_crlf() {
        let (block, body) = split_front_matter("---\r\ntitle: x\r\n---\r\nbody").unwrap();
        assert_eq!(block, "title: x\r\n");
        assert_eq!(body, "body");
    }

    #[test]
    fn manifest_missing_description_is_none() {
        let fm = FrontMatter::parse("---\nname: x\n---\n").unwrap();
        assert!(SkillManifest::from_front_matter(&fm).is_none());
    }
}
