//! Crawl path → (Markdown output path, source URL).
//!
//! The mirroring tool stores `https://docs.example.com/a/index` as
//! `docs.example.com/a/index.html` under the crawl root. [`map_path`] reverses
//! that: the first segment is the host, the remaining segments are the URL
//! path, and the output path keeps every directory so that `a/index.html`
//! and `b/index.html` land on different Markdown files.

use url::Url;

use crate::error::{PathError, Result};

/// Scheme used when the caller does not supply one.
pub const DEFAULT_SCHEME: &str = "https";

const HTML_SUFFIX: &str = ".html";
const MD_SUFFIX: &str = ".md";

/// Result of mapping one crawled file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappedPath {
    /// Relative Markdown path, `/`-separated (not yet sanitized).
    pub output_path: String,
    /// Best-effort reconstruction of the page's original URL.
    pub source_url: String,
}

/// Map a crawl-relative path to its Markdown output path and source URL.
///
/// `scheme` defaults to [`DEFAULT_SCHEME`] when `None` or empty. Both `/` and
/// `\` separate segments; empty segments are ignored. Fails with
/// [`PathError::InvalidInput`] when no segment remains.
///
/// ```
/// use site2skill_paths::map_path;
///
/// let mapped = map_path("docs.example.com/a/index.html", None).unwrap();
/// assert_eq!(mapped.output_path, "docs.example.com/a/index.md");
/// assert_eq!(mapped.source_url, "https://docs.example.com/a/index");
/// ```
pub fn map_path(rel_path: &str, scheme: Option<&str>) -> Result<MappedPath> {
    let segments = split_segments(rel_path);
    if segments.is_empty() {
        return Err(PathError::invalid(rel_path, "path has no segments"));
    }

    let joined = segments.join("/");
    let scheme = scheme.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SCHEME);

    let url_path = joined.strip_suffix(HTML_SUFFIX).unwrap_or(&joined);

    Ok(MappedPath {
        output_path: md_path_for(&joined),
        source_url: format!("{scheme}://{url_path}"),
    })
}

/// Apply the extension rule alone: a trailing `.html` becomes `.md`, anything
/// else gets `.md` appended.
pub fn md_path_for(path: &str) -> String {
    match path.strip_suffix(HTML_SUFFIX) {
        Some(stem) => format!("{stem}{MD_SUFFIX}"),
        None => format!("{path}{MD_SUFFIX}"),
    }
}

/// Scheme of the operator-supplied base URL, or [`DEFAULT_SCHEME`] when the
/// URL does not parse.
pub fn scheme_of(base_url: &str) -> String {
    Url::parse(base_url)
        .map(|u| u.scheme().to_string())
        .unwrap_or_else(|_| DEFAULT_SCHEME.to_string())
}

/// Split a relative path into its non-empty segments.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped(output: &str, url: &str) -> MappedPath {
        MappedPath {
            output_path: output.into(),
            source_url: url.into(),
        }
    }

    #[test]
    fn maps_nested_index_page() {
        assert_eq!(
            map_path("docs.example.com/a/index.html", None).unwrap(),
            mapped("docs.example.com/a/index.md", "https://docs.example.com/a/index")
        );
    }

    #[test]
    fn maps_root_index_page_distinct_from_nested() {
        let root = map_path("docs.example.com/index.html", None).unwrap();
        assert_eq!(
            root,
            mapped("docs.example.com/index.md", "https://docs.example.com/index")
        );

        let nested = map_path("docs.example.com/a/index.html", None).unwrap();
        assert_ne!(root.output_path, nested.output_path);
    }

    #[test]
    fn extensionless_file_gets_md_appended() {
        let m = map_path("docs.pay.jp/v1/cardtoken", None).unwrap();
        assert_eq!(m.output_path, "docs.pay.jp/v1/cardtoken.md");
        assert_eq!(m.source_url, "https://docs.pay.jp/v1/cardtoken");
    }

    #[test]
    fn only_trailing_html_is_stripped() {
        let m = map_path("example.com/html.html/page.htmlx", None).unwrap();
        assert_eq!(m.output_path, "example.com/html.html/page.htmlx.md");
        assert_eq!(m.source_url, "https://example.com/html.html/page.htmlx");
    }

    #[test]
    fn explicit_scheme_is_used() {
        let m = map_path("example.com/page.html", Some("http")).unwrap();
        assert_eq!(m.source_url, "http://example.com/page");
    }

    #[test]
    fn empty_scheme_falls_back_to_https() {
        let m = map_path("example.com/page.html", Some("")).unwrap();
        assert_eq!(m.source_url, "https://example.com/page");
    }

    #[test]
    fn backslash_and_doubled_separators_are_segments() {
        let m = map_path("example.com\\guide//intro.html", None).unwrap();
        assert_eq!(m.output_path, "example.com/guide/intro.md");
        assert_eq!(m.source_url, "https://example.com/guide/intro");
    }

    #[test]
    fn empty_path_is_invalid_input() {
        for input in ["", "/", "//\\"] {
            let err = map_path(input, None).unwrap_err();
            assert!(
                matches!(err, PathError::InvalidInput { .. }),
                "expected InvalidInput for {input:?}"
            );
        }
    }

    #[test]
    fn mapping_is_deterministic() {
        let a = map_path("example.com/a/b.html", Some("https")).unwrap();
        let b = map_path("example.com/a/b.html", Some("https")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_directories_map_to_distinct_outputs() {
        let paths = [
            "example.com/index.html",
            "example.com/a/index.html",
            "example.com/a/b/index.html",
            "example.com/b/index.html",
            "other.example.com/index.html",
        ];
        let mut outputs: Vec<String> = paths
            .iter()
            .map(|p| map_path(p, None).unwrap().output_path)
            .collect();
        outputs.sort();
        outputs.dedup();
        assert_eq!(outputs.len(), paths.len());
    }

    #[test]
    fn md_path_for_examples() {
        assert_eq!(md_path_for("docs/index.html"), "docs/index.md");
        assert_eq!(md_path_for("page.html"), "page.md");
        assert_eq!(md_path_for("docs/page"), "docs/page.md");
    }

    #[test]
    fn scheme_of_reads_base_url() {
        assert_eq!(scheme_of("http://docs.example.com/"), "http");
        assert_eq!(scheme_of("https://docs.example.com/v1"), "https");
        assert_eq!(scheme_of("docs.example.com"), "https");
        assert_eq!(scheme_of(""), "https");
    }
}
