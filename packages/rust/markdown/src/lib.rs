//! HTML-to-Markdown conversion and Markdown normalization.
//!
//! [`convert`] turns a crawled HTML page into Markdown using the `htmd` crate
//! and prepends a front-matter block carrying `source_url`, `title`, and
//! `fetched_at`. [`normalize`] runs the cleanup passes over an existing
//! Markdown document; it leaves front matter untouched and is idempotent.

mod cleanup;

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use site2skill_shared::{FrontMatter, Result, Site2SkillError, split_front_matter};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of converting an HTML page to Markdown.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The final Markdown content (with front matter).
    pub markdown: String,
    /// Extracted or inferred page title.
    pub title: String,
    /// Approximate word count of the Markdown body (excluding front matter).
    pub word_count: usize,
}

/// Options for the HTML-to-Markdown conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Source URL used for resolving relative links and front matter.
    pub source_url: String,
    /// Override title (if `None`, taken from the first H1, then `<title>`).
    pub title: Option<String>,
    /// ISO 8601 timestamp for the `fetched_at` front-matter field.
    pub fetched_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Tags dropped entirely during conversion.
const SKIP_TAGS: [&str; 6] = ["script", "style", "nav", "iframe", "noscript", "svg"];

/// Convert HTML to clean Markdown with front matter.
///
/// 1. Extracts the content HTML (known content containers, else `<body>`)
/// 2. Pre-processes HTML tables into markdown tables
/// 3. Converts HTML → Markdown via `htmd`
/// 4. Resolves relative links against `source_url`
/// 5. Runs the normalization passes
/// 6. Prepends front matter
#[instrument(skip(html), fields(url = %opts.source_url))]
pub fn convert(html: &str, opts: &ConvertOptions) -> Result<ConvertResult> {
    let extracted = extract_content(html);
    let content_html = preprocess_tables(&extracted.html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| Site2SkillError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    let base_url = Url::parse(&opts.source_url).ok();
    let linked = cleanup::resolve_links(&raw_markdown, base_url.as_ref());
    let cleaned = cleanup::trim_leading_blank_lines(&cleanup::run_pipeline(&linked));

    let title = opts
        .title
        .clone()
        .or_else(|| extract_title_from_markdown(&cleaned))
        .or(extracted.title)
        .unwrap_or_else(|| "Untitled".to_string());

    let word_count = count_words(&cleaned);

    let mut entries = vec![("source_url", opts.source_url.as_str()), ("title", title.as_str())];
    if let Some(ts) = opts.fetched_at.as_deref() {
        entries.push(("fetched_at", ts));
    }
    let markdown = format!("{}\n{cleaned}", FrontMatter::render(&entries));

    debug!(
        title = %title,
        word_count,
        final_len = markdown.len(),
        "conversion complete"
    );

    Ok(ConvertResult {
        markdown,
        title,
        word_count,
    })
}

/// Convert the HTML file at `html_path` and write the Markdown to `md_path`,
/// creating parent directories as needed. Invalid UTF-8 is replaced.
#[instrument(skip(opts), fields(html = %html_path.display(), md = %md_path.display()))]
pub fn convert_file(html_path: &Path, md_path: &Path, opts: &ConvertOptions) -> Result<ConvertResult> {
    let bytes = std::fs::read(html_path).map_err(|e| Site2SkillError::io(html_path, e))?;
    let html = String::from_utf8_lossy(&bytes);

    let result = convert(&html, opts)?;

    if let Some(parent) = md_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Site2SkillError::io(parent, e))?;
    }
    std::fs::write(md_path, &result.markdown).map_err(|e| Site2SkillError::io(md_path, e))?;

    Ok(result)
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Normalize a Markdown document.
///
/// A front-matter block, if present, is kept verbatim and separated from the
/// body by one blank line. The body goes through the cleanup passes.
/// `normalize(&normalize(md)) == normalize(md)`.
pub fn normalize(markdown: &str) -> String {
    if let Some((block, body)) = split_front_matter(markdown) {
        return with_front_matter(block, body);
    }

    // Cleanup can strip markup in front of a fence pair, exposing a block
    // that the next pass would read as front matter.
    let cleaned = cleanup::run_pipeline(markdown);
    match split_front_matter(&cleaned) {
        Some((block, body)) => with_front_matter(block, body),
        None => cleaned,
    }
}

fn with_front_matter(block: &str, body: &str) -> String {
    let body = cleanup::trim_leading_blank_lines(&cleanup::run_pipeline(body));
    format!("---\n{block}---\n\n{body}")
}

/// Normalize the Markdown file at `path` in place. Returns `true` if the file
/// changed.
#[instrument(fields(path = %path.display()))]
pub fn normalize_file(path: &Path) -> Result<bool> {
    let original = std::fs::read_to_string(path).map_err(|e| Site2SkillError::io(path, e))?;
    let normalized = normalize(&original);

    if normalized == original {
        return Ok(false);
    }

    std::fs::write(path, &normalized).map_err(|e| Site2SkillError::io(path, e))?;
    debug!(before = original.len(), after = normalized.len(), "normalized");
    Ok(true)
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("valid selector"));
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));

/// Convert HTML `<table>` elements to markdown table syntax before htmd conversion.
///
/// `htmd` 0.1 doesn't support table conversion, so we handle it manually.
fn preprocess_tables(html: &str) -> String {
    let doc = Html::parse_fragment(html);

    if doc.select(&TABLE_SEL).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();
    for table_el in doc.select(&TABLE_SEL) {
        let md_table = html_table_to_markdown(&table_el);
        result = result.replacen(&table_el.html(), &md_table, 1);
    }

    result
}

/// Convert a single HTML table element to a markdown table string.
fn html_table_to_markdown(table: &scraper::ElementRef) -> String {
    let cell_text = |cell: scraper::ElementRef| cell.text().collect::<String>().trim().to_string();

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut has_header = false;

    for tr in table.select(&TR_SEL) {
        let ths: Vec<String> = tr.select(&TH_SEL).map(cell_text).collect();
        if !ths.is_empty() {
            has_header = true;
            rows.push(ths);
            continue;
        }

        let tds: Vec<String> = tr.select(&TD_SEL).map(cell_text).collect();
        if !tds.is_empty() {
            rows.push(tds);
        }
    }

    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }

    for row in &mut rows {
        row.resize(col_count, String::new());
    }

    let render_row = |row: &[String]| format!("| {} |\n", row.join(" | "));

    let mut md = String::from("\n\n");
    md.push_str(&render_row(&rows[0]));
    md.push_str(&render_row(&vec!["---".to_string(); col_count]));

    // Without <th> cells the first row doubles as the header.
    let data_start = usize::from(has_header);
    for row in &rows[data_start..] {
        md.push_str(&render_row(row));
    }

    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Content HTML plus the document `<title>`, if any.
struct Extracted {
    html: String,
    title: Option<String>,
}

/// Extract the main content HTML, stripping chrome (nav, header, footer, etc.).
fn extract_content(html: &str) -> Extracted {
    static CONTENT_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        [
            "article .markdown", // Docusaurus
            ".vp-doc",           // VitePress
            ".markdown-section", // GitBook
            "[role=\"main\"]",   // ReadTheDocs / generic
            "article",
            "main",
            ".content",
            "body",
        ]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
    });
    static TITLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("title").expect("valid selector"));

    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE_SEL)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let content = CONTENT_SELS
        .iter()
        .find_map(|sel| doc.select(sel).next())
        .map(|el| el.inner_html())
        .unwrap_or_else(|| html.to_string());

    Extracted {
        html: content,
        title,
    }
}

/// Extract title from the first H1 in the Markdown text.
fn extract_title_from_markdown(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

/// Count words in Markdown body (excluding code blocks).
fn count_words(md: &str) -> usize {
    static CODE_BLOCK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

    CODE_BLOCK_RE
        .replace_all(md, "")
        .split_whitespace()
        .filter(|w| !w.starts_with('#') || w.len() > 2)
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
