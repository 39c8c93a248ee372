//! Crawl tree → staged Markdown tree.
//!
//! Every `*.html` under the crawl root is mapped, sanitized, and converted
//! into the staging directory, keeping the host/path hierarchy.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use site2skill_markdown::ConvertOptions;
use site2skill_paths::{contained_join, map_path, sanitize_path};
use site2skill_shared::{CollisionPolicy, PageRecord, Result, Site2SkillError};

use crate::pipeline::ProgressReporter;

/// Counters and records from [`convert_crawl`].
#[derive(Debug, Clone, Default)]
pub struct ConvertStats {
    /// Pages written to the staging directory, in crawl order.
    pub pages: Vec<PageRecord>,
    /// Files skipped with a warning.
    pub skipped: usize,
    /// Files whose output path was already written during this run.
    pub collisions: usize,
}

/// Inputs for [`convert_crawl`].
#[derive(Debug, Clone)]
pub struct ConvertStage<'a> {
    /// Mirror output, one directory per host.
    pub crawl_root: &'a Path,
    /// Directory the Markdown tree is written under.
    pub staging_root: &'a Path,
    /// URL scheme used for reconstructed source URLs.
    pub scheme: &'a str,
    /// Timestamp written as every page's `fetched_at`.
    pub fetched_at: DateTime<Utc>,
    /// What to do when two files map to one output path.
    pub collision: CollisionPolicy,
}

/// Every `*.html` file under `crawl_root`, sorted by path.
pub fn discover_html(crawl_root: &Path) -> Vec<PathBuf> {
    WalkDir::new(crawl_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "unreadable crawl entry, skipping");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Convert the crawl tree into the staging tree.
///
/// Mapper or conversion failures skip the file. An output path written
/// twice is either overwritten (last write wins) or aborts the run with
/// [`Site2SkillError::Collision`], per `stage.collision`. I/O errors on the
/// staging side abort the run.
#[instrument(skip_all, fields(crawl_root = %stage.crawl_root.display()))]
pub fn convert_crawl(stage: &ConvertStage<'_>, progress: &dyn ProgressReporter) -> Result<ConvertStats> {
    let files = discover_html(stage.crawl_root);
    let total = files.len();
    info!(files = total, "discovered HTML files");

    let fetched_at = stage.fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut stats = ConvertStats::default();

    for (i, html_path) in files.iter().enumerate() {
        let Some(rel) = crawl_relative(stage.crawl_root, html_path) else {
            warn!(file = %html_path.display(), "file escapes the crawl root, skipping");
            stats.skipped += 1;
            continue;
        };

        let mapped = match map_path(&rel, Some(stage.scheme)) {
            Ok(mapped) => mapped,
            Err(e) => {
                warn!(file = %rel, error = %e, "cannot map path, skipping");
                stats.skipped += 1;
                continue;
            }
        };

        let output_path = sanitize_path(&mapped.output_path);
        let dest = match contained_join(stage.staging_root, &output_path) {
            Ok(dest) => dest,
            Err(e) => {
                warn!(file = %rel, error = %e, "output escapes the staging root, skipping");
                stats.skipped += 1;
                continue;
            }
        };

        if dest.exists() {
            stats.collisions += 1;
            match stage.collision {
                CollisionPolicy::Overwrite => {
                    warn!(file = %rel, output = %output_path, "output collision, overwriting");
                }
                CollisionPolicy::Fail => {
                    return Err(Site2SkillError::Collision { path: output_path });
                }
            }
        }

        let opts = ConvertOptions {
            source_url: mapped.source_url.clone(),
            title: None,
            fetched_at: Some(fetched_at.clone()),
        };

        match site2skill_markdown::convert_file(html_path, &dest, &opts) {
            Ok(result) => {
                debug!(file = %rel, output = %output_path, title = %result.title, "converted");
                stats.pages.push(PageRecord {
                    crawl_path: rel,
                    output_path: output_path.clone(),
                    source_url: mapped.source_url,
                    title: result.title,
                    word_count: result.word_count,
                    fetched_at: stage.fetched_at,
                    written_to: dest,
                });
            }
            Err(Site2SkillError::Io { ref path, ref source }) if path == html_path => {
                warn!(file = %rel, error = %source, "cannot read HTML, skipping");
                stats.skipped += 1;
            }
            Err(e @ Site2SkillError::Conversion(_)) => {
                warn!(file = %rel, error = %e, "conversion failed, skipping");
                stats.skipped += 1;
            }
            Err(e) => return Err(e),
        }

        progress.page_converted(&output_path, i + 1, total);
    }

    info!(
        converted = stats.pages.len(),
        skipped = stats.skipped,
        collisions = stats.collisions,
        "conversion complete"
    );

    Ok(stats)
}

/// `/`-joined path of `file` relative to `root`, or `None` if it lies outside.
fn crawl_relative(root: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(root).ok()?;
    contained_join(root, rel).ok()?;
    Some(
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("s2s-convert-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn page(title: &str) -> String {
        format!("<html><head><title>{title}</title></head><body><h1>{title}</h1><p>Body of {title}.</p></body></html>")
    }

    fn stage<'a>(crawl: &'a Path, staging: &'a Path, collision: CollisionPolicy) -> ConvertStage<'a> {
        ConvertStage {
            crawl_root: crawl,
            staging_root: staging,
            scheme: "https",
            fetched_at: "2026-03-01T12:00:00Z".parse().unwrap(),
            collision,
        }
    }

    #[test]
    fn discover_finds_only_html_sorted() {
        let tmp = temp_dir();
        write(&tmp, "example.com/b/index.html", "b");
        write(&tmp, "example.com/a/index.html", "a");
        write(&tmp, "example.com/style.css", "css");
        write(&tmp, "example.com/robots.txt", "txt");

        let found: Vec<_> = discover_html(&tmp)
            .into_iter()
            .map(|p| p.strip_prefix(&tmp).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            found,
            vec![
                PathBuf::from("example.com/a/index.html"),
                PathBuf::from("example.com/b/index.html"),
            ]
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn same_named_pages_stay_distinct() {
        let tmp = temp_dir();
        let crawl = tmp.join("crawl");
        let staging = tmp.join("markdown");
        write(&crawl, "example.com/index.html", &page("Home"));
        write(&crawl, "example.com/a/index.html", &page("A"));
        write(&crawl, "example.com/b/c/index.html", &page("C"));

        let stats = convert_crawl(&stage(&crawl, &staging, CollisionPolicy::Fail), &SilentProgress).unwrap();

        assert_eq!(stats.pages.len(), 3);
        assert_eq!(stats.collisions, 0);
        assert!(staging.join("example.com/index.md").is_file());
        assert!(staging.join("example.com/a/index.md").is_file());
        assert!(staging.join("example.com/b/c/index.md").is_file());

        let a = std::fs::read_to_string(staging.join("example.com/a/index.md")).unwrap();
        assert!(a.contains("source_url: \"https://example.com/a/index\""));
        assert!(a.contains("fetched_at: \"2026-03-01T12:00:00Z\""));
        assert!(a.contains("# A"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unsafe_characters_are_sanitized_in_output_only() {
        let tmp = temp_dir();
        let crawl = tmp.join("crawl");
        let staging = tmp.join("markdown");
        write(&crawl, "docs.example.com/api v2/intro@latest.html", &page("Intro"));

        let stats = convert_crawl(&stage(&crawl, &staging, CollisionPolicy::Overwrite), &SilentProgress).unwrap();

        let record = &stats.pages[0];
        assert_eq!(record.output_path, "docs.example.com/api_v2/intro_latest.md");
        assert_eq!(record.source_url, "https://docs.example.com/api v2/intro@latest");
        assert_eq!(record.crawl_path, "docs.example.com/api v2/intro@latest.html");
        assert!(record.written_to.is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn collision_overwrites_by_default() {
        let tmp = temp_dir();
        let crawl = tmp.join("crawl");
        let staging = tmp.join("markdown");
        write(&crawl, "example.com/a b.html", &page("Spaced"));
        write(&crawl, "example.com/a_b.html", &page("Underscored"));

        let stats = convert_crawl(&stage(&crawl, &staging, CollisionPolicy::Overwrite), &SilentProgress).unwrap();

        assert_eq!(stats.collisions, 1);
        assert_eq!(stats.pages.len(), 2);
        let written = std::fs::read_to_string(staging.join("example.com/a_b.md")).unwrap();
        assert!(written.contains("Underscored"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn collision_fails_when_configured() {
        let tmp = temp_dir();
        let crawl = tmp.join("crawl");
        let staging = tmp.join("markdown");
        write(&crawl, "example.com/a b.html", &page("Spaced"));
        write(&crawl, "example.com/a_b.html", &page("Underscored"));

        let err = convert_crawl(&stage(&crawl, &staging, CollisionPolicy::Fail), &SilentProgress).unwrap_err();
        match err {
            Site2SkillError::Collision { path } => assert_eq!(path, "example.com/a_b.md"),
            other => panic!("expected collision, got {other}"),
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn empty_crawl_converts_nothing() {
        let tmp = temp_dir();
        let stats = convert_crawl(&stage(&tmp, &tmp.join("markdown"), CollisionPolicy::Fail), &SilentProgress).unwrap();
        assert!(stats.pages.is_empty());
        assert_eq!(stats.skipped, 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn crawl_relative_uses_forward_slashes() {
        let root = Path::new("build/download/crawl");
        let file = root.join("example.com").join("a").join("index.html");
        assert_eq!(crawl_relative(root, &file).as_deref(), Some("example.com/a/index.html"));
        assert_eq!(crawl_relative(root, Path::new("elsewhere/x.html")), None);
    }
}
