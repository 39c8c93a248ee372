//! End-to-end `build` pipeline: URL → mirror → convert → normalize →
//! assemble → validate → package.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use walkdir::WalkDir;

use site2skill_fetcher::{SiteMirror, crawl_root};
use site2skill_paths::{normalize_lexically, scheme_of};
use site2skill_shared::{AppConfig, CollisionPolicy, PageRecord, Result, Site2SkillError};

use crate::convert::{ConvertStage, convert_crawl};

/// Subdirectory of the temp dir the mirror writes into.
pub const DOWNLOAD_DIR: &str = "download";

/// Subdirectory of the temp dir holding converted Markdown.
pub const STAGING_DIR: &str = "markdown";

/// Configuration for [`run`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Documentation site to mirror.
    pub url: Url,
    /// Skill identifier, also the skill directory and archive name.
    pub skill_name: String,
    /// Base directory the skill directory is created under.
    pub output_dir: PathBuf,
    /// Directory the `.skill` archive is written to.
    pub skill_output: PathBuf,
    /// Scratch directory for the mirror and staged Markdown.
    pub temp_dir: PathBuf,
    /// Reuse an existing mirror under `temp_dir` instead of downloading.
    pub skip_fetch: bool,
    /// Remove `temp_dir` once the archive is written.
    pub clean: bool,
    /// Output collision policy.
    pub collision: CollisionPolicy,
    /// Size above which validation warns.
    pub max_total_bytes: u64,
}

impl PipelineConfig {
    /// Build a config from the loaded [`AppConfig`] defaults.
    pub fn new(url: Url, skill_name: impl Into<String>, app: &AppConfig) -> Self {
        Self {
            url,
            skill_name: skill_name.into(),
            output_dir: PathBuf::from(&app.defaults.output_dir),
            skill_output: PathBuf::from(&app.defaults.skill_output),
            temp_dir: PathBuf::from(&app.defaults.temp_dir),
            skip_fetch: false,
            clean: false,
            collision: app.defaults.collision,
            max_total_bytes: app.validation.max_total_bytes,
        }
    }

    /// Directory the mirror writes into.
    pub fn download_dir(&self) -> PathBuf {
        self.temp_dir.join(DOWNLOAD_DIR)
    }

    /// Directory the converted Markdown is staged in.
    pub fn staging_dir(&self) -> PathBuf {
        self.temp_dir.join(STAGING_DIR)
    }
}

/// Result of [`run`].
#[derive(Debug)]
pub struct PipelineResult {
    /// Assembled skill directory.
    pub skill_dir: PathBuf,
    /// Written `.skill` archive.
    pub skill_file: PathBuf,
    /// Pages converted to Markdown.
    pub pages_converted: usize,
    /// Crawled files skipped with a warning.
    pub pages_skipped: usize,
    /// Output paths written more than once.
    pub collisions: usize,
    /// Whether the skill passed validation.
    pub valid: bool,
    /// Per-page records, in crawl order.
    pub pages: Vec<PageRecord>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each crawled file is processed.
    fn page_converted(&self, path: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &PipelineResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_converted(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &PipelineResult) {}
}

/// Run the full `build` pipeline.
///
/// 1. Mirror the site (unless `skip_fetch`)
/// 2. Convert HTML → Markdown into the staging dir
/// 3. Normalize the staged Markdown
/// 4. Assemble the skill directory
/// 5. Validate it (a failure is logged, packaging still happens)
/// 6. Package it into `<skill_output>/<skill_name>.skill`
#[instrument(skip_all, fields(url = %config.url, skill = %config.skill_name))]
pub fn run(
    config: &PipelineConfig,
    mirror: &dyn SiteMirror,
    progress: &dyn ProgressReporter,
) -> Result<PipelineResult> {
    let start = Instant::now();
    let fetched_at = Utc::now();

    info!(url = %config.url, skill = %config.skill_name, "starting build pipeline");

    // --- Phase 1: Mirror ---
    let crawl_dir = if config.skip_fetch {
        let dir = crawl_root(&config.download_dir());
        if !dir.is_dir() {
            return Err(Site2SkillError::Fetch(format!(
                "no existing crawl at {}, run without --skip-fetch first",
                dir.display()
            )));
        }
        info!(crawl_dir = %dir.display(), "skipping fetch, reusing crawl");
        dir
    } else {
        progress.phase("Downloading site");
        reset_dir(&config.temp_dir)?;
        info!(mirror = mirror.name(), "mirroring site");
        mirror.mirror(&config.url, &config.download_dir())?
    };

    // --- Phase 2: Convert ---
    progress.phase("Converting to Markdown");
    let staging = config.staging_dir();
    reset_dir(&staging)?;

    let scheme = scheme_of(config.url.as_str());
    let stats = convert_crawl(
        &ConvertStage {
            crawl_root: &crawl_dir,
            staging_root: &staging,
            scheme: &scheme,
            fetched_at,
            collision: config.collision,
        },
        progress,
    )?;

    if stats.pages.is_empty() {
        warn!(crawl_dir = %crawl_dir.display(), "no pages were converted");
    }

    // --- Phase 3: Normalize ---
    progress.phase("Normalizing Markdown");
    normalize_tree(&staging)?;

    // --- Phase 4: Assemble ---
    progress.phase("Assembling skill");
    let assembled = site2skill_skill::generate_skill_structure(
        &config.skill_name,
        Some(staging.as_path()),
        &config.output_dir,
    )?;

    // --- Phase 5: Validate ---
    progress.phase("Validating skill");
    let report = site2skill_skill::validate_skill(&assembled.skill_dir, config.max_total_bytes)?;
    for warning in &report.warnings {
        warn!(%warning, "validation warning");
    }
    if !report.is_valid() {
        for problem in &report.errors {
            error!(%problem, "validation error");
        }
        error!("skill failed validation, packaging anyway");
    }

    // --- Phase 6: Package ---
    progress.phase("Packaging skill");
    let package = site2skill_skill::package_skill(&assembled.skill_dir, &config.skill_output)?;

    if config.clean {
        progress.phase("Cleaning up");
        std::fs::remove_dir_all(&config.temp_dir)
            .map_err(|e| Site2SkillError::io(&config.temp_dir, e))?;
        debug!(path = %config.temp_dir.display(), "removed temp dir");
    }

    let result = PipelineResult {
        skill_dir: assembled.skill_dir,
        skill_file: package.path,
        pages_converted: stats.pages.len(),
        pages_skipped: stats.skipped,
        collisions: stats.collisions,
        valid: report.is_valid(),
        pages: stats.pages,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        pages = result.pages_converted,
        skipped = result.pages_skipped,
        collisions = result.collisions,
        valid = result.valid,
        skill_file = %result.skill_file.display(),
        elapsed_ms = result.elapsed.as_millis(),
        "build pipeline complete"
    );

    Ok(result)
}

/// Normalize every `*.md` under `dir` in place, returning how many changed.
pub fn normalize_tree(dir: &Path) -> Result<usize> {
    let mut changed = 0;
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
    {
        if site2skill_markdown::normalize_file(entry.path())? {
            changed += 1;
        }
    }
    debug!(changed, "normalized staged Markdown");
    Ok(changed)
}

/// Remove `dir` if present and recreate it empty.
///
/// Refuses paths with no named component (`.`, `/`, `..`).
fn reset_dir(dir: &Path) -> Result<()> {
    let has_name = normalize_lexically(dir)
        .components()
        .any(|c| matches!(c, std::path::Component::Normal(_)));
    if !has_name {
        return Err(Site2SkillError::config(format!(
            "refusing to clear {}, choose a dedicated temp dir",
            dir.display()
        )));
    }

    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| Site2SkillError::io(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| Site2SkillError::io(dir, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("s2s-pipeline-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn page(title: &str) -> String {
        format!(
            "<html><head><title>{title}</title></head><body><main><h1>{title}</h1>\
             <p>About {title}. See <a href=\"/a/index.html\">A</a>.</p></main></body></html>"
        )
    }

    fn write_site(crawl: &Path) {
        for (rel, title) in [
            ("example.com/index.html", "Home"),
            ("example.com/a/index.html", "A"),
            ("example.com/b/c/index.html", "C"),
        ] {
            let path = crawl.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, page(title)).unwrap();
        }
    }

    /// Writes a fixed site instead of downloading.
    struct FakeMirror;

    impl SiteMirror for FakeMirror {
        fn mirror(&self, _url: &Url, dest: &Path) -> Result<PathBuf> {
            let root = crawl_root(dest);
            write_site(&root);
            Ok(root)
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    /// Fails if called.
    struct NoMirror;

    impl SiteMirror for NoMirror {
        fn mirror(&self, _url: &Url, _dest: &Path) -> Result<PathBuf> {
            Err(Site2SkillError::Fetch("mirror should not run".into()))
        }

        fn name(&self) -> &str {
            "none"
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        pages: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn page_converted(&self, path: &str, _current: usize, _total: usize) {
            self.pages.lock().unwrap().push(path.to_string());
        }
        fn done(&self, _result: &PipelineResult) {}
    }

    fn config(tmp: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::new(
            Url::parse("https://example.com/").unwrap(),
            "example",
            &AppConfig::default(),
        );
        config.output_dir = tmp.join("skills");
        config.skill_output = tmp.join("dist");
        config.temp_dir = tmp.join("build");
        config
    }

    #[test]
    fn build_from_existing_crawl() {
        let tmp = temp_dir();
        let config = PipelineConfig {
            skip_fetch: true,
            ..config(&tmp)
        };
        write_site(&crawl_root(&config.download_dir()));

        let result = run(&config, &NoMirror, &SilentProgress).unwrap();

        assert_eq!(result.pages_converted, 3);
        assert_eq!(result.collisions, 0);
        assert!(result.valid);

        let docs = result.skill_dir.join("docs/example.com");
        assert!(docs.join("index.md").is_file());
        assert!(docs.join("a/index.md").is_file());
        assert!(docs.join("b/c/index.md").is_file());

        let a = std::fs::read_to_string(docs.join("a/index.md")).unwrap();
        assert!(a.starts_with("---\nsource_url: \"https://example.com/a/index\"\n"));
        assert!(a.contains("[A](https://example.com/a/index.html)"));

        assert_eq!(result.skill_file, tmp.join("dist/example.skill"));
        assert!(result.skill_file.is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn build_with_mirror_reports_phases() {
        let tmp = temp_dir();
        let config = config(&tmp);
        let progress = RecordingProgress::default();

        let result = run(&config, &FakeMirror, &progress).unwrap();
        assert_eq!(result.pages_converted, 3);

        let phases = progress.phases.lock().unwrap();
        assert_eq!(phases.first().map(String::as_str), Some("Downloading site"));
        assert_eq!(phases.last().map(String::as_str), Some("Packaging skill"));
        assert_eq!(progress.pages.lock().unwrap().len(), 3);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn fetch_wipes_stale_temp_files() {
        let tmp = temp_dir();
        let config = config(&tmp);
        let stale = crawl_root(&config.download_dir()).join("old.example.com/index.html");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, page("Old")).unwrap();

        let result = run(&config, &FakeMirror, &SilentProgress).unwrap();
        assert_eq!(result.pages_converted, 3);
        assert!(!stale.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn clean_removes_temp_dir() {
        let tmp = temp_dir();
        let config = PipelineConfig {
            clean: true,
            ..config(&tmp)
        };

        let result = run(&config, &FakeMirror, &SilentProgress).unwrap();
        assert!(!config.temp_dir.exists());
        assert!(result.skill_file.is_file());
        assert!(result.skill_dir.join("SKILL.md").is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn skip_fetch_without_crawl_fails() {
        let tmp = temp_dir();
        let config = PipelineConfig {
            skip_fetch: true,
            ..config(&tmp)
        };

        let err = run(&config, &NoMirror, &SilentProgress).unwrap_err();
        assert!(matches!(err, Site2SkillError::Fetch(_)));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn empty_crawl_still_packages_invalid_skill() {
        let tmp = temp_dir();
        let config = PipelineConfig {
            skip_fetch: true,
            ..config(&tmp)
        };
        std::fs::create_dir_all(crawl_root(&config.download_dir())).unwrap();

        let result = run(&config, &NoMirror, &SilentProgress).unwrap();
        assert_eq!(result.pages_converted, 0);
        assert!(!result.valid);
        assert!(result.skill_file.is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn reset_dir_refuses_unnamed_paths() {
        assert!(reset_dir(Path::new(".")).is_err());
        assert!(reset_dir(Path::new("a/..")).is_err());
    }

    #[test]
    fn normalize_tree_counts_changes() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("clean.md"), "# Clean\n").unwrap();
        std::fs::write(tmp.join("messy.md"), "# Messy   \n\n\n\n\nText").unwrap();

        assert_eq!(normalize_tree(&tmp).unwrap(), 1);
        assert_eq!(normalize_tree(&tmp).unwrap(), 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
