//! Site mirroring.
//!
//! This crate provides:
//! - [`SiteMirror`]: the seam the pipeline downloads through
//! - [`WgetMirror`]: a `wget --recursive` implementation
//!
//! A mirror writes its tree under `<dest>/crawl/`, one top-level directory per
//! host, mirroring the remote path hierarchy.

pub mod wget;

use std::path::{Path, PathBuf};

use url::Url;

use site2skill_shared::Result;

pub use wget::{WgetMirror, wget_exit_meaning};

/// Name of the directory a mirror creates under its destination.
pub const CRAWL_DIR_NAME: &str = "crawl";

/// Downloads a documentation site into a local directory tree.
pub trait SiteMirror {
    /// Mirror `url` under `dest`, returning the crawl root (`dest/crawl`).
    fn mirror(&self, url: &Url, dest: &Path) -> Result<PathBuf>;

    /// Human-readable mirror name for tracing.
    fn name(&self) -> &str;
}

/// Crawl root a mirror uses for `dest`.
pub fn crawl_root(dest: &Path) -> PathBuf {
    dest.join(CRAWL_DIR_NAME)
}

/// Number of regular files under `dir` (0 if it does not exist).
pub fn count_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}
