//! `.skill` archive packaging.
//!
//! A `.skill` file is a zip archive whose entries all live under a single
//! `<skill_name>/` directory.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use site2skill_shared::{Result, Site2SkillError};

/// File extension of a packaged skill.
pub const SKILL_EXTENSION: &str = "skill";

/// Output from [`package_skill`].
#[derive(Debug, Clone, Serialize)]
pub struct PackageResult {
    /// Path of the written archive.
    pub path: PathBuf,
    /// Archive entry names, in archive order.
    pub entries: Vec<String>,
    /// Archive size on disk.
    pub size_bytes: u64,
    /// Hex SHA-256 of the archive.
    pub sha256: String,
}

/// Zip `skill_dir` into `<output_dir>/<skill_name>.skill`.
///
/// Entries are named `<skill_name>/<relative path>` with `/` separators and
/// written in sorted order, so the same tree always yields the same
/// entry list.
#[instrument(skip_all, fields(skill_dir = %skill_dir.display(), output_dir = %output_dir.display()))]
pub fn package_skill(skill_dir: &Path, output_dir: &Path) -> Result<PackageResult> {
    if !skill_dir.is_dir() {
        return Err(Site2SkillError::Package(format!(
            "skill directory not found: {}",
            skill_dir.display()
        )));
    }
    let skill_name = skill_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Site2SkillError::Package(format!("cannot name a skill after {}", skill_dir.display()))
        })?;

    std::fs::create_dir_all(output_dir).map_err(|e| Site2SkillError::io(output_dir, e))?;
    let target = output_dir.join(format!("{skill_name}.{SKILL_EXTENSION}"));
    let temp = output_dir.join(format!(".{skill_name}.{SKILL_EXTENSION}.tmp"));

    let files = collect_files(skill_dir, &[&target, &temp])?;
    info!(files = files.len(), path = %target.display(), "packaging skill");

    let entries = write_archive(&temp, &skill_name, &files)?;
    std::fs::rename(&temp, &target).map_err(|e| Site2SkillError::io(&target, e))?;

    let bytes = std::fs::read(&target).map_err(|e| Site2SkillError::io(&target, e))?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));

    info!(
        entries = entries.len(),
        size = bytes.len(),
        sha256 = %sha256,
        "package written"
    );

    Ok(PackageResult {
        path: target,
        entries,
        size_bytes: bytes.len() as u64,
        sha256,
    })
}

/// Relative `/`-separated path and absolute path of every file, sorted.
fn collect_files(skill_dir: &Path, exclude: &[&Path]) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(skill_dir) {
        let entry = entry.map_err(|e| Site2SkillError::Package(format!("walking skill dir: {e}")))?;
        if !entry.file_type().is_file() || exclude.contains(&entry.path()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(skill_dir) else {
            continue;
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((rel, entry.into_path()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn write_archive(path: &Path, skill_name: &str, files: &[(String, PathBuf)]) -> Result<Vec<String>> {
    let file = File::create(path).map_err(|e| Site2SkillError::io(path, e))?;
    let mut zip = ZipWriter::new(file);

    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let executable = deflated.unix_permissions(0o755);

    let mut entries = Vec::with_capacity(files.len());
    for (rel, src) in files {
        let name = format!("{skill_name}/{rel}");
        let options = if rel.ends_with(".py") { executable } else { deflated };

        zip.start_file(name.as_str(), options).map_err(zip_error)?;
        let content = std::fs::read(src).map_err(|e| Site2SkillError::io(src, e))?;
        zip.write_all(&content).map_err(|e| Site2SkillError::io(path, e))?;

        debug!(entry = %name, size = content.len(), "added");
        entries.push(name);
    }

    zip.finish().map_err(zip_error)?;
    Ok(entries)
}

fn zip_error(e: zip::result::ZipError) -> Site2SkillError {
    Site2SkillError::Package(e.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
