//! Skill directory validation.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use site2skill_shared::{FrontMatter, Result, Site2SkillError, SkillManifest};

use crate::assembler::{DOCS_DIR, SKILL_MD};

/// Longest accepted skill name.
pub const MAX_NAME_LEN: usize = 64;

/// Longest accepted skill description.
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Outcome of [`validate_skill`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Problems that make the skill unusable.
    pub errors: Vec<String>,
    /// Problems worth fixing that do not block packaging.
    pub warnings: Vec<String>,
    /// Markdown files found under `docs/`.
    pub doc_count: usize,
    /// Total size of every file in the skill directory.
    pub total_bytes: u64,
}

impl ValidationReport {
    /// `true` when no errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn a failed report into a [`Site2SkillError::Validation`].
    pub fn into_result(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Site2SkillError::validation(self.errors.join("; ")))
        }
    }

    fn error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!(%msg, "validation error");
        self.errors.push(msg);
    }

    fn warning(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!(%msg, "validation warning");
        self.warnings.push(msg);
    }
}

/// Check that `skill_dir` is a well-formed skill.
///
/// Only I/O failures while reading an existing file are returned as `Err`;
/// everything else lands in the report.
#[instrument(skip_all, fields(skill_dir = %skill_dir.display()))]
pub fn validate_skill(skill_dir: &Path, max_total_bytes: u64) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    if !skill_dir.is_dir() {
        report.error(format!("skill directory not found: {}", skill_dir.display()));
        return Ok(report);
    }

    check_manifest(skill_dir, &mut report)?;
    check_docs(&skill_dir.join(DOCS_DIR), &mut report)?;

    report.total_bytes = total_size(skill_dir);
    if report.total_bytes > max_total_bytes {
        report.warning(format!(
            "skill is {} bytes, larger than the {max_total_bytes} byte limit",
            report.total_bytes
        ));
    }

    info!(
        valid = report.is_valid(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        docs = report.doc_count,
        bytes = report.total_bytes,
        "validation complete"
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

fn check_manifest(skill_dir: &Path, report: &mut ValidationReport) -> Result<()> {
    let path = skill_dir.join(SKILL_MD);
    if !path.is_file() {
        report.error(format!("missing {SKILL_MD}"));
        return Ok(());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| Site2SkillError::io(&path, e))?;
    let Some(fm) = FrontMatter::parse(&content) else {
        report.error(format!("{SKILL_MD} must begin with front matter"));
        return Ok(());
    };

    let Some(manifest) = SkillManifest::from_front_matter(&fm) else {
        for key in ["name", "description"] {
            if fm.get(key).is_none() {
                report.error(format!("{SKILL_MD} front matter is missing '{key}'"));
            }
        }
        return Ok(());
    };

    if let Some(problem) = name_problem(&manifest.name) {
        report.error(format!("invalid skill name '{}': {problem}", manifest.name));
    }

    let description = manifest.description.trim();
    let len = description.chars().count();
    if description.is_empty() {
        report.error("description must not be empty");
    } else if len > MAX_DESCRIPTION_LEN {
        report.error(format!("description is {len} characters, limit is {MAX_DESCRIPTION_LEN}"));
    }

    Ok(())
}

fn name_problem(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("must not be empty".into());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Some(format!("longer than {MAX_NAME_LEN} characters"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Some(format!(
            "'{bad}' not allowed, use lowercase letters, digits, and hyphens"
        ));
    }
    None
}

fn check_docs(docs_dir: &Path, report: &mut ValidationReport) -> Result<()> {
    if !docs_dir.is_dir() {
        report.error(format!("missing {DOCS_DIR}/ directory"));
        return Ok(());
    }

    for entry in WalkDir::new(docs_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
    {
        report.doc_count += 1;

        let path = entry.path();
        let rel = path.strip_prefix(docs_dir).unwrap_or(path).display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| Site2SkillError::io(path, e))?;

        match FrontMatter::parse(&content) {
            None => report.warning(format!("{rel}: missing front matter")),
            Some(fm) => {
                for key in ["source_url", "fetched_at"] {
                    if fm.get(key).is_none() {
                        report.warning(format!("{rel}: front matter is missing '{key}'"));
                    }
                }
            }
        }
    }

    if report.doc_count == 0 {
        report.error(format!("{DOCS_DIR}/ contains no Markdown files"));
    }

    Ok(())
}

fn total_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
