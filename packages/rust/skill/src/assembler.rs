//! Skill directory assembler.
//!
//! Lays out `SKILL.md`, `docs/`, and `scripts/` under the output base and
//! copies the staged Markdown tree into `docs/`.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use site2skill_paths::contained_join;
use site2skill_shared::{FrontMatter, Result, Site2SkillError, SkillManifest};

/// Manifest file at the root of a skill directory.
pub const SKILL_MD: &str = "SKILL.md";

/// Directory holding the documentation tree.
pub const DOCS_DIR: &str = "docs";

/// Directory holding helper scripts.
pub const SCRIPTS_DIR: &str = "scripts";

const SEARCH_DOCS_PY: &str = include_str!("templates/search_docs.py");
const SCRIPTS_README: &str = include_str!("templates/scripts_README.md");

/// Output from [`generate_skill_structure`].
#[derive(Debug, Clone)]
pub struct AssembleResult {
    /// `<output_base>/<skill_name>`.
    pub skill_dir: PathBuf,
    /// Number of Markdown files copied into `docs/`.
    pub docs_copied: usize,
    /// Whether `SKILL.md` was written by this call.
    pub manifest_created: bool,
}

/// Create (or refresh) the skill directory for `skill_name`.
///
/// An existing `SKILL.md` is left untouched so hand edits survive rebuilds.
/// `scripts/` is always reinstalled. Every `*.md` under `source_dir` is
/// copied into `docs/` with its relative path preserved; files whose
/// destination would escape `docs/` are skipped.
#[instrument(skip_all, fields(skill = %skill_name, output_base = %output_base.display()))]
pub fn generate_skill_structure(
    skill_name: &str,
    source_dir: Option<&Path>,
    output_base: &Path,
) -> Result<AssembleResult> {
    let skill_dir = contained_join(output_base, skill_name)?;

    if skill_dir.exists() {
        warn!(path = %skill_dir.display(), "skill directory already exists");
    }
    create_dirs(&skill_dir)?;

    let skill_md = skill_dir.join(SKILL_MD);
    let manifest_created = if skill_md.exists() {
        debug!(path = %skill_md.display(), "keeping existing SKILL.md");
        false
    } else {
        write_file(&skill_md, &render_skill_md(&SkillManifest::for_skill(skill_name)))?;
        info!(path = %skill_md.display(), "created SKILL.md");
        true
    };

    install_scripts(&skill_dir.join(SCRIPTS_DIR))?;

    let docs_copied = match source_dir {
        Some(src) if src.is_dir() => copy_markdown(src, &skill_dir.join(DOCS_DIR))?,
        other => {
            warn!(
                source = %other.map(|p| p.display().to_string()).unwrap_or_default(),
                "source directory not found, no docs copied"
            );
            0
        }
    };

    info!(docs = docs_copied, path = %skill_dir.display(), "skill structure ready");

    Ok(AssembleResult {
        skill_dir,
        docs_copied,
        manifest_created,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn create_dirs(skill_dir: &Path) -> Result<()> {
    let dirs = [
        skill_dir.to_path_buf(),
        skill_dir.join(DOCS_DIR),
        skill_dir.join(SCRIPTS_DIR),
    ];

    for dir in &dirs {
        std::fs::create_dir_all(dir).map_err(|e| Site2SkillError::io(dir, e))?;
    }

    debug!(path = %skill_dir.display(), "directory structure created");
    Ok(())
}

fn install_scripts(scripts_dir: &Path) -> Result<()> {
    write_file(&scripts_dir.join("search_docs.py"), SEARCH_DOCS_PY)?;
    write_file(&scripts_dir.join("README.md"), SCRIPTS_README)?;
    debug!(path = %scripts_dir.display(), "installed helper scripts");
    Ok(())
}

/// Copy every `*.md` under `source` into `docs_dir`, returning the count.
fn copy_markdown(source: &Path, docs_dir: &Path) -> Result<usize> {
    info!(source = %source.display(), "copying Markdown into docs/");
    let mut copied = 0;

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf());
            Site2SkillError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() || entry.path().extension().is_none_or(|ext| ext != "md") {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };
        let dest = match contained_join(docs_dir, rel) {
            Ok(dest) => dest,
            Err(e) => {
                warn!(file = %rel.display(), error = %e, "skipping file outside docs/");
                continue;
            }
        };

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Site2SkillError::io(parent, e))?;
        }
        std::fs::copy(entry.path(), &dest).map_err(|e| Site2SkillError::io(&dest, e))?;
        debug!(file = %rel.display(), "copied");
        copied += 1;
    }

    info!(count = copied, "copied files to docs/");
    Ok(copied)
}

fn render_skill_md(manifest: &SkillManifest) -> String {
    let upper = manifest.name.to_uppercase();
    let front_matter = FrontMatter::render(&[
        ("name", manifest.name.as_str()),
        ("description", manifest.description.as_str()),
    ]);

    format!(
        r#"{front_matter}
# {upper} Skill

This skill provides access to {upper} documentation.

## Documentation

All documentation files are in the `docs/` directory as Markdown files.

## Search Tool

```bash
python scripts/search_docs.py "<query>"
```

Options:
- `--json` - Output as JSON
- `--max-results N` - Limit results (default: 10)

## Usage

1. Search or read files in `docs/` for relevant information
2. Each file has front matter with `source_url` and `fetched_at`
3. Always cite the source URL in responses
4. Note the fetch date, documentation may have changed

## Response Format

```
[Answer based on documentation]

**Source:** [source_url]
**Fetched:** [fetched_at]
```
"#
    )
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| Site2SkillError::io(path, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
