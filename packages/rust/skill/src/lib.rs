//! Skill bundle assembly, validation, and packaging.
//!
//! A skill directory looks like:
//! ```text
//! <output_base>/<skill_name>/
//! ├── SKILL.md          # manifest front matter + usage instructions
//! ├── docs/             # converted Markdown, hierarchy preserved
//! └── scripts/
//!     ├── search_docs.py
//!     └── README.md
//! ```
//! [`package_skill`] zips it into `<skill_name>.skill`.

pub mod assembler;
pub mod package;
pub mod validate;

pub use assembler::{AssembleResult, DOCS_DIR, SCRIPTS_DIR, SKILL_MD, generate_skill_structure};
pub use package::{PackageResult, SKILL_EXTENSION, package_skill};
pub use validate::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN, ValidationReport, validate_skill};
