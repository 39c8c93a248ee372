//! Shared types, error model, and configuration for site2skill.
//!
//! This crate is the foundation depended on by all other site2skill crates.
//! It provides:
//! - [`Site2SkillError`]: the unified error type
//! - Domain types ([`FrontMatter`], [`SkillManifest`], [`PageRecord`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CollisionPolicy, DefaultsConfig, FetchConfig, ValidationConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, Site2SkillError};
pub use types::{FRONT_MATTER_FENCE, FrontMatter, PageRecord, SkillManifest, split_front_matter};
