//! Core pipeline orchestration for site2skill.
//!
//! This crate ties together mirroring, path mapping, Markdown conversion,
//! and skill assembly into the end-to-end `build` workflow.

pub mod convert;
pub mod pipeline;

pub use convert::{ConvertStage, ConvertStats, convert_crawl, discover_html};
pub use pipeline::{PipelineConfig, PipelineResult, ProgressReporter, SilentProgress, normalize_tree, run};
