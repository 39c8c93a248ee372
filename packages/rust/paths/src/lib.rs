//! Crawl-path mapping and sanitization for site2skill.
//!
//! The mirroring tool lays crawled pages out as `<host>/<path...>` under the
//! crawl root. This crate turns those relative paths back into source URLs and
//! Markdown output paths ([`map_path`]), makes any relative path safe for disk
//! and zip storage ([`sanitize_path`]), and offers the root-containment check
//! ([`contained_join`]) the orchestrator runs wherever it joins untrusted paths.
//!
//! Mapping and sanitizing are pure functions: no filesystem access, no state.

pub mod containment;
pub mod error;
pub mod mapper;
pub mod sanitize;

pub use containment::{contained_join, is_within, normalize_lexically};
pub use error::{PathError, Result};
pub use mapper::{DEFAULT_SCHEME, MappedPath, map_path, md_path_for, scheme_of, split_segments};
pub use sanitize::{FALLBACK_PATH, sanitize_path, sanitize_segment};
