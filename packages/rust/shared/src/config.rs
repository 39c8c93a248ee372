//! Application configuration for site2skill.
//!
//! User config lives at `~/.site2skill/site2skill.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, Site2SkillError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "site2skill.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".site2skill";

// ---------------------------------------------------------------------------
// Config structs (matching site2skill.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output locations and run policy.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Site mirroring settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Skill validation limits.
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// What to do when two crawled files map to the same Markdown path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Warn and keep the last file written.
    #[default]
    Overwrite,
    /// Abort the run.
    Fail,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overwrite => f.write_str("overwrite"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Base directory the skill directory is created under.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory the `.skill` archive is written to.
    #[serde(default = "default_skill_output")]
    pub skill_output: String,

    /// Scratch directory for downloads and staged Markdown.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,

    /// Output collision policy.
    #[serde(default)]
    pub collision: CollisionPolicy,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            skill_output: default_skill_output(),
            temp_dir: default_temp_dir(),
            collision: CollisionPolicy::default(),
        }
    }
}

fn default_output_dir() -> String {
    ".claude/skills".into()
}
fn default_skill_output() -> String {
    ".".into()
}
fn default_temp_dir() -> String {
    "build".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Mirroring command (must be wget-compatible).
    #[serde(default = "default_wget_cmd")]
    pub wget_cmd: String,

    /// Maximum recursion depth.
    #[serde(default = "default_depth")]
    pub depth: u32,

    /// Per-request network timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per file (wget `--tries`).
    #[serde(default = "default_tries")]
    pub tries: u32,

    /// Delay between requests in milliseconds.
    #[serde(default)]
    pub wait_ms: u64,

    /// Whether to respect robots.txt.
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,

    /// File extensions never downloaded.
    #[serde(default = "default_reject")]
    pub reject: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            wget_cmd: default_wget_cmd(),
            depth: default_depth(),
            timeout_secs: default_timeout_secs(),
            tries: default_tries(),
            wait_ms: 0,
            respect_robots_txt: true,
            reject: default_reject(),
        }
    }
}

fn default_wget_cmd() -> String {
    "wget".into()
}
fn default_depth() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_tries() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_reject() -> Vec<String> {
    [
        "png", "jpg", "jpeg", "gif", "svg", "ico", "css", "js", "woff", "woff2", "ttf", "eot",
        "pdf", "zip", "mp4", "webm",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[validation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Skill directories larger than this produce a size warning.
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: default_max_total_bytes(),
        }
    }
}

fn default_max_total_bytes() -> u64 {
    8 * 1024 * 1024
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.site2skill/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Site2SkillError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.site2skill/site2skill.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| Site2SkillError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        Site2SkillError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| Site2SkillError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| Site2SkillError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| Site2SkillError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("collision = \"overwrite\""));
        assert!(toml_str.contains("wget_cmd"));
    }

    #[test]
    fn config_roundtrip() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fetch.depth, 5);
        assert_eq!(parsed.defaults.temp_dir, "build");
        assert_eq!(parsed.validation.max_total_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
collision = "fail"

[fetch]
depth = 2
respect_robots_txt = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.collision, CollisionPolicy::Fail);
        assert_eq!(config.defaults.output_dir, ".claude/skills");
        assert_eq!(config.fetch.depth, 2);
        assert!(!config.fetch.respect_robots_txt);
        assert_eq!(config.fetch.tries, 3);
        assert!(config.fetch.reject.iter().any(|e| e == "png"));
    }

    #[test]
    fn unknown_collision_policy_rejected() {
        let toml_str = "[defaults]\ncollision = \"merge\"\n";
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn load_config_from_reports_parse_errors() {
        let dir = std::env::temp_dir().join(format!("s2s-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("site2skill.toml");
        std::fs::write(&path, "[fetch\ndepth = ").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
