//! `wget`-backed [`SiteMirror`].

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument, warn};
use url::Url;

use site2skill_shared::{FetchConfig, Result, Site2SkillError};

use crate::{SiteMirror, count_files, crawl_root};

/// Mirrors a site by shelling out to `wget --recursive`.
#[derive(Debug, Clone)]
pub struct WgetMirror {
    config: FetchConfig,
}

impl WgetMirror {
    /// Create a mirror using the `[fetch]` settings.
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    /// Check that the configured command runs, returning its version line.
    pub fn check_available(&self) -> Result<String> {
        let cmd = &self.config.wget_cmd;
        match Command::new(cmd).arg("--version").output() {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
            }
            Ok(output) => Err(Site2SkillError::Fetch(format!(
                "'{cmd} --version' exited with status {}",
                output.status.code().unwrap_or(-1)
            ))),
            Err(e) => Err(Site2SkillError::Fetch(format!(
                "'{cmd}' not found ({e}). Install wget, e.g. `apt install wget` or `brew install wget`"
            ))),
        }
    }

    /// Command-line arguments for mirroring `url` into `crawl_dir`.
    pub fn args(&self, url: &Url, crawl_dir: &Path) -> Result<Vec<String>> {
        let host = url
            .host_str()
            .ok_or_else(|| Site2SkillError::Fetch(format!("URL '{url}' has no host")))?;

        let c = &self.config;
        let mut args = vec![
            "--recursive".to_string(),
            format!("--level={}", c.depth),
            "--no-parent".to_string(),
            "--adjust-extension".to_string(),
            "--no-verbose".to_string(),
            format!("--timeout={}", c.timeout_secs),
            format!("--tries={}", c.tries),
            format!("--domains={host}"),
            "-e".to_string(),
            format!("robots={}", if c.respect_robots_txt { "on" } else { "off" }),
        ];

        if c.wait_ms > 0 {
            args.push(format!("--wait={:.3}", c.wait_ms as f64 / 1000.0));
        }
        if !c.reject.is_empty() {
            args.push(format!("--reject={}", c.reject.join(",")));
        }

        args.push(format!("--directory-prefix={}", crawl_dir.display()));
        args.push(url.to_string());

        Ok(args)
    }
}

impl SiteMirror for WgetMirror {
    #[instrument(skip(self), fields(url = %url, dest = %dest.display()))]
    fn mirror(&self, url: &Url, dest: &Path) -> Result<PathBuf> {
        let version = self.check_available()?;
        info!(version = %version, "wget found");

        let crawl_dir = crawl_root(dest);
        std::fs::create_dir_all(&crawl_dir).map_err(|e| Site2SkillError::io(&crawl_dir, e))?;

        let args = self.args(url, &crawl_dir)?;
        debug!(cmd = %self.config.wget_cmd, ?args, "spawning wget");

        let output = Command::new(&self.config.wget_cmd)
            .args(&args)
            .output()
            .map_err(|e| Site2SkillError::Fetch(format!("failed to spawn wget: {e}")))?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(target: "site2skill::wget", "{line}");
        }

        let files = count_files(&crawl_dir);

        match output.status.code() {
            Some(0) => {
                if files == 0 {
                    warn!("wget finished but downloaded no files");
                }
            }
            Some(code) if files > 0 => {
                // wget reports any failed page (e.g. one 404) as a non-zero exit.
                warn!(
                    code,
                    reason = wget_exit_meaning(code),
                    files,
                    "wget reported errors, continuing with partial mirror"
                );
            }
            Some(code) => {
                return Err(Site2SkillError::Fetch(format!(
                    "wget exited with status {code} ({}) and downloaded nothing",
                    wget_exit_meaning(code)
                )));
            }
            None => {
                return Err(Site2SkillError::Fetch("wget was terminated by a signal".into()));
            }
        }

        info!(files, crawl_dir = %crawl_dir.display(), "mirror complete");
        Ok(crawl_dir)
    }

    fn name(&self) -> &str {
        "wget"
    }
}

/// Meaning of a wget exit status, per the wget manual.
pub fn wget_exit_meaning(code: i32) -> &'static str {
    match code {
        0 => "no problems occurred",
        1 => "generic error",
        2 => "parse error",
        3 => "file I/O error",
        4 => "network failure",
        5 => "SSL verification failure",
        6 => "authentication failure",
        7 => "protocol error",
        8 => "server issued an error response",
        _ => "unknown error",
    }
}
