//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use site2skill_core::pipeline::{PipelineConfig, PipelineResult, ProgressReporter};
use site2skill_fetcher::WgetMirror;
use site2skill_shared::{
    AppConfig, CollisionPolicy, config_file_path, init_config, load_config, load_config_from,
};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// site2skill: turn documentation websites into packaged skills.
#[derive(Parser)]
#[command(
    name = "site2skill",
    version,
    about = "Mirror a documentation site and package it as a skill bundle.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.site2skill/site2skill.toml).
    #[arg(long, global = true, env = "SITE2SKILL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// `--on-collision` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum CollisionArg {
    /// Warn and keep the last file written.
    Overwrite,
    /// Abort the build.
    Fail,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(arg: CollisionArg) -> Self {
        match arg {
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
            CollisionArg::Fail => CollisionPolicy::Fail,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Mirror a site and build its skill end to end.
    Build {
        /// Documentation URL to mirror.
        url: String,

        /// Skill name (lowercase letters, digits, hyphens).
        skill_name: String,

        /// Base directory for the skill directory.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Directory for the `.skill` archive.
        #[arg(long)]
        skill_output: Option<PathBuf>,

        /// Scratch directory for downloads and staged Markdown.
        #[arg(long)]
        temp_dir: Option<PathBuf>,

        /// Reuse the existing download under the temp dir.
        #[arg(long)]
        skip_fetch: bool,

        /// Remove the temp dir after packaging.
        #[arg(long)]
        clean: bool,

        /// Maximum crawl depth.
        #[arg(long)]
        depth: Option<u32>,

        /// What to do when two pages map to the same output file.
        #[arg(long, value_enum)]
        on_collision: Option<CollisionArg>,
    },

    /// Validate a skill directory.
    Validate {
        /// Skill directory to check.
        skill_dir: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Package a skill directory into a `.skill` archive.
    Package {
        /// Skill directory to package.
        skill_dir: PathBuf,

        /// Directory for the archive.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "site2skill=info",
        1 => "site2skill=debug",
        _ => "site2skill=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build {
            url,
            skill_name,
            output,
            skill_output,
            temp_dir,
            skip_fetch,
            clean,
            depth,
            on_collision,
        } => {
            let mut app = resolve_config(config_path)?;
            if let Some(depth) = depth {
                app.fetch.depth = depth;
            }
            let parsed = Url::parse(&url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

            let mut config = PipelineConfig::new(parsed, skill_name, &app);
            config.skip_fetch = skip_fetch;
            config.clean = clean;
            if let Some(dir) = output {
                config.output_dir = dir;
            }
            if let Some(dir) = skill_output {
                config.skill_output = dir;
            }
            if let Some(dir) = temp_dir {
                config.temp_dir = dir;
            }
            if let Some(policy) = on_collision {
                config.collision = policy.into();
            }

            cmd_build(&config, &app)
        }
        Command::Validate { skill_dir, json } => cmd_validate(&skill_dir, json, config_path),
        Command::Package { skill_dir, output } => {
            cmd_package(&skill_dir, output.as_deref(), config_path)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load `--config` if given, else the user config (defaults if absent).
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(config: &PipelineConfig, app: &AppConfig) -> Result<()> {
    info!(
        url = %config.url,
        skill = %config.skill_name,
        collision = %config.collision,
        skip_fetch = config.skip_fetch,
        "building skill"
    );

    let mirror = WgetMirror::new(app.fetch.clone());
    let reporter = CliProgress::new();

    let result = site2skill_core::pipeline::run(config, &mirror, &reporter)?;

    // Print summary
    println!();
    if result.valid {
        println!("  Skill built successfully!");
    } else {
        println!("  Skill built, but validation failed (see log above).");
    }
    println!("  Skill:      {}", result.skill_dir.display());
    println!("  Package:    {}", result.skill_file.display());
    println!("  Pages:      {}", result.pages_converted);
    println!("  Skipped:    {}", result.pages_skipped);
    println!("  Collisions: {}", result.collisions);
    println!(
        "  Time:       {:.1}s",
        result.elapsed.as_secs_f64()
    );
    println!();

    Ok(())
}

fn cmd_validate(skill_dir: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    let app = resolve_config(config_path)?;
    let report = site2skill_skill::validate_skill(skill_dir, app.validation.max_total_bytes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for error in &report.errors {
            println!("  error:   {error}");
        }
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
        println!(
            "  {} docs, {} bytes",
            report.doc_count, report.total_bytes
        );
    }

    let errors = report.errors.len();
    report
        .into_result()
        .wrap_err_with(|| format!("{} failed validation with {errors} error(s)", skill_dir.display()))?;

    if !json {
        println!("  {} is valid", skill_dir.display());
    }
    Ok(())
}

fn cmd_package(skill_dir: &Path, output: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let app = resolve_config(config_path)?;
    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&app.defaults.skill_output));

    let result = site2skill_skill::package_skill(skill_dir, &output_dir)?;

    println!();
    println!("  Package: {}", result.path.display());
    println!("  Entries: {}", result.entries.len());
    println!("  Size:    {} bytes", result.size_bytes);
    println!("  SHA-256: {}", result.sha256);
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let source = match config_path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("# {}", source.display());
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_converted(&self, path: &str, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Converting [{current}/{total}] {path}"
        ));
    }

    fn done(&self, _result: &PipelineResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_parses_all_flags() {
        let cli = Cli::try_parse_from([
            "site2skill",
            "-vv",
            "build",
            "https://docs.example.com/",
            "example",
            "--output",
            "out/skills",
            "--skill-output",
            "dist",
            "--temp-dir",
            "tmp",
            "--skip-fetch",
            "--clean",
            "--depth",
            "2",
            "--on-collision",
            "fail",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Build {
                url,
                skill_name,
                output,
                skip_fetch,
                clean,
                depth,
                on_collision,
                ..
            } => {
                assert_eq!(url, "https://docs.example.com/");
                assert_eq!(skill_name, "example");
                assert_eq!(output, Some(PathBuf::from("out/skills")));
                assert!(skip_fetch && clean);
                assert_eq!(depth, Some(2));
                assert_eq!(on_collision, Some(CollisionArg::Fail));
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn build_defaults_come_from_config() {
        let cli = Cli::try_parse_from(["site2skill", "build", "https://x.dev", "x"]).unwrap();
        match cli.command {
            Command::Build {
                output,
                skill_output,
                temp_dir,
                on_collision,
                ..
            } => {
                assert!(output.is_none() && skill_output.is_none() && temp_dir.is_none());
                assert!(on_collision.is_none());
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn unknown_collision_policy_is_rejected() {
        let parsed = Cli::try_parse_from([
            "site2skill",
            "build",
            "https://x.dev",
            "x",
            "--on-collision",
            "rename",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn collision_arg_converts() {
        assert_eq!(CollisionPolicy::from(CollisionArg::Fail), CollisionPolicy::Fail);
        assert_eq!(CollisionPolicy::from(CollisionArg::Overwrite), CollisionPolicy::Overwrite);
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["site2skill", "validate", "skill", "--config", "c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }
}
