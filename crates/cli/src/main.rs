// lagtrack - how far IaC providers trail cloud feature announcements

mod exit_codes;
mod fetch;
mod pipeline;
mod store;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lagtrack::model::Cloud;
use lagtrack::output::OutputRecord;
use lagtrack::summary::summarize;

use exit_codes::{EXIT_ERROR, EXIT_STORE_WRITE, EXIT_SUCCESS, EXIT_USAGE};
use fetch::{AcquireOptions, GITHUB_API_BASE};
use pipeline::RunArgs;

#[derive(Parser)]
#[command(name = "lagtrack")]
#[command(about = "Track how long IaC providers take to support new cloud features")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArg {
    /// Tracker config (TOML). Built-in defaults when omitted.
    #[arg(long, env = "LAGTRACK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire, reconcile, and merge into the persisted document
    #[command(after_help = "\
Examples:
  lagtrack run
  lagtrack run --config tracker.toml --output public/lag_data.json
  lagtrack run --no-backfill --json > summary.json
  lagtrack run --cloud aws,gcp
  GITHUB_TOKEN=ghp_... lagtrack run -q")]
    Run {
        #[command(flatten)]
        config: ConfigArg,

        /// Persisted document (default: `output` from the config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Never scan month archives, even for a small store
        #[arg(long)]
        no_backfill: bool,

        /// Only process these clouds (comma-separated: aws,azure,gcp)
        #[arg(long = "cloud", value_delimiter = ',', value_name = "CLOUD")]
        clouds: Vec<Cloud>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// GitHub API base URL
        #[arg(long, env = "LAGTRACK_GITHUB_API", default_value = GITHUB_API_BASE)]
        github_api: String,

        /// Token for GitHub API requests (raises the rate limit)
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// First retry delay in milliseconds for HTTP sources
        #[arg(long, default_value_t = 1000, hide = true)]
        retry_backoff_ms: u64,
    },

    /// Parse and validate a config without fetching anything
    Validate {
        #[command(flatten)]
        config: ConfigArg,
    },

    /// Merge two persisted documents offline (the second one wins on conflicts)
    #[command(after_help = "\
Examples:
  lagtrack merge lag_data.json snapshot.json
  lagtrack merge old.json new.json --output combined.json")]
    Merge {
        /// Existing document
        existing: PathBuf,

        /// Newer document; its records replace same-titled ones
        new: PathBuf,

        /// Where to write the result (default: overwrite EXISTING)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("LAGTRACK_GIT_HASH"), ")",
        "\nengine:  lagtrack ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("LAGTRACK_TARGET"),
    )
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };

    init_tracing(cli.quiet);

    let result = match cli.command {
        Commands::Run {
            config,
            output,
            no_backfill,
            clouds,
            json,
            github_api,
            github_token,
            retry_backoff_ms,
        } => cmd_run(
            RunArgs {
                config: config.config,
                output,
                no_backfill,
                clouds,
                acquire: AcquireOptions {
                    github_api,
                    github_token,
                    backoff: Duration::from_millis(retry_backoff_ms),
                },
            },
            json,
        ),
        Commands::Validate { config } => cmd_validate(config.config),
        Commands::Merge { existing, new, output, json } => cmd_merge(existing, new, output, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", text).map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(args: RunArgs, json: bool) -> Result<(), CliError> {
    let report = pipeline::run(&args, chrono::Utc::now())?;
    if json {
        print_json(&report)?;
    }
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config: Option<PathBuf>) -> Result<(), CliError> {
    let config = pipeline::load_config(config.as_deref())?;
    let clouds: Vec<String> = config.clouds.iter().map(|(c, _)| c.to_string()).collect();
    let feeds: usize = config.clouds.iter().map(|(_, p)| p.feeds.len()).sum();
    println!(
        "ok: {} cloud(s) [{}], {} feed(s), {} synonym(s), output {}",
        clouds.len(),
        clouds.join(", "),
        feeds,
        config.normalizer().len(),
        config.output
    );
    Ok(())
}

// ============================================================================
// merge
// ============================================================================

fn read_document(path: &Path) -> Result<Vec<OutputRecord>, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
        CliError::io(format!("{} is not a lag document: {}", path.display(), e))
            .with_hint("expected a JSON array of records as written by `lagtrack run`")
    })
}

fn cmd_merge(existing: PathBuf, new: PathBuf, output: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let old_records = read_document(&existing)?;
    let new_records = read_document(&new)?;
    let (old_len, new_len) = (old_records.len(), new_records.len());

    let merged = lagtrack::merge(old_records, new_records);
    let target = output.unwrap_or(existing);
    store::save(&target, &merged).map_err(|e| CliError {
        code: EXIT_STORE_WRITE,
        message: format!("cannot write {}: {}", target.display(), e),
        hint: None,
    })?;
    tracing::info!(existing = old_len, new = new_len, merged = merged.len(), "documents merged");

    if json {
        print_json(&summarize(&merged))?;
    }
    Ok(())
}
