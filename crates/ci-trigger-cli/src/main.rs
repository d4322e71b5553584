//! ci-trigger - nudge a CI observer with a fresh commit
//!
//! Run with no arguments inside a git working copy: stages `tests/`,
//! commits (an empty commit when nothing is staged) and prints what it did.
//! An external observer watching the repository picks up the new commit.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::Level;

use ci_trigger_core::{
    init_tracing, CommitTrigger, GitCli, SystemClock, TriggerConfig, TriggerError, TriggerReport,
};

#[derive(Parser, Debug)]
#[command(name = "ci-trigger")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Create a commit so a watching CI observer starts a build", long_about = None)]
struct Cli {
    /// Working copy to commit in; any directory inside it works
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Config file (default: .ci-trigger.toml at the working copy root, when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subdirectory to stage before committing
    #[arg(long)]
    stage_path: Option<PathBuf>,

    /// Push the new commit after creating it
    #[arg(long)]
    push: bool,

    /// Format of the final report
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    init_tracing(cli.json_logs, level);

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<TriggerError>().and_then(|e| e.tool_stderr()) {
                // Git already explained itself; pass it through untouched.
                Some(stderr) => eprintln!("{stderr}"),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(cli: &Cli) -> Result<TriggerReport> {
    let root = working_copy_root(&cli.repo);
    let config = resolve_config(cli, &root)?;
    let trigger = CommitTrigger::new(GitCli::new(&root), SystemClock, config);

    match cli.format {
        Format::Text => {
            let stdout = std::io::stdout();
            let mut progress = stdout.lock();
            Ok(trigger.run(&mut progress)?)
        }
        Format::Json => {
            let report = {
                let stderr = std::io::stderr();
                let mut progress = stderr.lock();
                trigger.run(&mut progress)?
            };
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
            Ok(report)
        }
    }
}

/// Top of the working copy containing `repo`.
///
/// Falls back to `repo` itself when git cannot tell; the commit step then
/// reports the real problem.
fn working_copy_root(repo: &Path) -> PathBuf {
    match GitCli::new(repo).toplevel() {
        Ok(root) => root,
        Err(err) => {
            tracing::debug!(repo = %repo.display(), error = %err, "could not resolve working copy root");
            repo.to_path_buf()
        }
    }
}

/// Defaults, then the config file, then command-line flags.
fn resolve_config(cli: &Cli, root: &Path) -> Result<TriggerConfig> {
    let mut config = TriggerConfig::load(root, cli.config.as_deref())
        .context("Failed to load ci-trigger config")?;
    if let Some(path) = &cli.stage_path {
        config.stage_path = path.clone();
    }
    if cli.push {
        config.push.enabled = true;
    }
    Ok(config)
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    let code = err
        .downcast_ref::<TriggerError>()
        .map(TriggerError::exit_code)
        .unwrap_or(1);
    u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1)
}
