//! Binary entry point for the shulkr CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Revert renamed locals in every modified .java file of the working tree
//! shulkr undo
//!
//! # Preview without writing, comparing against another revision
//! shulkr undo --dry-run --base v1.20
//!
//! # Inspect the rename mapping between two files
//! shulkr analyze old/Foo.java new/Foo.java
//!
//! # Print the new revision with renamed locals reverted
//! shulkr analyze old/Foo.java new/Foo.java --rewrite
//!
//! # Write a default .shulkr
//! shulkr config init
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use shulkr::cli::{run_analyze, run_config_init, run_rewrite, run_undo, UndoOptions};
use shulkr_core::config::OnError;
use shulkr_core::error::{OutputErrorCode, ShulkrError};
use shulkr_core::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Revert renamed local variables in generated Java sources.
///
/// All command output is JSON on stdout, except `analyze --rewrite`, which
/// prints source text. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "shulkr",
    version,
    about = "Revert renamed local variables in generated Java sources"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Repository root (default: current directory).
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

impl GlobalArgs {
    fn repo_path(&self) -> PathBuf {
        self.repo.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Failure policy accepted by `undo --on-error`.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OnErrorArg {
    /// Stop at the first file that cannot be analyzed.
    Abort,
    /// Leave such files untouched and continue.
    Skip,
}

impl From<OnErrorArg> for OnError {
    fn from(arg: OnErrorArg) -> Self {
        match arg {
            OnErrorArg::Abort => OnError::Abort,
            OnErrorArg::Skip => OnError::Skip,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two revisions of one Java file.
    ///
    /// Prints the detected rename mapping, the edits it implies, and the
    /// scopes that were left alone. With `--rewrite`, prints the new revision
    /// with renamed locals reverted instead.
    Analyze {
        /// Old revision of the file.
        old: PathBuf,
        /// New revision of the file.
        new: PathBuf,
        /// File name used in diagnostics (default: the NEW path).
        #[arg(long)]
        file_name: Option<String>,
        /// Print the rewritten source instead of the JSON report.
        #[arg(long)]
        rewrite: bool,
    },
    /// Revert renamed locals in the modified files of the working tree.
    Undo {
        /// Report what would change without writing any file.
        #[arg(long)]
        dry_run: bool,
        /// Revision to compare the working tree with (overrides `.shulkr`).
        #[arg(long)]
        base: Option<String>,
        /// What to do with files that cannot be analyzed (overrides `.shulkr`).
        #[arg(long, value_enum)]
        on_error: Option<OnErrorArg>,
    },
    /// Manage the `.shulkr` configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default `.shulkr` at the repository root.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), ShulkrError> {
    match cli.command {
        Command::Analyze {
            old,
            new,
            file_name,
            rewrite,
        } => execute_analyze(&old, &new, file_name.as_deref(), rewrite),
        Command::Undo {
            dry_run,
            base,
            on_error,
        } => {
            let options = UndoOptions {
                dry_run,
                base_ref: base,
                on_error: on_error.map(OnError::from),
            };
            let response = run_undo(&cli.global.repo_path(), options)?;
            emit(&response)
        }
        Command::Config { action } => match action {
            ConfigAction::Init { force } => {
                let response = run_config_init(&cli.global.repo_path(), force)?;
                emit(&response)
            }
        },
    }
}

fn execute_analyze(
    old: &Path,
    new: &Path,
    file_name: Option<&str>,
    rewrite: bool,
) -> Result<(), ShulkrError> {
    if rewrite {
        let text = run_rewrite(old, new, file_name)?;
        let mut stdout = io::stdout();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    }
    let response = run_analyze(old, new, file_name)?;
    emit(&response)
}

fn emit<T: serde::Serialize>(response: &T) -> Result<(), ShulkrError> {
    emit_response(response, &mut io::stdout())?;
    Ok(())
}
