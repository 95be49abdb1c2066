mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::RunArgs;
use output::OutputFormat;

/// kiln - Concurrent artifact build orchestration
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show the resolved artifact tree
  Inspect {
    /// Configuration file or directory
    path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
  },

  /// Validate every artifact without building anything
  Validate {
    /// Configuration file or directory
    path: PathBuf,

    #[command(flatten)]
    run: RunArgs,
  },

  /// Validate, then build every artifact
  Build {
    /// Configuration file or directory
    path: PathBuf,

    #[command(flatten)]
    run: RunArgs,
  },
}

fn main() -> Result<ExitCode> {
  let cli = Cli::parse();

  // KILN_LOG takes precedence over RUST_LOG
  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_env("KILN_LOG")
    .or_else(|_| EnvFilter::try_from_default_env())
    .unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Inspect { path, format } => cmd::cmd_inspect(&path, format),
    Commands::Validate { path, run } => cmd::cmd_validate(&path, &run),
    Commands::Build { path, run } => cmd::cmd_build(&path, &run),
  }
}
