mod build;
mod inspect;
mod validate;

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use kiln_lib::artifact::{Loaded, load};
use kiln_lib::diagnostics::{DEFAULT_WIDTH, Diagnostics};
use kiln_lib::execute::{Core, ExecuteConfig, Operation, OutputConfig};
use kiln_lib::handler::{NullHandler, Registry};

use crate::output::{format_duration, print_diagnostics, print_error, print_success, print_warning, stdout_color};

pub use build::cmd_build;
pub use inspect::cmd_inspect;
pub use validate::cmd_validate;

/// Options shared by commands that run handlers.
#[derive(Args, Debug)]
pub struct RunArgs {
  /// Run one top-level artifact (and everything built from it) at a time
  #[arg(long)]
  debug: bool,

  /// Maximum number of handlers running at once (default: number of CPUs)
  #[arg(short = 'j', long)]
  parallelism: Option<usize>,

  /// Disable colored diagnostics
  #[arg(long)]
  no_color: bool,
}

/// Artifact types this binary knows how to handle.
fn registry() -> Registry {
  Registry::new().with("null", NullHandler)
}

/// Load `path`, printing diagnostics. `None` means loading failed.
fn load_or_report(path: &Path, color: bool) -> Result<Option<Loaded>> {
  match load(path) {
    Ok(loaded) => {
      if !loaded.warnings.is_empty() {
        print_diagnostics(&loaded.warnings, color)?;
      }
      Ok(Some(loaded))
    }
    Err(diagnostics) => {
      print_diagnostics(&diagnostics, color)?;
      print_error(&format!("Failed to load {}", path.display()));
      Ok(None)
    }
  }
}

/// Load `path` and run `operations` over it until done or interrupted.
fn run(path: &Path, args: &RunArgs, operations: Vec<Operation>) -> Result<ExitCode> {
  let color = stdout_color(args.no_color);
  let Some(loaded) = load_or_report(path, color)? else {
    return Ok(ExitCode::FAILURE);
  };

  let defaults = ExecuteConfig::default();
  let config = ExecuteConfig {
    parallelism: args.parallelism.unwrap_or(defaults.parallelism),
    debug: args.debug,
    operations: operations.clone(),
    output: OutputConfig {
      width: DEFAULT_WIDTH,
      color,
    },
  };
  let core = Core::new(loaded.root, registry(), config).context("Failed to prepare run")?;
  let artifacts = core.dag().len();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let started = Instant::now();
  let diagnostics = rt.block_on(async {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, cancelling");
        interrupt.cancel();
      }
    });
    core.run(cancel).await
  });

  Ok(summarize(&diagnostics, &operations, artifacts, started))
}

fn summarize(diagnostics: &Diagnostics, operations: &[Operation], artifacts: usize, started: Instant) -> ExitCode {
  let last = operations.last().copied().unwrap_or(Operation::Validation);
  let warnings = diagnostics.warnings().count();
  if warnings > 0 {
    print_warning(&format!("{} warning(s)", warnings));
  }

  let errors = diagnostics.errors().count();
  if errors > 0 {
    print_error(&format!("{} failed with {} error(s)", capitalize(last.as_str()), errors));
    return ExitCode::FAILURE;
  }

  print_success(&format!(
    "{} finished for {} artifact(s) in {}",
    capitalize(last.as_str()),
    artifacts,
    format_duration(started.elapsed())
  ));
  ExitCode::SUCCESS
}

fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}
