//! Types for running operations over an artifact forest.
//!
//! This module defines the lifecycle operations, the engine configuration
//! and the errors returned when an engine cannot be constructed.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::{DEFAULT_WIDTH, Diagnostics};

/// A lifecycle phase.
///
/// Phases run in declaration order: every artifact is validated before any
/// artifact is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
  Validation,
  Build,
}

impl Operation {
  /// Every operation, in the order they run.
  pub const ALL: [Operation; 2] = [Operation::Validation, Operation::Build];

  pub fn as_str(self) -> &'static str {
    match self {
      Operation::Validation => "validation",
      Operation::Build => "build",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Errors constructing an engine.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The configuration cannot be used to run anything.
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  /// The artifact forest has dangling, duplicate or cyclic sources.
  #[error("artifact sources could not be resolved ({} errors)", .0.errors().count())]
  Unresolved(Diagnostics),
}

/// How the final diagnostic report is rendered.
#[derive(Debug, Clone)]
pub struct OutputConfig {
  /// Wrapping width of diagnostic details.
  pub width: usize,

  /// Whether to emit ANSI colors.
  pub color: bool,
}

impl Default for OutputConfig {
  fn default() -> Self {
    Self {
      width: DEFAULT_WIDTH,
      color: false,
    }
  }
}

/// Configuration for running an artifact forest.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of handlers running at the same time.
  ///
  /// Artifacts waiting on their source do not count.
  pub parallelism: usize,

  /// Run top-level artifacts one subtree at a time.
  ///
  /// Trades concurrency for output that is not interleaved between
  /// unrelated artifacts.
  pub debug: bool,

  /// Operations to run. Always executed in lifecycle order.
  pub operations: Vec<Operation>,

  pub output: OutputConfig,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      debug: false,
      operations: Operation::ALL.to_vec(),
      output: OutputConfig::default(),
    }
  }
}

impl ExecuteConfig {
  /// Check the configuration and return the operations to run, sorted and
  /// deduplicated.
  pub(crate) fn validate(&self) -> Result<Vec<Operation>, ExecuteError> {
    if self.parallelism == 0 {
      return Err(ExecuteError::InvalidConfig("parallelism must be at least 1".to_string()));
    }
    if self.operations.is_empty() {
      return Err(ExecuteError::InvalidConfig(
        "at least one operation must be selected".to_string(),
      ));
    }

    let mut operations = self.operations.clone();
    operations.sort();
    operations.dedup();
    Ok(operations)
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
