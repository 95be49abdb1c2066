//! Implementation of the `kiln build` command.
//!
//! Loads a configuration, validates every artifact and, when validation
//! succeeds, builds them.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use kiln_lib::execute::Operation;

use super::{RunArgs, run};

pub fn cmd_build(path: &Path, args: &RunArgs) -> Result<ExitCode> {
  run(path, args, Operation::ALL.to_vec())
}
