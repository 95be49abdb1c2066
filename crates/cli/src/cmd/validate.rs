//! Implementation of the `kiln validate` command.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use kiln_lib::execute::Operation;

use super::{RunArgs, run};

pub fn cmd_validate(path: &Path, args: &RunArgs) -> Result<ExitCode> {
  run(path, args, vec![Operation::Validation])
}
