//! Implementation of the `kiln inspect` command.
//!
//! Loads and flattens a configuration and prints the resulting artifact
//! forest, each artifact under the one it is built from.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use kiln_lib::artifact::{Artifact, Root};

use super::load_or_report;
use crate::output::{OutputFormat, print_info, print_json, print_stat, stdout_color};

#[derive(Debug, Serialize)]
struct InspectOutput<'a> {
  artifacts: usize,
  files: Vec<&'a str>,
  #[serde(flatten)]
  root: &'a Root,
}

pub fn cmd_inspect(path: &Path, format: OutputFormat) -> Result<ExitCode> {
  let color = !format.is_json() && stdout_color(false);
  let Some(loaded) = load_or_report(path, color)? else {
    return Ok(ExitCode::FAILURE);
  };
  let root = &loaded.root;

  if format.is_json() {
    print_json(&InspectOutput {
      artifacts: root.node_count(),
      files: root.files.keys().map(String::as_str).collect(),
      root,
    })?;
    return Ok(ExitCode::SUCCESS);
  }

  if root.artifacts.is_empty() {
    print_info("No artifacts found");
    return Ok(ExitCode::SUCCESS);
  }

  for artifact in &root.artifacts {
    print_artifact(artifact, 0);
  }
  println!();
  print_stat("Artifacts", &root.node_count().to_string());
  print_stat("Files", &root.files.len().to_string());

  Ok(ExitCode::SUCCESS)
}

fn print_artifact(artifact: &Artifact, depth: usize) {
  let indent = "  ".repeat(depth);
  let name = artifact.full_name();
  let provisioners = if artifact.provisioners.is_empty() {
    String::new()
  } else {
    let kinds: Vec<&str> = artifact.provisioners.iter().map(|p| p.kind.as_str()).collect();
    format!(" [{}]", kinds.join(", "))
  };
  let location = artifact
    .range
    .as_ref()
    .map(|range| format!(" ({})", range.filename))
    .unwrap_or_default();

  println!(
    "{}{}{}{}",
    indent,
    name.if_supports_color(Stream::Stdout, |s| s.bold()),
    provisioners,
    location.if_supports_color(Stream::Stdout, |s| s.dimmed())
  );

  for child in &artifact.artifacts {
    print_artifact(child, depth + 1);
  }
}
