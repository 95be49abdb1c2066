//! Source resolution.
//!
//! Artifacts can be declared at the top level and point at the artifact they
//! are built from with `source`. Flattening moves every such artifact under
//! its source so that, afterwards, the parent/child structure of the forest
//! is the whole dependency graph:
//!
//! ```text
//! artifact.googlecompute.base          artifact.googlecompute.base
//! artifact.googlecompute.consul   =>     artifact.googlecompute.consul
//!   source = artifact.googlecompute.base
//! ```
//!
//! Before anything moves the forest is checked: every full name must be
//! unique, every source must exist and the combined nesting/source graph
//! must be acyclic. Any violation aborts flattening.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::debug;

use super::types::{Artifact, Root};
use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};

/// Reasons a forest cannot be flattened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlattenError {
  #[error("{referenced_by} declares source \"{missing}\", but no artifact with that name exists")]
  SourceNotFound { missing: String, referenced_by: String },

  #[error("{name} is declared {count} times; artifact names must be unique per type")]
  DuplicateArtifact { name: String, count: usize },

  #[error("source references form a cycle: {chain}")]
  SourceCycle { chain: String },
}

impl FlattenError {
  pub fn summary(&self) -> &'static str {
    match self {
      FlattenError::SourceNotFound { .. } => "Source not found",
      FlattenError::DuplicateArtifact { .. } => "Duplicate artifact",
      FlattenError::SourceCycle { .. } => "Source cycle",
    }
  }

  pub fn to_diagnostic(&self, subject: Option<SourceRange>) -> Diagnostic {
    Diagnostic::error(self.summary(), self.to_string()).with_subject(subject)
  }
}

/// Resolve `source` references by nesting each artifact under its source.
///
/// Returns the rewritten forest, or the diagnostics explaining why it could
/// not be resolved. A forest without any `source` is returned unchanged.
pub fn flatten(mut root: Root) -> Result<Root, Diagnostics> {
  let diagnostics = check(&root);
  if diagnostics.has_errors() {
    return Err(diagnostics);
  }

  let mut pending = Vec::new();
  detach_sourced(&mut root.artifacts, &mut pending);

  if pending.is_empty() {
    return Ok(root);
  }
  debug!(count = pending.len(), "relocating sourced artifacts");

  // A target may itself be pending, so attach in rounds until everything has
  // found its place. `check` guarantees every round makes progress.
  while !pending.is_empty() {
    let before = pending.len();
    let mut waiting = Vec::new();

    for mut artifact in pending.drain(..) {
      let target = artifact.source().map(str::to_string).unwrap_or_default();
      match root.find_mut(&target) {
        Some(parent) => {
          debug!(artifact = %artifact.full_name(), source = %target, "nesting under source");
          artifact.source = None;
          parent.artifacts.push(artifact);
        }
        None => waiting.push(artifact),
      }
    }

    if waiting.len() == before {
      return Err(
        waiting
          .iter()
          .map(|a| {
            FlattenError::SourceNotFound {
              missing: a.source().unwrap_or_default().to_string(),
              referenced_by: a.full_name(),
            }
            .to_diagnostic(a.range.clone())
          })
          .collect(),
      );
    }
    pending = waiting;
  }

  Ok(root)
}

/// Move every artifact with a source out of `nodes`, recursively, keeping
/// declaration order in `pending`.
fn detach_sourced(nodes: &mut Vec<Artifact>, pending: &mut Vec<Artifact>) {
  let mut kept = Vec::with_capacity(nodes.len());
  for mut node in nodes.drain(..) {
    let mut nested = Vec::new();
    detach_sourced(&mut node.artifacts, &mut nested);

    if node.source().is_some() {
      pending.push(node);
    } else {
      node.source = None;
      kept.push(node);
    }
    pending.extend(nested);
  }
  *nodes = kept;
}

/// Validate names, sources and acyclicity without modifying the forest.
fn check(root: &Root) -> Diagnostics {
  let mut diagnostics = Diagnostics::new();

  let mut all = Vec::new();
  root.visit(&mut |a| all.push(a));

  let mut by_name: HashMap<String, Vec<&Artifact>> = HashMap::new();
  for &artifact in &all {
    by_name.entry(artifact.full_name()).or_default().push(artifact);
  }

  let mut duplicates: Vec<_> = by_name.iter().filter(|(_, v)| v.len() > 1).collect();
  duplicates.sort_by(|a, b| a.0.cmp(b.0));
  for (name, declared) in duplicates {
    let err = FlattenError::DuplicateArtifact {
      name: name.clone(),
      count: declared.len(),
    };
    diagnostics.push(err.to_diagnostic(declared.get(1).and_then(|a| a.range.clone())));
  }

  for &artifact in &all {
    if let Some(source) = artifact.source()
      && !by_name.contains_key(source)
    {
      let err = FlattenError::SourceNotFound {
        missing: source.to_string(),
        referenced_by: artifact.full_name(),
      };
      diagnostics.push(err.to_diagnostic(artifact.range.clone()));
    }
  }

  // Cycle detection needs a consistent name -> node mapping.
  if diagnostics.has_errors() {
    return diagnostics;
  }

  let mut graph: DiGraph<String, ()> = DiGraph::new();
  let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
  for &artifact in &all {
    let name = artifact.full_name();
    let idx = graph.add_node(name.clone());
    nodes.insert(name, idx);
  }

  for &artifact in &all {
    let idx = nodes[&artifact.full_name()];
    for child in &artifact.artifacts {
      graph.add_edge(idx, nodes[&child.full_name()], ());
    }
    if let Some(source) = artifact.source() {
      graph.add_edge(nodes[source], idx, ());
    }
  }

  for component in tarjan_scc(&graph) {
    let is_cycle = match component.as_slice() {
      [single] => graph.contains_edge(*single, *single),
      _ => true,
    };
    if !is_cycle {
      continue;
    }

    let mut names: Vec<&str> = component.iter().map(|idx| graph[*idx].as_str()).collect();
    names.sort_unstable();
    let chain = names.join(" -> ");
    let subject = names.first().and_then(|n| root.find(n)).and_then(|a| a.range.clone());
    diagnostics.push(FlattenError::SourceCycle { chain }.to_diagnostic(subject));
  }

  diagnostics
}
