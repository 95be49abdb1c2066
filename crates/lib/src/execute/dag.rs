//! Execution DAG over a resolved artifact forest.
//!
//! After flattening, every artifact has at most one parent: the artifact it
//! is nested under. The graph holds one node per artifact and one edge from
//! each parent to each of its children, so scheduling only needs to know a
//! node's parent and which nodes belong to which top-level subtree.

use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::artifact::{Artifact, Root};

/// A forest of artifacts with explicit parent links.
#[derive(Debug, Clone, Default)]
pub struct ExecutionDag {
  graph: DiGraph<Arc<Artifact>, ()>,

  /// Top-level artifacts, in declaration order.
  roots: Vec<NodeIndex>,
}

impl ExecutionDag {
  /// Build the DAG for a resolved forest.
  ///
  /// Nodes are added in pre-order, so a parent's index is always lower than
  /// any of its descendants'.
  pub fn from_root(root: &Root) -> Self {
    let mut dag = Self::default();
    for artifact in &root.artifacts {
      let idx = dag.add(artifact, None);
      dag.roots.push(idx);
    }
    dag
  }

  fn add(&mut self, artifact: &Artifact, parent: Option<NodeIndex>) -> NodeIndex {
    let idx = self.graph.add_node(Arc::new(artifact.clone()));
    if let Some(parent) = parent {
      self.graph.add_edge(parent, idx, ());
    }
    for child in &artifact.artifacts {
      self.add(child, Some(idx));
    }
    idx
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  pub fn roots(&self) -> &[NodeIndex] {
    &self.roots
  }

  pub fn artifact(&self, idx: NodeIndex) -> &Arc<Artifact> {
    &self.graph[idx]
  }

  /// The node this one is nested under, if any.
  pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
    self.graph.neighbors_directed(idx, Direction::Incoming).next()
  }

  /// Direct children, in no particular order.
  pub fn children(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
    self.graph.neighbors_directed(idx, Direction::Outgoing)
  }

  /// `root` and every node below it, parents before children.
  pub fn subtree(&self, root: NodeIndex) -> Vec<NodeIndex> {
    let mut nodes = Vec::new();
    let mut dfs = Dfs::new(&self.graph, root);
    while let Some(idx) = dfs.next(&self.graph) {
      nodes.push(idx);
    }
    nodes
  }

  /// Full names of every node, in index order.
  pub fn full_names(&self) -> Vec<String> {
    self.graph.node_weights().map(|a| a.full_name()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn forest() -> Root {
    Root::new(vec![
      Artifact::new("googlecompute", "A")
        .with_child(Artifact::new("googlecompute", "B").with_child(Artifact::new("null", "C")))
        .with_child(Artifact::new("null", "D")),
      Artifact::new("amazon-ebs", "E"),
    ])
  }

  #[test]
  fn empty_forest() {
    let dag = ExecutionDag::from_root(&Root::default());
    assert!(dag.is_empty());
    assert!(dag.roots().is_empty());
  }

  #[test]
  fn one_node_per_artifact() {
    let root = forest();
    let dag = ExecutionDag::from_root(&root);

    assert_eq!(dag.len(), root.node_count());
    assert_eq!(dag.roots().len(), 2);
    assert_eq!(
      dag.full_names(),
      vec![
        "artifact.googlecompute.A",
        "artifact.googlecompute.B",
        "artifact.null.C",
        "artifact.null.D",
        "artifact.amazon-ebs.E",
      ]
    );
  }

  #[test]
  fn parents_follow_nesting() {
    let dag = ExecutionDag::from_root(&forest());
    let a = dag.roots()[0];
    let e = dag.roots()[1];

    assert_eq!(dag.parent(a), None);
    assert_eq!(dag.parent(e), None);

    let mut children: Vec<String> = dag.children(a).map(|c| dag.artifact(c).full_name()).collect();
    children.sort();
    assert_eq!(children, vec!["artifact.googlecompute.B", "artifact.null.D"]);

    for child in dag.children(a) {
      assert_eq!(dag.parent(child), Some(a));
    }
  }

  #[test]
  fn subtree_lists_parents_first() {
    let dag = ExecutionDag::from_root(&forest());
    let a = dag.roots()[0];

    let subtree = dag.subtree(a);
    assert_eq!(subtree.len(), 4);
    assert_eq!(subtree[0], a);
    for (pos, &idx) in subtree.iter().enumerate() {
      if let Some(parent) = dag.parent(idx) {
        let parent_pos = subtree.iter().position(|&n| n == parent).unwrap();
        assert!(parent_pos < pos);
      }
    }

    assert_eq!(dag.subtree(dag.roots()[1]).len(), 1);
  }
}
