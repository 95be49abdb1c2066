//! Artifact tree types.
//!
//! An [`Artifact`] is one build step: something a handler of the matching
//! `kind` knows how to validate and build. Artifacts nest: a child is built
//! from the output of its parent. A [`Root`] is the forest of top-level
//! artifacts produced by the loader.
//!
//! # Serialization
//!
//! ```json
//! {
//!   "artifact": [
//!     {
//!       "type": "googlecompute",
//!       "name": "ubuntu-1804-lts",
//!       "provisioner": [{ "type": "shell", "inline": ["apt-get update"] }],
//!       "artifact": [{ "type": "compress", "name": "ubuntu.gz" }],
//!       "image_family": "ubuntu"
//!     }
//!   ]
//! }
//! ```
//!
//! Keys other than `type`, `name`, `source`, `provisioner` and `artifact`
//! are kept in [`Artifact::remain`] for the handler to interpret.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diagnostics::{Files, SourceRange};

/// Prefix of every artifact's addressable name.
pub const ARTIFACT_PREFIX: &str = "artifact";

/// Build the addressable name of an artifact: `artifact.<kind>.<name>`.
pub fn full_name(kind: &str, name: &str) -> String {
  format!("{}.{}.{}", ARTIFACT_PREFIX, kind, name)
}

/// A provisioning step attached to an artifact.
///
/// Opaque to the engine; the artifact's handler decides what to do with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provisioner {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(flatten)]
  pub remain: Map<String, Value>,
}

impl Provisioner {
  pub fn new(kind: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      remain: Map::new(),
    }
  }
}

/// A single artifact declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
  /// Handler kind, e.g. `googlecompute` or `compress`.
  #[serde(rename = "type")]
  pub kind: String,

  /// Name, unique among artifacts of the same kind.
  pub name: String,

  /// Full name of the artifact that must be built before this one.
  ///
  /// Cleared by the flattener once the artifact has been moved under its
  /// source.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,

  #[serde(default, rename = "provisioner", skip_serializing_if = "Vec::is_empty")]
  pub provisioners: Vec<Provisioner>,

  /// Children, built after this artifact.
  #[serde(default, rename = "artifact", skip_serializing_if = "Vec::is_empty")]
  pub artifacts: Vec<Artifact>,

  /// Where the artifact was declared, when known.
  #[serde(skip)]
  pub range: Option<SourceRange>,

  /// Handler specific configuration.
  #[serde(flatten)]
  pub remain: Map<String, Value>,
}

impl Artifact {
  pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      name: name.into(),
      source: None,
      provisioners: Vec::new(),
      artifacts: Vec::new(),
      range: None,
      remain: Map::new(),
    }
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }

  pub fn with_child(mut self, child: Artifact) -> Self {
    self.artifacts.push(child);
    self
  }

  pub fn with_provisioner(mut self, provisioner: Provisioner) -> Self {
    self.provisioners.push(provisioner);
    self
  }

  pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.remain.insert(key.into(), value.into());
    self
  }

  /// The addressable name, `artifact.<kind>.<name>`.
  pub fn full_name(&self) -> String {
    full_name(&self.kind, &self.name)
  }

  /// The declared source, ignoring empty strings.
  pub fn source(&self) -> Option<&str> {
    self.source.as_deref().filter(|s| !s.is_empty())
  }

  /// Number of artifacts in this subtree, including this one.
  pub fn node_count(&self) -> usize {
    1 + self.artifacts.iter().map(Artifact::node_count).sum::<usize>()
  }

  /// Visit this artifact and its descendants, depth first, parents first.
  pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Artifact)) {
    f(self);
    for child in &self.artifacts {
      child.visit(f);
    }
  }

  /// Find an artifact in this subtree by full name.
  pub fn find(&self, full_name: &str) -> Option<&Artifact> {
    if self.full_name() == full_name {
      return Some(self);
    }
    self.artifacts.iter().find_map(|child| child.find(full_name))
  }

  pub fn find_mut(&mut self, full_name: &str) -> Option<&mut Artifact> {
    if self.full_name() == full_name {
      return Some(self);
    }
    self.artifacts.iter_mut().find_map(|child| child.find_mut(full_name))
  }

  pub(crate) fn set_range(&mut self, range: &SourceRange) {
    self.range = Some(range.clone());
    for child in &mut self.artifacts {
      child.set_range(range);
    }
  }
}

/// The forest of top-level artifacts of one configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Root {
  #[serde(default, rename = "artifact")]
  pub artifacts: Vec<Artifact>,

  /// Contents of the files the root was loaded from.
  #[serde(skip)]
  pub files: Files,
}

impl Root {
  pub fn new(artifacts: Vec<Artifact>) -> Self {
    Self {
      artifacts,
      files: Files::new(),
    }
  }

  /// Merge another root into this one.
  ///
  /// Artifacts are appended in order; file caches are unioned, entries from
  /// `other` winning on conflict.
  pub fn merge(&mut self, other: Root) {
    self.artifacts.extend(other.artifacts);
    self.files.extend(other.files);
  }

  /// Total number of artifacts at every nesting level.
  pub fn node_count(&self) -> usize {
    self.artifacts.iter().map(Artifact::node_count).sum()
  }

  /// Visit every artifact of the forest, depth first, parents first.
  pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Artifact)) {
    for artifact in &self.artifacts {
      artifact.visit(f);
    }
  }

  pub fn find(&self, full_name: &str) -> Option<&Artifact> {
    self.artifacts.iter().find_map(|a| a.find(full_name))
  }

  pub fn find_mut(&mut self, full_name: &str) -> Option<&mut Artifact> {
    self.artifacts.iter_mut().find_map(|a| a.find_mut(full_name))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn full_name_is_dotted() {
    let artifact = Artifact::new("googlecompute", "ubuntu");
    assert_eq!(artifact.full_name(), "artifact.googlecompute.ubuntu");
  }

  #[test]
  fn empty_source_is_ignored() {
    let artifact = Artifact::new("a", "b").with_source("");
    assert_eq!(artifact.source(), None);
  }

  #[test]
  fn find_searches_all_levels() {
    let root = Root::new(vec![
      Artifact::new("a", "1").with_child(Artifact::new("b", "2").with_child(Artifact::new("c", "3"))),
      Artifact::new("d", "4"),
    ]);

    assert_eq!(root.node_count(), 4);
    assert!(root.find("artifact.c.3").is_some());
    assert!(root.find("artifact.d.4").is_some());
    assert!(root.find("artifact.c.4").is_none());
  }

  #[test]
  fn visit_is_parent_first() {
    let root = Root::new(vec![
      Artifact::new("a", "1").with_child(Artifact::new("b", "2")),
      Artifact::new("c", "3"),
    ]);
    let mut seen = Vec::new();
    root.visit(&mut |a| seen.push(a.name.clone()));
    assert_eq!(seen, vec!["1", "2", "3"]);
  }

  #[test]
  fn merge_appends_artifacts_and_files() {
    let mut left = Root::new(vec![Artifact::new("a", "1")]);
    left.files.insert("left.json".into(), "{}".into());

    let mut right = Root::new(vec![Artifact::new("b", "2")]);
    right.files.insert("right.json".into(), "{}".into());

    left.merge(right);

    let names: Vec<_> = left.artifacts.iter().map(Artifact::full_name).collect();
    assert_eq!(names, vec!["artifact.a.1", "artifact.b.2"]);
    assert_eq!(left.files.len(), 2);
  }

  #[test]
  fn deserialize_keeps_unknown_keys_in_remain() {
    let root: Root = serde_json::from_value(json!({
      "artifact": [{
        "type": "googlecompute",
        "name": "ubuntu",
        "image_family": "ubuntu-1804-lts",
        "provisioner": [{ "type": "shell", "inline": ["echo hi"] }],
        "artifact": [{ "type": "compress", "name": "ubuntu.gz", "source": "" }]
      }]
    }))
    .unwrap();

    let artifact = &root.artifacts[0];
    assert_eq!(artifact.kind, "googlecompute");
    assert_eq!(artifact.remain["image_family"], "ubuntu-1804-lts");
    assert_eq!(artifact.provisioners[0].kind, "shell");
    assert_eq!(artifact.provisioners[0].remain["inline"], json!(["echo hi"]));
    assert_eq!(artifact.artifacts[0].name, "ubuntu.gz");
    assert!(!artifact.remain.contains_key("provisioner"));
  }

  #[test]
  fn serialize_omits_empty_fields() {
    let value = serde_json::to_value(Artifact::new("null", "a")).unwrap();
    assert_eq!(value, json!({ "type": "null", "name": "a" }));
  }
}
