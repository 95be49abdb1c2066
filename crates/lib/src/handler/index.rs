//! Results shared between the handlers of one operation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// Map from artifact full name to the result its handler recorded.
///
/// A fresh index is created for every operation, so results recorded during
/// validation are not visible during build. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct ResultIndex {
  inner: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl ResultIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a result, returning the previous one if any.
  pub fn insert(&self, artifact: impl Into<String>, result: Value) -> Option<Value> {
    self.lock().insert(artifact.into(), result)
  }

  pub fn get(&self, artifact: &str) -> Option<Value> {
    self.lock().get(artifact).cloned()
  }

  pub fn contains(&self, artifact: &str) -> bool {
    self.lock().contains_key(artifact)
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// A copy of every recorded result.
  pub fn snapshot(&self) -> BTreeMap<String, Value> {
    self.lock().clone()
  }

  fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn insert_and_get() {
    let index = ResultIndex::new();
    assert!(index.is_empty());

    assert_eq!(index.insert("artifact.a.b", json!("img-1")), None);
    assert_eq!(index.insert("artifact.a.b", json!("img-2")), Some(json!("img-1")));

    assert!(index.contains("artifact.a.b"));
    assert_eq!(index.get("artifact.a.b"), Some(json!("img-2")));
    assert_eq!(index.get("artifact.a.c"), None);
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn clones_share_results() {
    let index = ResultIndex::new();
    let other = index.clone();
    other.insert("artifact.x.y", json!(1));
    assert_eq!(index.snapshot().len(), 1);
  }
}
