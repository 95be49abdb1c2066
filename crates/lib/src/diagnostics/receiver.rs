//! Concurrency-safe diagnostic collection shared by every task of a run.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Diagnostic, Diagnostics};

/// Collects diagnostics from concurrently running handlers.
///
/// Clones share the same underlying store. Every operation takes the lock,
/// so an `extend` is atomic with respect to other calls and no record is
/// ever lost.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReceiver {
  inner: Arc<Mutex<Diagnostics>>,
}

impl DiagnosticReceiver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn append(&self, diagnostic: Diagnostic) {
    self.lock().push(diagnostic);
  }

  pub fn extend(&self, diagnostics: Diagnostics) {
    if diagnostics.is_empty() {
      return;
    }
    self.lock().extend(diagnostics);
  }

  /// Returns a copy of everything collected so far.
  pub fn snapshot(&self) -> Diagnostics {
    self.lock().clone()
  }

  pub fn has_errors(&self) -> bool {
    self.lock().has_errors()
  }

  fn lock(&self) -> MutexGuard<'_, Diagnostics> {
    // A push never leaves the Vec half-written, so a poisoned lock is still usable.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;

  #[test]
  fn append_and_snapshot() {
    let receiver = DiagnosticReceiver::new();
    receiver.append(Diagnostic::warning("w", ""));
    assert!(!receiver.has_errors());

    receiver.append(Diagnostic::error("e", ""));
    assert!(receiver.has_errors());
    assert_eq!(receiver.snapshot().len(), 2);
  }

  #[test]
  fn clones_share_storage() {
    let receiver = DiagnosticReceiver::new();
    let other = receiver.clone();
    other.append(Diagnostic::error("e", ""));
    assert!(receiver.has_errors());
  }

  #[test]
  fn concurrent_writers_lose_nothing() {
    const WRITERS: usize = 16;
    const PER_WRITER: usize = 250;

    let receiver = DiagnosticReceiver::new();
    let handles: Vec<_> = (0..WRITERS)
      .map(|w| {
        let receiver = receiver.clone();
        thread::spawn(move || {
          for i in 0..PER_WRITER {
            if i % 2 == 0 {
              receiver.append(Diagnostic::warning(format!("{w}-{i}"), ""));
            } else {
              receiver.extend(Diagnostic::warning(format!("{w}-{i}"), "").into());
            }
          }
        })
      })
      .collect();

    for handle in handles {
      handle.join().unwrap();
    }

    assert_eq!(receiver.snapshot().len(), WRITERS * PER_WRITER);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_tasks_lose_nothing() {
    let receiver = DiagnosticReceiver::new();
    let mut set = tokio::task::JoinSet::new();
    for w in 0..8 {
      let receiver = receiver.clone();
      set.spawn(async move {
        let batch: Diagnostics = (0..50).map(|i| Diagnostic::error(format!("{w}-{i}"), "")).collect();
        receiver.extend(batch);
      });
    }
    while let Some(res) = set.join_next().await {
      res.unwrap();
    }

    let snapshot = receiver.snapshot();
    assert_eq!(snapshot.len(), 400);
    assert!(snapshot.has_errors());
  }
}
