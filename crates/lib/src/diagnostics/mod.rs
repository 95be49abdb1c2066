//! Structured diagnostics.
//!
//! Diagnostics are the only error channel between handlers and the engine.
//! The loader and the flattener report through the same types so a single
//! report can be rendered at the end of a run.

mod receiver;
mod render;

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

pub use receiver::DiagnosticReceiver;
pub use render::{DEFAULT_WIDTH, DiagnosticWriter, Files};

/// How bad a diagnostic is.
///
/// Only [`Severity::Error`] fails a phase; warnings are reported but never
/// stop the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Error,
  Warning,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Error => write!(f, "Error"),
      Severity::Warning => write!(f, "Warning"),
    }
  }
}

/// A 1-based line/column position inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
  pub line: usize,
  pub column: usize,
}

/// Where something was declared.
///
/// `start` is `None` when only the file is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
  pub filename: String,
  pub start: Option<Pos>,
}

impl SourceRange {
  /// A range that only names a file.
  pub fn file(filename: impl Into<String>) -> Self {
    Self {
      filename: filename.into(),
      start: None,
    }
  }

  /// A range pointing at a line and column of a file.
  pub fn at(filename: impl Into<String>, line: usize, column: usize) -> Self {
    Self {
      filename: filename.into(),
      start: Some(Pos { line, column }),
    }
  }
}

impl fmt::Display for SourceRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.start {
      Some(pos) => write!(f, "{}:{}:{}", self.filename, pos.line, pos.column),
      None => write!(f, "{}", self.filename),
    }
  }
}

/// A single structured error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub severity: Severity,
  pub summary: String,
  pub detail: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject: Option<SourceRange>,
}

impl Diagnostic {
  pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
    Self {
      severity: Severity::Error,
      summary: summary.into(),
      detail: detail.into(),
      subject: None,
    }
  }

  pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
    Self {
      severity: Severity::Warning,
      summary: summary.into(),
      detail: detail.into(),
      subject: None,
    }
  }

  /// Attach the declaration site this diagnostic is about.
  pub fn with_subject(mut self, subject: Option<SourceRange>) -> Self {
    self.subject = subject;
    self
  }

  pub fn is_error(&self) -> bool {
    self.severity == Severity::Error
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.severity, self.summary)?;
    if !self.detail.is_empty() {
      write!(f, "; {}", self.detail)?;
    }
    Ok(())
  }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, diagnostic: Diagnostic) {
    self.0.push(diagnostic);
  }

  /// Returns true if at least one diagnostic has error severity.
  pub fn has_errors(&self) -> bool {
    self.0.iter().any(Diagnostic::is_error)
  }

  pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
    self.0.iter().filter(|d| d.is_error())
  }

  pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
    self.0.iter().filter(|d| !d.is_error())
  }
}

impl Deref for Diagnostics {
  type Target = [Diagnostic];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl From<Diagnostic> for Diagnostics {
  fn from(diagnostic: Diagnostic) -> Self {
    Self(vec![diagnostic])
  }
}

impl From<Vec<Diagnostic>> for Diagnostics {
  fn from(diagnostics: Vec<Diagnostic>) -> Self {
    Self(diagnostics)
  }
}

impl FromIterator<Diagnostic> for Diagnostics {
  fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl Extend<Diagnostic> for Diagnostics {
  fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
    self.0.extend(iter);
  }
}

impl IntoIterator for Diagnostics {
  type Item = Diagnostic;
  type IntoIter = std::vec::IntoIter<Diagnostic>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

impl<'a> IntoIterator for &'a Diagnostics {
  type Item = &'a Diagnostic;
  type IntoIter = std::slice::Iter<'a, Diagnostic>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn warnings_do_not_count_as_errors() {
    let mut diags = Diagnostics::new();
    diags.push(Diagnostic::warning("slow", "took a while"));
    assert!(!diags.has_errors());

    diags.push(Diagnostic::error("broken", "it broke"));
    assert!(diags.has_errors());
    assert_eq!(diags.errors().count(), 1);
    assert_eq!(diags.warnings().count(), 1);
  }

  #[test]
  fn empty_diagnostics_have_no_errors() {
    assert!(!Diagnostics::new().has_errors());
    assert!(Diagnostics::new().is_empty());
  }

  #[test]
  fn diagnostic_display() {
    let diag = Diagnostic::error("Source not found", "artifact.a.b is missing");
    assert_eq!(diag.to_string(), "Error: Source not found; artifact.a.b is missing");

    let bare = Diagnostic::warning("heads up", "");
    assert_eq!(bare.to_string(), "Warning: heads up");
  }

  #[test]
  fn source_range_display() {
    assert_eq!(SourceRange::file("a.json").to_string(), "a.json");
    assert_eq!(SourceRange::at("a.json", 3, 7).to_string(), "a.json:3:7");
  }

  #[test]
  fn diagnostics_serialize_as_list() {
    let diags: Diagnostics = vec![Diagnostic::error("x", "y")].into();
    let json = serde_json::to_value(&diags).unwrap();
    assert_eq!(json[0]["severity"], "error");
    assert_eq!(json[0]["summary"], "x");
    assert!(json[0].get("subject").is_none());
  }
}
