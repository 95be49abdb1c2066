//! Loading artifact forests from JSON files.
//!
//! A location is either a single file or a directory. Directories are listed
//! (not recursively) in name order and every file with a recognized
//! extension is decoded. All decoded roots are merged, then flattened.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::flatten::flatten;
use super::types::Root;
use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};

/// Problems reading configuration from disk.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("{source}")]
  Stat {
    location: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("the location {location:?} could not be listed; {source}")]
  List {
    location: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{source}")]
  Read {
    file: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{source}")]
  Parse {
    file: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

impl LoadError {
  pub fn to_diagnostic(&self) -> Diagnostic {
    match self {
      LoadError::Stat { location, .. } => {
        Diagnostic::error(format!("Failed to stat '{}'", location.display()), self.to_string())
      }
      LoadError::List { .. } => Diagnostic::error("Failed to list location", self.to_string()),
      LoadError::Read { file, .. } => Diagnostic::error(format!("Failed to read '{}'", file.display()), self.to_string())
        .with_subject(Some(SourceRange::file(file.display().to_string()))),
      LoadError::Parse { file, source } => {
        let filename = file.display().to_string();
        let subject = if source.line() > 0 {
          SourceRange::at(filename, source.line(), source.column())
        } else {
          SourceRange::file(filename)
        };
        Diagnostic::error("Invalid configuration", self.to_string()).with_subject(Some(subject))
      }
    }
  }
}

/// A successfully loaded and flattened forest.
#[derive(Debug)]
pub struct Loaded {
  pub root: Root,
  /// Non-fatal diagnostics produced while loading.
  pub warnings: Diagnostics,
}

/// Reads configuration files into a [`Root`].
#[derive(Debug, Clone)]
pub struct Loader {
  /// Recognized file extensions, compared case-insensitively.
  pub extensions: Vec<String>,
}

impl Default for Loader {
  fn default() -> Self {
    Self {
      extensions: vec!["json".to_string()],
    }
  }
}

/// Load `location` with the default [`Loader`].
pub fn load(location: impl AsRef<Path>) -> Result<Loaded, Diagnostics> {
  Loader::default().load(location)
}

impl Loader {
  /// Load, merge and flatten every recognized file under `location`.
  ///
  /// All parse errors are collected before giving up so that a single run
  /// reports every broken file.
  pub fn load(&self, location: impl AsRef<Path>) -> Result<Loaded, Diagnostics> {
    let location = location.as_ref();
    info!(location = %location.display(), "loading configuration");

    let files = self.list(location).map_err(|e| Diagnostics::from(e.to_diagnostic()))?;

    let mut root = Root::default();
    let mut diagnostics = Diagnostics::new();
    let mut recognized = 0usize;

    for file in files {
      if !self.is_recognized(&file) {
        debug!(file = %file.display(), "skipping unrecognized file");
        continue;
      }
      recognized += 1;

      match load_file(&file) {
        Ok(current) => root.merge(current),
        Err(e) => diagnostics.push(e.to_diagnostic()),
      }
    }

    if diagnostics.has_errors() {
      return Err(diagnostics);
    }

    if recognized == 0 {
      diagnostics.push(Diagnostic::warning(
        "No recognized file type found",
        format!("Recognized file extensions: {}", self.extensions.join(", ")),
      ));
    }

    let root = flatten(root)?;
    info!(artifacts = root.node_count(), "configuration loaded");

    Ok(Loaded {
      root,
      warnings: diagnostics,
    })
  }

  fn list(&self, location: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let metadata = fs::metadata(location).map_err(|source| LoadError::Stat {
      location: location.to_path_buf(),
      source,
    })?;

    if !metadata.is_dir() {
      return Ok(vec![location.to_path_buf()]);
    }

    let list_err = |source: io::Error| LoadError::List {
      location: location.to_path_buf(),
      source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(location).map_err(list_err)? {
      let path = entry.map_err(list_err)?.path();
      if path.is_file() {
        files.push(path);
      }
    }
    files.sort();
    Ok(files)
  }

  fn is_recognized(&self, file: &Path) -> bool {
    file
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
  }
}

fn load_file(file: &Path) -> Result<Root, LoadError> {
  let content = fs::read_to_string(file).map_err(|source| LoadError::Read {
    file: file.to_path_buf(),
    source,
  })?;

  let mut root: Root = serde_json::from_str(&content).map_err(|source| LoadError::Parse {
    file: file.to_path_buf(),
    source,
  })?;

  let filename = file.display().to_string();
  let range = SourceRange::file(filename.clone());
  for artifact in &mut root.artifacts {
    artifact.set_range(&range);
  }
  root.files.insert(filename, content);

  debug!(file = %file.display(), artifacts = root.artifacts.len(), "decoded file");
  Ok(root)
}
