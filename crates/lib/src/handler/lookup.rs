//! Resolving handlers from artifact types.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::Handler;

/// A handler could not be produced for an artifact type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
  #[error("no handler is registered for artifact type \"{0}\"")]
  UnknownKind(String),

  #[error("handler for artifact type \"{kind}\" is unavailable: {message}")]
  Unavailable { kind: String, message: String },
}

/// Maps an artifact type to the handler implementing it.
///
/// Implemented by [`Registry`] and by any
/// `Fn(&str) -> Result<Arc<dyn Handler>, LookupError>`.
pub trait HandlerLookup: Send + Sync {
  fn lookup(&self, kind: &str) -> Result<Arc<dyn Handler>, LookupError>;
}

impl<F> HandlerLookup for F
where
  F: Fn(&str) -> Result<Arc<dyn Handler>, LookupError> + Send + Sync,
{
  fn lookup(&self, kind: &str) -> Result<Arc<dyn Handler>, LookupError> {
    self(kind)
  }
}

/// A fixed table of handlers keyed by artifact type.
#[derive(Clone, Default)]
pub struct Registry {
  handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `handler` for `kind`, replacing any previous registration.
  pub fn register(&mut self, kind: impl Into<String>, handler: impl Handler + 'static) -> &mut Self {
    self.handlers.insert(kind.into(), Arc::new(handler));
    self
  }

  /// Builder form of [`Registry::register`].
  pub fn with(mut self, kind: impl Into<String>, handler: impl Handler + 'static) -> Self {
    self.register(kind, handler);
    self
  }

  pub fn kinds(&self) -> impl Iterator<Item = &str> {
    self.handlers.keys().map(String::as_str)
  }
}

impl fmt::Debug for Registry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registry").field("kinds", &self.handlers.keys().collect::<Vec<_>>()).finish()
  }
}

impl HandlerLookup for Registry {
  fn lookup(&self, kind: &str) -> Result<Arc<dyn Handler>, LookupError> {
    self
      .handlers
      .get(kind)
      .cloned()
      .ok_or_else(|| LookupError::UnknownKind(kind.to_string()))
  }
}
