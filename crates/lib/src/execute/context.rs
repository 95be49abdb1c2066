//! Per-artifact execution context.

use tokio_util::sync::CancellationToken;

use super::types::Operation;

/// What a handler knows about the invocation it is serving.
///
/// The context is cancelled when the run is cancelled. Handlers must watch
/// [`ExecutionContext::cancelled`] and stop promptly; the engine never
/// interrupts a handler on its own.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
  operation: Operation,
  artifact: String,
  parent: Option<String>,
  pub(crate) token: CancellationToken,
}

impl ExecutionContext {
  pub fn new(operation: Operation, artifact: impl Into<String>, parent: Option<String>, token: CancellationToken) -> Self {
    Self {
      operation,
      artifact: artifact.into(),
      parent,
      token,
    }
  }

  /// The operation being run.
  pub fn operation(&self) -> Operation {
    self.operation
  }

  /// Full name of the artifact being handled.
  pub fn artifact(&self) -> &str {
    &self.artifact
  }

  /// Full name of the artifact this one is built from, if any.
  ///
  /// Its result, when the parent's handler recorded one, is in the
  /// [`ResultIndex`](crate::handler::ResultIndex) under this name.
  pub fn parent(&self) -> Option<&str> {
    self.parent.as_deref()
  }

  pub fn is_cancelled(&self) -> bool {
    self.token.is_cancelled()
  }

  /// Completes once the context is cancelled.
  pub async fn cancelled(&self) {
    self.token.cancelled().await
  }

  /// A context cancelled with this one, plus the token to cancel it early.
  pub(crate) fn child(&self) -> (Self, CancellationToken) {
    let token = self.token.child_token();
    let ctx = Self {
      token: token.clone(),
      ..self.clone()
    };
    (ctx, token)
  }
}
