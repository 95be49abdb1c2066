//! Deadline enforcement for handlers.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{Handler, ResultIndex};
use crate::artifact::Artifact;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::execute::ExecutionContext;

/// How long a handler may keep running after it has been cancelled.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(60);

/// Wraps a handler with a deadline.
///
/// When `timeout` elapses (or the run is cancelled) the inner handler's
/// context is cancelled and it gets `grace` to return. A handler that hit the
/// deadline always fails with `Handler timed out`, on top of whatever it
/// reported itself.
#[derive(Debug, Clone)]
pub struct TimeoutHandler<H> {
  pub inner: H,
  pub timeout: Duration,
  pub grace: Duration,
}

impl<H: Handler> TimeoutHandler<H> {
  pub fn new(inner: H, timeout: Duration) -> Self {
    Self {
      inner,
      timeout,
      grace: DEFAULT_GRACE,
    }
  }

  pub fn with_grace(mut self, grace: Duration) -> Self {
    self.grace = grace;
    self
  }
}

#[async_trait]
impl<H: Handler> Handler for TimeoutHandler<H> {
  async fn handle(&self, ctx: &ExecutionContext, artifact: &Artifact, index: &ResultIndex) -> Diagnostics {
    let (inner_ctx, token) = ctx.child();
    let work = self.inner.handle(&inner_ctx, artifact, index);
    tokio::pin!(work);

    let timed_out = tokio::select! {
      diagnostics = &mut work => return diagnostics,
      _ = tokio::time::sleep(self.timeout) => {
        warn!(artifact = ctx.artifact(), timeout = ?self.timeout, "handler timed out, cancelling");
        true
      }
      _ = ctx.cancelled() => false,
    };
    token.cancel();

    let mut diagnostics = match tokio::time::timeout(self.grace, work).await {
      Ok(diagnostics) => diagnostics,
      Err(_) => {
        warn!(artifact = ctx.artifact(), grace = ?self.grace, "handler ignored cancellation");
        Diagnostics::from(
          Diagnostic::error(
            "Handler did not return after cancellation",
            format!(
              "The handler for {} was still running {:?} after it was cancelled.",
              ctx.artifact(),
              self.grace
            ),
          )
          .with_subject(artifact.range.clone()),
        )
      }
    };

    if timed_out {
      diagnostics.push(
        Diagnostic::error(
          "Handler timed out",
          format!("The handler for {} did not finish within {:?}.", ctx.artifact(), self.timeout),
        )
        .with_subject(artifact.range.clone()),
      );
    }
    diagnostics
  }
}
