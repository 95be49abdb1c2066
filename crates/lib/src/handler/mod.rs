//! The contract every artifact type implements.
//!
//! The engine knows nothing about what an artifact of a given type does. It
//! resolves a [`Handler`] for the artifact's `type` through a
//! [`HandlerLookup`] and calls it once per operation, after the artifact's
//! parent has been handled.

mod index;
mod lookup;
mod null;
mod timeout;

use std::future::Future;

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::diagnostics::Diagnostics;
use crate::execute::ExecutionContext;

pub use index::ResultIndex;
pub use lookup::{HandlerLookup, LookupError, Registry};
pub use null::NullHandler;
pub use timeout::{DEFAULT_GRACE, TimeoutHandler};

/// Validates or builds one artifact.
///
/// Which of the two is asked for is [`ExecutionContext::operation`].
///
/// - Any error diagnostic in the returned list means the artifact failed and
///   nothing built from it will be handled in this operation.
/// - The handler should record its output (the artifact it expects to produce
///   during validation, the artifact it produced during build) in `index`
///   under the artifact's full name, so artifacts built from it can read it.
/// - The handler must return promptly once `ctx` is cancelled.
#[async_trait]
pub trait Handler: Send + Sync {
  async fn handle(&self, ctx: &ExecutionContext, artifact: &Artifact, index: &ResultIndex) -> Diagnostics;
}

/// Adapts an async function into a [`Handler`].
///
/// The function receives owned copies of its arguments.
///
/// ```
/// use kiln_lib::artifact::Artifact;
/// use kiln_lib::diagnostics::Diagnostics;
/// use kiln_lib::execute::ExecutionContext;
/// use kiln_lib::handler::{HandlerFn, ResultIndex};
///
/// let handler = HandlerFn(|ctx: ExecutionContext, artifact: Artifact, index: ResultIndex| async move {
///   index.insert(ctx.artifact(), serde_json::json!({ "kind": artifact.kind }));
///   Diagnostics::new()
/// });
/// # let _ = handler;
/// ```
pub struct HandlerFn<F>(pub F);

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
  F: Fn(ExecutionContext, Artifact, ResultIndex) -> Fut + Send + Sync,
  Fut: Future<Output = Diagnostics> + Send,
{
  async fn handle(&self, ctx: &ExecutionContext, artifact: &Artifact, index: &ResultIndex) -> Diagnostics {
    (self.0)(ctx.clone(), artifact.clone(), index.clone()).await
  }
}
