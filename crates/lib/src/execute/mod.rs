//! Running operations over an artifact forest.
//!
//! [`Core`] runs each configured [`Operation`] in lifecycle order. Within an
//! operation every artifact gets its own task:
//! - top-level artifacts start right away
//! - nested artifacts wait for their parent's handler to return, and skip
//!   silently when anything in the operation has already failed
//! - a semaphore bounds how many handlers run at once
//!
//! An operation that ends with any error diagnostic stops the run.

mod context;
mod dag;
mod types;

use std::io::{self, Write};
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::artifact::{Artifact, Root, flatten};
use crate::diagnostics::{Diagnostic, DiagnosticReceiver, DiagnosticWriter, Diagnostics, Files};
use crate::handler::{HandlerLookup, ResultIndex};

pub use context::ExecutionContext;
pub use dag::ExecutionDag;
pub use types::{ExecuteConfig, ExecuteError, Operation, OutputConfig};

/// The execution engine for one resolved forest.
pub struct Core {
  dag: ExecutionDag,
  files: Files,
  lookup: Arc<dyn HandlerLookup>,
  config: ExecuteConfig,
  operations: Vec<Operation>,
}

impl Core {
  /// Prepare `root` for execution.
  ///
  /// The forest is flattened first, which leaves an already resolved forest
  /// untouched.
  ///
  /// # Errors
  ///
  /// Returns `InvalidConfig` if `config` cannot run anything and
  /// `Unresolved` if the artifact sources do not form a forest.
  pub fn new(root: Root, lookup: impl HandlerLookup + 'static, config: ExecuteConfig) -> Result<Self, ExecuteError> {
    let operations = config.validate()?;
    let root = flatten(root).map_err(ExecuteError::Unresolved)?;
    let dag = ExecutionDag::from_root(&root);

    Ok(Self {
      dag,
      files: root.files,
      lookup: Arc::new(lookup),
      config,
      operations,
    })
  }

  pub fn dag(&self) -> &ExecutionDag {
    &self.dag
  }

  /// Run every operation, print the report to stdout and return all
  /// diagnostics.
  pub async fn run(&self, cancel: CancellationToken) -> Diagnostics {
    let diagnostics = self.execute(cancel).await;
    if let Err(e) = self.report(io::stdout().lock(), &diagnostics) {
      error!(error = %e, "failed to write diagnostics");
    }
    diagnostics
  }

  /// Render `diagnostics` with the configured output settings.
  pub fn report<W: Write>(&self, out: W, diagnostics: &Diagnostics) -> io::Result<()> {
    DiagnosticWriter::new(out, &self.files)
      .width(self.config.output.width)
      .color(self.config.output.color)
      .write_diagnostics(diagnostics)
  }

  /// Run every operation and return all diagnostics without rendering them.
  pub async fn execute(&self, cancel: CancellationToken) -> Diagnostics {
    info!(artifacts = self.dag.len(), operations = ?self.operations, "starting run");
    let receiver = DiagnosticReceiver::new();

    for &operation in &self.operations {
      self.run_operation(operation, &cancel, &receiver).await;

      if cancel.is_cancelled() {
        warn!(%operation, "run cancelled");
        receiver.append(Diagnostic::error(
          "Build cancelled",
          format!("The run was cancelled during the {} operation.", operation),
        ));
        break;
      }
      if receiver.has_errors() {
        info!(%operation, "operation failed, not running later operations");
        break;
      }
    }

    let diagnostics = receiver.snapshot();
    info!(
      errors = diagnostics.errors().count(),
      warnings = diagnostics.warnings().count(),
      "run complete"
    );
    diagnostics
  }

  async fn run_operation(&self, operation: Operation, run: &CancellationToken, receiver: &DiagnosticReceiver) {
    info!(%operation, "starting operation");

    let index = ResultIndex::new();
    let semaphore = Arc::new(Semaphore::new(self.config.parallelism));
    let tokens: Vec<CancellationToken> = (0..self.dag.len()).map(|_| run.child_token()).collect();
    let mut tasks = JoinSet::new();

    for &root in self.dag.roots() {
      if run.is_cancelled() {
        debug!(%operation, "run cancelled, not starting remaining artifacts");
        break;
      }
      for idx in self.dag.subtree(root) {
        let task = self.node_task(operation, idx, &tokens, run, &index, receiver, &semaphore);
        tasks.spawn(task.run());
      }

      if self.config.debug {
        join_all(&mut tasks, receiver).await;
      }
    }
    join_all(&mut tasks, receiver).await;

    info!(%operation, results = index.len(), "operation complete");
  }

  #[allow(clippy::too_many_arguments)]
  fn node_task(
    &self,
    operation: Operation,
    idx: NodeIndex,
    tokens: &[CancellationToken],
    run: &CancellationToken,
    index: &ResultIndex,
    receiver: &DiagnosticReceiver,
    semaphore: &Arc<Semaphore>,
  ) -> NodeTask {
    let artifact = self.dag.artifact(idx).clone();
    let parent = self.dag.parent(idx);

    NodeTask {
      ctx: ExecutionContext::new(
        operation,
        artifact.full_name(),
        parent.map(|p| self.dag.artifact(p).full_name()),
        tokens[idx.index()].clone(),
      ),
      artifact,
      parent_done: parent.map(|p| tokens[p.index()].clone()),
      run: run.clone(),
      lookup: self.lookup.clone(),
      index: index.clone(),
      receiver: receiver.clone(),
      semaphore: semaphore.clone(),
    }
  }
}

/// Everything one artifact's task needs for one operation.
struct NodeTask {
  ctx: ExecutionContext,
  artifact: Arc<Artifact>,
  /// Cancelled once the parent's task is finished.
  parent_done: Option<CancellationToken>,
  run: CancellationToken,
  lookup: Arc<dyn HandlerLookup>,
  index: ResultIndex,
  receiver: DiagnosticReceiver,
  semaphore: Arc<Semaphore>,
}

impl NodeTask {
  async fn run(self) {
    // Marks this node done for its children however the task ends.
    let _done = self.ctx.token.clone().drop_guard();

    if let Some(parent) = &self.parent_done {
      parent.cancelled().await;
      if self.receiver.has_errors() {
        debug!(artifact = self.ctx.artifact(), "skipping, an artifact failed");
        return;
      }
    }
    if self.run.is_cancelled() {
      debug!(artifact = self.ctx.artifact(), "skipping, run cancelled");
      return;
    }

    let kind = &self.artifact.kind;
    let handler = match self.lookup.lookup(kind) {
      Ok(handler) => handler,
      Err(e) => {
        warn!(artifact = self.ctx.artifact(), kind = %kind, error = %e, "no handler");
        self.receiver.append(
          Diagnostic::error(format!("Error getting component {}", kind), e.to_string())
            .with_subject(self.artifact.range.clone()),
        );
        return;
      }
    };

    let Ok(_permit) = self.semaphore.acquire().await else {
      return;
    };

    debug!(artifact = self.ctx.artifact(), operation = %self.ctx.operation(), "invoking handler");
    let ctx = self.ctx.clone();
    let artifact = self.artifact.clone();
    let index = self.index.clone();
    let invocation = tokio::spawn(async move { handler.handle(&ctx, &artifact, &index).await });

    match invocation.await {
      Ok(diagnostics) => {
        debug!(
          artifact = self.ctx.artifact(),
          failed = diagnostics.has_errors(),
          "handler returned"
        );
        self.receiver.extend(diagnostics);
      }
      Err(e) => {
        error!(artifact = self.ctx.artifact(), error = %e, "handler panicked");
        self.receiver.append(
          Diagnostic::error(
            "Handler panicked",
            format!("The handler for {} did not complete: {}", self.ctx.artifact(), e),
          )
          .with_subject(self.artifact.range.clone()),
        );
      }
    }
  }
}

async fn join_all(tasks: &mut JoinSet<()>, receiver: &DiagnosticReceiver) {
  while let Some(joined) = tasks.join_next().await {
    if let Err(e) = joined {
      error!(error = %e, "artifact task failed");
      receiver.append(Diagnostic::error("Internal error", format!("An artifact task did not complete: {}", e)));
    }
  }
}
