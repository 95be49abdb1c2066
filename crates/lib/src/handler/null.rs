//! The `null` artifact type: does nothing, records that it did.
//!
//! Useful to exercise a configuration's dependency graph without building
//! anything. Two optional settings shape its behavior:
//!
//! - `sleep_ms`: wait that long before completing; cancellation is an error
//! - `fail`: report an error instead of a result

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::{Handler, ResultIndex};
use crate::artifact::Artifact;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::execute::{ExecutionContext, Operation};

#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

#[async_trait]
impl Handler for NullHandler {
  async fn handle(&self, ctx: &ExecutionContext, artifact: &Artifact, index: &ResultIndex) -> Diagnostics {
    let name = ctx.artifact();
    let mut diagnostics = Diagnostics::new();

    if let Some(ms) = artifact.remain.get("sleep_ms").and_then(Value::as_u64) {
      tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
        _ = ctx.cancelled() => {
          debug!(artifact = name, "cancelled while sleeping");
          diagnostics.push(
            Diagnostic::error(
              format!("Artifact {} cancelled", name),
              format!("The {} operation was cancelled before it completed.", ctx.operation()),
            )
            .with_subject(artifact.range.clone()),
          );
          return diagnostics;
        }
      }
    }

    if artifact.remain.get("fail").and_then(Value::as_bool).unwrap_or(false) {
      diagnostics.push(
        Diagnostic::error(
          format!("Artifact {} configured to fail", name),
          format!("The {} operation was asked to fail for this artifact.", ctx.operation()),
        )
        .with_subject(artifact.range.clone()),
      );
      return diagnostics;
    }

    let upstream = match ctx.parent() {
      Some(parent) => {
        let result = index.get(parent);
        if result.is_none() {
          diagnostics.push(
            Diagnostic::warning(
              "Missing source result",
              format!("{} is built from {}, which did not record a result.", name, parent),
            )
            .with_subject(artifact.range.clone()),
          );
        }
        result.unwrap_or(Value::Null)
      }
      None => Value::Null,
    };

    let result = match ctx.operation() {
      Operation::Validation => json!({ "expected": name }),
      Operation::Build => json!({ "built": name, "from": upstream }),
    };
    index.insert(name, result);

    diagnostics
  }
}
