//! kiln-lib: Core types and logic for Kiln
//!
//! This crate provides the building blocks of a Kiln run:
//! - `Artifact`: a build step, nested under the artifact it is built from
//! - `Diagnostic`: errors and warnings collected across a whole run
//! - `Handler`: the contract implemented by every artifact type
//! - `Core`: runs validation, then build, over a resolved forest

pub mod artifact;
pub mod diagnostics;
pub mod execute;
pub mod handler;
