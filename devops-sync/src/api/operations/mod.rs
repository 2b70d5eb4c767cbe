//! Typed mutating operations
//!
//! Every change the reconciler makes to a target workspace is built as an
//! `Operation` first and then executed through a `WorkspaceClient`.

pub mod operation;

pub use operation::{Operation, OperationResult};
