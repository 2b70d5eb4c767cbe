//! Differencing and selective reconciliation of project-tracking workspaces
//!
//! Compares work items, area/iteration trees, security group membership
//! and saved queries between a source and a target workspace, then applies
//! an operator-selected subset of the differences to the target.

pub mod api;
pub mod config;
pub mod error;
pub mod sync;

pub use api::{GuardedClient, InMemoryWorkspaceClient, WorkspaceClient, WorkspaceRef};
pub use config::SyncConfig;
pub use error::{ErrorKind, IsolationViolation, RemoteError, SyncError};
pub use sync::{ApplyOutcome, Differences, OperationLog, SyncEngine};
