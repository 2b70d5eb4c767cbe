//! Remote workspace API surface
//!
//! Defines the client contract the engine consumes, the typed record
//! models it exchanges, the mutating operations it issues, and a
//! resilience layer applied to every call.

pub mod client;
pub mod memory;
pub mod models;
pub mod operations;
pub mod resilience;

pub use client::WorkspaceClient;
pub use memory::InMemoryWorkspaceClient;
pub use models::{
    ClassificationNode, FetchOptions, FieldPatch, GroupInfo, GroupMember, GroupSummary,
    NodeStructure, QueryFields, QueryNode, QueryPatch, Record, RecordFields, RecordKind, WorkItem,
    WorkItemFields, WorkItemPatch, WorkspaceRef,
};
pub use operations::{Operation, OperationResult};
pub use resilience::{ConcurrencyLimiter, ConcurrencyStats, GuardedClient};
