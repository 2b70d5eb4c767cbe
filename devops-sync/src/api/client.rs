//! Remote workspace client contract
//!
//! The engine only consumes this trait. Authentication, transport and
//! organization routing belong to the implementor; every call names the
//! workspace it targets so a single client may serve both sides of a sync.

use async_trait::async_trait;

use super::models::{
    FetchOptions, FieldPatch, GroupInfo, GroupMember, Record, RecordFields, RecordKind,
    WorkspaceRef,
};
use crate::error::RemoteError;

#[async_trait]
pub trait WorkspaceClient: Send + Sync {
    /// Fetch the full record set of one kind. Hierarchical kinds return
    /// their root nodes with children attached.
    async fn fetch_records(
        &self,
        workspace: &WorkspaceRef,
        kind: RecordKind,
        options: &FetchOptions,
    ) -> Result<Vec<Record>, RemoteError>;

    /// Fetch a single record by its workspace-local id
    async fn fetch_record_detail(
        &self,
        workspace: &WorkspaceRef,
        kind: RecordKind,
        record_id: &str,
    ) -> Result<Record, RemoteError>;

    /// Create a record, returning its new id. `parent_path` locates the
    /// parent for hierarchical kinds (query folder path, classification
    /// path relative to the project root).
    async fn create_record(
        &self,
        workspace: &WorkspaceRef,
        fields: &RecordFields,
        parent_path: Option<&str>,
    ) -> Result<String, RemoteError>;

    async fn update_record(
        &self,
        workspace: &WorkspaceRef,
        record_id: &str,
        patch: &FieldPatch,
    ) -> Result<(), RemoteError>;

    /// Direct members of a group. `Ok(None)` when the group does not exist
    /// or is not visible to the caller.
    async fn fetch_group_members(
        &self,
        workspace: &WorkspaceRef,
        group_name: &str,
    ) -> Result<Option<GroupInfo>, RemoteError>;

    async fn add_group_member(
        &self,
        workspace: &WorkspaceRef,
        group_name: &str,
        member: &GroupMember,
    ) -> Result<(), RemoteError>;
}
