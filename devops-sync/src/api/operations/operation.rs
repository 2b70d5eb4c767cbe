//! Mutating operations issued against a target workspace

use serde::{Deserialize, Serialize};

use crate::api::client::WorkspaceClient;
use crate::api::models::{
    FieldPatch, GroupMember, NodeStructure, QueryFields, QueryPatch, RecordFields, RecordKind,
    WorkItemFields, WorkItemPatch, WorkspaceRef,
};
use crate::error::{ErrorKind, RemoteError};
use crate::sync::log::OperationType;

/// A single mutating call, built before it is executed so the reconciler
/// can log exactly what it attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a work item copied from a source record
    CreateWorkItem {
        fields: WorkItemFields,
    },
    /// Patch an existing target work item
    UpdateWorkItem {
        record_id: String,
        patch: WorkItemPatch,
    },
    /// Create an area or iteration node under `parent_path`
    /// (relative to the project root; `None` for top level)
    CreateClassificationNode {
        structure: NodeStructure,
        name: String,
        parent_path: Option<String>,
    },
    /// Rename an existing node (case-only differences)
    UpdateClassificationNode {
        record_id: String,
        name: String,
    },
    /// Create a query folder under `parent_path` (`None` for a root folder)
    CreateQueryFolder {
        name: String,
        parent_path: Option<String>,
    },
    CreateQuery {
        fields: QueryFields,
        parent_path: Option<String>,
    },
    UpdateQuery {
        record_id: String,
        patch: QueryPatch,
    },
    /// Add a member to a target security group (removals are never issued)
    AddGroupMember {
        group_name: String,
        member: GroupMember,
    },
}

/// Result of executing an Operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    /// The operation that was executed
    pub operation: Operation,
    /// Whether the operation succeeded
    pub success: bool,
    /// Id of the created record, if any
    pub record_id: Option<String>,
    /// Error message if operation failed
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl Operation {
    pub fn create_query_folder(name: impl Into<String>, parent_path: Option<&str>) -> Self {
        Self::CreateQueryFolder {
            name: name.into(),
            parent_path: parent_path.map(str::to_string),
        }
    }

    pub fn create_classification_node(
        structure: NodeStructure,
        name: impl Into<String>,
        parent_path: Option<&str>,
    ) -> Self {
        Self::CreateClassificationNode {
            structure,
            name: name.into(),
            parent_path: parent_path.map(str::to_string),
        }
    }

    pub fn add_group_member(group_name: impl Into<String>, member: GroupMember) -> Self {
        Self::AddGroupMember {
            group_name: group_name.into(),
            member,
        }
    }

    /// Entity type this operation mutates
    pub fn record_kind(&self) -> RecordKind {
        match self {
            Self::CreateWorkItem { .. } | Self::UpdateWorkItem { .. } => RecordKind::WorkItem,
            Self::CreateClassificationNode { .. } | Self::UpdateClassificationNode { .. } => {
                RecordKind::ClassificationNode
            }
            Self::CreateQueryFolder { .. } | Self::CreateQuery { .. } | Self::UpdateQuery { .. } => {
                RecordKind::Query
            }
            Self::AddGroupMember { .. } => RecordKind::SecurityGroup,
        }
    }

    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::CreateWorkItem { .. } => OperationType::CreateWorkItem,
            Self::UpdateWorkItem { .. } => OperationType::UpdateWorkItem,
            Self::CreateClassificationNode { .. } => OperationType::CreateClassificationNode,
            Self::UpdateClassificationNode { .. } => OperationType::UpdateClassificationNode,
            Self::CreateQueryFolder { .. } => OperationType::CreateQueryFolder,
            Self::CreateQuery { .. } => OperationType::CreateQuery,
            Self::UpdateQuery { .. } => OperationType::UpdateQuery,
            Self::AddGroupMember { .. } => OperationType::AddGroupMember,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(
            self,
            Self::CreateWorkItem { .. }
                | Self::CreateClassificationNode { .. }
                | Self::CreateQueryFolder { .. }
                | Self::CreateQuery { .. }
                | Self::AddGroupMember { .. }
        )
    }

    /// Short human-readable description for the operation log
    pub fn describe(&self) -> String {
        match self {
            Self::CreateWorkItem { fields } => {
                format!("Create {} '{}'", fields.work_item_type, fields.title)
            }
            Self::UpdateWorkItem { record_id, patch } => format!(
                "Update work item {} ({})",
                record_id,
                patch.field_names().join(", ")
            ),
            Self::CreateClassificationNode {
                structure,
                name,
                parent_path,
            } => match parent_path {
                Some(parent) => format!("Create {} node '{}\\{}'", structure.label(), parent, name),
                None => format!("Create {} node '{}'", structure.label(), name),
            },
            Self::UpdateClassificationNode { record_id, name } => {
                format!("Rename classification node {} to '{}'", record_id, name)
            }
            Self::CreateQueryFolder { name, parent_path } => match parent_path {
                Some(parent) => format!("Create query folder '{}/{}'", parent, name),
                None => format!("Create query folder '{}'", name),
            },
            Self::CreateQuery {
                fields,
                parent_path,
            } => match parent_path {
                Some(parent) => format!("Create query '{}/{}'", parent, fields.name),
                None => format!("Create query '{}'", fields.name),
            },
            Self::UpdateQuery { record_id, .. } => format!("Update query {}", record_id),
            Self::AddGroupMember { group_name, member } => {
                format!("Add '{}' to group '{}'", member.display_name, group_name)
            }
        }
    }

    /// Execute this operation against `workspace`. Returns the id of the
    /// created record for create operations.
    pub async fn execute(
        &self,
        client: &dyn WorkspaceClient,
        workspace: &WorkspaceRef,
    ) -> Result<Option<String>, RemoteError> {
        match self {
            Self::CreateWorkItem { fields } => client
                .create_record(workspace, &RecordFields::WorkItem(fields.clone()), None)
                .await
                .map(Some),
            Self::UpdateWorkItem { record_id, patch } => client
                .update_record(workspace, record_id, &FieldPatch::WorkItem(patch.clone()))
                .await
                .map(|_| None),
            Self::CreateClassificationNode {
                structure,
                name,
                parent_path,
            } => {
                let fields = RecordFields::ClassificationNode {
                    structure: *structure,
                    name: name.clone(),
                };
                client
                    .create_record(workspace, &fields, parent_path.as_deref())
                    .await
                    .map(Some)
            }
            Self::UpdateClassificationNode { record_id, name } => client
                .update_record(
                    workspace,
                    record_id,
                    &FieldPatch::ClassificationNode { name: name.clone() },
                )
                .await
                .map(|_| None),
            Self::CreateQueryFolder { name, parent_path } => client
                .create_record(
                    workspace,
                    &RecordFields::QueryFolder { name: name.clone() },
                    parent_path.as_deref(),
                )
                .await
                .map(Some),
            Self::CreateQuery {
                fields,
                parent_path,
            } => client
                .create_record(
                    workspace,
                    &RecordFields::Query(fields.clone()),
                    parent_path.as_deref(),
                )
                .await
                .map(Some),
            Self::UpdateQuery { record_id, patch } => client
                .update_record(workspace, record_id, &FieldPatch::Query(patch.clone()))
                .await
                .map(|_| None),
            Self::AddGroupMember { group_name, member } => client
                .add_group_member(workspace, group_name, member)
                .await
                .map(|_| None),
        }
    }

    /// Execute and capture the outcome instead of propagating the error
    pub async fn execute_captured(
        &self,
        client: &dyn WorkspaceClient,
        workspace: &WorkspaceRef,
    ) -> OperationResult {
        match self.execute(client, workspace).await {
            Ok(record_id) => OperationResult::success(self.clone(), record_id),
            Err(e) => OperationResult::error(self.clone(), &e),
        }
    }
}

impl OperationResult {
    /// Create a new successful result
    pub fn success(operation: Operation, record_id: Option<String>) -> Self {
        Self {
            operation,
            success: true,
            record_id,
            error: None,
            error_kind: None,
        }
    }

    /// Create a new error result
    pub fn error(operation: Operation, error: &RemoteError) -> Self {
        Self {
            operation,
            success: false,
            record_id: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_error(&self) -> bool {
        !self.success
    }
}
