//! Remote workspace record models
//!
//! Every entity kind has a closed, typed field set. Creation payloads
//! (`RecordFields`) and patches (`FieldPatch`) are enums over those sets so
//! that field comparison and patch construction stay exhaustive.

use serde::{Deserialize, Serialize};

/// A project scope within a remote organization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceRef {
    /// Remote-assigned project identifier
    pub id: String,
    /// Project name, also the namespace used in paths and WIQL
    pub display_name: String,
    /// Organization endpoint (e.g., "https://dev.azure.com/contoso")
    pub host_endpoint: String,
}

impl WorkspaceRef {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        host_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            host_endpoint: host_endpoint.into(),
        }
    }

    /// Namespace that qualifies paths and WIQL clauses in this workspace
    pub fn namespace(&self) -> &str {
        &self.display_name
    }

    /// Host endpoint normalized for comparison
    pub fn normalized_host(&self) -> String {
        self.host_endpoint.trim().trim_end_matches('/').to_lowercase()
    }
}

impl std::fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.host_endpoint)
    }
}

/// Entity types handled by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    WorkItem,
    ClassificationNode,
    SecurityGroup,
    Query,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::WorkItem,
        RecordKind::ClassificationNode,
        RecordKind::SecurityGroup,
        RecordKind::Query,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::WorkItem => "Work Items",
            Self::ClassificationNode => "Classification Nodes",
            Self::SecurityGroup => "Security Groups",
            Self::Query => "Queries",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which classification tree a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeStructure {
    Area,
    Iteration,
}

impl NodeStructure {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Area => "Area",
            Self::Iteration => "Iteration",
        }
    }
}

/// Work item with the fields the engine compares and copies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    /// e.g., "Bug", "User Story"
    pub work_item_type: String,
    pub title: String,
    pub state: String,
    pub description: Option<String>,
    /// Display name or unique name of the assignee
    pub assigned_to: Option<String>,
    /// Backslash-separated, rooted at the project name (e.g., "ProjA\\Team")
    pub area_path: String,
    pub iteration_path: String,
    pub priority: Option<i32>,
}

/// Area or iteration node; the root node carries the project name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationNode {
    pub id: String,
    pub name: String,
    pub structure: NodeStructure,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ClassificationNode>,
}

/// Saved query or query folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryNode {
    pub id: String,
    pub name: String,
    pub is_folder: bool,
    /// Query text; `None` for folders
    pub wiql: Option<String>,
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<QueryNode>,
}

/// Security group as listed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    /// Fully qualified name, e.g. "[ProjA]\\Contributors"
    pub principal_name: String,
}

/// A member of a security group (user or nested group)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMember {
    pub display_name: String,
    pub email: Option<String>,
    pub principal_name: Option<String>,
    /// Nested groups are resolved transitively during comparison
    #[serde(default)]
    pub is_group: bool,
}

impl GroupMember {
    pub fn user(
        display_name: impl Into<String>,
        email: Option<&str>,
        principal_name: Option<&str>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            email: email.map(str::to_string),
            principal_name: principal_name.map(str::to_string),
            is_group: false,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            display_name: name.into(),
            email: None,
            principal_name: None,
            is_group: true,
        }
    }

    /// Identity match across organizations: email OR principal name,
    /// case-insensitive
    pub fn same_identity(&self, other: &GroupMember) -> bool {
        let eq = |a: &Option<String>, b: &Option<String>| match (a, b) {
            (Some(a), Some(b)) => !a.is_empty() && a.eq_ignore_ascii_case(b),
            _ => false,
        };
        eq(&self.email, &other.email) || eq(&self.principal_name, &other.principal_name)
    }
}

/// Group with its direct members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub group_name: String,
    pub principal_name: String,
    pub members: Vec<GroupMember>,
}

/// A record returned by `fetch_records` / `fetch_record_detail`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    WorkItem(WorkItem),
    /// Root of an area or iteration tree
    ClassificationNode(ClassificationNode),
    SecurityGroup(GroupSummary),
    /// Root folder of the query hierarchy (e.g., "Shared Queries")
    Query(QueryNode),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::WorkItem(_) => RecordKind::WorkItem,
            Self::ClassificationNode(_) => RecordKind::ClassificationNode,
            Self::SecurityGroup(_) => RecordKind::SecurityGroup,
            Self::Query(_) => RecordKind::Query,
        }
    }
}

/// Options for a full-snapshot fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Maximum tree depth for hierarchical kinds
    pub depth: Option<u32>,
}

impl FetchOptions {
    pub fn with_depth(depth: u32) -> Self {
        Self { depth: Some(depth) }
    }
}

/// Fields used to create a work item in the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemFields {
    pub work_item_type: String,
    pub title: String,
    pub description: Option<String>,
    pub state: String,
    pub area_path: String,
    pub iteration_path: String,
}

/// Fields used to create a saved query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFields {
    pub name: String,
    pub wiql: String,
    pub is_public: bool,
}

/// Creation payload for `create_record`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordFields {
    WorkItem(WorkItemFields),
    ClassificationNode { structure: NodeStructure, name: String },
    QueryFolder { name: String },
    Query(QueryFields),
}

impl RecordFields {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::WorkItem(_) => RecordKind::WorkItem,
            Self::ClassificationNode { .. } => RecordKind::ClassificationNode,
            Self::QueryFolder { .. } | Self::Query(_) => RecordKind::Query,
        }
    }
}

/// Minimal work item patch; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemPatch {
    pub state: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub area_path: Option<String>,
    pub iteration_path: Option<String>,
}

impl WorkItemPatch {
    pub fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.description.is_none()
            && self.assigned_to.is_none()
            && self.area_path.is_none()
            && self.iteration_path.is_none()
    }

    /// Names of the fields this patch touches
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.state.is_some() {
            names.push("State");
        }
        if self.description.is_some() {
            names.push("Description");
        }
        if self.assigned_to.is_some() {
            names.push("Assigned To");
        }
        if self.area_path.is_some() {
            names.push("Area Path");
        }
        if self.iteration_path.is_some() {
            names.push("Iteration Path");
        }
        names
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPatch {
    pub wiql: Option<String>,
    pub is_public: Option<bool>,
}

/// Patch payload for `update_record`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPatch {
    WorkItem(WorkItemPatch),
    ClassificationNode { name: String },
    Query(QueryPatch),
}
