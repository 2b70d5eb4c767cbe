//! In-memory `WorkspaceClient`
//!
//! Holds any number of workspaces keyed by id. Hierarchies are stored flat
//! with their full path and assembled into trees on fetch, the way the
//! remote service returns them. Supports injected permission failures,
//! create failures and latency, and records every mutating call.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::client::WorkspaceClient;
use super::models::{
    ClassificationNode, FetchOptions, FieldPatch, GroupInfo, GroupMember, GroupSummary,
    NodeStructure, QueryNode, Record, RecordFields, RecordKind, WorkItem, WorkspaceRef,
};
use crate::error::RemoteError;

#[derive(Debug, Clone)]
struct StoredNode {
    id: String,
    structure: NodeStructure,
    /// Relative to the project root, backslash-separated
    path: String,
}

#[derive(Debug, Clone)]
struct StoredQuery {
    id: String,
    /// Slash-separated, including the root folder
    path: String,
    is_folder: bool,
    wiql: Option<String>,
    is_public: bool,
}

#[derive(Debug, Clone)]
struct StoredGroup {
    id: String,
    info: GroupInfo,
}

#[derive(Debug, Default)]
struct WorkspaceState {
    display_name: String,
    work_items: Vec<WorkItem>,
    nodes: Vec<StoredNode>,
    queries: Vec<StoredQuery>,
    groups: Vec<StoredGroup>,
    denied: HashSet<RecordKind>,
}

/// A mutating call observed by the in-memory client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub workspace_id: String,
    pub kind: RecordKind,
    pub summary: String,
}

#[derive(Debug, Default)]
struct State {
    workspaces: HashMap<String, WorkspaceState>,
    next_id: u64,
    failing_names: HashSet<String>,
    slow_names: HashMap<String, Duration>,
    latency: Option<Duration>,
    mutations: Vec<MutationRecord>,
}

impl State {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{}", 1000 + self.next_id)
    }

    fn workspace(&self, workspace: &WorkspaceRef) -> Result<&WorkspaceState, RemoteError> {
        self.workspaces
            .get(&workspace.id)
            .ok_or_else(|| RemoteError::NotFound(format!("workspace '{}'", workspace.display_name)))
    }

    fn workspace_mut(&mut self, workspace: &WorkspaceRef) -> Result<&mut WorkspaceState, RemoteError> {
        self.workspaces
            .get_mut(&workspace.id)
            .ok_or_else(|| RemoteError::NotFound(format!("workspace '{}'", workspace.display_name)))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWorkspaceClient {
    state: Mutex<State>,
}

fn segments(path: &str, sep: char) -> Vec<&str> {
    path.split(sep).filter(|s| !s.is_empty()).collect()
}

fn parent_of(path: &str, sep: char) -> Option<&str> {
    path.rfind(sep).map(|idx| &path[..idx])
}

fn last_segment(path: &str, sep: char) -> &str {
    path.rsplit(sep).next().unwrap_or(path)
}

fn join(parent: Option<&str>, name: &str, sep: char) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{}{}{}", parent, sep, name),
        _ => name.to_string(),
    }
}

impl InMemoryWorkspaceClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_workspace(&self, workspace: &WorkspaceRef) {
        self.lock().workspaces.insert(
            workspace.id.clone(),
            WorkspaceState {
                display_name: workspace.display_name.clone(),
                ..Default::default()
            },
        );
    }

    pub fn add_work_item(&self, workspace: &WorkspaceRef, item: WorkItem) {
        if let Some(ws) = self.lock().workspaces.get_mut(&workspace.id) {
            ws.work_items.push(item);
        }
    }

    /// Add a classification path (relative, backslash-separated), creating
    /// missing ancestors
    pub fn add_classification_path(&self, workspace: &WorkspaceRef, structure: NodeStructure, path: &str) {
        let mut state = self.lock();
        let mut prefix = String::new();
        for segment in segments(path, '\\') {
            prefix = join(Some(&prefix), segment, '\\');
            let id = state.next_id();
            let Some(ws) = state.workspaces.get_mut(&workspace.id) else {
                return;
            };
            let exists = ws
                .nodes
                .iter()
                .any(|n| n.structure == structure && n.path.eq_ignore_ascii_case(&prefix));
            if !exists {
                ws.nodes.push(StoredNode {
                    id,
                    structure,
                    path: prefix.clone(),
                });
            }
        }
    }

    /// Add a query folder path, creating missing ancestors
    pub fn add_query_folder(&self, workspace: &WorkspaceRef, path: &str) {
        let mut state = self.lock();
        let mut prefix = String::new();
        for segment in segments(path, '/') {
            prefix = join(Some(&prefix), segment, '/');
            let id = state.next_id();
            let Some(ws) = state.workspaces.get_mut(&workspace.id) else {
                return;
            };
            if !ws.queries.iter().any(|q| q.path.eq_ignore_ascii_case(&prefix)) {
                ws.queries.push(StoredQuery {
                    id,
                    path: prefix.clone(),
                    is_folder: true,
                    wiql: None,
                    is_public: true,
                });
            }
        }
    }

    /// Add a saved query at `path`, creating its parent folders
    pub fn add_query(&self, workspace: &WorkspaceRef, path: &str, wiql: &str) {
        if let Some(parent) = parent_of(path, '/') {
            self.add_query_folder(workspace, parent);
        }
        let mut state = self.lock();
        let id = state.next_id();
        if let Some(ws) = state.workspaces.get_mut(&workspace.id) {
            ws.queries.push(StoredQuery {
                id,
                path: path.to_string(),
                is_folder: false,
                wiql: Some(wiql.to_string()),
                is_public: true,
            });
        }
    }

    /// Add a group; the principal name is qualified with the workspace name
    pub fn add_group(&self, workspace: &WorkspaceRef, name: &str, members: Vec<GroupMember>) {
        let principal = format!("[{}]\\{}", workspace.display_name, name);
        self.add_group_with_principal(workspace, name, &principal, members);
    }

    pub fn add_group_with_principal(
        &self,
        workspace: &WorkspaceRef,
        name: &str,
        principal_name: &str,
        members: Vec<GroupMember>,
    ) {
        let mut state = self.lock();
        let id = state.next_id();
        if let Some(ws) = state.workspaces.get_mut(&workspace.id) {
            ws.groups.push(StoredGroup {
                id,
                info: GroupInfo {
                    group_name: name.to_string(),
                    principal_name: principal_name.to_string(),
                    members,
                },
            });
        }
    }

    /// Make `fetch_records` for `kind` fail with `PermissionDenied`
    pub fn deny(&self, workspace: &WorkspaceRef, kind: RecordKind) {
        if let Some(ws) = self.lock().workspaces.get_mut(&workspace.id) {
            ws.denied.insert(kind);
        }
    }

    /// Make creation of any record with this title/name fail
    pub fn fail_creates_named(&self, name: &str) {
        self.lock().failing_names.insert(name.to_string());
    }

    /// Delay creation of any record with this title/name by `delay`
    pub fn delay_creates_named(&self, name: &str, delay: Duration) {
        self.lock().slow_names.insert(name.to_string(), delay);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    pub fn mutations(&self) -> Vec<MutationRecord> {
        self.lock().mutations.clone()
    }

    pub fn work_items(&self, workspace: &WorkspaceRef) -> Vec<WorkItem> {
        self.lock()
            .workspaces
            .get(&workspace.id)
            .map(|ws| ws.work_items.clone())
            .unwrap_or_default()
    }

    /// All query and folder paths, in creation order
    pub fn query_paths(&self, workspace: &WorkspaceRef) -> Vec<String> {
        self.lock()
            .workspaces
            .get(&workspace.id)
            .map(|ws| ws.queries.iter().map(|q| q.path.clone()).collect())
            .unwrap_or_default()
    }

    pub fn query_wiql(&self, workspace: &WorkspaceRef, path: &str) -> Option<String> {
        self.lock().workspaces.get(&workspace.id).and_then(|ws| {
            ws.queries
                .iter()
                .find(|q| q.path.eq_ignore_ascii_case(path))
                .and_then(|q| q.wiql.clone())
        })
    }

    pub fn query_is_public(&self, workspace: &WorkspaceRef, path: &str) -> Option<bool> {
        self.lock().workspaces.get(&workspace.id).and_then(|ws| {
            ws.queries
                .iter()
                .find(|q| q.path.eq_ignore_ascii_case(path))
                .map(|q| q.is_public)
        })
    }

    /// Make the query or folder at `path` public or private
    pub fn set_query_visibility(&self, workspace: &WorkspaceRef, path: &str, is_public: bool) {
        if let Some(ws) = self.lock().workspaces.get_mut(&workspace.id) {
            if let Some(query) = ws.queries.iter_mut().find(|q| q.path.eq_ignore_ascii_case(path)) {
                query.is_public = is_public;
            }
        }
    }

    pub fn classification_paths(&self, workspace: &WorkspaceRef, structure: NodeStructure) -> Vec<String> {
        self.lock()
            .workspaces
            .get(&workspace.id)
            .map(|ws| {
                ws.nodes
                    .iter()
                    .filter(|n| n.structure == structure)
                    .map(|n| n.path.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn group(&self, workspace: &WorkspaceRef, name: &str) -> Option<GroupInfo> {
        self.lock().workspaces.get(&workspace.id).and_then(|ws| {
            ws.groups
                .iter()
                .find(|g| g.info.group_name.eq_ignore_ascii_case(name))
                .map(|g| g.info.clone())
        })
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn build_classification_tree(
    ws: &WorkspaceState,
    structure: NodeStructure,
    max_depth: Option<u32>,
) -> ClassificationNode {
    fn children_of(
        nodes: &[&StoredNode],
        parent: Option<&str>,
        depth: u32,
        max_depth: Option<u32>,
    ) -> Vec<ClassificationNode> {
        if max_depth.is_some_and(|max| depth > max) {
            return Vec::new();
        }
        nodes
            .iter()
            .filter(|n| parent_of(&n.path, '\\') == parent)
            .map(|n| ClassificationNode {
                id: n.id.clone(),
                name: last_segment(&n.path, '\\').to_string(),
                structure: n.structure,
                children: children_of(nodes, Some(&n.path), depth + 1, max_depth),
            })
            .collect()
    }

    let nodes: Vec<&StoredNode> = ws.nodes.iter().filter(|n| n.structure == structure).collect();
    ClassificationNode {
        id: format!("{}-root", structure.label().to_lowercase()),
        name: ws.display_name.clone(),
        structure,
        children: children_of(&nodes, None, 1, max_depth),
    }
}

fn build_query_tree(ws: &WorkspaceState, max_depth: Option<u32>) -> Vec<QueryNode> {
    fn children_of(
        queries: &[StoredQuery],
        parent: Option<&str>,
        depth: u32,
        max_depth: Option<u32>,
    ) -> Vec<QueryNode> {
        if max_depth.is_some_and(|max| depth > max) {
            return Vec::new();
        }
        queries
            .iter()
            .filter(|q| parent_of(&q.path, '/') == parent)
            .map(|q| QueryNode {
                id: q.id.clone(),
                name: last_segment(&q.path, '/').to_string(),
                is_folder: q.is_folder,
                wiql: q.wiql.clone(),
                is_public: q.is_public,
                children: if q.is_folder {
                    children_of(queries, Some(&q.path), depth + 1, max_depth)
                } else {
                    Vec::new()
                },
            })
            .collect()
    }

    children_of(&ws.queries, None, 1, max_depth)
}

#[async_trait]
impl WorkspaceClient for InMemoryWorkspaceClient {
    async fn fetch_records(
        &self,
        workspace: &WorkspaceRef,
        kind: RecordKind,
        options: &FetchOptions,
    ) -> Result<Vec<Record>, RemoteError> {
        self.simulate_latency().await;
        let state = self.lock();
        let ws = state.workspace(workspace)?;
        if ws.denied.contains(&kind) {
            return Err(RemoteError::PermissionDenied(format!(
                "{} of '{}'",
                kind, workspace.display_name
            )));
        }

        let records = match kind {
            RecordKind::WorkItem => ws.work_items.iter().cloned().map(Record::WorkItem).collect(),
            RecordKind::ClassificationNode => [NodeStructure::Area, NodeStructure::Iteration]
                .into_iter()
                .map(|s| Record::ClassificationNode(build_classification_tree(ws, s, options.depth)))
                .collect(),
            RecordKind::SecurityGroup => ws
                .groups
                .iter()
                .map(|g| {
                    Record::SecurityGroup(GroupSummary {
                        id: g.id.clone(),
                        name: g.info.group_name.clone(),
                        principal_name: g.info.principal_name.clone(),
                    })
                })
                .collect(),
            RecordKind::Query => build_query_tree(ws, options.depth)
                .into_iter()
                .map(Record::Query)
                .collect(),
        };
        Ok(records)
    }

    async fn fetch_record_detail(
        &self,
        workspace: &WorkspaceRef,
        kind: RecordKind,
        record_id: &str,
    ) -> Result<Record, RemoteError> {
        self.simulate_latency().await;
        let state = self.lock();
        let ws = state.workspace(workspace)?;
        let not_found = || RemoteError::NotFound(format!("{} record {}", kind, record_id));

        match kind {
            RecordKind::WorkItem => ws
                .work_items
                .iter()
                .find(|w| w.id == record_id)
                .cloned()
                .map(Record::WorkItem)
                .ok_or_else(not_found),
            RecordKind::Query => ws
                .queries
                .iter()
                .find(|q| q.id == record_id)
                .map(|q| {
                    Record::Query(QueryNode {
                        id: q.id.clone(),
                        name: last_segment(&q.path, '/').to_string(),
                        is_folder: q.is_folder,
                        wiql: q.wiql.clone(),
                        is_public: q.is_public,
                        children: Vec::new(),
                    })
                })
                .ok_or_else(not_found),
            RecordKind::ClassificationNode | RecordKind::SecurityGroup => Err(not_found()),
        }
    }

    async fn create_record(
        &self,
        workspace: &WorkspaceRef,
        fields: &RecordFields,
        parent_path: Option<&str>,
    ) -> Result<String, RemoteError> {
        self.simulate_latency().await;
        let name = match fields {
            RecordFields::WorkItem(f) => f.title.clone(),
            RecordFields::ClassificationNode { name, .. } => name.clone(),
            RecordFields::QueryFolder { name } => name.clone(),
            RecordFields::Query(f) => f.name.clone(),
        };
        let delay = self.lock().slow_names.get(&name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.failing_names.contains(&name) {
            return Err(RemoteError::Unavailable(format!("injected failure creating '{}'", name)));
        }

        let id = state.next_id();
        let ws = state.workspace_mut(workspace)?;
        let summary = match fields {
            RecordFields::WorkItem(f) => {
                ws.work_items.push(WorkItem {
                    id: id.clone(),
                    work_item_type: f.work_item_type.clone(),
                    title: f.title.clone(),
                    state: f.state.clone(),
                    description: f.description.clone(),
                    assigned_to: None,
                    area_path: f.area_path.clone(),
                    iteration_path: f.iteration_path.clone(),
                    priority: None,
                });
                format!("create work item '{}'", f.title)
            }
            RecordFields::ClassificationNode { structure, name } => {
                if let Some(parent) = parent_path {
                    let parent_exists = ws
                        .nodes
                        .iter()
                        .any(|n| n.structure == *structure && n.path.eq_ignore_ascii_case(parent));
                    if !parent_exists {
                        return Err(RemoteError::NotFound(format!("parent node '{}'", parent)));
                    }
                }
                let path = join(parent_path, name, '\\');
                if ws
                    .nodes
                    .iter()
                    .any(|n| n.structure == *structure && n.path.eq_ignore_ascii_case(&path))
                {
                    return Err(RemoteError::Unavailable(format!("node '{}' already exists", path)));
                }
                ws.nodes.push(StoredNode {
                    id: id.clone(),
                    structure: *structure,
                    path: path.clone(),
                });
                format!("create {} node '{}'", structure.label(), path)
            }
            RecordFields::QueryFolder { .. } | RecordFields::Query(_) => {
                if let Some(parent) = parent_path {
                    let parent_exists = ws
                        .queries
                        .iter()
                        .any(|q| q.is_folder && q.path.eq_ignore_ascii_case(parent));
                    if !parent_exists {
                        return Err(RemoteError::NotFound(format!("parent folder '{}'", parent)));
                    }
                }
                let path = join(parent_path, &name, '/');
                if ws.queries.iter().any(|q| q.path.eq_ignore_ascii_case(&path)) {
                    return Err(RemoteError::Unavailable(format!("'{}' already exists", path)));
                }
                let (is_folder, wiql, is_public) = match fields {
                    RecordFields::Query(f) => (false, Some(f.wiql.clone()), f.is_public),
                    _ => (true, None, true),
                };
                ws.queries.push(StoredQuery {
                    id: id.clone(),
                    path: path.clone(),
                    is_folder,
                    wiql,
                    is_public,
                });
                if is_folder {
                    format!("create folder '{}'", path)
                } else {
                    format!("create query '{}'", path)
                }
            }
        };

        state.mutations.push(MutationRecord {
            workspace_id: workspace.id.clone(),
            kind: fields.kind(),
            summary,
        });
        Ok(id)
    }

    async fn update_record(
        &self,
        workspace: &WorkspaceRef,
        record_id: &str,
        patch: &FieldPatch,
    ) -> Result<(), RemoteError> {
        self.simulate_latency().await;
        let mut state = self.lock();
        let ws = state.workspace_mut(workspace)?;
        let not_found = || RemoteError::NotFound(format!("record {}", record_id));

        let kind = match patch {
            FieldPatch::WorkItem(p) => {
                let item = ws
                    .work_items
                    .iter_mut()
                    .find(|w| w.id == record_id)
                    .ok_or_else(not_found)?;
                if let Some(v) = &p.state {
                    item.state = v.clone();
                }
                if let Some(v) = &p.description {
                    item.description = Some(v.clone());
                }
                if let Some(v) = &p.assigned_to {
                    item.assigned_to = Some(v.clone());
                }
                if let Some(v) = &p.area_path {
                    item.area_path = v.clone();
                }
                if let Some(v) = &p.iteration_path {
                    item.iteration_path = v.clone();
                }
                RecordKind::WorkItem
            }
            FieldPatch::ClassificationNode { name } => {
                let node = ws
                    .nodes
                    .iter_mut()
                    .find(|n| n.id == record_id)
                    .ok_or_else(not_found)?;
                node.path = join(parent_of(&node.path, '\\'), name, '\\');
                RecordKind::ClassificationNode
            }
            FieldPatch::Query(p) => {
                let query = ws
                    .queries
                    .iter_mut()
                    .find(|q| q.id == record_id)
                    .ok_or_else(not_found)?;
                if let Some(wiql) = &p.wiql {
                    query.wiql = Some(wiql.clone());
                }
                if let Some(is_public) = p.is_public {
                    query.is_public = is_public;
                }
                RecordKind::Query
            }
        };

        state.mutations.push(MutationRecord {
            workspace_id: workspace.id.clone(),
            kind,
            summary: format!("update record {}", record_id),
        });
        Ok(())
    }

    async fn fetch_group_members(
        &self,
        workspace: &WorkspaceRef,
        group_name: &str,
    ) -> Result<Option<GroupInfo>, RemoteError> {
        self.simulate_latency().await;
        let state = self.lock();
        let ws = state.workspace(workspace)?;
        if ws.denied.contains(&RecordKind::SecurityGroup) {
            return Ok(None);
        }
        Ok(ws
            .groups
            .iter()
            .find(|g| g.info.group_name.eq_ignore_ascii_case(group_name))
            .map(|g| g.info.clone()))
    }

    async fn add_group_member(
        &self,
        workspace: &WorkspaceRef,
        group_name: &str,
        member: &GroupMember,
    ) -> Result<(), RemoteError> {
        self.simulate_latency().await;
        let mut state = self.lock();
        if state.failing_names.contains(&member.display_name) {
            return Err(RemoteError::Unavailable(format!(
                "injected failure adding '{}'",
                member.display_name
            )));
        }
        let ws = state.workspace_mut(workspace)?;
        let group = ws
            .groups
            .iter_mut()
            .find(|g| g.info.group_name.eq_ignore_ascii_case(group_name))
            .ok_or_else(|| RemoteError::NotFound(format!("group '{}'", group_name)))?;
        if !group.info.members.iter().any(|m| m.same_identity(member)) {
            group.info.members.push(member.clone());
        }

        state.mutations.push(MutationRecord {
            workspace_id: workspace.id.clone(),
            kind: RecordKind::SecurityGroup,
            summary: format!("add '{}' to '{}'", member.display_name, group_name),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::WorkItemFields;

    fn workspace() -> WorkspaceRef {
        WorkspaceRef::new("p1", "ProjA", "https://dev.azure.com/contoso")
    }

    #[tokio::test]
    async fn test_query_tree_is_assembled_from_paths() {
        let client = InMemoryWorkspaceClient::new();
        let ws = workspace();
        client.add_workspace(&ws);
        client.add_query(&ws, "Shared Queries/Team/Active Bugs", "SELECT [System.Id] FROM WorkItems");

        let records = client
            .fetch_records(&ws, RecordKind::Query, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        let Record::Query(root) = &records[0] else {
            panic!("expected query root");
        };
        assert_eq!(root.name, "Shared Queries");
        assert_eq!(root.children[0].name, "Team");
        assert_eq!(root.children[0].children[0].name, "Active Bugs");
        assert!(!root.children[0].children[0].is_folder);
    }

    #[tokio::test]
    async fn test_create_folder_requires_existing_parent() {
        let client = InMemoryWorkspaceClient::new();
        let ws = workspace();
        client.add_workspace(&ws);

        let err = client
            .create_record(
                &ws,
                &RecordFields::QueryFolder { name: "Sprint1".into() },
                Some("Shared Queries/Team"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
        assert!(client.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_denied_kind_and_hidden_groups() {
        let client = InMemoryWorkspaceClient::new();
        let ws = workspace();
        client.add_workspace(&ws);
        client.add_group(&ws, "Readers", vec![]);
        client.deny(&ws, RecordKind::SecurityGroup);

        let err = client
            .fetch_records(&ws, RecordKind::SecurityGroup, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::PermissionDenied(_)));
        assert_eq!(client.fetch_group_members(&ws, "Readers").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_work_item_records_mutation() {
        let client = InMemoryWorkspaceClient::new();
        let ws = workspace();
        client.add_workspace(&ws);

        let fields = RecordFields::WorkItem(WorkItemFields {
            work_item_type: "Bug".into(),
            title: "Crash".into(),
            description: None,
            state: "New".into(),
            area_path: "ProjA".into(),
            iteration_path: "ProjA".into(),
        });
        let id = client.create_record(&ws, &fields, None).await.unwrap();

        assert_eq!(client.work_items(&ws)[0].id, id);
        assert_eq!(client.mutations().len(), 1);
        assert_eq!(client.mutations()[0].kind, RecordKind::WorkItem);
    }

    #[tokio::test]
    async fn test_classification_depth_limit() {
        let client = InMemoryWorkspaceClient::new();
        let ws = workspace();
        client.add_workspace(&ws);
        client.add_classification_path(&ws, NodeStructure::Area, "Web\\Frontend\\Forms");

        let records = client
            .fetch_records(&ws, RecordKind::ClassificationNode, &FetchOptions::with_depth(2))
            .await
            .unwrap();
        let Record::ClassificationNode(area) = &records[0] else {
            panic!("expected area root");
        };
        assert_eq!(area.name, "ProjA");
        assert_eq!(area.children[0].name, "Web");
        assert_eq!(area.children[0].children[0].name, "Frontend");
        assert!(area.children[0].children[0].children.is_empty());
    }
}
