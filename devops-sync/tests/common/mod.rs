#![allow(dead_code)]

use std::sync::Arc;

use devops_sync::api::models::{GroupMember, WorkItem};
use devops_sync::{InMemoryWorkspaceClient, SyncConfig, SyncEngine, WorkspaceRef};

pub const HOST: &str = "https://dev.azure.com/contoso";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn source() -> WorkspaceRef {
    WorkspaceRef::new("p1", "ProjA", HOST)
}

pub fn target() -> WorkspaceRef {
    WorkspaceRef::new("p2", "ProjB", HOST)
}

/// Client holding empty `ProjA` and `ProjB` workspaces
pub fn client() -> Arc<InMemoryWorkspaceClient> {
    init_logging();
    let client = Arc::new(InMemoryWorkspaceClient::new());
    client.add_workspace(&source());
    client.add_workspace(&target());
    client
}

pub fn engine(client: &Arc<InMemoryWorkspaceClient>) -> SyncEngine {
    engine_with(client, SyncConfig::disabled())
}

pub fn engine_with(client: &Arc<InMemoryWorkspaceClient>, config: SyncConfig) -> SyncEngine {
    SyncEngine::new(client.clone(), config)
}

pub fn work_item(id: &str, work_item_type: &str, title: &str, state: &str, namespace: &str) -> WorkItem {
    WorkItem {
        id: id.to_string(),
        work_item_type: work_item_type.to_string(),
        title: title.to_string(),
        state: state.to_string(),
        description: None,
        assigned_to: None,
        area_path: namespace.to_string(),
        iteration_path: namespace.to_string(),
        priority: None,
    }
}

pub fn user(name: &str) -> GroupMember {
    let email = format!("{}@contoso.com", name.to_lowercase());
    GroupMember::user(name, Some(&email), None)
}

pub fn names(members: &[GroupMember]) -> Vec<&str> {
    members.iter().map(|m| m.display_name.as_str()).collect()
}
