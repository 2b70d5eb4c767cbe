mod common;

use std::time::Duration;

use common::{client, engine, engine_with, names, source, target, user, work_item};
use devops_sync::api::models::{GroupMember, NodeStructure, RecordKind};
use devops_sync::sync::logic::RewriteStep;
use devops_sync::sync::{build_summary, ComparatorPhase, DifferenceType};
use devops_sync::{ErrorKind, SyncConfig};

const BUGS_WIQL_A: &str = "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = 'ProjA' AND [System.AreaPath] UNDER 'ProjA\\Web'";
const BUGS_WIQL_B: &str = "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = 'ProjB' AND [System.AreaPath] UNDER 'ProjB\\Web'";

#[tokio::test]
async fn test_equivalent_workspaces_are_synchronized() {
    let client = client();
    let (src, tgt) = (source(), target());

    client.add_work_item(&src, work_item("1", "Bug", "Crash on save", "Active", "ProjA"));
    client.add_work_item(&tgt, work_item("2", "Bug", "Crash on save", "Active", "ProjB"));
    for ws in [&src, &tgt] {
        client.add_classification_path(ws, NodeStructure::Area, "Web\\Frontend");
        client.add_classification_path(ws, NodeStructure::Iteration, "Sprint 1");
        client.add_group(ws, "Readers", vec![user("Alice")]);
    }
    client.add_query(&src, "Shared Queries/Bugs", BUGS_WIQL_A);
    client.add_query(&tgt, "Shared Queries/Bugs", BUGS_WIQL_B);

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;

    assert!(diffs.notes.is_empty(), "{:?}", diffs.notes);
    for kind in RecordKind::ALL {
        let types = diffs.types_of(kind);
        assert!(!types.is_empty(), "no records for {}", kind);
        assert!(
            types.iter().all(|t| *t == DifferenceType::Synchronized),
            "{}: {:?}",
            kind,
            types
        );
    }
    assert!(!build_summary(&diffs).has_changes());
}

#[tokio::test]
async fn test_new_query_carries_retargeted_text() {
    let client = client();
    let (src, tgt) = (source(), target());
    client.add_query(&src, "Shared Queries/Bugs", BUGS_WIQL_A);
    client.add_query_folder(&tgt, "Shared Queries");

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;

    let query = diffs
        .queries
        .iter()
        .find(|d| d.payload.path == "Shared Queries/Bugs")
        .unwrap();
    assert_eq!(query.difference_type, DifferenceType::New);
    assert_eq!(query.payload.rewritten_wiql.as_deref(), Some(BUGS_WIQL_B));
    assert_eq!(
        query.payload.rewrite_steps,
        vec![RewriteStep::ProjectClause, RewriteStep::PathClause]
    );

    let root = diffs
        .queries
        .iter()
        .find(|d| d.payload.path == "Shared Queries")
        .unwrap();
    assert_eq!(root.difference_type, DifferenceType::Synchronized);
}

#[tokio::test]
async fn test_changed_query_text_is_updated() {
    let client = client();
    let (src, tgt) = (source(), target());
    client.add_query(
        &src,
        "Shared Queries/Active",
        "SELECT [System.Id] FROM WorkItems WHERE [System.State] = 'Active'",
    );
    client.add_query(
        &tgt,
        "Shared Queries/Active",
        "SELECT [System.Id] FROM WorkItems WHERE [System.State] = 'New'",
    );

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;
    let query = diffs
        .queries
        .iter()
        .find(|d| d.payload.path == "Shared Queries/Active")
        .unwrap();

    assert_eq!(query.difference_type, DifferenceType::Updated);
    assert_eq!(query.payload.changes, vec!["Query text".to_string()]);
}

#[tokio::test]
async fn test_work_item_field_changes() {
    let client = client();
    let (src, tgt) = (source(), target());

    let mut moved = work_item("1", "User Story", "Login page", "Active", "ProjA");
    moved.area_path = "ProjA\\Web".to_string();
    client.add_work_item(&src, moved);
    client.add_work_item(&tgt, work_item("9", "User Story", "Login page", "New", "ProjB"));
    client.add_work_item(&src, work_item("2", "Bug", "Broken link", "New", "ProjA"));

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;

    let new = diffs.work_items.iter().find(|d| d.source_id == "2").unwrap();
    assert_eq!(new.difference_type, DifferenceType::New);
    assert!(new.target_id.is_none());

    let updated = diffs.work_items.iter().find(|d| d.source_id == "1").unwrap();
    assert_eq!(updated.difference_type, DifferenceType::Updated);
    assert_eq!(updated.target_id.as_deref(), Some("9"));
    let fields: Vec<_> = updated.payload.changes.iter().map(|c| c.field.label()).collect();
    assert_eq!(fields, vec!["State", "Area Path"]);
}

#[tokio::test]
async fn test_group_membership_partition() {
    let client = client();
    let (src, tgt) = (source(), target());
    client.add_group(&src, "Contributors", vec![user("Alice"), user("Bob")]);
    client.add_group(&tgt, "Contributors", vec![user("Bob"), user("Carol")]);

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;

    assert_eq!(diffs.security_groups.len(), 1);
    let group = &diffs.security_groups[0];
    assert_eq!(group.difference_type, DifferenceType::Updated);
    assert_eq!(names(&group.payload.members_to_add), vec!["Alice"]);
    assert_eq!(names(&group.payload.members_to_remove), vec!["Carol"]);
    assert_eq!(names(&group.payload.existing), vec!["Bob"]);

    // Target-only members are flagged for review, never removed
    let summary = build_summary(&diffs);
    assert!(summary
        .manual_review
        .iter()
        .any(|item| item.record_kind == RecordKind::SecurityGroup));
}

#[tokio::test]
async fn test_nested_groups_are_resolved_before_comparing() {
    let client = client();
    let (src, tgt) = (source(), target());
    client.add_group(&src, "Readers", vec![GroupMember::group("Core Team")]);
    client.add_group(&src, "Core Team", vec![user("Dave")]);
    client.add_group(&tgt, "Readers", vec![user("Dave")]);

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;

    let readers = diffs
        .security_groups
        .iter()
        .find(|d| d.payload.group_name == "Readers")
        .unwrap();
    assert_eq!(readers.difference_type, DifferenceType::Synchronized);
}

#[tokio::test]
async fn test_group_absent_from_target_is_missing_with_guidance() {
    let client = client();
    let (src, tgt) = (source(), target());
    client.add_group(&src, "Auditors", vec![user("Erin")]);

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;

    let group = &diffs.security_groups[0];
    assert_eq!(group.difference_type, DifferenceType::Missing);
    assert!(!group.is_actionable());
    let guidance = group.payload.guidance.as_deref().unwrap();
    assert!(guidance.contains("Auditors"));
    assert!(guidance.contains("ProjB"));
}

#[tokio::test]
async fn test_leaked_target_group_is_an_error() {
    let client = client();
    let (src, tgt) = (source(), target());
    client.add_group(&src, "Readers", vec![user("Alice")]);
    client.add_group_with_principal(&tgt, "Readers", "[ProjA]\\Readers", vec![]);

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;

    assert_eq!(diffs.security_groups[0].difference_type, DifferenceType::Error);
    assert!(diffs
        .notes
        .iter()
        .any(|n| n.error_kind == Some(ErrorKind::CrossScopeLeak)));
}

#[tokio::test]
async fn test_permission_denied_degrades_one_kind_only() {
    let client = client();
    let (src, tgt) = (source(), target());
    client.add_work_item(&src, work_item("1", "Bug", "Crash on save", "New", "ProjA"));
    client.add_group(&src, "Readers", vec![user("Alice")]);
    client.deny(&tgt, RecordKind::SecurityGroup);

    let engine = engine(&client);
    let diffs = engine.analyze_differences(&src, &tgt).await;

    assert!(diffs.security_groups.is_empty());
    let note = diffs
        .notes
        .iter()
        .find(|n| n.record_kind == Some(RecordKind::SecurityGroup))
        .unwrap();
    assert_eq!(note.error_kind, Some(ErrorKind::PermissionDenied));
    assert!(note.message.contains("permission"));

    assert_eq!(diffs.types_of(RecordKind::WorkItem), vec![DifferenceType::New]);

    let progress = engine.progress();
    assert_eq!(progress.phase(RecordKind::SecurityGroup), Some(ComparatorPhase::Failed));
    assert_eq!(progress.phase(RecordKind::WorkItem), Some(ComparatorPhase::Complete));
}

#[tokio::test]
async fn test_trashed_records_are_excluded() {
    let client = client();
    let (src, tgt) = (source(), target());
    client.add_query(&src, "Shared Queries/Recycle Bin/Old", "SELECT [System.Id] FROM WorkItems");
    client.add_query(&src, "Shared Queries/Current", "SELECT [System.Id] FROM WorkItems");
    client.add_classification_path(&src, NodeStructure::Area, "Trash\\Legacy");
    client.add_classification_path(&src, NodeStructure::Area, "Web");

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;

    let query_paths: Vec<_> = diffs.queries.iter().map(|d| d.payload.path.as_str()).collect();
    assert_eq!(query_paths, vec!["Shared Queries", "Shared Queries/Current"]);
    let node_paths: Vec<_> = diffs
        .classification_nodes
        .iter()
        .map(|d| d.payload.path.as_str())
        .collect();
    assert_eq!(node_paths, vec!["Web"]);
}

#[tokio::test]
async fn test_analysis_of_same_workspace_is_synchronized() {
    let client = client();
    let src = source();
    client.add_work_item(&src, work_item("1", "Bug", "Crash on save", "New", "ProjA"));
    client.add_group(&src, "Readers", vec![user("Alice")]);
    client.add_query(&src, "Shared Queries/Bugs", BUGS_WIQL_A);

    let diffs = engine(&client).analyze_differences(&src, &src).await;

    for kind in RecordKind::ALL {
        assert!(diffs
            .types_of(kind)
            .iter()
            .all(|t| *t == DifferenceType::Synchronized));
    }
}

#[tokio::test]
async fn test_timeouts_become_notes() {
    let client = client();
    let (src, tgt) = (source(), target());
    client.add_work_item(&src, work_item("1", "Bug", "Crash on save", "New", "ProjA"));
    client.set_latency(Duration::from_millis(200));

    let config = SyncConfig::builder()
        .call_timeout(Duration::from_millis(20))
        .build();
    let diffs = engine_with(&client, config).analyze_differences(&src, &tgt).await;

    assert!(diffs.work_items.is_empty());
    assert_eq!(diffs.notes.len(), 4);
    assert!(diffs
        .notes
        .iter()
        .all(|n| n.error_kind == Some(ErrorKind::RemoteUnavailable)));
}

#[tokio::test]
async fn test_cross_organization_note() {
    let client = client();
    let src = source();
    let remote = devops_sync::WorkspaceRef::new("p9", "ProjB", "https://dev.azure.com/fabrikam");
    client.add_workspace(&remote);

    let diffs = engine(&client).analyze_differences(&src, &remote).await;

    let advisory = diffs
        .notes
        .iter()
        .find(|n| n.record_kind.is_none())
        .unwrap();
    assert!(advisory.error_kind.is_none());
}

#[tokio::test]
async fn test_results_are_ordered_by_key() {
    let client = client();
    let (src, tgt) = (source(), target());
    for (id, title) in [("3", "Zeta"), ("1", "alpha"), ("2", "Beta")] {
        client.add_work_item(&src, work_item(id, "Task", title, "New", "ProjA"));
    }

    let diffs = engine(&client).analyze_differences(&src, &tgt).await;
    let titles: Vec<_> = diffs
        .work_items
        .iter()
        .map(|d| d.payload.source.title.as_str())
        .collect();
    assert_eq!(titles, vec!["alpha", "Beta", "Zeta"]);
}
