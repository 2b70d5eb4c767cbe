//! Work item comparison
//!
//! Source and target work items are matched by (title, type). Paths are
//! compared after retargeting the source namespace, so two items that only
//! differ by their project prefix are in sync.

use std::collections::HashMap;

use crate::api::models::{RecordKind, WorkItem, WorkItemFields, WorkItemPatch};
use crate::sync::types::{
    Difference, DifferenceType, FieldChange, RecordKey, WorkItemDiff, WorkItemField,
};

/// Replace a leading `source_namespace` segment of a backslash path
pub fn retarget_path(path: &str, source_namespace: &str, target_namespace: &str) -> String {
    let (head, rest) = match path.find('\\') {
        Some(idx) => (&path[..idx], &path[idx..]),
        None => (path, ""),
    };
    if head.eq_ignore_ascii_case(source_namespace) {
        format!("{}{}", target_namespace, rest)
    } else {
        path.to_string()
    }
}

fn field_value(item: &WorkItem, field: WorkItemField) -> Option<String> {
    match field {
        WorkItemField::State => Some(item.state.clone()),
        WorkItemField::Description => item.description.clone(),
        WorkItemField::AssignedTo => item.assigned_to.clone(),
        WorkItemField::AreaPath => Some(item.area_path.clone()),
        WorkItemField::IterationPath => Some(item.iteration_path.clone()),
        WorkItemField::Priority => item.priority.map(|p| p.to_string()),
    }
}

/// Normalized for comparison: trimmed, empty treated as absent
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn values_equal(field: WorkItemField, a: &Option<String>, b: &Option<String>) -> bool {
    match (field, a, b) {
        (WorkItemField::AreaPath | WorkItemField::IterationPath, Some(a), Some(b)) => {
            a.eq_ignore_ascii_case(b)
        }
        _ => a == b,
    }
}

/// Field-level differences between a source item and its matched target
pub fn field_changes(
    source: &WorkItem,
    target: &WorkItem,
    source_namespace: &str,
    target_namespace: &str,
) -> Vec<FieldChange> {
    WorkItemField::ALL
        .iter()
        .filter_map(|&field| {
            let mut source_value = normalize(field_value(source, field));
            if matches!(field, WorkItemField::AreaPath | WorkItemField::IterationPath) {
                source_value = source_value
                    .map(|p| retarget_path(&p, source_namespace, target_namespace));
            }
            let target_value = normalize(field_value(target, field));

            if values_equal(field, &source_value, &target_value) {
                None
            } else {
                Some(FieldChange {
                    field,
                    source: source_value,
                    target: target_value,
                })
            }
        })
        .collect()
}

/// "State ('New' -> 'Active'), Priority (none -> '2')"
pub fn describe_changes(changes: &[FieldChange]) -> String {
    let show = |v: &Option<String>| match v {
        Some(v) => format!("'{}'", v),
        None => "none".to_string(),
    };
    changes
        .iter()
        .map(|c| format!("{} ({} -> {})", c.field.label(), show(&c.target), show(&c.source)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compare two full work item snapshots
pub fn compare_work_items(
    source_items: &[WorkItem],
    target_items: &[WorkItem],
    source_namespace: &str,
    target_namespace: &str,
) -> Vec<Difference<WorkItemDiff>> {
    // First target wins on duplicate keys
    let mut target_map: HashMap<RecordKey, &WorkItem> = HashMap::new();
    for item in target_items {
        target_map
            .entry(RecordKey::work_item(&item.title, &item.work_item_type))
            .or_insert(item);
    }

    let mut diffs: Vec<_> = source_items
        .iter()
        .map(|source| {
            let key = RecordKey::work_item(&source.title, &source.work_item_type);
            let target = target_map.get(&key).copied();

            let (difference_type, changes, description) = match target {
                None => (
                    DifferenceType::New,
                    Vec::new(),
                    format!("New {} '{}'", source.work_item_type, source.title),
                ),
                Some(target) => {
                    let changes = field_changes(source, target, source_namespace, target_namespace);
                    if changes.is_empty() {
                        (DifferenceType::Synchronized, changes, "In sync".to_string())
                    } else {
                        let description = describe_changes(&changes);
                        (DifferenceType::Updated, changes, description)
                    }
                }
            };

            log::debug!("Work item '{}': {}", source.title, difference_type);

            Difference {
                key,
                source_id: source.id.clone(),
                target_id: target.map(|t| t.id.clone()),
                record_kind: RecordKind::WorkItem,
                difference_type,
                description,
                selected: false,
                payload: WorkItemDiff {
                    source: source.clone(),
                    target: target.cloned(),
                    changes,
                },
            }
        })
        .collect();

    diffs.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.source_id.cmp(&b.source_id)));
    diffs
}

/// Fields for creating `source` in the target: title, description and
/// state, with both paths bound to the target's default (root) path
pub fn create_fields(source: &WorkItem, target_namespace: &str) -> WorkItemFields {
    WorkItemFields {
        work_item_type: source.work_item_type.clone(),
        title: source.title.clone(),
        description: source.description.clone(),
        state: source.state.clone(),
        area_path: target_namespace.to_string(),
        iteration_path: target_namespace.to_string(),
    }
}

/// Minimal patch bringing `target` in line with `source`
pub fn build_patch(
    source: &WorkItem,
    target: &WorkItem,
    source_namespace: &str,
    target_namespace: &str,
) -> WorkItemPatch {
    let mut patch = WorkItemPatch::default();
    for change in field_changes(source, target, source_namespace, target_namespace) {
        // Cleared source values are left alone in the target
        let Some(value) = change.source else {
            continue;
        };
        match change.field {
            WorkItemField::State => patch.state = Some(value),
            WorkItemField::Description => patch.description = Some(value),
            WorkItemField::AssignedTo => patch.assigned_to = Some(value),
            WorkItemField::AreaPath => patch.area_path = Some(value),
            WorkItemField::IterationPath => patch.iteration_path = Some(value),
            WorkItemField::Priority => {}
        }
    }
    patch
}
