//! Core data types for workspace differencing and reconciliation
//!
//! A `Differences` snapshot is produced by one analysis run and is the
//! only input of one reconciliation pass. The caller flips `selected` on
//! the records it wants applied; nothing else in the snapshot changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::log::OperationLog;
use super::logic::wiql::RewriteStep;
use crate::api::models::{GroupMember, NodeStructure, RecordKind, WorkItem, WorkspaceRef};
use crate::error::{ErrorKind, IsolationViolation};

/// Classification of a source record against the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifferenceType {
    /// No target record with the same key
    New,
    /// Matched, at least one compared field differs
    Updated,
    Synchronized,
    /// The counterpart is absent from the target and cannot be created here
    Missing,
    /// The record could not be compared; the description carries guidance
    Error,
}

impl DifferenceType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Updated => "Updated",
            Self::Synchronized => "Synchronized",
            Self::Missing => "Missing",
            Self::Error => "Error",
        }
    }

    /// Only these are ever acted on by the reconciler
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::New | Self::Updated)
    }
}

impl std::fmt::Display for DifferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Natural key used to match records across workspaces.
/// Always lowercase; remote ids never take part in matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(String);

impl RecordKey {
    /// (title, type) for work items
    pub fn work_item(title: &str, work_item_type: &str) -> Self {
        Self(format!("{}|{}", title.trim(), work_item_type.trim()).to_lowercase())
    }

    /// Classification node path, qualified by its structure
    pub fn classification(structure: NodeStructure, path: &str) -> Self {
        Self(format!("{}\\{}", structure.label(), path).to_lowercase())
    }

    /// Full query or folder path
    pub fn query(path: &str) -> Self {
        Self(path.to_lowercase())
    }

    pub fn group(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One source record classified against the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference<T> {
    pub key: RecordKey,
    pub source_id: String,
    pub target_id: Option<String>,
    pub record_kind: RecordKind,
    pub difference_type: DifferenceType,
    /// Human-readable summary (change list, guidance)
    pub description: String,
    /// Set by the caller only; comparators always leave it false
    pub selected: bool,
    pub payload: T,
}

impl<T> Difference<T> {
    pub fn is_actionable(&self) -> bool {
        self.difference_type.is_actionable()
    }

    /// Selected and of a type the reconciler acts on
    pub fn is_pending(&self) -> bool {
        self.selected && self.is_actionable()
    }
}

/// Work item field compared across workspaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkItemField {
    State,
    Description,
    AssignedTo,
    AreaPath,
    IterationPath,
    /// Compared and reported, never patched
    Priority,
}

impl WorkItemField {
    pub const ALL: [WorkItemField; 6] = [
        WorkItemField::State,
        WorkItemField::Description,
        WorkItemField::AssignedTo,
        WorkItemField::AreaPath,
        WorkItemField::IterationPath,
        WorkItemField::Priority,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::State => "State",
            Self::Description => "Description",
            Self::AssignedTo => "Assigned To",
            Self::AreaPath => "Area Path",
            Self::IterationPath => "Iteration Path",
            Self::Priority => "Priority",
        }
    }

    pub fn is_patchable(&self) -> bool {
        !matches!(self, Self::Priority)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: WorkItemField,
    /// Source value, with paths already retargeted to the target namespace
    pub source: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemDiff {
    pub source: WorkItem,
    pub target: Option<WorkItem>,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationDiff {
    pub structure: NodeStructure,
    /// Relative to the project root, backslash-separated
    pub path: String,
    pub name: String,
    pub parent_path: Option<String>,
    /// Name of the matched target node, when there is one
    pub target_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDiff {
    /// Full slash-separated path including the root folder
    pub path: String,
    pub name: String,
    pub parent_path: Option<String>,
    pub is_folder: bool,
    /// Query text as stored in the source
    pub source_wiql: Option<String>,
    /// Source text after retargeting to the target namespace
    pub rewritten_wiql: Option<String>,
    pub rewrite_steps: Vec<RewriteStep>,
    pub target_wiql: Option<String>,
    pub is_public: bool,
    pub target_is_public: Option<bool>,
    pub changes: Vec<String>,
}

/// Membership diff of one security group, users only (nested groups are
/// resolved before partitioning)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembershipDiff {
    pub group_name: String,
    /// In source, absent from target; the only members ever applied
    pub members_to_add: Vec<GroupMember>,
    /// In target, absent from source; informational, never removed
    pub members_to_remove: Vec<GroupMember>,
    pub existing: Vec<GroupMember>,
    /// Set when the group could not be compared
    pub guidance: Option<String>,
}

/// Something an analysis run could not do, or wants the operator to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisNote {
    pub record_kind: Option<RecordKind>,
    pub error_kind: Option<ErrorKind>,
    pub message: String,
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Differences {
    pub snapshot_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source: WorkspaceRef,
    pub target: WorkspaceRef,
    pub work_items: Vec<Difference<WorkItemDiff>>,
    pub classification_nodes: Vec<Difference<ClassificationDiff>>,
    pub security_groups: Vec<Difference<GroupMembershipDiff>>,
    pub queries: Vec<Difference<QueryDiff>>,
    pub notes: Vec<AnalysisNote>,
}

fn set_selected<T>(diffs: &mut [Difference<T>], source_id: &str, selected: bool) -> bool {
    let mut found = false;
    for diff in diffs.iter_mut().filter(|d| d.source_id == source_id) {
        diff.selected = selected;
        found = true;
    }
    found
}

fn select_actionable<T>(diffs: &mut [Difference<T>]) -> usize {
    let mut count = 0;
    for diff in diffs.iter_mut().filter(|d| d.is_actionable()) {
        diff.selected = true;
        count += 1;
    }
    count
}

fn clear<T>(diffs: &mut [Difference<T>]) {
    diffs.iter_mut().for_each(|d| d.selected = false);
}

impl Differences {
    pub fn new(source: WorkspaceRef, target: WorkspaceRef) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            created_at: Utc::now(),
            source,
            target,
            work_items: Vec::new(),
            classification_nodes: Vec::new(),
            security_groups: Vec::new(),
            queries: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Mark the record of `kind` with `source_id` as selected.
    /// Returns false if no such record exists.
    pub fn select(&mut self, kind: RecordKind, source_id: &str) -> bool {
        self.set_selected(kind, source_id, true)
    }

    pub fn deselect(&mut self, kind: RecordKind, source_id: &str) -> bool {
        self.set_selected(kind, source_id, false)
    }

    fn set_selected(&mut self, kind: RecordKind, source_id: &str, selected: bool) -> bool {
        match kind {
            RecordKind::WorkItem => set_selected(&mut self.work_items, source_id, selected),
            RecordKind::ClassificationNode => {
                set_selected(&mut self.classification_nodes, source_id, selected)
            }
            RecordKind::SecurityGroup => set_selected(&mut self.security_groups, source_id, selected),
            RecordKind::Query => set_selected(&mut self.queries, source_id, selected),
        }
    }

    /// Select every New/Updated record of `kind`; returns how many
    pub fn select_all_actionable(&mut self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::WorkItem => select_actionable(&mut self.work_items),
            RecordKind::ClassificationNode => select_actionable(&mut self.classification_nodes),
            RecordKind::SecurityGroup => select_actionable(&mut self.security_groups),
            RecordKind::Query => select_actionable(&mut self.queries),
        }
    }

    pub fn deselect_all(&mut self) {
        clear(&mut self.work_items);
        clear(&mut self.classification_nodes);
        clear(&mut self.security_groups);
        clear(&mut self.queries);
    }

    pub fn selected_count(&self) -> usize {
        self.work_items.iter().filter(|d| d.selected).count()
            + self.classification_nodes.iter().filter(|d| d.selected).count()
            + self.security_groups.iter().filter(|d| d.selected).count()
            + self.queries.iter().filter(|d| d.selected).count()
    }

    /// Difference types of every record of `kind`, in list order
    pub fn types_of(&self, kind: RecordKind) -> Vec<DifferenceType> {
        match kind {
            RecordKind::WorkItem => self.work_items.iter().map(|d| d.difference_type).collect(),
            RecordKind::ClassificationNode => self
                .classification_nodes
                .iter()
                .map(|d| d.difference_type)
                .collect(),
            RecordKind::SecurityGroup => {
                self.security_groups.iter().map(|d| d.difference_type).collect()
            }
            RecordKind::Query => self.queries.iter().map(|d| d.difference_type).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.work_items.is_empty()
            && self.classification_nodes.is_empty()
            && self.security_groups.is_empty()
            && self.queries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Per entity type counts of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub work_items: KindCounts,
    pub classification_nodes: KindCounts,
    /// Member additions count as created
    pub security_groups: KindCounts,
    pub queries: KindCounts,
}

impl ApplySummary {
    pub fn get(&self, kind: RecordKind) -> &KindCounts {
        match kind {
            RecordKind::WorkItem => &self.work_items,
            RecordKind::ClassificationNode => &self.classification_nodes,
            RecordKind::SecurityGroup => &self.security_groups,
            RecordKind::Query => &self.queries,
        }
    }

    pub fn get_mut(&mut self, kind: RecordKind) -> &mut KindCounts {
        match kind {
            RecordKind::WorkItem => &mut self.work_items,
            RecordKind::ClassificationNode => &mut self.classification_nodes,
            RecordKind::SecurityGroup => &mut self.security_groups,
            RecordKind::Query => &mut self.queries,
        }
    }

    pub fn total_created(&self) -> usize {
        RecordKind::ALL.iter().map(|k| self.get(*k).created).sum()
    }

    pub fn total_updated(&self) -> usize {
        RecordKind::ALL.iter().map(|k| self.get(*k).updated).sum()
    }

    pub fn total_failed(&self) -> usize {
        RecordKind::ALL.iter().map(|k| self.get(*k).failed).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Result of `apply_selected_changes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub summary: ApplySummary,
    pub log: OperationLog,
    /// Isolation violations that aborted an entity type's batch
    pub violations: Vec<IsolationViolation>,
}

impl ApplyOutcome {
    pub fn has_failures(&self) -> bool {
        self.summary.total_failed() > 0 || !self.violations.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_diff(id: &str, difference_type: DifferenceType) -> Difference<GroupMembershipDiff> {
        Difference {
            key: RecordKey::group(id),
            source_id: id.to_string(),
            target_id: None,
            record_kind: RecordKind::SecurityGroup,
            difference_type,
            description: String::new(),
            selected: false,
            payload: GroupMembershipDiff::default(),
        }
    }

    fn differences() -> Differences {
        Differences::new(
            WorkspaceRef::new("a", "ProjA", "https://dev.azure.com/contoso"),
            WorkspaceRef::new("b", "ProjB", "https://dev.azure.com/contoso"),
        )
    }

    #[test]
    fn test_record_keys_are_case_insensitive() {
        assert_eq!(RecordKey::work_item("Crash", "Bug"), RecordKey::work_item("crash ", "BUG"));
        assert_eq!(
            RecordKey::classification(NodeStructure::Area, "Web\\Frontend"),
            RecordKey::classification(NodeStructure::Area, "web\\frontend")
        );
        assert_ne!(
            RecordKey::classification(NodeStructure::Area, "Web"),
            RecordKey::classification(NodeStructure::Iteration, "Web")
        );
    }

    #[test]
    fn test_parent_key_sorts_before_child() {
        let mut keys = vec![
            RecordKey::query("Shared Queries/Team/Sprint1"),
            RecordKey::query("Shared Queries/Team-X"),
            RecordKey::query("Shared Queries/Team"),
        ];
        keys.sort();
        assert_eq!(keys[0], RecordKey::query("Shared Queries/Team"));
    }

    #[test]
    fn test_selection_helpers() {
        let mut diffs = differences();
        diffs.security_groups = vec![
            group_diff("g1", DifferenceType::Updated),
            group_diff("g2", DifferenceType::Synchronized),
            group_diff("g3", DifferenceType::Error),
        ];

        assert!(diffs.select(RecordKind::SecurityGroup, "g2"));
        assert!(!diffs.select(RecordKind::SecurityGroup, "missing"));
        assert_eq!(diffs.selected_count(), 1);

        diffs.deselect_all();
        assert_eq!(diffs.select_all_actionable(RecordKind::SecurityGroup), 1);
        assert!(diffs.security_groups[0].is_pending());
        assert!(!diffs.security_groups[2].selected);
    }

    #[test]
    fn test_apply_summary_totals() {
        let mut summary = ApplySummary::default();
        summary.get_mut(RecordKind::WorkItem).created = 2;
        summary.get_mut(RecordKind::Query).created = 1;
        summary.get_mut(RecordKind::Query).failed = 1;
        assert_eq!(summary.total_created(), 3);
        assert_eq!(summary.total_failed(), 1);
    }

    #[test]
    fn test_differences_json_export() {
        let mut diffs = differences();
        diffs.security_groups.push(group_diff("g1", DifferenceType::New));
        let json = diffs.to_json().unwrap();
        assert!(json.contains("snapshot_id"));
        let back: Differences = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diffs);
    }
}
