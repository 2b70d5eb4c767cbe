//! Summary of an analysis run
//!
//! Counts per entity type and the items an operator should look at by
//! hand: records that could not be compared and target-only members.

use serde::{Deserialize, Serialize};

use crate::api::models::RecordKind;
use crate::sync::types::{Difference, DifferenceType, Differences};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSummary {
    pub new: usize,
    pub updated: usize,
    pub synchronized: usize,
    pub missing: usize,
    pub error: usize,
    pub selected: usize,
}

impl KindSummary {
    fn from_diffs<T>(diffs: &[Difference<T>]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.difference_type {
                DifferenceType::New => summary.new += 1,
                DifferenceType::Updated => summary.updated += 1,
                DifferenceType::Synchronized => summary.synchronized += 1,
                DifferenceType::Missing => summary.missing += 1,
                DifferenceType::Error => summary.error += 1,
            }
            if diff.selected {
                summary.selected += 1;
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.new + self.updated + self.synchronized + self.missing + self.error
    }

    pub fn actionable(&self) -> usize {
        self.new + self.updated
    }
}

/// An item that needs a manual decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualReviewItem {
    pub record_kind: RecordKind,
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferencesSummary {
    pub work_items: KindSummary,
    pub classification_nodes: KindSummary,
    pub security_groups: KindSummary,
    pub queries: KindSummary,
    pub manual_review: Vec<ManualReviewItem>,
    /// Entity types that could not be compared at all
    pub notes: Vec<String>,
}

impl DifferencesSummary {
    pub fn get(&self, kind: RecordKind) -> &KindSummary {
        match kind {
            RecordKind::WorkItem => &self.work_items,
            RecordKind::ClassificationNode => &self.classification_nodes,
            RecordKind::SecurityGroup => &self.security_groups,
            RecordKind::Query => &self.queries,
        }
    }

    /// True when at least one record would be created or updated
    pub fn has_changes(&self) -> bool {
        RecordKind::ALL.iter().any(|k| self.get(*k).actionable() > 0)
    }
}

fn review_items<T>(diffs: &[Difference<T>], out: &mut Vec<ManualReviewItem>) {
    for diff in diffs {
        if matches!(diff.difference_type, DifferenceType::Error | DifferenceType::Missing) {
            out.push(ManualReviewItem {
                record_kind: diff.record_kind,
                key: diff.key.to_string(),
                reason: diff.description.clone(),
            });
        }
    }
}

/// Build a summary from an analysis result
pub fn build_summary(differences: &Differences) -> DifferencesSummary {
    let mut summary = DifferencesSummary {
        work_items: KindSummary::from_diffs(&differences.work_items),
        classification_nodes: KindSummary::from_diffs(&differences.classification_nodes),
        security_groups: KindSummary::from_diffs(&differences.security_groups),
        queries: KindSummary::from_diffs(&differences.queries),
        manual_review: Vec::new(),
        notes: differences.notes.iter().map(|n| n.message.clone()).collect(),
    };

    review_items(&differences.work_items, &mut summary.manual_review);
    review_items(&differences.classification_nodes, &mut summary.manual_review);
    review_items(&differences.security_groups, &mut summary.manual_review);
    review_items(&differences.queries, &mut summary.manual_review);

    // Target-only members are never removed automatically
    for group in &differences.security_groups {
        for member in &group.payload.members_to_remove {
            summary.manual_review.push(ManualReviewItem {
                record_kind: RecordKind::SecurityGroup,
                key: group.key.to_string(),
                reason: format!(
                    "'{}' is only in the target group '{}'; remove manually if intended",
                    member.display_name, group.payload.group_name
                ),
            });
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{GroupMember, WorkspaceRef};
    use crate::sync::types::{GroupMembershipDiff, RecordKey};

    fn group(name: &str, difference_type: DifferenceType, remove: Vec<GroupMember>) -> Difference<GroupMembershipDiff> {
        Difference {
            key: RecordKey::group(name),
            source_id: name.to_string(),
            target_id: None,
            record_kind: RecordKind::SecurityGroup,
            difference_type,
            description: format!("{} description", name),
            selected: difference_type == DifferenceType::Updated,
            payload: GroupMembershipDiff {
                group_name: name.to_string(),
                members_to_remove: remove,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_counts_and_review_items() {
        let mut diffs = Differences::new(
            WorkspaceRef::new("a", "ProjA", "https://dev.azure.com/contoso"),
            WorkspaceRef::new("b", "ProjB", "https://dev.azure.com/contoso"),
        );
        diffs.security_groups = vec![
            group("Contributors", DifferenceType::Updated, vec![GroupMember::user("Carol", None, None)]),
            group("Readers", DifferenceType::Error, vec![]),
            group("Admins", DifferenceType::Synchronized, vec![]),
        ];

        let summary = build_summary(&diffs);
        let groups = summary.get(RecordKind::SecurityGroup);
        assert_eq!(groups.total(), 3);
        assert_eq!(groups.actionable(), 1);
        assert_eq!(groups.selected, 1);
        assert!(summary.has_changes());

        assert_eq!(summary.manual_review.len(), 2);
        assert!(summary.manual_review.iter().any(|i| i.reason.contains("Carol")));
    }

    #[test]
    fn test_empty_has_no_changes() {
        let diffs = Differences::new(
            WorkspaceRef::new("a", "ProjA", "https://dev.azure.com/contoso"),
            WorkspaceRef::new("b", "ProjB", "https://dev.azure.com/contoso"),
        );
        assert!(!build_summary(&diffs).has_changes());
    }
}
