//! Security group membership diffing
//!
//! Members are matched by email OR principal name, case-insensitively.
//! Target-only members are reported and never removed.

use crate::api::models::{GroupMember, RecordKind};
use crate::sync::types::{Difference, DifferenceType, GroupMembershipDiff, RecordKey};

/// Drop members whose identity already appeared earlier in the list
pub fn dedup_members(members: Vec<GroupMember>) -> Vec<GroupMember> {
    let mut unique: Vec<GroupMember> = Vec::with_capacity(members.len());
    for member in members {
        if !unique.iter().any(|m| m.same_identity(&member)) {
            unique.push(member);
        }
    }
    unique
}

fn sort_members(members: &mut [GroupMember]) {
    members.sort_by_key(|m| m.display_name.to_lowercase());
}

/// Split resolved source and target user lists into add/remove/existing
pub fn partition_members(source: &[GroupMember], target: &[GroupMember]) -> GroupMembershipDiff {
    let mut diff = GroupMembershipDiff::default();

    for member in source {
        if target.iter().any(|t| t.same_identity(member)) {
            diff.existing.push(member.clone());
        } else {
            diff.members_to_add.push(member.clone());
        }
    }
    for member in target {
        if !source.iter().any(|s| s.same_identity(member)) {
            diff.members_to_remove.push(member.clone());
        }
    }

    sort_members(&mut diff.members_to_add);
    sort_members(&mut diff.members_to_remove);
    sort_members(&mut diff.existing);
    diff
}

fn names(members: &[GroupMember]) -> String {
    members
        .iter()
        .map(|m| m.display_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the group's difference record from a computed membership diff
pub fn membership_difference(
    source_id: &str,
    target_id: &str,
    mut diff: GroupMembershipDiff,
    group_name: &str,
) -> Difference<GroupMembershipDiff> {
    diff.group_name = group_name.to_string();

    let difference_type = if diff.members_to_add.is_empty() {
        DifferenceType::Synchronized
    } else {
        DifferenceType::Updated
    };

    let mut parts = Vec::new();
    if !diff.members_to_add.is_empty() {
        parts.push(format!("add {}", names(&diff.members_to_add)));
    }
    if !diff.members_to_remove.is_empty() {
        parts.push(format!("target only (kept): {}", names(&diff.members_to_remove)));
    }
    let description = if parts.is_empty() {
        "In sync".to_string()
    } else {
        parts.join("; ")
    };

    log::debug!(
        "Group '{}': {} to add, {} target-only, {} existing",
        group_name,
        diff.members_to_add.len(),
        diff.members_to_remove.len(),
        diff.existing.len()
    );

    Difference {
        key: RecordKey::group(group_name),
        source_id: source_id.to_string(),
        target_id: Some(target_id.to_string()),
        record_kind: RecordKind::SecurityGroup,
        difference_type,
        description,
        selected: false,
        payload: diff,
    }
}

/// A group that could not be compared (`Missing` or `Error`)
pub fn unresolved_difference(
    source_id: &str,
    target_id: Option<&str>,
    group_name: &str,
    difference_type: DifferenceType,
    guidance: String,
) -> Difference<GroupMembershipDiff> {
    log::warn!("Group '{}': {}", group_name, guidance);
    Difference {
        key: RecordKey::group(group_name),
        source_id: source_id.to_string(),
        target_id: target_id.map(str::to_string),
        record_kind: RecordKind::SecurityGroup,
        difference_type,
        description: guidance.clone(),
        selected: false,
        payload: GroupMembershipDiff {
            group_name: group_name.to_string(),
            guidance: Some(guidance),
            ..Default::default()
        },
    }
}
