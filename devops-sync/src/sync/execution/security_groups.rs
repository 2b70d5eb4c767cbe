//! Security group reconciliation
//!
//! Only additions are ever issued. Target-only members stay in the diff
//! as information and are never removed.

use super::{BatchReport, ReconcileContext};
use crate::api::models::RecordKind;
use crate::api::operations::Operation;
use crate::error::{IsolationViolation, RemoteError};
use crate::sync::log::OperationType;
use crate::sync::logic::isolation::ensure_belongs_to_scope;
use crate::sync::types::{Difference, DifferenceType, GroupMembershipDiff};

async fn add_members(
    ctx: &ReconcileContext<'_>,
    diff: &Difference<GroupMembershipDiff>,
    report: &mut BatchReport,
) -> Result<(), IsolationViolation> {
    let group_name = &diff.payload.group_name;

    let current = match ctx.target_client.fetch_group_members(ctx.target, group_name).await {
        Ok(Some(group)) => group,
        Ok(None) => {
            let error = RemoteError::NotFound(format!("group '{}'", group_name));
            report.fail(
                OperationType::AddGroupMember,
                format!("Group '{}' is not readable in '{}'", group_name, ctx.target.display_name),
                &error,
                &diff.source_id,
            );
            return Ok(());
        }
        Err(e) => {
            report.fail(
                OperationType::AddGroupMember,
                format!("Could not read group '{}'", group_name),
                &e,
                &diff.source_id,
            );
            return Ok(());
        }
    };
    ensure_belongs_to_scope(ctx.target, &current.principal_name)?;

    for member in &diff.payload.members_to_add {
        let operation = Operation::add_group_member(group_name.clone(), member.clone());
        if current.members.iter().any(|m| m.same_identity(member)) {
            report.skip(
                format!("{} (already a member)", operation.describe()),
                &diff.source_id,
            );
            continue;
        }
        ctx.execute(&operation, &diff.source_id, report).await?;
    }
    Ok(())
}

/// Reconcile the selected groups, in list order
pub async fn reconcile(
    ctx: &ReconcileContext<'_>,
    diffs: &[Difference<GroupMembershipDiff>],
) -> BatchReport {
    let mut report = BatchReport::new(RecordKind::SecurityGroup);

    for diff in diffs.iter().filter(|d| d.is_pending()) {
        // Groups are never created here; New cannot come out of analysis
        if diff.difference_type != DifferenceType::Updated {
            continue;
        }
        if let Err(violation) = add_members(ctx, diff, &mut report).await {
            report.abort(violation);
            break;
        }
        let kept = &diff.payload.members_to_remove;
        if !kept.is_empty() {
            let names: Vec<_> = kept.iter().map(|m| m.display_name.as_str()).collect();
            let message = format!(
                "Group '{}': left {} target-only member(s) in place: {}",
                diff.payload.group_name,
                kept.len(),
                names.join(", ")
            );
            log::info!("{}", message);
            report
                .log
                .push(OperationType::Advisory, true, message, None, Some(&diff.source_id));
        }
    }

    report.finish()
}
