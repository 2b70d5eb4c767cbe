//! Work item reconciliation
//!
//! New items are created from a freshly fetched source record with both
//! paths bound to the target root. Updated items get a minimal patch
//! computed from the fresh source record.

use super::{BatchReport, ReconcileContext};
use crate::api::models::{Record, RecordKind, WorkItem};
use crate::api::operations::Operation;
use crate::error::{IsolationViolation, RemoteError};
use crate::sync::log::OperationType;
use crate::sync::logic::work_items::{build_patch, create_fields};
use crate::sync::types::{Difference, DifferenceType, WorkItemDiff};

async fn fetch_source_item(ctx: &ReconcileContext<'_>, source_id: &str) -> Result<WorkItem, RemoteError> {
    match ctx
        .source_client
        .fetch_record_detail(ctx.source, RecordKind::WorkItem, source_id)
        .await?
    {
        Record::WorkItem(item) => Ok(item),
        other => Err(RemoteError::NotFound(format!(
            "work item {} (got a {} record)",
            source_id,
            other.kind()
        ))),
    }
}

async fn create(
    ctx: &ReconcileContext<'_>,
    diff: &Difference<WorkItemDiff>,
    report: &mut BatchReport,
) -> Result<(), IsolationViolation> {
    let source = match fetch_source_item(ctx, &diff.source_id).await {
        Ok(item) => item,
        Err(e) => {
            report.fail(
                OperationType::CreateWorkItem,
                format!("Could not read source work item {}", diff.source_id),
                &e,
                &diff.source_id,
            );
            return Ok(());
        }
    };

    let operation = Operation::CreateWorkItem {
        fields: create_fields(&source, ctx.target.namespace()),
    };
    ctx.execute(&operation, &diff.source_id, report).await?;
    Ok(())
}

async fn update(
    ctx: &ReconcileContext<'_>,
    diff: &Difference<WorkItemDiff>,
    report: &mut BatchReport,
) -> Result<(), IsolationViolation> {
    let (Some(target_id), Some(target)) = (&diff.target_id, &diff.payload.target) else {
        report.skip(
            format!("Skipping work item {}: no target record id", diff.source_id),
            &diff.source_id,
        );
        return Ok(());
    };

    let source = match fetch_source_item(ctx, &diff.source_id).await {
        Ok(item) => item,
        Err(e) => {
            report.fail(
                OperationType::UpdateWorkItem,
                format!("Could not read source work item {}", diff.source_id),
                &e,
                &diff.source_id,
            );
            return Ok(());
        }
    };

    let patch = build_patch(&source, target, ctx.source.namespace(), ctx.target.namespace());
    if patch.is_empty() {
        report.skip(
            format!("Skipping work item {}: nothing to patch", diff.source_id),
            &diff.source_id,
        );
        return Ok(());
    }

    let operation = Operation::UpdateWorkItem {
        record_id: target_id.clone(),
        patch,
    };
    ctx.execute(&operation, &diff.source_id, report).await?;
    Ok(())
}

/// Reconcile the selected work items, in list order
pub async fn reconcile(ctx: &ReconcileContext<'_>, diffs: &[Difference<WorkItemDiff>]) -> BatchReport {
    let mut report = BatchReport::new(RecordKind::WorkItem);

    for diff in diffs.iter().filter(|d| d.is_pending()) {
        let result = match diff.difference_type {
            DifferenceType::New => create(ctx, diff, &mut report).await,
            DifferenceType::Updated => update(ctx, diff, &mut report).await,
            _ => Ok(()),
        };
        if let Err(violation) = result {
            report.abort(violation);
            break;
        }
    }

    report.finish()
}
