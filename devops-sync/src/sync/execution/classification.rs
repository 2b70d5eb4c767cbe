//! Area and iteration node reconciliation
//!
//! Missing nodes are created parent before child. Before every creation
//! the target tree is fetched again, so a node that already exists is
//! never created twice.

use std::collections::HashSet;

use super::{BatchReport, ReconcileContext};
use crate::api::models::{FetchOptions, NodeStructure, Record, RecordKind};
use crate::api::operations::Operation;
use crate::error::{IsolationViolation, RemoteError};
use crate::sync::log::OperationType;
use crate::sync::logic::classification::flatten_roots;
use crate::sync::logic::isolation::ensure_belongs_to_scope;
use crate::sync::logic::tree::path_prefixes;
use crate::sync::types::{ClassificationDiff, Difference, DifferenceType, RecordKey};

/// Current target node keys; fails on a tree rooted in another workspace
async fn fetch_target_keys(
    ctx: &ReconcileContext<'_>,
) -> Result<Result<HashSet<RecordKey>, RemoteError>, IsolationViolation> {
    let depth = ctx.config.classification_depth;
    let records = match ctx
        .target_client
        .fetch_records(ctx.target, RecordKind::ClassificationNode, &FetchOptions::with_depth(depth))
        .await
    {
        Ok(records) => records,
        Err(e) => return Ok(Err(e)),
    };

    let roots: Vec<_> = records
        .into_iter()
        .filter_map(|r| match r {
            Record::ClassificationNode(node) => Some(node),
            _ => None,
        })
        .collect();
    for root in &roots {
        ensure_belongs_to_scope(ctx.target, &root.name)?;
    }

    Ok(Ok(flatten_roots(&roots, depth)
        .into_iter()
        .map(|(structure, path, _, _)| RecordKey::classification(structure, &path))
        .collect()))
}

/// Create every missing node along `path`. Returns false when a node could
/// not be created or the target could not be read.
async fn ensure_path(
    ctx: &ReconcileContext<'_>,
    structure: NodeStructure,
    path: &str,
    related_record_id: &str,
    report: &mut BatchReport,
) -> Result<bool, IsolationViolation> {
    let mut created_any = false;
    let mut parent: Option<String> = None;

    for prefix in path_prefixes(path, '\\') {
        let existing = match fetch_target_keys(ctx).await? {
            Ok(keys) => keys,
            Err(e) => {
                report.fail(
                    OperationType::CreateClassificationNode,
                    format!("Could not read {} tree of '{}'", structure.label(), ctx.target.display_name),
                    &e,
                    related_record_id,
                );
                return Ok(false);
            }
        };

        if !existing.contains(&RecordKey::classification(structure, &prefix)) {
            let name = prefix.rsplit('\\').next().unwrap_or(&prefix);
            let operation = Operation::create_classification_node(structure, name, parent.as_deref());
            if !ctx.execute(&operation, related_record_id, report).await? {
                return Ok(false);
            }
            created_any = true;
        }
        parent = Some(prefix);
    }

    if !created_any {
        report.skip(
            format!("{} node '{}' already exists", structure.label(), path),
            related_record_id,
        );
    }
    Ok(true)
}

async fn rename(
    ctx: &ReconcileContext<'_>,
    diff: &Difference<ClassificationDiff>,
    report: &mut BatchReport,
) -> Result<(), IsolationViolation> {
    let Some(target_id) = &diff.target_id else {
        report.skip(
            format!("Skipping node '{}': no target record id", diff.payload.path),
            &diff.source_id,
        );
        return Ok(());
    };

    let operation = Operation::UpdateClassificationNode {
        record_id: target_id.clone(),
        name: diff.payload.name.clone(),
    };
    ctx.execute(&operation, &diff.source_id, report).await?;
    Ok(())
}

/// Reconcile the selected classification nodes, in list order
pub async fn reconcile(
    ctx: &ReconcileContext<'_>,
    diffs: &[Difference<ClassificationDiff>],
) -> BatchReport {
    let mut report = BatchReport::new(RecordKind::ClassificationNode);

    for diff in diffs.iter().filter(|d| d.is_pending()) {
        if ctx.config.is_trashed(&diff.payload.path) {
            report.skip(
                format!("Skipping trashed node '{}'", diff.payload.path),
                &diff.source_id,
            );
            continue;
        }

        let result = match diff.difference_type {
            DifferenceType::New => ensure_path(
                ctx,
                diff.payload.structure,
                &diff.payload.path,
                &diff.source_id,
                &mut report,
            )
            .await
            .map(|_| ()),
            DifferenceType::Updated => rename(ctx, diff, &mut report).await,
            _ => Ok(()),
        };
        if let Err(violation) = result {
            report.abort(violation);
            break;
        }
    }

    report.finish()
}
