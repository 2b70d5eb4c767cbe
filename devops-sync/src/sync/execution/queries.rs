//! Query and query folder reconciliation
//!
//! Folders are created depth-first, parent before child, each creation
//! checked against a freshly fetched target hierarchy. Query text always
//! passes through the WIQL rewriter. Anything under a trash folder is left
//! alone even when selected.

use std::collections::HashSet;

use super::{BatchReport, ReconcileContext};
use crate::api::models::{FetchOptions, QueryFields, QueryPatch, Record, RecordKind};
use crate::api::operations::Operation;
use crate::error::{IsolationViolation, RemoteError};
use crate::sync::log::OperationType;
use crate::sync::logic::queries::wiql_equal;
use crate::sync::logic::tree::{flatten, path_prefixes};
use crate::sync::logic::wiql::rewrite;
use crate::sync::types::{Difference, DifferenceType, QueryDiff, RecordKey};

/// Keys of every query and folder currently in the target
async fn fetch_target_paths(ctx: &ReconcileContext<'_>) -> Result<HashSet<RecordKey>, RemoteError> {
    let depth = ctx.config.query_depth;
    let records = ctx
        .target_client
        .fetch_records(ctx.target, RecordKind::Query, &FetchOptions::with_depth(depth))
        .await?;

    let roots: Vec<_> = records
        .into_iter()
        .filter_map(|r| match r {
            Record::Query(node) => Some(node),
            _ => None,
        })
        .collect();

    Ok(flatten(&roots, '/', depth)
        .into_iter()
        .map(|flat| RecordKey::query(&flat.path))
        .collect())
}

fn split_path(path: &str) -> (Option<&str>, &str) {
    match path.rfind('/') {
        Some(idx) => (Some(&path[..idx]), &path[idx + 1..]),
        None => (None, path),
    }
}

/// Create every missing folder along `path`. Returns whether the whole
/// path now exists, and whether anything was created.
async fn ensure_folders(
    ctx: &ReconcileContext<'_>,
    path: &str,
    related_record_id: &str,
    report: &mut BatchReport,
) -> Result<(bool, bool), IsolationViolation> {
    let mut created_any = false;

    for prefix in path_prefixes(path, '/') {
        let existing = match fetch_target_paths(ctx).await {
            Ok(paths) => paths,
            Err(e) => {
                report.fail(
                    OperationType::CreateQueryFolder,
                    format!("Could not read query hierarchy of '{}'", ctx.target.display_name),
                    &e,
                    related_record_id,
                );
                return Ok((false, created_any));
            }
        };

        if existing.contains(&RecordKey::query(&prefix)) {
            continue;
        }

        let (parent, name) = split_path(&prefix);
        let operation = Operation::create_query_folder(name, parent);
        if !ctx.execute(&operation, related_record_id, report).await? {
            return Ok((false, created_any));
        }
        created_any = true;
    }

    Ok((true, created_any))
}

async fn create_folder(
    ctx: &ReconcileContext<'_>,
    diff: &Difference<QueryDiff>,
    report: &mut BatchReport,
) -> Result<(), IsolationViolation> {
    let (ok, created_any) = ensure_folders(ctx, &diff.payload.path, &diff.source_id, report).await?;
    if ok && !created_any {
        report.skip(
            format!("Folder '{}' already exists", diff.payload.path),
            &diff.source_id,
        );
    }
    Ok(())
}

async fn create_query(
    ctx: &ReconcileContext<'_>,
    diff: &Difference<QueryDiff>,
    report: &mut BatchReport,
) -> Result<(), IsolationViolation> {
    let payload = &diff.payload;
    let Some(source_wiql) = &payload.source_wiql else {
        report.skip(format!("Skipping query '{}': no query text", payload.path), &diff.source_id);
        return Ok(());
    };

    if let Some(parent) = &payload.parent_path {
        let (ok, _) = ensure_folders(ctx, parent, &diff.source_id, report).await?;
        if !ok {
            report.skip(
                format!("Skipping query '{}': parent folder unavailable", payload.path),
                &diff.source_id,
            );
            return Ok(());
        }
    }

    match fetch_target_paths(ctx).await {
        Ok(paths) if paths.contains(&RecordKey::query(&payload.path)) => {
            report.skip(format!("Query '{}' already exists", payload.path), &diff.source_id);
            return Ok(());
        }
        Ok(_) => {}
        Err(e) => {
            report.fail(
                OperationType::CreateQuery,
                format!("Could not read query hierarchy of '{}'", ctx.target.display_name),
                &e,
                &diff.source_id,
            );
            return Ok(());
        }
    }

    let outcome = rewrite(source_wiql, ctx.source.namespace(), ctx.target.namespace());
    log::debug!("Query '{}': {}", payload.path, outcome.summary());

    let operation = Operation::CreateQuery {
        fields: QueryFields {
            name: payload.name.clone(),
            wiql: outcome.text,
            is_public: payload.is_public,
        },
        parent_path: payload.parent_path.clone(),
    };
    ctx.execute(&operation, &diff.source_id, report).await?;
    Ok(())
}

async fn update_query(
    ctx: &ReconcileContext<'_>,
    diff: &Difference<QueryDiff>,
    report: &mut BatchReport,
) -> Result<(), IsolationViolation> {
    let payload = &diff.payload;
    let Some(target_id) = &diff.target_id else {
        report.skip(
            format!("Skipping query '{}': no target record id", payload.path),
            &diff.source_id,
        );
        return Ok(());
    };

    let wiql = payload
        .source_wiql
        .as_deref()
        .map(|text| rewrite(text, ctx.source.namespace(), ctx.target.namespace()))
        .filter(|outcome| !wiql_equal(Some(&outcome.text), payload.target_wiql.as_deref()))
        .map(|outcome| outcome.text);
    let is_public = (payload.target_is_public != Some(payload.is_public)).then_some(payload.is_public);

    if wiql.is_none() && is_public.is_none() {
        report.skip(format!("Query '{}' is already up to date", payload.path), &diff.source_id);
        return Ok(());
    }

    let operation = Operation::UpdateQuery {
        record_id: target_id.clone(),
        patch: QueryPatch { wiql, is_public },
    };
    ctx.execute(&operation, &diff.source_id, report).await?;
    Ok(())
}

/// Reconcile the selected queries and folders, in list order
pub async fn reconcile(ctx: &ReconcileContext<'_>, diffs: &[Difference<QueryDiff>]) -> BatchReport {
    let mut report = BatchReport::new(RecordKind::Query);

    for diff in diffs.iter().filter(|d| d.is_pending()) {
        if ctx.config.is_trashed(&diff.payload.path) {
            report.skip(format!("Skipping trashed '{}'", diff.payload.path), &diff.source_id);
            continue;
        }

        let result = match (diff.difference_type, diff.payload.is_folder) {
            (DifferenceType::New, true) => create_folder(ctx, diff, &mut report).await,
            (DifferenceType::New, false) => create_query(ctx, diff, &mut report).await,
            (DifferenceType::Updated, false) => update_query(ctx, diff, &mut report).await,
            _ => Ok(()),
        };
        if let Err(violation) = result {
            report.abort(violation);
            break;
        }
    }

    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("Shared Queries/Team"), (Some("Shared Queries"), "Team"));
        assert_eq!(split_path("Shared Queries"), (None, "Shared Queries"));
    }
}
