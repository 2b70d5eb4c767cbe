//! Selective reconciliation
//!
//! Replays the selected New/Updated records of a `Differences` snapshot
//! against the target workspace. Entity types reconcile concurrently, each
//! one sequentially in list order with its own log, merged at the end in
//! entity type order. One record's failure never stops its batch; an
//! isolation violation always does.

pub mod classification;
pub mod queries;
pub mod security_groups;
pub mod work_items;

use chrono::Utc;

use super::log::{OperationLog, OperationType};
use super::logic::isolation::{cross_organization_advisory, ensure_distinct_scopes};
use super::types::{ApplyOutcome, Differences, KindCounts};
use crate::api::client::WorkspaceClient;
use crate::api::models::{RecordKind, WorkspaceRef};
use crate::api::operations::Operation;
use crate::config::{ComparisonConfig, SnapshotConfig};
use crate::error::{IsolationViolation, RemoteError, SyncError};

/// Borrowed state shared by the entity type workers of one pass
pub struct ReconcileContext<'a> {
    pub source_client: &'a dyn WorkspaceClient,
    pub target_client: &'a dyn WorkspaceClient,
    pub source: &'a WorkspaceRef,
    pub target: &'a WorkspaceRef,
    pub config: &'a ComparisonConfig,
}

impl ReconcileContext<'_> {
    /// Run one mutating operation against the target, re-checking scope
    /// isolation first. Logs and counts the outcome; returns whether it
    /// succeeded.
    pub async fn execute(
        &self,
        operation: &Operation,
        related_record_id: &str,
        report: &mut BatchReport,
    ) -> Result<bool, IsolationViolation> {
        ensure_distinct_scopes(self.source, self.target)?;

        let result = operation
            .execute_captured(self.target_client, self.target)
            .await;
        report.log.record_result(&result, related_record_id);

        if result.is_success() {
            log::info!("{}", operation.describe());
            if operation.is_create() {
                report.counts.created += 1;
            } else {
                report.counts.updated += 1;
            }
        } else {
            log::warn!(
                "{} failed: {}",
                operation.describe(),
                result.error.as_deref().unwrap_or("unknown error")
            );
            report.counts.failed += 1;
        }
        Ok(result.is_success())
    }
}

/// Counts, log and abort reason of one entity type's batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub kind: RecordKind,
    pub counts: KindCounts,
    pub log: OperationLog,
    pub violation: Option<IsolationViolation>,
}

impl BatchReport {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            counts: KindCounts::default(),
            log: OperationLog::new(),
            violation: None,
        }
    }

    /// A selected record that is deliberately left alone
    pub fn skip(&mut self, message: impl Into<String>, related_record_id: &str) {
        let message = message.into();
        log::debug!("{}", message);
        self.counts.skipped += 1;
        self.log.skip(message, related_record_id);
    }

    /// A record that failed before its operation could be issued
    pub fn fail(
        &mut self,
        operation_type: OperationType,
        message: impl Into<String>,
        error: &RemoteError,
        related_record_id: &str,
    ) {
        let message = message.into();
        log::warn!("{}: {}", message, error);
        self.counts.failed += 1;
        self.log.push(
            operation_type,
            false,
            message,
            Some(error.to_string()),
            Some(related_record_id),
        );
    }

    /// Stop the batch on an isolation violation
    pub fn abort(&mut self, violation: IsolationViolation) {
        log::error!("{} batch aborted: {}", self.kind, violation);
        self.log.push(
            OperationType::IsolationViolation,
            false,
            format!("{} batch aborted", self.kind),
            Some(violation.to_string()),
            None,
        );
        self.violation = Some(violation);
    }

    pub fn finish(mut self) -> Self {
        let c = self.counts;
        self.log.lifecycle(
            OperationType::BatchCompleted,
            format!(
                "{}: {} created, {} updated, {} skipped, {} failed",
                self.kind, c.created, c.updated, c.skipped, c.failed
            ),
        );
        self
    }
}

/// Reject a snapshot computed for another target or older than allowed
pub fn validate_snapshot(
    differences: &Differences,
    target: &WorkspaceRef,
    config: &SnapshotConfig,
) -> Result<(), SyncError> {
    let same_target = differences.target.id.eq_ignore_ascii_case(&target.id)
        && differences.target.normalized_host() == target.normalized_host();
    if !same_target {
        return Err(SyncError::SnapshotMismatch {
            expected: differences.target.to_string(),
            actual: target.to_string(),
        });
    }

    if let Some(max_age) = config.max_age {
        let age_secs = (Utc::now() - differences.created_at).num_seconds();
        let max_age_secs = max_age.as_secs();
        if age_secs > i64::try_from(max_age_secs).unwrap_or(i64::MAX) {
            return Err(SyncError::StaleSnapshot {
                age_secs,
                max_age_secs,
            });
        }
    }
    Ok(())
}

/// Apply every selected New/Updated record of `differences` to `target`
pub async fn apply_selected_changes(
    source_client: &dyn WorkspaceClient,
    target_client: &dyn WorkspaceClient,
    differences: &Differences,
    target: &WorkspaceRef,
    comparison: &ComparisonConfig,
    snapshot: &SnapshotConfig,
) -> Result<ApplyOutcome, SyncError> {
    // Checked here regardless of what the caller validated
    ensure_distinct_scopes(&differences.source, target)?;
    validate_snapshot(differences, target, snapshot)?;

    let ctx = ReconcileContext {
        source_client,
        target_client,
        source: &differences.source,
        target,
        config: comparison,
    };

    let mut log = OperationLog::new();
    log.lifecycle(
        OperationType::PassStarted,
        format!(
            "Applying {} selected record(s) of snapshot {} to '{}'",
            differences.selected_count(),
            differences.snapshot_id,
            target.display_name
        ),
    );
    if let Some(advisory) = cross_organization_advisory(&differences.source, target) {
        log.push(OperationType::Advisory, true, advisory, None, None);
    }

    let (work_items, classification_nodes, security_groups, queries) = tokio::join!(
        work_items::reconcile(&ctx, &differences.work_items),
        classification::reconcile(&ctx, &differences.classification_nodes),
        security_groups::reconcile(&ctx, &differences.security_groups),
        queries::reconcile(&ctx, &differences.queries),
    );

    let mut outcome = ApplyOutcome::default();
    for report in [work_items, classification_nodes, security_groups, queries] {
        *outcome.summary.get_mut(report.kind) = report.counts;
        log.merge(report.log);
        outcome.violations.extend(report.violation);
    }

    let summary = &outcome.summary;
    log.lifecycle(
        OperationType::PassCompleted,
        format!(
            "{} created, {} updated, {} failed",
            summary.total_created(),
            summary.total_updated(),
            summary.total_failed()
        ),
    );
    log::info!(
        "Applied snapshot {}: {} created, {} updated, {} failed, {} violation(s)",
        differences.snapshot_id,
        summary.total_created(),
        summary.total_updated(),
        summary.total_failed(),
        outcome.violations.len()
    );

    outcome.log = log;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn differences() -> Differences {
        Differences::new(
            WorkspaceRef::new("a", "ProjA", "https://dev.azure.com/contoso"),
            WorkspaceRef::new("b", "ProjB", "https://dev.azure.com/contoso"),
        )
    }

    #[test]
    fn test_snapshot_for_other_target_rejected() {
        let diffs = differences();
        let other = WorkspaceRef::new("c", "ProjC", "https://dev.azure.com/contoso");
        let err = validate_snapshot(&diffs, &other, &SnapshotConfig::default()).unwrap_err();
        assert!(matches!(err, SyncError::SnapshotMismatch { .. }));
    }

    #[test]
    fn test_stale_snapshot_rejected() {
        let mut diffs = differences();
        diffs.created_at = Utc::now() - chrono::Duration::hours(2);
        let target = diffs.target.clone();

        let err = validate_snapshot(&diffs, &target, &SnapshotConfig::default()).unwrap_err();
        assert!(matches!(err, SyncError::StaleSnapshot { max_age_secs: 3600, .. }));

        let no_limit = SnapshotConfig { max_age: None };
        assert!(validate_snapshot(&diffs, &target, &no_limit).is_ok());

        let generous = SnapshotConfig {
            max_age: Some(Duration::from_secs(3 * 3600)),
        };
        assert!(validate_snapshot(&diffs, &target, &generous).is_ok());
    }

    #[test]
    fn test_batch_report_counts() {
        let mut report = BatchReport::new(RecordKind::Query);
        report.skip("Skipping 'Recycle Bin/Old'", "q1");
        report.fail(
            OperationType::CreateQuery,
            "Could not read target queries",
            &RemoteError::Unavailable("503".into()),
            "q2",
        );
        let report = report.finish();

        assert_eq!(report.counts.skipped, 1);
        assert_eq!(report.counts.failed, 1);
        let last = report.log.entries().last().unwrap();
        assert_eq!(last.operation_type, OperationType::BatchCompleted);
        assert!(last.message.contains("1 skipped, 1 failed"));
    }
}
