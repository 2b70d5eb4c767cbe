//! Append-only operation log produced by one reconciliation pass
//!
//! Each entity-type worker writes to its own `OperationLog`; the pass
//! merges them in a fixed order once the workers finish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::operations::OperationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    // Lifecycle markers
    PassStarted,
    BatchCompleted,
    PassCompleted,

    // Record mutations
    CreateWorkItem,
    UpdateWorkItem,
    CreateClassificationNode,
    UpdateClassificationNode,
    CreateQueryFolder,
    CreateQuery,
    UpdateQuery,
    AddGroupMember,

    /// A selected record that was deliberately not acted on
    Skip,
    IsolationViolation,
    /// Informational, e.g. cross-organization copies
    Advisory,
}

impl OperationType {
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::PassStarted | Self::BatchCompleted | Self::PassCompleted
        )
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateWorkItem
                | Self::UpdateWorkItem
                | Self::CreateClassificationNode
                | Self::UpdateClassificationNode
                | Self::CreateQueryFolder
                | Self::CreateQuery
                | Self::UpdateQuery
                | Self::AddGroupMember
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub operation_type: OperationType,
    pub is_success: bool,
    pub message: String,
    /// Error text or field list, when there is one
    pub details: Option<String>,
    /// Source record the entry refers to
    pub related_record_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        operation_type: OperationType,
        is_success: bool,
        message: impl Into<String>,
        details: Option<String>,
        related_record_id: Option<&str>,
    ) {
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            operation_type,
            is_success,
            message: message.into(),
            details,
            related_record_id: related_record_id.map(str::to_string),
        });
    }

    pub fn lifecycle(&mut self, operation_type: OperationType, message: impl Into<String>) {
        self.push(operation_type, true, message, None, None);
    }

    pub fn skip(&mut self, message: impl Into<String>, related_record_id: &str) {
        self.push(OperationType::Skip, true, message, None, Some(related_record_id));
    }

    /// Record the outcome of an executed operation
    pub fn record_result(&mut self, result: &OperationResult, related_record_id: &str) {
        let details = match (&result.error, &result.record_id) {
            (Some(error), _) => Some(error.clone()),
            (None, Some(id)) => Some(format!("record id {}", id)),
            (None, None) => None,
        };
        self.push(
            result.operation.operation_type(),
            result.success,
            result.operation.describe(),
            details,
            Some(related_record_id),
        );
    }

    /// Append every entry of `other`, keeping its order
    pub fn merge(&mut self, other: OperationLog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mutations(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.operation_type.is_mutation())
    }

    pub fn failures(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| !e.is_success)
    }

    /// True when the log holds nothing but pass/batch markers
    pub fn only_lifecycle(&self) -> bool {
        self.entries.iter().all(|e| e.operation_type.is_lifecycle())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::operations::Operation;
    use crate::error::RemoteError;

    #[test]
    fn test_lifecycle_only() {
        let mut log = OperationLog::new();
        log.lifecycle(OperationType::PassStarted, "start");
        log.lifecycle(OperationType::PassCompleted, "done");
        assert!(log.only_lifecycle());
        assert_eq!(log.mutations().count(), 0);

        log.skip("Skipping work item 7 (no target id)", "7");
        assert!(!log.only_lifecycle());
        assert_eq!(log.mutations().count(), 0);
    }

    #[test]
    fn test_record_result_failure() {
        let mut log = OperationLog::new();
        let op = Operation::create_query_folder("Team", Some("Shared Queries"));
        let result = OperationResult::error(op, &RemoteError::Unavailable("503".into()));
        log.record_result(&result, "q1");

        let entry = &log.entries()[0];
        assert_eq!(entry.operation_type, OperationType::CreateQueryFolder);
        assert!(!entry.is_success);
        assert_eq!(entry.related_record_id.as_deref(), Some("q1"));
        assert!(entry.details.as_deref().unwrap().contains("503"));
        assert_eq!(log.failures().count(), 1);
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut a = OperationLog::new();
        a.lifecycle(OperationType::PassStarted, "start");
        let mut b = OperationLog::new();
        b.lifecycle(OperationType::BatchCompleted, "work items");
        b.lifecycle(OperationType::BatchCompleted, "queries");
        a.merge(b);

        let messages: Vec<_> = a.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["start", "work items", "queries"]);
    }

    #[test]
    fn test_to_json() {
        let mut log = OperationLog::new();
        log.lifecycle(OperationType::PassStarted, "start");
        let json = log.to_json().unwrap();
        assert!(json.contains("PassStarted"));
    }
}
