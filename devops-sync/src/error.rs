//! Error types for remote access, workspace isolation and reconciliation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of failures surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Transient, retryable by the caller (timeouts included)
    RemoteUnavailable,
    /// Non-retryable; comparators degrade and report guidance
    PermissionDenied,
    /// Record or workspace missing
    NotFound,
    /// Source and target resolve to the same workspace
    SameScopeViolation,
    /// A target-scoped lookup returned data from another workspace
    CrossScopeLeak,
    /// A single record failed during reconciliation
    PartialApplyFailure,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RemoteUnavailable => "RemoteUnavailable",
            Self::PermissionDenied => "PermissionDenied",
            Self::NotFound => "NotFound",
            Self::SameScopeViolation => "SameScopeViolation",
            Self::CrossScopeLeak => "CrossScopeLeak",
            Self::PartialApplyFailure => "PartialApplyFailure",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable)
    }
}

/// Error returned by a remote workspace client call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote service unavailable: {0}")]
    Unavailable(String),

    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => ErrorKind::RemoteUnavailable,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Operator-facing guidance for a failure while reading `subject`
    pub fn guidance(&self, subject: &str) -> String {
        match self {
            Self::Unavailable(msg) => format!(
                "Could not reach the remote service while reading {}: {}. Re-run the analysis once the service responds.",
                subject, msg
            ),
            Self::Timeout(after) => format!(
                "Reading {} timed out after {}s. Re-run the analysis or raise the call timeout.",
                subject,
                after.as_secs()
            ),
            Self::PermissionDenied(msg) => format!(
                "Missing permission to read {} ({}). Grant the service account read access and re-run the analysis.",
                subject, msg
            ),
            Self::NotFound(msg) => format!(
                "{} could not be found ({}). Check that it exists in both workspaces.",
                subject, msg
            ),
        }
    }
}

/// Violation of the rule that no operation crosses workspace boundaries
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationViolation {
    #[error("source and target are the same workspace '{workspace}'")]
    SameScope { workspace: String },

    #[error("'{resolved}' was returned for target workspace '{workspace}' but does not belong to it")]
    CrossScopeLeak { workspace: String, resolved: String },
}

impl IsolationViolation {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SameScope { .. } => ErrorKind::SameScopeViolation,
            Self::CrossScopeLeak { .. } => ErrorKind::CrossScopeLeak,
        }
    }
}

/// Fatal errors of a reconciliation pass, raised before any mutating call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Isolation(#[from] IsolationViolation),

    #[error("differences were computed for target '{expected}' but apply was requested for '{actual}'")]
    SnapshotMismatch { expected: String, actual: String },

    #[error("differences snapshot is {age_secs}s old (limit {max_age_secs}s); re-run the analysis")]
    StaleSnapshot { age_secs: i64, max_age_secs: u64 },
}

impl SyncError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Isolation(violation) => Some(violation.kind()),
            Self::SnapshotMismatch { .. } | Self::StaleSnapshot { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_kinds() {
        assert_eq!(
            RemoteError::Timeout(Duration::from_secs(5)).kind(),
            ErrorKind::RemoteUnavailable
        );
        assert!(RemoteError::Unavailable("503".into()).is_retryable());
        assert!(!RemoteError::PermissionDenied("x".into()).is_retryable());
        assert_eq!(RemoteError::NotFound("x".into()).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_guidance_mentions_subject() {
        let msg = RemoteError::PermissionDenied("403".into()).guidance("security groups of 'ProjB'");
        assert!(msg.contains("security groups of 'ProjB'"));
        assert!(msg.contains("permission"));
    }

    #[test]
    fn test_isolation_violation_converts_to_sync_error() {
        let err: SyncError = IsolationViolation::SameScope {
            workspace: "ProjA".into(),
        }
        .into();
        assert_eq!(err.kind(), Some(ErrorKind::SameScopeViolation));
        assert!(err.to_string().contains("ProjA"));
    }
}
