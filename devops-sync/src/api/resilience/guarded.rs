//! Client wrapper applying the request limiter and per-call timeout

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::concurrency::{ConcurrencyLimiter, ConcurrencyStats};
use crate::api::client::WorkspaceClient;
use crate::api::models::{
    FetchOptions, FieldPatch, GroupInfo, GroupMember, Record, RecordFields, RecordKind,
    WorkspaceRef,
};
use crate::config::SyncConfig;
use crate::error::RemoteError;

/// Wraps any `WorkspaceClient` so every call holds a request permit and
/// fails with `RemoteError::Timeout` instead of hanging
#[derive(Clone)]
pub struct GuardedClient {
    inner: Arc<dyn WorkspaceClient>,
    limiter: ConcurrencyLimiter,
    call_timeout: Duration,
}

impl GuardedClient {
    pub fn new(inner: Arc<dyn WorkspaceClient>, limiter: ConcurrencyLimiter, call_timeout: Duration) -> Self {
        Self {
            inner,
            limiter,
            call_timeout,
        }
    }

    pub fn from_config(inner: Arc<dyn WorkspaceClient>, config: &SyncConfig) -> Self {
        Self::new(
            inner,
            ConcurrencyLimiter::for_requests(&config.concurrency),
            config.timeouts.call_timeout,
        )
    }

    /// Limiter shared with other clients built from the same engine
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn stats(&self) -> ConcurrencyStats {
        self.limiter.stats()
    }

    async fn guarded<T, F>(&self, call: &str, fut: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>> + Send,
    {
        let _permit = self.limiter.acquire().await;
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Remote call '{}' timed out after {:?}", call, self.call_timeout);
                Err(RemoteError::Timeout(self.call_timeout))
            }
        }
    }
}

#[async_trait]
impl WorkspaceClient for GuardedClient {
    async fn fetch_records(
        &self,
        workspace: &WorkspaceRef,
        kind: RecordKind,
        options: &FetchOptions,
    ) -> Result<Vec<Record>, RemoteError> {
        self.guarded(
            "fetch_records",
            self.inner.fetch_records(workspace, kind, options),
        )
        .await
    }

    async fn fetch_record_detail(
        &self,
        workspace: &WorkspaceRef,
        kind: RecordKind,
        record_id: &str,
    ) -> Result<Record, RemoteError> {
        self.guarded(
            "fetch_record_detail",
            self.inner.fetch_record_detail(workspace, kind, record_id),
        )
        .await
    }

    async fn create_record(
        &self,
        workspace: &WorkspaceRef,
        fields: &RecordFields,
        parent_path: Option<&str>,
    ) -> Result<String, RemoteError> {
        self.guarded(
            "create_record",
            self.inner.create_record(workspace, fields, parent_path),
        )
        .await
    }

    async fn update_record(
        &self,
        workspace: &WorkspaceRef,
        record_id: &str,
        patch: &FieldPatch,
    ) -> Result<(), RemoteError> {
        self.guarded(
            "update_record",
            self.inner.update_record(workspace, record_id, patch),
        )
        .await
    }

    async fn fetch_group_members(
        &self,
        workspace: &WorkspaceRef,
        group_name: &str,
    ) -> Result<Option<GroupInfo>, RemoteError> {
        self.guarded(
            "fetch_group_members",
            self.inner.fetch_group_members(workspace, group_name),
        )
        .await
    }

    async fn add_group_member(
        &self,
        workspace: &WorkspaceRef,
        group_name: &str,
        member: &GroupMember,
    ) -> Result<(), RemoteError> {
        self.guarded(
            "add_group_member",
            self.inner.add_group_member(workspace, group_name, member),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::InMemoryWorkspaceClient;

    fn workspace() -> WorkspaceRef {
        WorkspaceRef::new("p1", "ProjA", "https://dev.azure.com/contoso")
    }

    #[tokio::test]
    async fn test_timeout_becomes_remote_error() {
        let memory = Arc::new(InMemoryWorkspaceClient::new());
        memory.add_workspace(&workspace());
        memory.set_latency(Duration::from_millis(200));

        let client = GuardedClient::new(
            memory,
            ConcurrencyLimiter::new("requests", 2, true),
            Duration::from_millis(20),
        );

        let err = client
            .fetch_records(&workspace(), RecordKind::WorkItem, &FetchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Timeout(Duration::from_millis(20)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_calls_pass_through_and_count_permits() {
        let memory = Arc::new(InMemoryWorkspaceClient::new());
        memory.add_workspace(&workspace());

        let client = GuardedClient::new(
            memory,
            ConcurrencyLimiter::new("requests", 2, true),
            Duration::from_secs(5),
        );

        let records = client
            .fetch_records(&workspace(), RecordKind::WorkItem, &FetchOptions::default())
            .await
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(client.stats().acquired, 1);
        assert_eq!(client.stats().available_permits, 2);
    }
}
