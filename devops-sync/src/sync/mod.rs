//! Workspace differencing and selective reconciliation
//!
//! Compares two project-tracking workspaces and applies an operator-chosen
//! subset of the differences to the target:
//!
//! 1. Analysis - one comparator per entity type, run concurrently
//! 2. Review - the caller marks records as selected
//! 3. Apply - selected New/Updated records are replayed against the target
//!
//! Key properties:
//! - Additive only: target-only records and members are reported, never deleted
//! - Query text is retargeted to the target namespace
//! - Source and target may never be the same workspace when applying
//! - One record's failure never aborts its batch

pub mod analysis;
pub mod execution;
pub mod log;
pub mod logic;
pub mod types;

pub use analysis::{AnalysisProgress, ComparatorPhase, EntityComparator};
pub use self::log::{LogEntry, OperationLog, OperationType};
pub use logic::summary::{build_summary, DifferencesSummary};
pub use types::*;

use std::sync::Arc;

use crate::api::client::WorkspaceClient;
use crate::api::models::WorkspaceRef;
use crate::api::resilience::{ConcurrencyLimiter, GuardedClient};
use crate::config::SyncConfig;
use crate::error::SyncError;
use analysis::{comparators_for, run_comparators, ComparisonContext};

/// Entry point for analysis and reconciliation
pub struct SyncEngine {
    source_client: Arc<dyn WorkspaceClient>,
    target_client: Arc<dyn WorkspaceClient>,
    config: SyncConfig,
    comparator_limiter: ConcurrencyLimiter,
    progress: AnalysisProgress,
}

impl SyncEngine {
    /// Engine whose source and target live behind the same service
    pub fn new(client: Arc<dyn WorkspaceClient>, config: SyncConfig) -> Self {
        let guarded: Arc<dyn WorkspaceClient> = Arc::new(GuardedClient::from_config(client, &config));
        Self::build(guarded.clone(), guarded, config)
    }

    /// Engine with independent source and target services, each with its
    /// own request limiter
    pub fn with_clients(
        source_client: Arc<dyn WorkspaceClient>,
        target_client: Arc<dyn WorkspaceClient>,
        config: SyncConfig,
    ) -> Self {
        let source: Arc<dyn WorkspaceClient> = Arc::new(GuardedClient::from_config(source_client, &config));
        let target: Arc<dyn WorkspaceClient> = Arc::new(GuardedClient::from_config(target_client, &config));
        Self::build(source, target, config)
    }

    fn build(
        source_client: Arc<dyn WorkspaceClient>,
        target_client: Arc<dyn WorkspaceClient>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source_client,
            target_client,
            comparator_limiter: ConcurrencyLimiter::for_comparators(&config.concurrency),
            config,
            progress: AnalysisProgress::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Progress handle of the current or last analysis
    pub fn progress(&self) -> AnalysisProgress {
        self.progress.clone()
    }

    /// Compare `source` against `target`. Always returns a snapshot; entity
    /// types that could not be compared are listed in its notes.
    pub async fn analyze_differences(&self, source: &WorkspaceRef, target: &WorkspaceRef) -> Differences {
        ::log::info!("Analyzing differences from {} to {}", source, target);
        let ctx = ComparisonContext {
            source_client: self.source_client.clone(),
            target_client: self.target_client.clone(),
            source: source.clone(),
            target: target.clone(),
            config: self.config.comparison.clone(),
            max_parallel_lookups: self.config.concurrency.max_parallel_lookups,
        };
        let comparators = comparators_for(&self.config.comparison);
        run_comparators(&comparators, &ctx, &self.comparator_limiter, &self.progress).await
    }

    /// Apply the selected records of `differences` to `target`. Fails before
    /// any mutating call when source and target are the same workspace or
    /// the snapshot does not fit `target`.
    pub async fn apply_selected_changes(
        &self,
        differences: &Differences,
        target: &WorkspaceRef,
    ) -> Result<ApplyOutcome, SyncError> {
        execution::apply_selected_changes(
            self.source_client.as_ref(),
            self.target_client.as_ref(),
            differences,
            target,
            &self.config.comparison,
            &self.config.snapshot,
        )
        .await
    }
}
