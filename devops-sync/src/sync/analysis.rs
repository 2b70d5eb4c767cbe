//! Analysis: runs one comparator per entity type and assembles the
//! `Differences` snapshot
//!
//! Comparators run concurrently, bounded by the comparator limiter. A
//! comparator that fails (permission, not found, timeout) contributes an
//! empty slice and a guidance note; it never aborts the other entity types.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{self, StreamExt};

use super::logic::isolation::{cross_organization_advisory, ensure_belongs_to_scope};
use super::logic::security_groups::{dedup_members, membership_difference, partition_members, unresolved_difference};
use super::logic::{compare_classification_nodes, compare_queries, compare_work_items};
use super::types::{
    AnalysisNote, ClassificationDiff, Difference, DifferenceType, Differences, GroupMembershipDiff,
    QueryDiff, WorkItemDiff,
};
use crate::api::client::WorkspaceClient;
use crate::api::models::{
    ClassificationNode, FetchOptions, GroupMember, GroupSummary, QueryNode, Record, RecordKind,
    WorkItem, WorkspaceRef,
};
use crate::api::resilience::ConcurrencyLimiter;
use crate::config::ComparisonConfig;
use crate::error::{ErrorKind, RemoteError};

/// Everything a comparator needs; shared read-only by all comparators
pub struct ComparisonContext {
    pub source_client: Arc<dyn WorkspaceClient>,
    pub target_client: Arc<dyn WorkspaceClient>,
    pub source: WorkspaceRef,
    pub target: WorkspaceRef,
    pub config: ComparisonConfig,
    /// Record-level parallelism inside a comparator
    pub max_parallel_lookups: usize,
}

/// One comparator's share of the snapshot
#[derive(Debug, Clone)]
pub enum ComparisonSlice {
    WorkItems(Vec<Difference<WorkItemDiff>>),
    ClassificationNodes(Vec<Difference<ClassificationDiff>>),
    SecurityGroups(Vec<Difference<GroupMembershipDiff>>),
    Queries(Vec<Difference<QueryDiff>>),
}

#[derive(Debug, Clone)]
pub struct ComparatorOutput {
    pub slice: ComparisonSlice,
    pub notes: Vec<AnalysisNote>,
}

impl ComparatorOutput {
    fn new(slice: ComparisonSlice) -> Self {
        Self {
            slice,
            notes: Vec::new(),
        }
    }
}

/// Compares one entity type between source and target
#[async_trait]
pub trait EntityComparator: Send + Sync {
    fn kind(&self) -> RecordKind;

    /// Fetch both sides and classify every source record. Remote failures
    /// that prevent the comparison are returned; per-record failures become
    /// `Error` differences.
    async fn compare(&self, ctx: &ComparisonContext) -> Result<ComparatorOutput, RemoteError>;
}

/// Progress of a single comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparatorPhase {
    Pending,
    Running,
    Complete,
    Failed,
}

/// Per entity type progress of the current analysis, readable while it runs
#[derive(Debug, Clone, Default)]
pub struct AnalysisProgress {
    phases: Arc<RwLock<BTreeMap<RecordKind, ComparatorPhase>>>,
}

impl AnalysisProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, kind: RecordKind, phase: ComparatorPhase) {
        if let Ok(mut phases) = self.phases.write() {
            phases.insert(kind, phase);
        }
    }

    fn reset(&self) {
        if let Ok(mut phases) = self.phases.write() {
            phases.clear();
        }
    }

    pub fn phase(&self, kind: RecordKind) -> Option<ComparatorPhase> {
        self.phases.read().ok().and_then(|p| p.get(&kind).copied())
    }

    pub fn snapshot(&self) -> BTreeMap<RecordKind, ComparatorPhase> {
        self.phases.read().map(|p| p.clone()).unwrap_or_default()
    }
}

fn fetch_subject(kind: RecordKind, ctx: &ComparisonContext) -> String {
    format!(
        "{} of '{}' and '{}'",
        kind.label().to_lowercase(),
        ctx.source.display_name,
        ctx.target.display_name
    )
}

async fn fetch_both(
    ctx: &ComparisonContext,
    kind: RecordKind,
    options: &FetchOptions,
) -> Result<(Vec<Record>, Vec<Record>), RemoteError> {
    tokio::try_join!(
        ctx.source_client.fetch_records(&ctx.source, kind, options),
        ctx.target_client.fetch_records(&ctx.target, kind, options),
    )
}

fn work_items(records: Vec<Record>) -> Vec<WorkItem> {
    records
        .into_iter()
        .filter_map(|r| match r {
            Record::WorkItem(item) => Some(item),
            _ => None,
        })
        .collect()
}

fn classification_roots(records: Vec<Record>) -> Vec<ClassificationNode> {
    records
        .into_iter()
        .filter_map(|r| match r {
            Record::ClassificationNode(node) => Some(node),
            _ => None,
        })
        .collect()
}

fn query_roots(records: Vec<Record>) -> Vec<QueryNode> {
    records
        .into_iter()
        .filter_map(|r| match r {
            Record::Query(node) => Some(node),
            _ => None,
        })
        .collect()
}

fn group_summaries(records: Vec<Record>) -> Vec<GroupSummary> {
    records
        .into_iter()
        .filter_map(|r| match r {
            Record::SecurityGroup(group) => Some(group),
            _ => None,
        })
        .collect()
}

pub struct WorkItemComparator;

#[async_trait]
impl EntityComparator for WorkItemComparator {
    fn kind(&self) -> RecordKind {
        RecordKind::WorkItem
    }

    async fn compare(&self, ctx: &ComparisonContext) -> Result<ComparatorOutput, RemoteError> {
        let (source, target) = fetch_both(ctx, RecordKind::WorkItem, &FetchOptions::default()).await?;
        let (source, target) = (work_items(source), work_items(target));
        log::info!(
            "Comparing {} source work items against {} target work items",
            source.len(),
            target.len()
        );

        let diffs = compare_work_items(
            &source,
            &target,
            ctx.source.namespace(),
            ctx.target.namespace(),
        );
        Ok(ComparatorOutput::new(ComparisonSlice::WorkItems(diffs)))
    }
}

pub struct ClassificationComparator;

#[async_trait]
impl EntityComparator for ClassificationComparator {
    fn kind(&self) -> RecordKind {
        RecordKind::ClassificationNode
    }

    async fn compare(&self, ctx: &ComparisonContext) -> Result<ComparatorOutput, RemoteError> {
        let options = FetchOptions::with_depth(ctx.config.classification_depth);
        let (source, target) = fetch_both(ctx, RecordKind::ClassificationNode, &options).await?;
        let (source, target) = (classification_roots(source), classification_roots(target));

        // Target roots carry the project name; anything else came from another scope
        let mut notes = Vec::new();
        for root in &target {
            if let Err(violation) = ensure_belongs_to_scope(&ctx.target, &root.name) {
                notes.push(AnalysisNote {
                    record_kind: Some(RecordKind::ClassificationNode),
                    error_kind: Some(violation.kind()),
                    message: violation.to_string(),
                });
            }
        }
        if !notes.is_empty() {
            return Ok(ComparatorOutput {
                slice: ComparisonSlice::ClassificationNodes(Vec::new()),
                notes,
            });
        }

        let diffs = compare_classification_nodes(&source, &target, &ctx.config);
        Ok(ComparatorOutput::new(ComparisonSlice::ClassificationNodes(diffs)))
    }
}

pub struct QueryComparator;

#[async_trait]
impl EntityComparator for QueryComparator {
    fn kind(&self) -> RecordKind {
        RecordKind::Query
    }

    async fn compare(&self, ctx: &ComparisonContext) -> Result<ComparatorOutput, RemoteError> {
        let options = FetchOptions::with_depth(ctx.config.query_depth);
        let (source, target) = fetch_both(ctx, RecordKind::Query, &options).await?;

        let diffs = compare_queries(
            &query_roots(source),
            &query_roots(target),
            ctx.source.namespace(),
            ctx.target.namespace(),
            &ctx.config,
        );
        Ok(ComparatorOutput::new(ComparisonSlice::Queries(diffs)))
    }
}

/// A group with its membership resolved down to users
#[derive(Debug, Clone)]
pub struct ResolvedGroup {
    pub principal_name: String,
    pub users: Vec<GroupMember>,
}

/// Resolve `group_name` transitively through nested groups, up to
/// `max_nesting` levels. `None` when the group itself cannot be read.
pub async fn resolve_members(
    client: &dyn WorkspaceClient,
    workspace: &WorkspaceRef,
    group_name: &str,
    max_nesting: usize,
    parallel_lookups: usize,
) -> Result<Option<ResolvedGroup>, RemoteError> {
    let Some(root) = client.fetch_group_members(workspace, group_name).await? else {
        return Ok(None);
    };

    let mut visited: HashSet<String> = HashSet::from([group_name.to_lowercase()]);
    let mut users = Vec::new();
    let mut frontier = root.members;
    let mut depth = 0;

    loop {
        let mut nested = Vec::new();
        for member in frontier {
            if !member.is_group {
                users.push(member);
            } else if visited.insert(member.display_name.to_lowercase()) {
                nested.push(member.display_name);
            }
        }

        if nested.is_empty() {
            break;
        }
        depth += 1;
        if depth > max_nesting {
            log::warn!(
                "Group '{}' nests deeper than {} levels; ignoring {} nested group(s)",
                group_name,
                max_nesting,
                nested.len()
            );
            break;
        }

        // Ordered so the resolved member list is stable across runs
        let lookups: Vec<_> = nested
            .iter()
            .map(|name| client.fetch_group_members(workspace, name))
            .collect();
        let infos: Vec<_> = stream::iter(lookups)
            .buffered(parallel_lookups.max(1))
            .collect()
            .await;

        frontier = Vec::new();
        for (name, info) in nested.iter().zip(infos) {
            match info? {
                Some(info) => frontier.extend(info.members),
                None => log::debug!("Nested group '{}' of '{}' is not readable", name, group_name),
            }
        }
    }

    Ok(Some(ResolvedGroup {
        principal_name: root.principal_name,
        users: dedup_members(users),
    }))
}

pub struct SecurityGroupComparator;

impl SecurityGroupComparator {
    async fn compare_group(
        &self,
        ctx: &ComparisonContext,
        source: &GroupSummary,
        targets: &[GroupSummary],
    ) -> (Difference<GroupMembershipDiff>, Option<AnalysisNote>) {
        let name = source.name.as_str();
        let leak_note = |message: String| AnalysisNote {
            record_kind: Some(RecordKind::SecurityGroup),
            error_kind: Some(ErrorKind::CrossScopeLeak),
            message,
        };

        let Some(target) = targets.iter().find(|t| t.name.eq_ignore_ascii_case(name)) else {
            let guidance = format!(
                "Group '{}' does not exist in '{}'; create it there before syncing its membership",
                name, ctx.target.display_name
            );
            return (
                unresolved_difference(&source.id, None, name, DifferenceType::Missing, guidance),
                None,
            );
        };

        if let Err(violation) = ensure_belongs_to_scope(&ctx.target, &target.principal_name) {
            let message = violation.to_string();
            return (
                unresolved_difference(&source.id, Some(&target.id), name, DifferenceType::Error, message.clone()),
                Some(leak_note(message)),
            );
        }

        let max_nesting = ctx.config.max_group_nesting;
        let lookups = ctx.max_parallel_lookups;
        let (source_members, target_members) = tokio::join!(
            resolve_members(ctx.source_client.as_ref(), &ctx.source, name, max_nesting, lookups),
            resolve_members(ctx.target_client.as_ref(), &ctx.target, name, max_nesting, lookups),
        );

        let unreadable = |side: &WorkspaceRef| {
            format!(
                "Members of group '{}' in '{}' could not be read (missing or no permission). Grant read access to the group and re-run the analysis.",
                name, side.display_name
            )
        };

        let source_members = match source_members {
            Ok(Some(group)) => group,
            Ok(None) => {
                let guidance = unreadable(&ctx.source);
                return (
                    unresolved_difference(&source.id, Some(&target.id), name, DifferenceType::Error, guidance),
                    None,
                );
            }
            Err(e) => {
                let guidance = e.guidance(&format!("group '{}' in '{}'", name, ctx.source.display_name));
                return (
                    unresolved_difference(&source.id, Some(&target.id), name, DifferenceType::Error, guidance),
                    None,
                );
            }
        };

        let target_members = match target_members {
            Ok(Some(group)) => group,
            Ok(None) => {
                let guidance = unreadable(&ctx.target);
                return (
                    unresolved_difference(&source.id, Some(&target.id), name, DifferenceType::Error, guidance),
                    None,
                );
            }
            Err(e) => {
                let guidance = e.guidance(&format!("group '{}' in '{}'", name, ctx.target.display_name));
                return (
                    unresolved_difference(&source.id, Some(&target.id), name, DifferenceType::Error, guidance),
                    None,
                );
            }
        };

        if let Err(violation) = ensure_belongs_to_scope(&ctx.target, &target_members.principal_name) {
            let message = violation.to_string();
            return (
                unresolved_difference(&source.id, Some(&target.id), name, DifferenceType::Error, message.clone()),
                Some(leak_note(message)),
            );
        }

        let diff = partition_members(&source_members.users, &target_members.users);
        (membership_difference(&source.id, &target.id, diff, name), None)
    }
}

#[async_trait]
impl EntityComparator for SecurityGroupComparator {
    fn kind(&self) -> RecordKind {
        RecordKind::SecurityGroup
    }

    async fn compare(&self, ctx: &ComparisonContext) -> Result<ComparatorOutput, RemoteError> {
        let (source, target) = fetch_both(ctx, RecordKind::SecurityGroup, &FetchOptions::default()).await?;
        let source: Vec<_> = group_summaries(source)
            .into_iter()
            .filter(|g| ctx.config.includes_group(&g.name))
            .collect();
        let target = group_summaries(target);
        log::info!("Comparing membership of {} security group(s)", source.len());

        let comparisons: Vec<_> = source
            .iter()
            .map(|group| self.compare_group(ctx, group, &target))
            .collect();
        let results: Vec<_> = stream::iter(comparisons)
            .buffered(ctx.max_parallel_lookups.max(1))
            .collect()
            .await;

        let mut diffs = Vec::with_capacity(results.len());
        let mut notes = Vec::new();
        for (diff, note) in results {
            diffs.push(diff);
            notes.extend(note);
        }
        diffs.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(ComparatorOutput {
            slice: ComparisonSlice::SecurityGroups(diffs),
            notes,
        })
    }
}

/// Comparators enabled by `config`, in entity type order
pub fn comparators_for(config: &ComparisonConfig) -> Vec<Box<dyn EntityComparator>> {
    let mut comparators: Vec<Box<dyn EntityComparator>> = Vec::new();
    if config.include_work_items {
        comparators.push(Box::new(WorkItemComparator));
    }
    if config.include_classification_nodes {
        comparators.push(Box::new(ClassificationComparator));
    }
    if config.include_security_groups {
        comparators.push(Box::new(SecurityGroupComparator));
    }
    if config.include_queries {
        comparators.push(Box::new(QueryComparator));
    }
    comparators
}

/// Run `comparators` concurrently and assemble their output
pub async fn run_comparators(
    comparators: &[Box<dyn EntityComparator>],
    ctx: &ComparisonContext,
    limiter: &ConcurrencyLimiter,
    progress: &AnalysisProgress,
) -> Differences {
    let mut differences = Differences::new(ctx.source.clone(), ctx.target.clone());
    if let Some(advisory) = cross_organization_advisory(&ctx.source, &ctx.target) {
        differences.notes.push(AnalysisNote {
            record_kind: None,
            error_kind: None,
            message: advisory,
        });
    }

    progress.reset();
    for comparator in comparators {
        progress.set(comparator.kind(), ComparatorPhase::Pending);
    }

    let outputs = join_all(comparators.iter().map(|comparator| async move {
        let _permit = limiter.acquire().await;
        let kind = comparator.kind();
        progress.set(kind, ComparatorPhase::Running);
        log::debug!("Comparator '{}' started", kind);
        (kind, comparator.compare(ctx).await)
    }))
    .await;

    for (kind, result) in outputs {
        match result {
            Ok(output) => {
                progress.set(kind, ComparatorPhase::Complete);
                differences.notes.extend(output.notes);
                match output.slice {
                    ComparisonSlice::WorkItems(d) => differences.work_items = d,
                    ComparisonSlice::ClassificationNodes(d) => differences.classification_nodes = d,
                    ComparisonSlice::SecurityGroups(d) => differences.security_groups = d,
                    ComparisonSlice::Queries(d) => differences.queries = d,
                }
            }
            Err(e) => {
                progress.set(kind, ComparatorPhase::Failed);
                log::warn!("Comparing {} failed: {}", kind, e);
                differences.notes.push(AnalysisNote {
                    record_kind: Some(kind),
                    error_kind: Some(e.kind()),
                    message: e.guidance(&fetch_subject(kind, ctx)),
                });
            }
        }
    }

    log::info!(
        "Analysis {} complete: {} work items, {} classification nodes, {} groups, {} queries, {} note(s)",
        differences.snapshot_id,
        differences.work_items.len(),
        differences.classification_nodes.len(),
        differences.security_groups.len(),
        differences.queries.len(),
        differences.notes.len()
    );
    differences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::InMemoryWorkspaceClient;

    fn setup() -> (Arc<InMemoryWorkspaceClient>, WorkspaceRef) {
        let client = Arc::new(InMemoryWorkspaceClient::new());
        let ws = WorkspaceRef::new("p1", "ProjA", "https://dev.azure.com/contoso");
        client.add_workspace(&ws);
        (client, ws)
    }

    #[tokio::test]
    async fn test_resolve_members_through_nested_groups() {
        let (client, ws) = setup();
        client.add_group(
            &ws,
            "Contributors",
            vec![
                GroupMember::user("Alice", Some("alice@contoso.com"), None),
                GroupMember::group("Team"),
            ],
        );
        client.add_group(
            &ws,
            "Team",
            vec![
                GroupMember::user("Bob", Some("bob@contoso.com"), None),
                GroupMember::user("Alice", Some("ALICE@contoso.com"), None),
                GroupMember::group("Contributors"),
            ],
        );

        let resolved = resolve_members(client.as_ref(), &ws, "Contributors", 8, 2)
            .await
            .unwrap()
            .unwrap();
        let names: Vec<_> = resolved.users.iter().map(|m| m.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert_eq!(resolved.principal_name, "[ProjA]\\Contributors");
    }

    #[tokio::test]
    async fn test_resolve_members_respects_nesting_limit() {
        let (client, ws) = setup();
        client.add_group(&ws, "Outer", vec![GroupMember::group("Inner")]);
        client.add_group(&ws, "Inner", vec![GroupMember::user("Bob", Some("bob@contoso.com"), None)]);

        let resolved = resolve_members(client.as_ref(), &ws, "Outer", 0, 2).await.unwrap().unwrap();
        assert!(resolved.users.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_group_is_none() {
        let (client, ws) = setup();
        let resolved = resolve_members(client.as_ref(), &ws, "Nope", 8, 2).await.unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn test_comparators_follow_include_flags() {
        let config = ComparisonConfig {
            include_security_groups: false,
            ..Default::default()
        };
        let kinds: Vec<_> = comparators_for(&config).iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![RecordKind::WorkItem, RecordKind::ClassificationNode, RecordKind::Query]
        );
    }
}
