//! Saved query comparison
//!
//! Queries and folders are matched by their full path. Query text is
//! retargeted before it is compared, so a query that only names the
//! source project is in sync with its retargeted copy.

use std::collections::HashMap;

use super::tree::flatten;
use super::wiql::rewrite;
use crate::api::models::{QueryNode, RecordKind};
use crate::config::ComparisonConfig;
use crate::sync::types::{Difference, DifferenceType, QueryDiff, RecordKey};

/// Query texts that differ only in whitespace are the same query
pub(crate) fn wiql_equal(a: Option<&str>, b: Option<&str>) -> bool {
    let normalize = |s: Option<&str>| s.map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "));
    normalize(a) == normalize(b)
}

/// Compare source and target query hierarchies
pub fn compare_queries(
    source_roots: &[QueryNode],
    target_roots: &[QueryNode],
    source_namespace: &str,
    target_namespace: &str,
    config: &ComparisonConfig,
) -> Vec<Difference<QueryDiff>> {
    let target_map: HashMap<RecordKey, &QueryNode> = flatten(target_roots, '/', config.query_depth)
        .into_iter()
        .map(|flat| (RecordKey::query(&flat.path), flat.node))
        .collect();

    let mut diffs = Vec::new();
    for flat in flatten(source_roots, '/', config.query_depth) {
        if config.is_trashed(&flat.path) {
            log::debug!("Excluding trashed query '{}'", flat.path);
            continue;
        }

        let node = flat.node;
        let key = RecordKey::query(&flat.path);
        let target = target_map.get(&key).copied();

        let outcome = node
            .wiql
            .as_deref()
            .map(|wiql| rewrite(wiql, source_namespace, target_namespace));
        let rewritten = outcome.as_ref().map(|o| o.text.clone());

        let mut changes = Vec::new();
        let (difference_type, description) = match target {
            None if node.is_folder => (
                DifferenceType::New,
                format!("New folder '{}'", flat.path),
            ),
            None => (DifferenceType::New, format!("New query '{}'", flat.path)),
            Some(t) if t.is_folder != node.is_folder => (
                DifferenceType::Error,
                format!(
                    "'{}' is a {} in the source but a {} in the target; resolve manually",
                    flat.path,
                    if node.is_folder { "folder" } else { "query" },
                    if t.is_folder { "folder" } else { "query" },
                ),
            ),
            Some(_) if node.is_folder => (DifferenceType::Synchronized, "In sync".to_string()),
            Some(t) => {
                if !wiql_equal(rewritten.as_deref(), t.wiql.as_deref()) {
                    changes.push("Query text".to_string());
                }
                if node.is_public != t.is_public {
                    changes.push(format!(
                        "Visibility ({} -> {})",
                        if t.is_public { "public" } else { "private" },
                        if node.is_public { "public" } else { "private" },
                    ));
                }
                if changes.is_empty() {
                    (DifferenceType::Synchronized, "In sync".to_string())
                } else {
                    (DifferenceType::Updated, changes.join(", "))
                }
            }
        };

        diffs.push(Difference {
            key,
            source_id: node.id.clone(),
            target_id: target.map(|t| t.id.clone()),
            record_kind: RecordKind::Query,
            difference_type,
            description,
            selected: false,
            payload: QueryDiff {
                name: node.name.clone(),
                path: flat.path,
                parent_path: flat.parent_path,
                is_folder: node.is_folder,
                source_wiql: node.wiql.clone(),
                rewritten_wiql: rewritten,
                rewrite_steps: outcome.map(|o| o.applied).unwrap_or_default(),
                target_wiql: target.and_then(|t| t.wiql.clone()),
                is_public: node.is_public,
                target_is_public: target.map(|t| t.is_public),
                changes,
            },
        });
    }

    diffs.sort_by(|a, b| a.key.cmp(&b.key));
    diffs
}
