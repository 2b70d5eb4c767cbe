//! Workspace isolation checks
//!
//! Pure validation run before mutating calls, and during analysis for
//! target-scoped lookups.

use crate::api::models::WorkspaceRef;
use crate::error::IsolationViolation;

/// Fails when `source` and `target` are the same workspace: equal ids, or
/// equal names on the same host
pub fn ensure_distinct_scopes(
    source: &WorkspaceRef,
    target: &WorkspaceRef,
) -> Result<(), IsolationViolation> {
    let same_id = source.id.eq_ignore_ascii_case(&target.id);
    let same_name_and_host = source.normalized_host() == target.normalized_host()
        && source.display_name.eq_ignore_ascii_case(&target.display_name);

    if same_id || same_name_and_host {
        return Err(IsolationViolation::SameScope {
            workspace: target.display_name.clone(),
        });
    }
    Ok(())
}

/// Whether `resolved` (a principal name or path) names `workspace` as one
/// of its segments, e.g. `[ProjB]\Contributors` or `ProjB\Web`
pub fn belongs_to_scope(workspace: &WorkspaceRef, resolved: &str) -> bool {
    let namespace = workspace.namespace().trim();
    !namespace.is_empty()
        && resolved
            .split(['[', ']', '\\', '/', ':'])
            .map(str::trim)
            .any(|segment| segment.eq_ignore_ascii_case(namespace))
}

/// Fails when something returned for `workspace` does not belong to it
pub fn ensure_belongs_to_scope(
    workspace: &WorkspaceRef,
    resolved: &str,
) -> Result<(), IsolationViolation> {
    if belongs_to_scope(workspace, resolved) {
        Ok(())
    } else {
        log::error!(
            "Cross-scope leak: '{}' returned for workspace '{}'",
            resolved,
            workspace.display_name
        );
        Err(IsolationViolation::CrossScopeLeak {
            workspace: workspace.display_name.clone(),
            resolved: resolved.to_string(),
        })
    }
}

/// Advisory text when source and target live on different hosts.
/// Never fails; logs a warning when it applies.
pub fn cross_organization_advisory(source: &WorkspaceRef, target: &WorkspaceRef) -> Option<String> {
    if source.normalized_host() == target.normalized_host() {
        return None;
    }
    let message = format!(
        "Cross-organization copy from {} to {}; identities are matched by email or principal name only",
        source, target
    );
    log::warn!("{}", message);
    Some(message)
}
