//! WIQL namespace rewriting
//!
//! Retargets query text from the source workspace's namespace to the
//! target's. Steps run in a fixed order, each on the previous output:
//! 1. `[System.TeamProject] = 'Src'` clauses
//! 2. `[System.AreaPath]` / `[System.IterationPath]` clauses with `UNDER` or `=`
//! 3. any remaining `'Src'` literal
//! 4. removal of `@project 'Name'` cross-project directives
//!
//! Step 3 also rewrites unrelated literals that happen to equal the source
//! namespace.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static CROSS_PROJECT_DIRECTIVE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\s*@project\s*(?:\(\s*'[^']*'\s*\)|'[^']*')").ok());

/// A rewrite step that changed the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewriteStep {
    ProjectClause,
    PathClause,
    Literal,
    CrossProjectDirective,
}

impl RewriteStep {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProjectClause => "team project clause",
            Self::PathClause => "area/iteration path clause",
            Self::Literal => "namespace literal",
            Self::CrossProjectDirective => "cross-project directive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    /// Steps that matched, in the order they ran
    pub applied: Vec<RewriteStep>,
}

impl RewriteOutcome {
    /// True when no step matched and `text` is the input unchanged
    pub fn is_passthrough(&self) -> bool {
        self.applied.is_empty()
    }

    /// Short description for logs
    pub fn summary(&self) -> String {
        if self.is_passthrough() {
            "query text unchanged".to_string()
        } else {
            let steps: Vec<_> = self.applied.iter().map(|s| s.label()).collect();
            format!("rewrote {}", steps.join(", "))
        }
    }
}

fn project_clause(source: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"(?i)(\[(?:System\.TeamProject|Team Project)\]\s*=\s*)'{}'",
        regex::escape(source)
    ))
    .ok()
}

fn path_clause(source: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"(?i)(\[(?:System\.AreaPath|Area Path|System\.IterationPath|Iteration Path)\]\s*(?:NOT\s+)?(?:UNDER|=)\s*)'{}(\\[^']*)?'",
        regex::escape(source)
    ))
    .ok()
}

/// Run `re` over `text`, recording `step` if it matched
fn apply_step<F>(text: String, re: Option<Regex>, step: RewriteStep, applied: &mut Vec<RewriteStep>, rep: F) -> String
where
    F: FnMut(&Captures) -> String,
{
    match re {
        Some(re) if re.is_match(&text) => {
            applied.push(step);
            re.replace_all(&text, rep).into_owned()
        }
        _ => text,
    }
}

/// Retarget `text` from `source_namespace` to `target_namespace`
pub fn rewrite(text: &str, source_namespace: &str, target_namespace: &str) -> RewriteOutcome {
    let mut applied = Vec::new();
    if source_namespace.is_empty() {
        return RewriteOutcome {
            text: text.to_string(),
            applied,
        };
    }

    let text = apply_step(
        text.to_string(),
        project_clause(source_namespace),
        RewriteStep::ProjectClause,
        &mut applied,
        |caps| format!("{}'{}'", &caps[1], target_namespace),
    );

    let text = apply_step(
        text,
        path_clause(source_namespace),
        RewriteStep::PathClause,
        &mut applied,
        |caps| {
            let suffix = caps.get(2).map_or("", |m| m.as_str());
            format!("{}'{}{}'", &caps[1], target_namespace, suffix)
        },
    );

    let literal = format!("'{}'", source_namespace);
    let text = if text.contains(&literal) {
        applied.push(RewriteStep::Literal);
        text.replace(&literal, &format!("'{}'", target_namespace))
    } else {
        text
    };

    let text = apply_step(
        text,
        CROSS_PROJECT_DIRECTIVE.clone(),
        RewriteStep::CrossProjectDirective,
        &mut applied,
        |_| String::new(),
    );

    if !applied.is_empty() {
        log::debug!(
            "Rewrote WIQL from '{}' to '{}' ({} step(s))",
            source_namespace,
            target_namespace,
            applied.len()
        );
    }

    RewriteOutcome { text, applied }
}
