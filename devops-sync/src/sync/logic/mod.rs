//! Pure comparison and validation logic
//!
//! - Per-entity comparators over fetched snapshots
//! - WIQL namespace rewriting
//! - Workspace isolation checks
//! - Tree flattening
//! - Analysis summaries

pub mod classification;
pub mod isolation;
pub mod queries;
pub mod security_groups;
pub mod summary;
pub mod tree;
pub mod wiql;
pub mod work_items;

pub use classification::compare_classification_nodes;
pub use isolation::{belongs_to_scope, cross_organization_advisory, ensure_belongs_to_scope, ensure_distinct_scopes};
pub use queries::compare_queries;
pub use security_groups::partition_members;
pub use summary::{build_summary, DifferencesSummary, KindSummary, ManualReviewItem};
pub use tree::{flatten, path_prefixes, FlatNode, TreeNode};
pub use wiql::{rewrite, RewriteOutcome, RewriteStep};
pub use work_items::{compare_work_items, retarget_path};
