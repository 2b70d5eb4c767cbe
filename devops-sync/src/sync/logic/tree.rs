//! Iterative flattening of classification and query hierarchies
//!
//! Produces a flat list in pre-order (parent before child, siblings in
//! their original order), each entry annotated with its computed path.

use crate::api::models::{ClassificationNode, QueryNode};

/// A node with named children
pub trait TreeNode: Sized {
    fn name(&self) -> &str;
    fn children(&self) -> &[Self];
}

impl TreeNode for ClassificationNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

impl TreeNode for QueryNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode<'a, T> {
    pub node: &'a T,
    pub path: String,
    pub parent_path: Option<String>,
    /// 1 for the nodes passed in as roots
    pub depth: u32,
}

/// Flatten `roots` and their descendants down to `max_depth`
pub fn flatten<T: TreeNode>(roots: &[T], separator: char, max_depth: u32) -> Vec<FlatNode<'_, T>> {
    let mut flat = Vec::new();
    // (node, parent path, depth); pushed in reverse so pops keep sibling order
    let mut stack: Vec<(&T, Option<String>, u32)> =
        roots.iter().rev().map(|n| (n, None, 1)).collect();

    while let Some((node, parent_path, depth)) = stack.pop() {
        if depth > max_depth {
            continue;
        }

        let path = match &parent_path {
            Some(parent) => format!("{}{}{}", parent, separator, node.name()),
            None => node.name().to_string(),
        };

        for child in node.children().iter().rev() {
            stack.push((child, Some(path.clone()), depth + 1));
        }

        flat.push(FlatNode {
            node,
            path,
            parent_path,
            depth,
        });
    }

    flat
}

/// Every ancestor prefix of `path` including `path` itself, shortest first
pub fn path_prefixes(path: &str, separator: char) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut current = String::new();
    for segment in path.split(separator).filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push(separator);
        }
        current.push_str(segment);
        prefixes.push(current.clone());
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::NodeStructure;

    fn node(name: &str, children: Vec<ClassificationNode>) -> ClassificationNode {
        ClassificationNode {
            id: name.to_lowercase(),
            name: name.to_string(),
            structure: NodeStructure::Area,
            children,
        }
    }

    #[test]
    fn test_flatten_preorder_with_paths() {
        let roots = vec![
            node("Web", vec![node("Frontend", vec![node("Forms", vec![])]), node("Api", vec![])]),
            node("Mobile", vec![]),
        ];

        let flat = flatten(&roots, '\\', 16);
        let paths: Vec<_> = flat.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["Web", "Web\\Frontend", "Web\\Frontend\\Forms", "Web\\Api", "Mobile"]
        );
        assert_eq!(flat[2].parent_path.as_deref(), Some("Web\\Frontend"));
        assert_eq!(flat[2].depth, 3);
    }

    #[test]
    fn test_flatten_depth_limit() {
        let roots = vec![node("Web", vec![node("Frontend", vec![node("Forms", vec![])])])];
        let flat = flatten(&roots, '\\', 2);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].path, "Web\\Frontend");
    }

    #[test]
    fn test_path_prefixes() {
        assert_eq!(
            path_prefixes("Shared Queries/Team/Sprint1", '/'),
            vec!["Shared Queries", "Shared Queries/Team", "Shared Queries/Team/Sprint1"]
        );
        assert!(path_prefixes("", '/').is_empty());
    }
}
