//! Area and iteration tree comparison
//!
//! Trees are flattened below their project-named root and matched by
//! relative path. A matched node differs only when its name differs in
//! case.

use std::collections::HashMap;

use super::tree::flatten;
use crate::api::models::{ClassificationNode, NodeStructure, RecordKind};
use crate::config::ComparisonConfig;
use crate::sync::types::{ClassificationDiff, Difference, DifferenceType, RecordKey};

/// Flattened (structure, relative path, node) triples of the given roots
pub fn flatten_roots(
    roots: &[ClassificationNode],
    max_depth: u32,
) -> Vec<(NodeStructure, String, Option<String>, &ClassificationNode)> {
    roots
        .iter()
        .flat_map(|root| {
            flatten(&root.children, '\\', max_depth)
                .into_iter()
                .map(move |flat| (root.structure, flat.path, flat.parent_path, flat.node))
        })
        .collect()
}

/// Compare source and target area/iteration roots
pub fn compare_classification_nodes(
    source_roots: &[ClassificationNode],
    target_roots: &[ClassificationNode],
    config: &ComparisonConfig,
) -> Vec<Difference<ClassificationDiff>> {
    let target_map: HashMap<RecordKey, &ClassificationNode> =
        flatten_roots(target_roots, config.classification_depth)
            .into_iter()
            .map(|(structure, path, _, node)| (RecordKey::classification(structure, &path), node))
            .collect();

    let mut diffs: Vec<_> = flatten_roots(source_roots, config.classification_depth)
        .into_iter()
        .filter(|(_, path, _, _)| {
            let trashed = config.is_trashed(path);
            if trashed {
                log::debug!("Excluding trashed classification node '{}'", path);
            }
            !trashed
        })
        .map(|(structure, path, parent_path, node)| {
            let key = RecordKey::classification(structure, &path);
            let target = target_map.get(&key).copied();

            let (difference_type, description) = match target {
                None => (
                    DifferenceType::New,
                    format!("New {} node '{}'", structure.label(), path),
                ),
                Some(t) if t.name != node.name => (
                    DifferenceType::Updated,
                    format!("Name ('{}' -> '{}')", t.name, node.name),
                ),
                Some(_) => (DifferenceType::Synchronized, "In sync".to_string()),
            };

            Difference {
                key,
                source_id: node.id.clone(),
                target_id: target.map(|t| t.id.clone()),
                record_kind: RecordKind::ClassificationNode,
                difference_type,
                description,
                selected: false,
                payload: ClassificationDiff {
                    structure,
                    name: node.name.clone(),
                    path,
                    parent_path,
                    target_name: target.map(|t| t.name.clone()),
                },
            }
        })
        .collect();

    // Prefix keys sort first, so parents stay ahead of their children
    diffs.sort_by(|a, b| a.key.cmp(&b.key));
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str, structure: NodeStructure, children: Vec<ClassificationNode>) -> ClassificationNode {
        ClassificationNode {
            id: id.to_string(),
            name: name.to_string(),
            structure,
            children,
        }
    }

    fn area_root(project: &str, children: Vec<ClassificationNode>) -> ClassificationNode {
        node("root", project, NodeStructure::Area, children)
    }

    #[test]
    fn test_roots_are_not_compared() {
        let source = vec![area_root("ProjA", vec![])];
        let target = vec![area_root("ProjB", vec![])];
        let diffs = compare_classification_nodes(&source, &target, &ComparisonConfig::default());
        assert!(diffs.is_empty());
    }

    #[test]
    fn test_new_updated_and_synchronized() {
        let a = NodeStructure::Area;
        let source = vec![area_root(
            "ProjA",
            vec![
                node("1", "Web", a, vec![node("2", "Frontend", a, vec![])]),
                node("3", "API", a, vec![]),
            ],
        )];
        let target = vec![area_root(
            "ProjB",
            vec![node("7", "Web", a, vec![]), node("8", "Api", a, vec![])],
        )];

        let diffs = compare_classification_nodes(&source, &target, &ComparisonConfig::default());
        let summary: Vec<_> = diffs
            .iter()
            .map(|d| (d.payload.path.as_str(), d.difference_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("API", DifferenceType::Updated),
                ("Web", DifferenceType::Synchronized),
                ("Web\\Frontend", DifferenceType::New),
            ]
        );
        assert_eq!(diffs[2].payload.parent_path.as_deref(), Some("Web"));
        assert_eq!(diffs[0].target_id.as_deref(), Some("8"));
    }

    #[test]
    fn test_trashed_nodes_excluded() {
        let a = NodeStructure::Area;
        let source = vec![area_root(
            "ProjA",
            vec![node("1", "Trash", a, vec![node("2", "Old", a, vec![])])],
        )];
        let diffs = compare_classification_nodes(&source, &[], &ComparisonConfig::default());
        assert!(diffs.is_empty());
    }

    #[test]
    fn test_area_and_iteration_are_separate() {
        let source = vec![
            area_root("ProjA", vec![node("1", "Sprint 1", NodeStructure::Area, vec![])]),
            node("r", "ProjA", NodeStructure::Iteration, vec![node("2", "Sprint 1", NodeStructure::Iteration, vec![])]),
        ];
        let target = vec![area_root("ProjB", vec![node("9", "Sprint 1", NodeStructure::Area, vec![])])];

        let diffs = compare_classification_nodes(&source, &target, &ComparisonConfig::default());
        assert_eq!(diffs.len(), 2);
        let iteration = diffs.iter().find(|d| d.payload.structure == NodeStructure::Iteration).unwrap();
        assert_eq!(iteration.difference_type, DifferenceType::New);
    }
}
