//! Rule partitioning.
//!
//! Divides the layered rule list into the groups the emitter writes, one
//! group per emitted file. Two policies:
//!
//! - `group_parallel_rules = true` (default): layers are processed in
//!   ascending order and each layer is chunked into consecutive groups of up
//!   to `max_per_group` rules, so every group is homogeneous in layer.
//! - `group_parallel_rules = false`: rules are walked in layer-then-source
//!   order and a new group starts when the current one is full *or* the layer
//!   changes; smaller groups appear at layer boundaries.
//!
//! Either way the group sequence is ordered by (min layer, group index),
//! which is exactly the order the generated coordinator runs them in, and
//! rules of the same layer keep their source order.

use crate::{Group, LayerMap, Rule};

pub(crate) fn partition(
    rules: Vec<Rule>,
    layers: &LayerMap,
    max_per_group: usize,
    group_parallel_rules: bool,
) -> Vec<Group> {
    let cap = max_per_group.max(1);

    // Layer-then-source order; the sort is stable, so same-layer rules keep
    // their file-then-line order from parsing.
    let mut ordered: Vec<(u32, Rule)> =
        rules.into_iter().map(|rule| (layers.get(&rule.name).unwrap_or(0), rule)).collect();
    ordered.sort_by_key(|(layer, _)| *layer);

    if group_parallel_rules { chunk_layers(ordered, cap) } else { linear_walk(ordered, cap) }
}

/// Chunk each layer's run of rules into consecutive groups of up to `cap`.
fn chunk_layers(ordered: Vec<(u32, Rule)>, cap: usize) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut iter = ordered.into_iter().peekable();
    while let Some((layer, first)) = iter.next() {
        let mut rules = vec![first];
        while rules.len() < cap && iter.peek().is_some_and(|(next_layer, _)| *next_layer == layer) {
            rules.push(iter.next().unwrap().1);
        }
        groups.push(Group { index: groups.len(), rules, min_layer: layer, max_layer: layer });
    }
    groups
}

/// Walk rules linearly, starting a new group when the current one is full or
/// the layer changes.
fn linear_walk(ordered: Vec<(u32, Rule)>, cap: usize) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut previous_layer: Option<u32> = None;
    for (layer, rule) in ordered {
        let start_new = match groups.last() {
            None => true,
            Some(group) => group.len() >= cap || previous_layer != Some(layer),
        };
        if start_new {
            groups.push(Group { index: groups.len(), rules: Vec::new(), min_layer: layer, max_layer: layer });
        }
        let group = groups.last_mut().unwrap();
        group.rules.push(rule);
        group.min_layer = group.min_layer.min(layer);
        group.max_layer = group.max_layer.max(layer);
        previous_layer = Some(layer);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::{Action, CompareOp, Condition, ConditionGroup, SourceLoc};

    fn rule(name: &str, line: usize) -> Rule {
        Rule {
            name: name.into(),
            description: None,
            conditions: ConditionGroup {
                all: vec![Condition::Comparison { sensor: "a".into(), op: CompareOp::Gt, value: 0.0 }],
                any: vec![],
            },
            actions: vec![Action::SendMessage { channel: "c".into(), message: "m".into() }],
            loc: SourceLoc { file: PathBuf::from("rules/test.yaml"), line },
        }
    }

    fn layered(names_and_layers: &[(&str, u32)]) -> (Vec<Rule>, LayerMap) {
        let mut layers = LayerMap::default();
        let mut rules = Vec::new();
        for (idx, (name, layer)) in names_and_layers.iter().enumerate() {
            rules.push(rule(name, idx * 6 + 2));
            layers.insert((*name).into(), *layer);
        }
        (rules, layers)
    }

    #[test]
    fn fifty_rules_chunk_into_three_groups() {
        let spec: Vec<(String, u32)> = (0..50).map(|i| (format!("R{i:02}"), 0)).collect();
        let borrowed: Vec<(&str, u32)> = spec.iter().map(|(n, l)| (n.as_str(), *l)).collect();
        let (rules, layers) = layered(&borrowed);

        let groups = partition(rules, &layers, 20, true);
        let sizes: Vec<usize> = groups.iter().map(Group::len).collect();
        assert_eq!(sizes, vec![20, 20, 10]);
        assert!(groups.iter().all(|g| g.min_layer == 0 && g.max_layer == 0));
        assert_eq!(groups.iter().map(|g| g.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn exceeding_the_cap_by_one_splits_at_the_boundary() {
        let spec: Vec<(String, u32)> = (0..21).map(|i| (format!("R{i:02}"), 0)).collect();
        let borrowed: Vec<(&str, u32)> = spec.iter().map(|(n, l)| (n.as_str(), *l)).collect();
        let (rules, layers) = layered(&borrowed);

        let groups = partition(rules, &layers, 20, true);
        let sizes: Vec<usize> = groups.iter().map(Group::len).collect();
        assert_eq!(sizes, vec![20, 1]);
    }

    #[test]
    fn parallel_policy_keeps_groups_single_layer() {
        let (rules, layers) = layered(&[("A", 0), ("B", 0), ("C", 1), ("D", 1), ("E", 2)]);
        let groups = partition(rules, &layers, 10, true);
        assert_eq!(groups.len(), 3);
        for group in &groups {
            assert_eq!(group.min_layer, group.max_layer);
        }
        assert_eq!(groups[0].rules.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(groups[2].rules[0].name, "E");
    }

    #[test]
    fn layer_boundaries_split_even_without_the_policy() {
        let (rules, layers) = layered(&[("A", 0), ("B", 0), ("C", 1)]);
        let groups = partition(rules, &layers, 10, false);
        let sizes: Vec<usize> = groups.iter().map(Group::len).collect();
        assert_eq!(sizes, vec![2, 1]);
        assert_eq!(groups[1].min_layer, 1);
    }

    #[test]
    fn same_layer_rules_keep_source_order() {
        // Declared out of layer order on purpose.
        let (rules, layers) = layered(&[("Late", 1), ("A", 0), ("B", 0)]);
        let groups = partition(rules, &layers, 10, true);
        assert_eq!(groups[0].rules.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(groups[1].rules[0].name, "Late");
    }

    #[test]
    fn every_rule_lands_in_exactly_one_group() {
        let (rules, layers) = layered(&[("A", 0), ("B", 1), ("C", 0), ("D", 2), ("E", 1)]);
        let groups = partition(rules, &layers, 2, true);
        let mut names: Vec<&str> = groups.iter().flat_map(|g| g.rules.iter().map(|r| r.name.as_str())).collect();
        names.sort();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(groups.iter().map(Group::len).sum::<usize>(), 5);
    }

    #[test]
    fn empty_input_produces_no_groups() {
        let (rules, layers) = layered(&[]);
        assert!(partition(rules, &layers, 20, true).is_empty());
    }
}
