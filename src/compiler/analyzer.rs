//! Dependency analysis and layer assignment.
//!
//! Rule B depends on rule A when B reads a sensor A writes, directly (a
//! declared condition sensor) or through an expression (an extracted
//! identifier). The analyzer:
//!
//! 1. Indexes output sensor → producing rule. One producer per sensor: when
//!    two rules write the same sensor the later-parsed rule wins the entry
//!    and a warning is emitted.
//! 2. Collects each rule's read set and records a consumer → producer edge
//!    for every read of another rule's output. A rule reading its own output
//!    is a self-edge (and therefore a cycle of length 1).
//! 3. Assigns layers by depth-first traversal with a `visiting` set:
//!    `layer = max(producer layers) + 1`, leaves at 0. Re-entering a node
//!    still being visited aborts compilation with the cycle path.
//!
//! Depth beyond the soft limit warns but never fails; the hard failure is
//! reserved for cycles.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::compiler::expr;
use crate::diagnostics::{CompileError, Diagnostics, Issue, IssueKind};
use crate::{Action, Condition, LayerMap, Rule};

/// Output of the analyzer, keyed by rule name throughout.
#[derive(Debug, Default)]
pub(crate) struct Analysis {
    pub layers: LayerMap,
    /// Sensors each rule reads (declared + extracted from expressions).
    pub reads: BTreeMap<String, BTreeSet<String>>,
    /// Sensors each rule writes.
    pub writes: BTreeMap<String, BTreeSet<String>>,
    /// Producer rules each rule depends on, sorted.
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl Analysis {
    /// Number of distinct layers (0 for an empty rule set).
    pub fn layer_count(&self) -> usize {
        self.layers.iter().map(|(_, layer)| layer as usize + 1).max().unwrap_or(0)
    }
}

pub(crate) fn analyze(
    rules: &[Rule],
    max_dependency_depth: u32,
    diags: &mut Diagnostics,
) -> Result<Analysis, CompileError> {
    let mut analysis = Analysis::default();

    // Output index. Later-parsed rules win duplicated sensors.
    let mut producer_of: HashMap<&str, &str> = HashMap::new();
    for rule in rules {
        let mut writes = BTreeSet::new();
        for action in &rule.actions {
            if let Action::SetValue { key, .. } = action {
                writes.insert(key.clone());
                match producer_of.insert(key, &rule.name) {
                    Some(previous) if previous != rule.name => {
                        diags.push(
                            Issue::warning(
                                IssueKind::Validation,
                                format!(
                                    "sensor `{key}` is written by both `{previous}` and `{}`; the later rule wins",
                                    rule.name
                                ),
                            )
                            .at(&rule.loc.file, rule.loc.line)
                            .with_rule(&rule.name),
                        );
                    }
                    _ => {}
                }
            }
        }
        analysis.writes.insert(rule.name.clone(), writes);
    }

    // Read sets and consumer → producer edges.
    for rule in rules {
        let mut reads = BTreeSet::new();
        for condition in rule.conditions.iter() {
            match condition {
                Condition::Comparison { sensor, .. } | Condition::ThresholdOverTime { sensor, .. } => {
                    reads.insert(sensor.clone());
                }
                Condition::Expression { expression } => {
                    reads.extend(expr::extract_identifiers(expression));
                }
            }
        }
        for action in &rule.actions {
            if let Action::SetValue { value_expression: Some(expression), .. } = action {
                reads.extend(expr::extract_identifiers(expression));
            }
        }

        let producers: BTreeSet<&str> =
            reads.iter().filter_map(|sensor| producer_of.get(sensor.as_str()).copied()).collect();
        analysis
            .dependencies
            .insert(rule.name.clone(), producers.into_iter().map(str::to_owned).collect());
        analysis.reads.insert(rule.name.clone(), reads);
    }

    // Layer assignment, visiting rules in source order.
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();
    for rule in rules {
        let layer = layer_of(&rule.name, &analysis.dependencies, &mut marks, &mut path)?;
        analysis.layers.insert(rule.name.clone(), layer);

        if layer > max_dependency_depth {
            diags.push(
                Issue::warning(
                    IssueKind::Validation,
                    format!("dependency depth {layer} exceeds the soft limit of {max_dependency_depth}"),
                )
                .at(&rule.loc.file, rule.loc.line)
                .with_rule(&rule.name),
            );
        }
    }

    Ok(analysis)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done(u32),
}

fn layer_of<'a>(
    name: &'a str,
    dependencies: &'a BTreeMap<String, Vec<String>>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
) -> Result<u32, CompileError> {
    match marks.get(name) {
        Some(Mark::Done(layer)) => return Ok(*layer),
        Some(Mark::Visiting) => {
            let start = path.iter().position(|&n| n == name).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|&n| n.to_owned()).collect();
            cycle.push(name.to_owned());
            return Err(CompileError::CyclicDependency { path: cycle });
        }
        None => {}
    }

    marks.insert(name, Mark::Visiting);
    path.push(name);

    let mut layer = 0;
    if let Some(producers) = dependencies.get(name) {
        for producer in producers {
            layer = layer.max(layer_of(producer, dependencies, marks, path)? + 1);
        }
    }

    path.pop();
    marks.insert(name, Mark::Done(layer));
    Ok(layer)
}
