//! Compilation pipeline.
//!
//! This module is the operational core of the compiler. Compiling a rule set
//! is a unidirectional chain of transforms; each stage produces a typed
//! intermediate consumed by the next, and nothing is mutated after its
//! producing stage completes:
//!
//! ```text
//! rule documents ── parser::parse_file ──┐        (parser.rs)
//!                                        │
//! catalog ───────────────────────────────┼─ validator::validate
//!                                        │        (validator.rs)
//!                                        v
//!                           analyzer::analyze     (analyzer.rs)
//!                             - reads/writes per rule
//!                             - consumer → producer edges
//!                             - DFS layering, cycle rejection
//!                                        │
//!                                        v
//!                          partitioner::partition (partitioner.rs)
//!                                        │
//!                                        v
//!                              groups + layer map
//! ```
//!
//! Expression strings flow through the whole pipeline opaque; the only code
//! that ever looks inside them is the identifier scanner in `expr.rs`, shared
//! by the validator, the analyzer and the emitter.
//!
//! Issue propagation: syntax/schema/validation findings accumulate in the
//! shared [`Diagnostics`] sink so authors see every problem in one run, and
//! the pipeline stops after the first stage that produced an error. Cyclic
//! dependencies and I/O failures abort immediately.

#[path = "compiler/analyzer.rs"]
pub(crate) mod analyzer;
#[path = "compiler/expr.rs"]
pub(crate) mod expr;
#[path = "compiler/parser.rs"]
pub(crate) mod parser;
#[path = "compiler/partitioner.rs"]
pub(crate) mod partitioner;
#[path = "compiler/validator.rs"]
pub(crate) mod validator;

use std::path::{Path, PathBuf};

use crate::api::CompileOptions;
use crate::catalog::SensorCatalog;
use crate::diagnostics::{CompileError, Diagnostics};
use crate::{Group, Rule};

pub(crate) use analyzer::Analysis;

/// Everything the emitter needs, produced by a full pipeline run.
#[derive(Debug)]
pub(crate) struct Program {
    pub rules: Vec<Rule>,
    pub analysis: Analysis,
    pub groups: Vec<Group>,
    /// Documents the rules came from, in processing order.
    pub sources: Vec<PathBuf>,
}

/// Run parse + validate, stopping before dependency analysis. Returns the
/// validated rules and the documents they came from.
pub(crate) fn check(
    rules_path: &Path,
    catalog: &SensorCatalog,
    options: &CompileOptions,
    diags: &mut Diagnostics,
) -> Result<(Vec<Rule>, Vec<PathBuf>), CompileError> {
    let sources = collect_rule_files(rules_path)?;
    let mut rules = Vec::new();
    for source in &sources {
        rules.extend(parser::parse_file(source, diags)?);
    }
    tracing::debug!(files = sources.len(), rules = rules.len(), "parsed rule documents");
    if diags.has_errors() {
        return Err(CompileError::Rejected(diags.clone()));
    }

    validator::validate(&rules, catalog, options, diags);
    tracing::debug!(issues = diags.len(), "validated rule set");
    if diags.has_errors() {
        return Err(CompileError::Rejected(diags.clone()));
    }

    Ok((rules, sources))
}

/// Run the full pipeline: parse → validate → analyze → partition.
pub(crate) fn run(
    rules_path: &Path,
    catalog: &SensorCatalog,
    options: &CompileOptions,
    diags: &mut Diagnostics,
) -> Result<Program, CompileError> {
    let (rules, sources) = check(rules_path, catalog, options, diags)?;

    let analysis = analyzer::analyze(&rules, options.max_dependency_depth, diags)?;
    tracing::debug!(layers = analysis.layer_count(), "layered dependency graph");

    let groups = partitioner::partition(
        rules.clone(),
        &analysis.layers,
        options.max_rules_per_file,
        options.group_parallel_rules,
    );
    tracing::debug!(groups = groups.len(), "partitioned rules");

    Ok(Program { rules, analysis, groups, sources })
}

/// Enumerate rule documents: a single file, or every `.yaml`/`.yml` in a
/// directory, sorted by name so runs are deterministic.
pub(crate) fn collect_rule_files(path: &Path) -> Result<Vec<PathBuf>, CompileError> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| {
                matches!(p.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"))
            })
            .collect();
        files.sort();
        Ok(files)
    } else {
        // A missing file surfaces as an I/O error here rather than later
        // inside the parser.
        std::fs::metadata(path)?;
        Ok(vec![path.to_path_buf()])
    }
}
