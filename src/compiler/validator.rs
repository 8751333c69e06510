//! Structural validation of the parsed rule set.
//!
//! Validation runs after parsing and before dependency analysis. Every check
//! accumulates into the shared [`Diagnostics`] sink; the pipeline aborts after
//! this stage when any error-severity finding was produced. Validation is
//! idempotent: a clean rule set stays clean on re-validation.
//!
//! The validation level only moves findings between severities, it never
//! changes what is checked:
//!
//! - **strict**: missing description is an error; more than 5 actions per
//!   rule is an error.
//! - **normal**: missing description warns; more than 10 actions warns.
//! - **relaxed**: missing description is an informational note.

use std::collections::HashMap;

use crate::api::{CompileOptions, ValidationLevel};
use crate::catalog::SensorCatalog;
use crate::compiler::expr;
use crate::diagnostics::{Diagnostics, Issue, IssueKind};
use crate::{Action, Condition, Rule};

/// Action-count ceilings per level. Relaxed has none.
const STRICT_MAX_ACTIONS: usize = 5;
const NORMAL_MAX_ACTIONS: usize = 10;

pub(crate) fn validate(
    rules: &[Rule],
    catalog: &SensorCatalog,
    options: &CompileOptions,
    diags: &mut Diagnostics,
) {
    let mut first_seen: HashMap<&str, &Rule> = HashMap::new();

    for rule in rules {
        let issue_at = |issue: Issue| issue.at(&rule.loc.file, rule.loc.line).with_rule(&rule.name);

        if rule.name.is_empty() {
            diags.push(issue_at(Issue::error(IssueKind::Validation, "rule name must be non-empty")));
        } else if let Some(first) = first_seen.get(rule.name.as_str()) {
            diags.push(issue_at(Issue::error(
                IssueKind::Validation,
                format!("duplicate rule name `{}` (first defined at {})", rule.name, first.loc),
            )));
        } else {
            first_seen.insert(&rule.name, rule);
        }

        if rule.conditions.is_empty() {
            diags.push(issue_at(Issue::error(IssueKind::Validation, "rule has no conditions")));
        }

        let mut identifier_count = 0;
        for condition in rule.conditions.iter() {
            match condition {
                Condition::Comparison { sensor, .. } | Condition::ThresholdOverTime { sensor, .. } => {
                    if !catalog.contains(sensor) {
                        diags.push(issue_at(Issue::error(
                            IssueKind::Validation,
                            format!("unknown sensor `{sensor}`"),
                        )));
                    }
                }
                Condition::Expression { expression } => {
                    for ident in expr::extract_identifiers(expression) {
                        identifier_count += 1;
                        if !catalog.contains(&ident) {
                            diags.push(issue_at(Issue::error(
                                IssueKind::Validation,
                                format!("unknown sensor `{ident}` referenced in expression"),
                            )));
                        }
                    }
                }
            }
        }

        if rule.actions.is_empty() {
            diags.push(issue_at(Issue::error(IssueKind::Validation, "rule has no actions")));
        }
        for action in &rule.actions {
            match action {
                Action::SetValue { key, value_expression, .. } => {
                    if !catalog.contains(key) {
                        diags.push(issue_at(Issue::error(
                            IssueKind::Validation,
                            format!("unknown output sensor `{key}`"),
                        )));
                    }
                    if let Some(expression) = value_expression {
                        for ident in expr::extract_identifiers(expression) {
                            identifier_count += 1;
                            if !catalog.contains(&ident) {
                                diags.push(issue_at(Issue::error(
                                    IssueKind::Validation,
                                    format!("unknown sensor `{ident}` referenced in expression"),
                                )));
                            }
                        }
                    }
                }
                Action::SendMessage { .. } => {}
            }
        }

        match (options.validation_level, rule.description.as_deref()) {
            (_, Some(d)) if !d.trim().is_empty() => {}
            (ValidationLevel::Strict, _) => {
                diags.push(issue_at(Issue::error(IssueKind::Validation, "missing description")));
            }
            (ValidationLevel::Normal, _) => {
                diags.push(issue_at(Issue::warning(IssueKind::Validation, "missing description")));
            }
            (ValidationLevel::Relaxed, _) => {
                diags.push(issue_at(Issue::info(IssueKind::Validation, "missing description")));
            }
        }

        match options.validation_level {
            ValidationLevel::Strict if rule.actions.len() > STRICT_MAX_ACTIONS => {
                diags.push(issue_at(Issue::error(
                    IssueKind::Validation,
                    format!("{} actions exceed the strict-mode cap of {STRICT_MAX_ACTIONS}", rule.actions.len()),
                )));
            }
            ValidationLevel::Normal if rule.actions.len() > NORMAL_MAX_ACTIONS => {
                diags.push(issue_at(Issue::warning(
                    IssueKind::Validation,
                    format!("{} actions on one rule", rule.actions.len()),
                )));
            }
            _ => {}
        }

        // Coarse complexity score: every condition, action and expression
        // identifier counts 1.
        let complexity = rule.conditions.all.len() + rule.conditions.any.len() + rule.actions.len() + identifier_count;
        if complexity > options.complexity_threshold {
            diags.push(issue_at(Issue::warning(
                IssueKind::Validation,
                format!("rule complexity {complexity} exceeds threshold {}", options.complexity_threshold),
            )));
        }
    }
}
