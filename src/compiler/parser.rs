//! Rule document parsing.
//!
//! A rule document is a YAML mapping with a single `rules` key holding a
//! sequence of rule objects:
//!
//! ```yaml
//! rules:
//!   - name: Convert
//!     description: Fahrenheit to Celsius
//!     conditions:
//!       all:
//!         - condition:
//!             type: comparison
//!             sensor: temperature_f
//!             operator: ">"
//!             value: -459.67
//!     actions:
//!       - set_value:
//!           key: temperature_c
//!           value_expression: (temperature_f - 32) * 5/9
//! ```
//!
//! Parsing is two-phase. The document is first read into a
//! `serde_yaml::Value`; this is where malformed YAML, duplicate mapping keys
//! (a contract of this format, not a library accident) and the nesting-depth
//! guard surface as syntax errors. Each rule item is then converted
//! individually, so one
//! malformed rule does not hide the errors in its neighbors; schema findings
//! accumulate per rule and the stage aborts afterwards.
//!
//! Each produced [`Rule`] carries the line of its `name` key, recovered from a
//! raw-text scan (see [`scan_name_lines`]).

use std::path::Path;

use serde::Deserialize;

use crate::diagnostics::{CompileError, Diagnostics, Issue, IssueKind};
use crate::{Action, CompareOp, Condition, ConditionGroup, Rule, SourceLoc};

/// Documents nested deeper than this are rejected as pathological.
const MAX_NESTING: usize = 100;

// --- Wire shapes -------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RuleSpec {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    conditions: Option<ConditionsSpec>,
    #[serde(default)]
    actions: Vec<ActionSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionsSpec {
    #[serde(default)]
    all: Vec<ConditionWrapper>,
    #[serde(default)]
    any: Vec<ConditionWrapper>,
}

#[derive(Debug, Deserialize)]
struct ConditionWrapper {
    condition: ConditionSpec,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ConditionSpec {
    Comparison { sensor: String, operator: String, value: f64 },
    Expression { expression: String },
    /// `duration` is a bare integer of milliseconds. Unit-suffixed strings
    /// (`300ms`, `5s`) are rejected here; a suffix parser is an extension
    /// point, not part of the contract.
    ThresholdOverTime { sensor: String, threshold: f64, duration: u64 },
}

#[derive(Debug, Deserialize)]
struct ActionSpec {
    #[serde(default)]
    set_value: Option<SetValueSpec>,
    #[serde(default)]
    send_message: Option<SendMessageSpec>,
}

#[derive(Debug, Deserialize)]
struct SetValueSpec {
    key: String,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    value_expression: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendMessageSpec {
    channel: String,
    message: String,
}

// --- Parsing -----------------------------------------------------------------

/// Parse one rule document from disk. I/O failures are fatal; everything else
/// accumulates into `diags`.
pub(crate) fn parse_file(path: &Path, diags: &mut Diagnostics) -> Result<Vec<Rule>, CompileError> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_str(path, &text, diags))
}

/// Parse one rule document from text.
pub(crate) fn parse_str(file: &Path, text: &str, diags: &mut Diagnostics) -> Vec<Rule> {
    let value: serde_yaml::Value = match serde_yaml::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            let mut issue = Issue::error(IssueKind::Syntax, err.to_string()).with_file(file);
            if let Some(loc) = err.location() {
                issue = issue.with_line(loc.line());
            }
            diags.push(issue);
            return Vec::new();
        }
    };

    if depth_of(&value) > MAX_NESTING {
        diags.push(
            Issue::error(IssueKind::Syntax, format!("document nesting exceeds {MAX_NESTING} levels"))
                .with_file(file),
        );
        return Vec::new();
    }

    let Some(items) = value.get("rules").and_then(|v| v.as_sequence()) else {
        diags.push(
            Issue::error(IssueKind::Schema, "document root must be a mapping with a `rules` sequence")
                .with_file(file),
        );
        return Vec::new();
    };

    let name_lines = scan_name_lines(text);
    let mut rules = Vec::with_capacity(items.len());

    for (idx, item) in items.iter().enumerate() {
        let line = name_lines.get(idx).copied().unwrap_or(1);
        let named = item.get("name").and_then(|v| v.as_str()).map(str::to_owned);

        let spec = match serde_yaml::from_value::<RuleSpec>(item.clone()) {
            Ok(spec) => spec,
            Err(err) => {
                let mut issue = Issue::error(IssueKind::Schema, format!("rule {}: {err}", idx + 1))
                    .with_file(file)
                    .with_line(line);
                if let Some(name) = named {
                    issue = issue.with_rule(name);
                }
                diags.push(issue);
                continue;
            }
        };

        let loc = SourceLoc { file: file.to_path_buf(), line };
        if let Some(rule) = convert_rule(spec, loc, diags) {
            rules.push(rule);
        }
    }

    rules
}

/// Turn a wire-shape rule into the core model, accumulating schema findings.
/// Returns `None` when any part of the rule was rejected.
fn convert_rule(spec: RuleSpec, loc: SourceLoc, diags: &mut Diagnostics) -> Option<Rule> {
    let mut ok = true;
    let mut reject = |diags: &mut Diagnostics, message: String| {
        diags.push(Issue::error(IssueKind::Schema, message).at(&loc.file, loc.line).with_rule(&spec.name));
    };

    let wire = spec.conditions.unwrap_or_default();
    let mut conditions = ConditionGroup::default();
    for (wrappers, target) in [(wire.all, &mut conditions.all), (wire.any, &mut conditions.any)] {
        for wrapper in wrappers {
            match convert_condition(wrapper.condition) {
                Ok(condition) => target.push(condition),
                Err(message) => {
                    reject(diags, message);
                    ok = false;
                }
            }
        }
    }

    let mut actions = Vec::with_capacity(spec.actions.len());
    for (idx, action) in spec.actions.into_iter().enumerate() {
        match (action.set_value, action.send_message) {
            (Some(set), None) => {
                if set.value.is_some() && set.value_expression.is_some() {
                    reject(
                        diags,
                        format!("action {}: `set_value` carries both `value` and `value_expression`", idx + 1),
                    );
                    ok = false;
                } else {
                    actions.push(Action::SetValue {
                        key: set.key,
                        value: set.value,
                        value_expression: set.value_expression,
                    });
                }
            }
            (None, Some(send)) => {
                actions.push(Action::SendMessage { channel: send.channel, message: send.message });
            }
            _ => {
                reject(
                    diags,
                    format!("action {}: expected exactly one of `set_value` or `send_message`", idx + 1),
                );
                ok = false;
            }
        }
    }

    ok.then_some(Rule { name: spec.name, description: spec.description, conditions, actions, loc })
}

fn convert_condition(spec: ConditionSpec) -> Result<Condition, String> {
    match spec {
        ConditionSpec::Comparison { sensor, operator, value } => match parse_operator(&operator) {
            Some(op) => Ok(Condition::Comparison { sensor, op, value }),
            None => Err(format!("unrecognized comparison operator `{operator}`")),
        },
        ConditionSpec::Expression { expression } => Ok(Condition::Expression { expression }),
        ConditionSpec::ThresholdOverTime { sensor, threshold, duration } => {
            Ok(Condition::ThresholdOverTime { sensor, threshold, duration_ms: duration })
        }
    }
}

/// Map an operator spelling to its [`CompareOp`]. Both symbolic and word
/// forms are accepted on the wire; the symbolic form is canonical.
fn parse_operator(spelling: &str) -> Option<CompareOp> {
    match spelling {
        "<" | "less_than" => Some(CompareOp::Lt),
        "<=" | "less_than_or_equal" => Some(CompareOp::Le),
        ">" | "greater_than" => Some(CompareOp::Gt),
        ">=" | "greater_than_or_equal" => Some(CompareOp::Ge),
        "==" | "equal" => Some(CompareOp::Eq),
        "!=" | "not_equal" => Some(CompareOp::Ne),
        _ => None,
    }
}

/// 1-based lines of rule-level `name:` keys, in document order.
///
/// No other key in the schema is called `name`, so a plain line scan is
/// reliable; a rule missing its `name` key shifts attribution for the rules
/// after it, which the schema error for that rule already points out.
fn scan_name_lines(text: &str) -> Vec<usize> {
    let pattern = regex!(r"^\s*-?\s*name\s*:");
    text.lines()
        .enumerate()
        .filter(|(_, line)| pattern.is_match(line))
        .map(|(idx, _)| idx + 1)
        .collect()
}

/// Depth of a YAML value tree; scalars count 1.
fn depth_of(value: &serde_yaml::Value) -> usize {
    match value {
        serde_yaml::Value::Sequence(items) => 1 + items.iter().map(depth_of).max().unwrap_or(0),
        serde_yaml::Value::Mapping(map) => 1 + map.values().map(depth_of).max().unwrap_or(0),
        _ => 1,
    }
}
