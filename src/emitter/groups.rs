//! Group file rendering.
//!
//! One file per [`Group`], each exposing a unit struct with the single
//! `evaluate_group` operation. For every rule, in source order: the combined
//! condition group as one boolean expression, and on success the rule's
//! actions in declared order. The file header carries provenance (which
//! documents contributed rules), and every rule body is preceded by its
//! `file:line` attribution.

use std::collections::BTreeSet;

use crate::compiler::expr;
use crate::diagnostics::{Diagnostics, Issue, IssueKind};
use crate::{Action, Condition, ConditionGroup, Group, Rule};

/// `Group000`-style type name for a group index.
pub(crate) fn struct_name(index: usize) -> String {
    format!("Group{index:03}")
}

/// `group_000`-style module/file stem for a group index.
pub(crate) fn module_name(index: usize) -> String {
    format!("group_{index:03}")
}

/// Render one group file.
pub(crate) fn render(group: &Group, diags: &mut Diagnostics) -> String {
    let mut out = String::new();

    out.push_str(&format!("// Generated by pulsar {}. Do not edit.\n", env!("CARGO_PKG_VERSION")));
    out.push_str("//\n");
    if group.min_layer == group.max_layer {
        out.push_str(&format!(
            "// Group {} (layer {}), {} rule{}.\n",
            group.index,
            group.min_layer,
            group.len(),
            if group.len() == 1 { "" } else { "s" }
        ));
    } else {
        out.push_str(&format!(
            "// Group {} (layers {}..{}), {} rules.\n",
            group.index,
            group.min_layer,
            group.max_layer,
            group.len()
        ));
    }
    out.push_str("// Sources:\n");
    let sources: BTreeSet<String> =
        group.rules.iter().map(|rule| rule.loc.file.display().to_string()).collect();
    for source in &sources {
        out.push_str(&format!("//   {source}\n"));
    }
    out.push('\n');
    out.push_str("#![allow(unused_imports, unused_variables)]\n\n");
    out.push_str("use crate::runtime::math::*;\n");
    out.push_str("use crate::runtime::{EvalError, Host, SensorBuffers, SensorValues};\n\n");

    let name = struct_name(group.index);
    out.push_str(&format!("pub struct {name};\n\n"));
    out.push_str(&format!("impl {name} {{\n"));
    out.push_str("    pub fn evaluate_group(\n");
    out.push_str("        &self,\n");
    out.push_str("        inputs: &SensorValues,\n");
    out.push_str("        outputs: &mut SensorValues,\n");
    out.push_str("        buffers: &SensorBuffers,\n");
    out.push_str("        host: &mut dyn Host,\n");
    out.push_str("    ) -> Result<(), EvalError> {\n");

    for (idx, rule) in group.rules.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&format!("        // {} ({})\n", rule.name, rule.loc));
        out.push_str(&format!("        if {} {{\n", render_condition_group(&rule.conditions)));
        for action in &rule.actions {
            out.push_str("            ");
            out.push_str(&render_action(action, rule, diags));
            out.push('\n');
        }
        out.push_str("        }\n");
    }

    if !group.rules.is_empty() {
        out.push('\n');
    }
    out.push_str("        Ok(())\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

/// Combined boolean expression for a condition group: AND over `all`, AND'ed
/// with the parenthesized OR over `any`. Both empty emits `true` (the
/// validator rejects that upstream; this is the defensive rendering).
pub(crate) fn render_condition_group(group: &ConditionGroup) -> String {
    let all: Vec<String> = group.all.iter().map(render_condition).collect();
    let any: Vec<String> = group.any.iter().map(render_condition).collect();

    match (all.is_empty(), any.is_empty()) {
        (true, true) => "true".to_string(),
        (false, true) => all.join(" && "),
        (true, false) => format!("({})", any.join(" || ")),
        (false, false) => format!("{} && ({})", all.join(" && "), any.join(" || ")),
    }
}

fn render_condition(condition: &Condition) -> String {
    match condition {
        Condition::Comparison { sensor, op, value } => {
            format!("inputs[{}] {} {}", rust_str(sensor), op.symbol(), float_literal(*value))
        }
        Condition::ThresholdOverTime { sensor, threshold, duration_ms } => {
            format!(
                "buffers.is_at_or_above_threshold_for({}, {}, {duration_ms})",
                rust_str(sensor),
                float_literal(*threshold)
            )
        }
        // Parenthesized so the opaque expression cannot capture the
        // surrounding `&&`/`||` structure.
        Condition::Expression { expression } => format!("({})", expr::rewrite(expression)),
    }
}

fn render_action(action: &Action, rule: &Rule, diags: &mut Diagnostics) -> String {
    match action {
        Action::SetValue { key, value: Some(value), value_expression: None } => {
            format!("outputs[{}] = {};", rust_str(key), float_literal(*value))
        }
        Action::SetValue { key, value: None, value_expression: Some(expression) } => {
            format!("outputs[{}] = {};", rust_str(key), expr::rewrite(expression))
        }
        Action::SetValue { key, .. } => {
            // Neither value form present: substitute zero and flag it.
            diags.push(
                Issue::warning(
                    IssueKind::Validation,
                    format!("`set_value` for `{key}` has neither `value` nor `value_expression`; emitting 0.0"),
                )
                .at(&rule.loc.file, rule.loc.line)
                .with_rule(&rule.name),
            );
            format!("outputs[{}] = 0.0;", rust_str(key))
        }
        Action::SendMessage { channel, message } => {
            format!("host.send_message({}, {});", rust_str(channel), rust_str(message))
        }
    }
}

/// A culture-invariant `f64` literal that stays a float in the emitted
/// source: plain decimals gain a `.0`, non-finite values use the `f64`
/// constants.
pub(crate) fn float_literal(value: f64) -> String {
    if value.is_nan() {
        return "f64::NAN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "f64::INFINITY".to_string() } else { "f64::NEG_INFINITY".to_string() };
    }
    let text = format!("{value}");
    if text.contains('.') || text.contains('e') { text } else { format!("{text}.0") }
}

/// A double-quoted string literal with backslashes and quotes escaped.
pub(crate) fn rust_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::{CompareOp, SourceLoc};

    fn rule(name: &str, conditions: ConditionGroup, actions: Vec<Action>) -> Rule {
        Rule {
            name: name.into(),
            description: None,
            conditions,
            actions,
            loc: SourceLoc { file: PathBuf::from("rules/temperature.yaml"), line: 2 },
        }
    }

    fn single_group(rules: Vec<Rule>) -> Group {
        Group { index: 0, rules, min_layer: 0, max_layer: 0 }
    }

    #[test]
    fn float_literals_stay_floats() {
        assert_eq!(float_literal(-459.67), "-459.67");
        assert_eq!(float_literal(30.0), "30.0");
        assert_eq!(float_literal(0.0), "0.0");
        assert_eq!(float_literal(f64::INFINITY), "f64::INFINITY");
        assert_eq!(float_literal(f64::NAN), "f64::NAN");
    }

    #[test]
    fn string_literals_are_escaped() {
        assert_eq!(rust_str("plain"), "\"plain\"");
        assert_eq!(rust_str("say \"hi\"\\now"), "\"say \\\"hi\\\"\\\\now\"");
    }

    #[test]
    fn comparison_condition_renders_with_input_lookup() {
        let group = ConditionGroup {
            all: vec![Condition::Comparison { sensor: "temperature_f".into(), op: CompareOp::Gt, value: -459.67 }],
            any: vec![],
        };
        assert_eq!(render_condition_group(&group), "inputs[\"temperature_f\"] > -459.67");
    }

    #[test]
    fn threshold_condition_renders_against_buffers() {
        let group = ConditionGroup {
            all: vec![Condition::ThresholdOverTime { sensor: "temp".into(), threshold: 30.0, duration_ms: 300 }],
            any: vec![],
        };
        assert_eq!(
            render_condition_group(&group),
            "buffers.is_at_or_above_threshold_for(\"temp\", 30.0, 300)"
        );
    }

    #[test]
    fn any_members_are_parenthesized() {
        let c = |sensor: &str| Condition::Comparison { sensor: sensor.into(), op: CompareOp::Gt, value: 0.0 };
        let both = ConditionGroup { all: vec![c("a")], any: vec![c("b"), c("c")] };
        assert_eq!(
            render_condition_group(&both),
            "inputs[\"a\"] > 0.0 && (inputs[\"b\"] > 0.0 || inputs[\"c\"] > 0.0)"
        );

        let only_any = ConditionGroup { all: vec![], any: vec![c("b"), c("c")] };
        assert_eq!(render_condition_group(&only_any), "(inputs[\"b\"] > 0.0 || inputs[\"c\"] > 0.0)");

        let empty = ConditionGroup::default();
        assert_eq!(render_condition_group(&empty), "true");
    }

    #[test]
    fn expression_conditions_are_rewritten_and_parenthesized() {
        let group = ConditionGroup {
            all: vec![Condition::Expression { expression: "a + b > 0".into() }],
            any: vec![],
        };
        assert_eq!(render_condition_group(&group), "(inputs[\"a\"] + inputs[\"b\"] > 0)");
    }

    #[test]
    fn group_file_contains_the_scenario_rule() {
        let convert = rule(
            "Convert",
            ConditionGroup {
                all: vec![Condition::Comparison {
                    sensor: "temperature_f".into(),
                    op: CompareOp::Gt,
                    value: -459.67,
                }],
                any: vec![],
            },
            vec![Action::SetValue {
                key: "temperature_c".into(),
                value: None,
                value_expression: Some("(temperature_f - 32) * 5/9".into()),
            }],
        );

        let mut diags = Diagnostics::new();
        let text = render(&single_group(vec![convert]), &mut diags);
        assert!(diags.is_empty());

        assert!(text.contains("pub struct Group000;"));
        assert!(text.contains("// Convert (rules/temperature.yaml:2)"));
        assert!(text.contains("if inputs[\"temperature_f\"] > -459.67 {"));
        assert!(
            text.contains("outputs[\"temperature_c\"] = (inputs[\"temperature_f\"] - 32) * 5/9;"),
            "{text}"
        );
        assert!(text.contains("// Sources:\n//   rules/temperature.yaml"));
    }

    #[test]
    fn send_message_renders_the_host_call() {
        let alert = rule(
            "Alert",
            ConditionGroup {
                all: vec![Condition::ThresholdOverTime { sensor: "temp".into(), threshold: 30.0, duration_ms: 300 }],
                any: vec![],
            },
            vec![Action::SendMessage { channel: "alerts".into(), message: "too hot".into() }],
        );

        let mut diags = Diagnostics::new();
        let text = render(&single_group(vec![alert]), &mut diags);
        assert!(text.contains("host.send_message(\"alerts\", \"too hot\");"));
    }

    #[test]
    fn valueless_set_value_emits_zero_and_warns() {
        let zeroed = rule(
            "Zeroed",
            ConditionGroup {
                all: vec![Condition::Comparison { sensor: "a".into(), op: CompareOp::Gt, value: 0.0 }],
                any: vec![],
            },
            vec![Action::SetValue { key: "b".into(), value: None, value_expression: None }],
        );

        let mut diags = Diagnostics::new();
        let text = render(&single_group(vec![zeroed]), &mut diags);
        assert!(text.contains("outputs[\"b\"] = 0.0;"));
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.iter().next().unwrap().message.contains("emitting 0.0"));
    }

    #[test]
    fn rules_render_in_group_order() {
        let c = ConditionGroup {
            all: vec![Condition::Comparison { sensor: "a".into(), op: CompareOp::Gt, value: 0.0 }],
            any: vec![],
        };
        let one = rule("One", c.clone(), vec![Action::SetValue { key: "x".into(), value: Some(1.0), value_expression: None }]);
        let two = rule("Two", c, vec![Action::SetValue { key: "y".into(), value: Some(2.0), value_expression: None }]);

        let mut diags = Diagnostics::new();
        let text = render(&single_group(vec![one, two]), &mut diags);
        let first = text.find("// One").unwrap();
        let second = text.find("// Two").unwrap();
        assert!(first < second);
    }
}
