//! Manifest rendering.
//!
//! The manifest is the provenance document of a compile: every rule, where it
//! came from, its layer and its sensor footprint. Rule entries and sensor
//! lists are sorted, so two compiles of the same input differ only in
//! `generatedAt`. The emitter writes the manifest last, and only when the
//! compile produced no errors.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::compiler::Program;

pub(crate) const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Manifest {
    /// ISO-8601 emission timestamp.
    generated_at: String,
    schema_version: String,
    rules: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ManifestEntry {
    source_file: String,
    source_line: usize,
    layer: u32,
    description: String,
    input_sensors: Vec<String>,
    output_sensors: Vec<String>,
}

pub(crate) fn build(program: &Program, generated_at: DateTime<Utc>) -> Manifest {
    let mut rules = BTreeMap::new();
    for rule in &program.rules {
        let inputs = program.analysis.reads.get(&rule.name).cloned().unwrap_or_default();
        let outputs = program.analysis.writes.get(&rule.name).cloned().unwrap_or_default();
        rules.insert(
            rule.name.clone(),
            ManifestEntry {
                source_file: rule.loc.file.display().to_string(),
                source_line: rule.loc.line,
                layer: program.analysis.layers.get(&rule.name).unwrap_or(0),
                description: rule.description.clone().unwrap_or_default(),
                input_sensors: inputs.into_iter().collect(),
                output_sensors: outputs.into_iter().collect(),
            },
        );
    }

    Manifest {
        generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        schema_version: SCHEMA_VERSION.to_string(),
        rules,
    }
}

pub(crate) fn to_yaml(manifest: &Manifest) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use chrono::TimeZone;

    use crate::compiler::Analysis;
    use crate::{Action, CompareOp, Condition, ConditionGroup, Rule, SourceLoc};

    fn program() -> Program {
        let rule = Rule {
            name: "Convert".into(),
            description: Some("Fahrenheit to Celsius".into()),
            conditions: ConditionGroup {
                all: vec![Condition::Comparison {
                    sensor: "temperature_f".into(),
                    op: CompareOp::Gt,
                    value: -459.67,
                }],
                any: vec![],
            },
            actions: vec![Action::SetValue {
                key: "temperature_c".into(),
                value: None,
                value_expression: Some("(temperature_f - 32) * 5/9".into()),
            }],
            loc: SourceLoc { file: PathBuf::from("rules/temperature.yaml"), line: 2 },
        };

        let mut analysis = Analysis::default();
        analysis.layers.insert("Convert".into(), 0);
        analysis.reads.insert("Convert".into(), ["temperature_f".to_string()].into_iter().collect());
        analysis.writes.insert("Convert".into(), ["temperature_c".to_string()].into_iter().collect());

        Program {
            rules: vec![rule],
            analysis,
            groups: vec![],
            sources: vec![PathBuf::from("rules/temperature.yaml")],
        }
    }

    #[test]
    fn manifest_lists_every_rule_with_its_footprint() {
        let at = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let manifest = build(&program(), at);
        let yaml = to_yaml(&manifest).unwrap();

        assert!(yaml.contains("generatedAt: 2026-08-01T12:00:00Z"), "{yaml}");
        assert!(yaml.contains("schemaVersion: '1.0'"));
        assert!(yaml.contains("Convert:"));
        assert!(yaml.contains("sourceFile: rules/temperature.yaml"));
        assert!(yaml.contains("sourceLine: 2"));
        assert!(yaml.contains("layer: 0"));
        assert!(yaml.contains("description: Fahrenheit to Celsius"));
        assert!(yaml.contains("inputSensors:\n    - temperature_f"));
        assert!(yaml.contains("outputSensors:\n    - temperature_c"));
    }

    #[test]
    fn identical_programs_render_identically_except_the_timestamp() {
        let a = to_yaml(&build(&program(), Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap())).unwrap();
        let b = to_yaml(&build(&program(), Utc.with_ymd_and_hms(2026, 8, 2, 12, 0, 0).unwrap())).unwrap();

        let strip = |text: &str| -> String {
            text.lines().filter(|line| !line.starts_with("generatedAt:")).collect::<Vec<_>>().join("\n")
        };
        assert_ne!(a, b);
        assert_eq!(strip(&a), strip(&b));
    }
}
