//! Coordinator rendering and the generated buffer plan.
//!
//! The coordinator is the single entry point of the generated evaluator: it
//! owns one instance of every group and runs them in layer order. Between
//! groups it folds the outputs produced so far back into its working input
//! view, which is what makes a layer-*n* output visible to every later
//! layer (groups inside one layer never see each other's writes).
//!
//! The buffer plan is computed here too: for every sensor named by a
//! threshold-over-time condition, the capacity defaults to
//! `ceil(window / cycle_time × 1.2)` samples (the longest window wins) and
//! can be overridden wholesale by the catalog's `bufferCapacity`.

use std::collections::BTreeMap;

use super::groups::{module_name, struct_name};
use crate::{Condition, Group, Rule};

/// Samples beyond the window kept as slack.
const CAPACITY_OVERHEAD: f64 = 1.2;

/// Per-sensor buffer capacities, sorted by sensor name.
pub(crate) fn buffer_plan(
    rules: &[Rule],
    cycle_time_ms: u64,
    capacity_override: Option<usize>,
) -> Vec<(String, usize)> {
    let mut windows: BTreeMap<&str, u64> = BTreeMap::new();
    for rule in rules {
        for condition in rule.conditions.iter() {
            if let Condition::ThresholdOverTime { sensor, duration_ms, .. } = condition {
                let window = windows.entry(sensor).or_insert(0);
                *window = (*window).max(*duration_ms);
            }
        }
    }

    windows
        .into_iter()
        .map(|(sensor, window_ms)| {
            let capacity = capacity_override.unwrap_or_else(|| derived_capacity(window_ms, cycle_time_ms));
            (sensor.to_string(), capacity)
        })
        .collect()
}

/// `ceil(window_seconds × samples_per_second × overhead)`, never below one.
fn derived_capacity(window_ms: u64, cycle_time_ms: u64) -> usize {
    let samples = window_ms as f64 / cycle_time_ms.max(1) as f64 * CAPACITY_OVERHEAD;
    (samples.ceil() as usize).max(1)
}

/// Render the generated `coordinator.rs`.
pub(crate) fn render(
    groups: &[Group],
    plan: &[(String, usize)],
    sensors: &[String],
    cycle_time_ms: u64,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("// Generated by pulsar {}. Do not edit.\n", env!("CARGO_PKG_VERSION")));
    out.push_str("//\n");
    out.push_str(&format!(
        "// {} group{} in layer order.\n\n",
        groups.len(),
        if groups.len() == 1 { "" } else { "s" }
    ));

    if !groups.is_empty() {
        let names: Vec<String> = groups.iter().map(|g| struct_name(g.index)).collect();
        out.push_str(&format!("use crate::groups::{{{}}};\n", names.join(", ")));
    }
    out.push_str("use crate::runtime::{EvalError, Evaluate, Host, SensorBuffers, SensorValues};\n\n");

    out.push_str(&format!("pub const CYCLE_TIME_MS: u64 = {cycle_time_ms};\n\n"));

    out.push_str("/// Sequences every generated group in layer order.\n");
    out.push_str("pub struct Coordinator {\n");
    for group in groups {
        out.push_str(&format!("    {}: {},\n", module_name(group.index), struct_name(group.index)));
    }
    out.push_str("}\n\n");

    out.push_str("impl Coordinator {\n");
    out.push_str("    pub fn new() -> Self {\n");
    out.push_str("        Coordinator {\n");
    for group in groups {
        out.push_str(&format!("            {}: {},\n", module_name(group.index), struct_name(group.index)));
    }
    out.push_str("        }\n");
    out.push_str("    }\n\n");

    out.push_str("    /// Every catalog sensor, fetched at the top of each cycle.\n");
    out.push_str("    pub fn catalog_sensors() -> &'static [&'static str] {\n");
    out.push_str("        &[\n");
    for sensor in sensors {
        out.push_str(&format!("            {},\n", super::groups::rust_str(sensor)));
    }
    out.push_str("        ]\n");
    out.push_str("    }\n\n");

    out.push_str("    /// Per-sensor temporal buffer capacities, derived at compile time.\n");
    out.push_str("    pub fn buffer_plan() -> &'static [(&'static str, usize)] {\n");
    out.push_str("        &[\n");
    for (sensor, capacity) in plan {
        out.push_str(&format!("            ({}, {capacity}),\n", super::groups::rust_str(sensor)));
    }
    out.push_str("        ]\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str("impl Default for Coordinator {\n");
    out.push_str("    fn default() -> Self {\n");
    out.push_str("        Self::new()\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str("impl Evaluate for Coordinator {\n");
    out.push_str("    fn evaluate(\n");
    out.push_str("        &self,\n");
    out.push_str("        inputs: &SensorValues,\n");
    out.push_str("        outputs: &mut SensorValues,\n");
    out.push_str("        buffers: &SensorBuffers,\n");
    out.push_str("        host: &mut dyn Host,\n");
    out.push_str("    ) -> Result<(), EvalError> {\n");
    match groups.len() {
        0 => {}
        1 => {
            out.push_str(&format!(
                "        self.{}.evaluate_group(inputs, outputs, buffers, host)?;\n",
                module_name(groups[0].index)
            ));
        }
        _ => {
            out.push_str("        let mut view = inputs.clone();\n");
            for (idx, group) in groups.iter().enumerate() {
                if idx > 0 {
                    out.push_str("        view.merge_from(outputs);\n");
                }
                out.push_str(&format!(
                    "        self.{}.evaluate_group(&view, outputs, buffers, host)?;\n",
                    module_name(group.index)
                ));
            }
        }
    }
    out.push_str("        Ok(())\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}
