use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::catalog::SystemConfig;
use crate::compiler::{self, Program};
use crate::diagnostics::{CompileError, Diagnostics};
use crate::emitter;
use crate::{Group, LayerMap, Rule};

/// How sternly the validator treats soft findings.
///
/// The level never changes *what* is checked, only whether a finding is an
/// error, a warning or a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    Strict,
    #[default]
    Normal,
    Relaxed,
}

impl std::str::FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(ValidationLevel::Strict),
            "normal" => Ok(ValidationLevel::Normal),
            "relaxed" => Ok(ValidationLevel::Relaxed),
            other => Err(format!("unknown validation level `{other}` (expected strict, normal or relaxed)")),
        }
    }
}

/// Knobs of a compile run.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Cap on rules per emitted group file.
    pub max_rules_per_file: usize,
    /// Keep every group homogeneous in layer (chunk layer by layer).
    pub group_parallel_rules: bool,
    /// Per-rule complexity budget; exceeding it warns.
    pub complexity_threshold: usize,
    pub validation_level: ValidationLevel,
    /// Soft limit on dependency-chain depth; exceeding it warns.
    pub max_dependency_depth: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            max_rules_per_file: 100,
            group_parallel_rules: true,
            complexity_threshold: 100,
            validation_level: ValidationLevel::default(),
            max_dependency_depth: 10,
        }
    }
}

/// Result of [`compile`]: the layered, partitioned program plus the run's
/// accumulated report (warnings and notes; errors would have rejected it).
#[derive(Debug)]
pub struct Compilation {
    pub(crate) program: Program,
    pub(crate) sensors: Vec<String>,
    pub(crate) cycle_time_ms: u64,
    pub(crate) buffer_capacity: Option<usize>,
    pub report: Diagnostics,
    pub elapsed: Duration,
}

impl Compilation {
    pub fn rules(&self) -> &[Rule] {
        &self.program.rules
    }

    pub fn groups(&self) -> &[Group] {
        &self.program.groups
    }

    pub fn layers(&self) -> &LayerMap {
        &self.program.analysis.layers
    }

    pub fn layer_of(&self, rule: &str) -> Option<u32> {
        self.program.analysis.layers.get(rule)
    }

    /// Documents the rules came from, in processing order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.program.sources
    }

    /// Sensors a rule reads, per the dependency analysis.
    pub fn inputs_of(&self, rule: &str) -> Vec<String> {
        self.program.analysis.reads.get(rule).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    /// Sensors a rule writes.
    pub fn outputs_of(&self, rule: &str) -> Vec<String> {
        self.program.analysis.writes.get(rule).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }
}

/// Result of [`validate`].
#[derive(Debug)]
pub struct Validation {
    /// Rules that parsed and validated.
    pub rules: usize,
    pub report: Diagnostics,
    pub elapsed: Duration,
}

/// Result of [`emit`].
#[derive(Debug)]
pub struct EmitSummary {
    /// Every emitted code file, in write order.
    pub files: Vec<PathBuf>,
    pub manifest: PathBuf,
    /// Findings produced during emission (e.g. a valueless `set_value`).
    pub report: Diagnostics,
}

/// Compile a rule file (or directory of rule files) against the system
/// configuration.
///
/// Runs the full pipeline: parse → validate → analyze → partition. Fails
/// with [`CompileError::Rejected`] when any stage accumulated errors, with
/// [`CompileError::CyclicDependency`] on a dependency cycle, and with
/// [`CompileError::Io`] when sources cannot be read.
///
/// # Example
/// ```no_run
/// use pulsar::{CompileOptions, SystemConfig, compile, emit};
///
/// # fn main() -> Result<(), pulsar::CompileError> {
/// let config = SystemConfig::load("system.yaml".as_ref())?;
/// let compilation = compile("rules/".as_ref(), &config, &CompileOptions::default())?;
/// emit(&compilation, "beacon/".as_ref())?;
/// # Ok(())
/// # }
/// ```
pub fn compile(
    rules_path: &Path,
    config: &SystemConfig,
    options: &CompileOptions,
) -> Result<Compilation, CompileError> {
    let started = Instant::now();
    let catalog = config.catalog();
    let mut diags = Diagnostics::new();

    let program = compiler::run(rules_path, &catalog, options, &mut diags)?;

    Ok(Compilation {
        program,
        sensors: catalog.all().iter().cloned().collect(),
        cycle_time_ms: config.cycle_time_ms,
        buffer_capacity: config.buffer_capacity,
        report: diags,
        elapsed: started.elapsed(),
    })
}

/// Parse and validate only; no dependency analysis, nothing written.
pub fn validate(
    rules_path: &Path,
    config: &SystemConfig,
    options: &CompileOptions,
) -> Result<Validation, CompileError> {
    let started = Instant::now();
    let catalog = config.catalog();
    let mut diags = Diagnostics::new();

    let (rules, _sources) = compiler::check(rules_path, &catalog, options, &mut diags)?;

    Ok(Validation { rules: rules.len(), report: diags, elapsed: started.elapsed() })
}

/// Emit the Beacon project for a compilation into `output_path`.
///
/// Code files are written first; the manifest is written last, so its
/// presence vouches for a complete tree. File-write failures are fatal.
pub fn emit(compilation: &Compilation, output_path: &Path) -> Result<EmitSummary, CompileError> {
    let mut diags = Diagnostics::new();
    let (files, manifest) = emitter::emit_project(
        &compilation.program,
        &compilation.sensors,
        compilation.cycle_time_ms,
        compilation.buffer_capacity,
        output_path,
        &mut diags,
    )?;
    Ok(EmitSummary { files, manifest, report: diags })
}
