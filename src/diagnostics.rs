//! Issue collection and the compiler error taxonomy.
//!
//! The pipeline distinguishes two failure shapes:
//!
//! - **Accumulated issues** (`Issue` inside `Diagnostics`): syntax, schema and
//!   validation findings are collected per stage so rule authors see every
//!   problem in one run, then the stage aborts if any of them was an error.
//! - **Immediate failures** (`CompileError`): configuration, cyclic
//!   dependencies and I/O abort on the spot.
//!
//! Stages never log through a process-wide singleton: each stage receives a
//! `&mut Diagnostics` sink for user-facing findings and uses `tracing` events
//! for operational logs.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

// --- Issues ------------------------------------------------------------------

/// How severe an [`Issue`] is. Only `Error` fails a compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

/// The family an [`Issue`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Catalog/system configuration malformed or missing required fields.
    Config,
    /// Rule document ill-formed (bad YAML, duplicate keys, pathological nesting).
    Syntax,
    /// Rule document parses but violates the schema.
    Schema,
    /// Unknown sensor, empty condition group, missing actions, duplicate names.
    Validation,
    /// The rule dependency graph contains a cycle.
    CyclicDependency,
    /// Reading inputs or writing emitted files failed.
    Io,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueKind::Config => "config",
            IssueKind::Syntax => "syntax",
            IssueKind::Schema => "schema",
            IssueKind::Validation => "validation",
            IssueKind::CyclicDependency => "cycle",
            IssueKind::Io => "io",
        };
        f.write_str(s)
    }
}

/// A single finding, with enough provenance to point the author at the rule.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Issue {
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Issue { kind, severity: Severity::Error, message: message.into(), file: None, line: None, rule: None }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Issue { kind, severity: Severity::Warning, message: message.into(), file: None, line: None, rule: None }
    }

    pub fn info(kind: IssueKind, message: impl Into<String>) -> Self {
        Issue { kind, severity: Severity::Info, message: message.into(), file: None, line: None, rule: None }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn at(self, file: &Path, line: usize) -> Self {
        self.with_file(file).with_line(line)
    }
}

impl fmt::Display for Issue {
    /// One report line: `severity[kind] file:line (rule): message`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity, self.kind)?;
        if let Some(file) = &self.file {
            write!(f, " {}", file.display())?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
        }
        if let Some(rule) = &self.rule {
            write!(f, " ({rule})")?;
        }
        write!(f, ": {}", self.message)
    }
}

// --- Accumulating sink -------------------------------------------------------

/// Ordered collection of issues produced across pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Warning).count()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// One JSON object per issue, newline-separated, for tooling that
    /// consumes the report instead of a human.
    pub fn to_json_lines(&self) -> String {
        self.issues
            .iter()
            .map(|issue| serde_json::to_string(issue).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// --- Fatal errors ------------------------------------------------------------

/// Failure of a public operation.
///
/// `Rejected` carries the full accumulated report; the other variants are
/// immediate aborts.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cyclic dependency: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("compilation rejected with {} error(s)", .0.error_count())]
    Rejected(Diagnostics),
}

impl CompileError {
    /// The report behind a `Rejected` failure, if any.
    pub fn report(&self) -> Option<&Diagnostics> {
        match self {
            CompileError::Rejected(report) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_display_carries_provenance() {
        let issue = Issue::error(IssueKind::Validation, "unknown sensor `c`")
            .with_file("rules/a.yaml")
            .with_line(12)
            .with_rule("R2");
        assert_eq!(issue.to_string(), "error[validation] rules/a.yaml:12 (R2): unknown sensor `c`");
    }

    #[test]
    fn diagnostics_counts_by_severity() {
        let mut diags = Diagnostics::new();
        diags.push(Issue::warning(IssueKind::Validation, "missing description"));
        diags.push(Issue::error(IssueKind::Schema, "bad condition type"));
        diags.push(Issue::info(IssueKind::Validation, "note"));

        assert_eq!(diags.len(), 3);
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());
    }

    #[test]
    fn cycle_error_names_the_path() {
        let err = CompileError::CyclicDependency { path: vec!["R1".into(), "R2".into(), "R1".into()] };
        assert_eq!(err.to_string(), "cyclic dependency: R1 -> R2 -> R1");
    }

    #[test]
    fn json_lines_carry_kind_severity_and_provenance() {
        let mut diags = Diagnostics::new();
        diags.push(Issue::error(IssueKind::Validation, "unknown sensor `c`").with_file("rules/a.yaml").with_line(12));
        diags.push(Issue::warning(IssueKind::Validation, "missing description"));

        let json_lines = diags.to_json_lines();
        let lines: Vec<&str> = json_lines.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "{\"kind\":\"validation\",\"severity\":\"error\",\"message\":\"unknown sensor `c`\",\"file\":\"rules/a.yaml\",\"line\":12}"
        );
        assert!(lines[1].contains("\"severity\":\"warning\""));
        // Absent provenance fields are omitted, not null.
        assert!(!lines[1].contains("\"file\""));
    }
}
