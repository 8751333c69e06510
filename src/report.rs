use pulsar::{Compilation, Diagnostics, EmitSummary, Severity, Validation};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// Line-oriented issue report: one line per finding, colored by severity.
pub fn print_issues(report: &Diagnostics, color: bool) {
    if report.is_empty() {
        return;
    }
    let palette = ansi::Palette::new(color);

    eprintln!("{}", palette.paint("━━━ Issues ━━━", ansi::GRAY));
    for issue in report.iter() {
        let line = issue.to_string();
        match issue.severity {
            Severity::Error => eprintln!("  {}", palette.paint(line, ansi::RED)),
            Severity::Warning => eprintln!("  {}", palette.paint(line, ansi::YELLOW)),
            Severity::Info => eprintln!("  {}", palette.dim(line)),
        }
    }
    eprintln!(
        "  {}",
        palette.dim(format!("{} error(s), {} warning(s)", report.error_count(), report.warning_count()))
    );
}

pub fn print_compile_summary(compilation: &Compilation, summary: &EmitSummary, color: bool) {
    let palette = ansi::Palette::new(color);

    println!("{}", palette.paint("━━━ Beacon ━━━", ansi::GRAY));
    println!(
        "  {} rule(s) from {} document(s) in {} group(s), {} layer(s)",
        palette.bold(compilation.rules().len().to_string()),
        compilation.sources().len(),
        compilation.groups().len(),
        compilation.groups().iter().map(|g| g.max_layer as usize + 1).max().unwrap_or(0),
    );
    for group in compilation.groups() {
        println!(
            "  {}",
            palette.dim(format!("group {:03}  layer {}  {} rule(s)", group.index, group.min_layer, group.len()))
        );
    }
    println!(
        "  {} file(s) written, manifest at {}",
        summary.files.len() + 1,
        palette.paint(summary.manifest.display().to_string(), ansi::CYAN)
    );
    println!("  {}", palette.paint(format!("compiled in {:?}", compilation.elapsed), ansi::GREEN));
}

pub fn print_validation_summary(validation: &Validation, color: bool) {
    let palette = ansi::Palette::new(color);

    println!("{}", palette.paint("━━━ Validation ━━━", ansi::GRAY));
    println!(
        "  {} rule(s) valid, {} warning(s)",
        palette.bold(validation.rules.to_string()),
        validation.report.warning_count()
    );
    println!("  {}", palette.paint(format!("checked in {:?}", validation.elapsed), ansi::GREEN));
}
