mod report;

use std::io::IsTerminal;
use std::path::PathBuf;

use pulsar::{CompileError, CompileOptions, SystemConfig, compile, emit, validate};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    std::process::exit(run(config));
}

enum Command {
    Compile,
    Validate,
}

struct CliConfig {
    command: Command,
    rules: PathBuf,
    config: PathBuf,
    output: Option<PathBuf>,
    options: CompileOptions,
    color: bool,
    /// Machine-readable issue output: one JSON object per finding on stdout.
    json: bool,
}

fn run(cli: CliConfig) -> i32 {
    let system = match SystemConfig::load(&cli.config) {
        Ok(system) => system,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };

    match cli.command {
        Command::Validate => match validate(&cli.rules, &system, &cli.options) {
            Ok(validation) => {
                print_report(&validation.report, &cli);
                if !cli.json {
                    report::print_validation_summary(&validation, cli.color);
                }
                0
            }
            Err(err) => {
                print_failure(&err, &cli);
                1
            }
        },
        Command::Compile => {
            let compilation = match compile(&cli.rules, &system, &cli.options) {
                Ok(compilation) => compilation,
                Err(err) => {
                    print_failure(&err, &cli);
                    return 1;
                }
            };

            // The output path was checked in parse_args.
            let output = cli.output.as_deref().expect("compile requires --output");
            match emit(&compilation, output) {
                Ok(summary) => {
                    print_report(&compilation.report, &cli);
                    print_report(&summary.report, &cli);
                    if !cli.json {
                        report::print_compile_summary(&compilation, &summary, cli.color);
                    }
                    0
                }
                Err(err) => {
                    print_failure(&err, &cli);
                    1
                }
            }
        }
    }
}

fn print_report(report: &pulsar::Diagnostics, cli: &CliConfig) {
    if cli.json {
        if !report.is_empty() {
            println!("{}", report.to_json_lines());
        }
    } else {
        report::print_issues(report, cli.color);
    }
}

fn print_failure(err: &CompileError, cli: &CliConfig) {
    if let Some(issues) = err.report() {
        print_report(issues, cli);
    }
    eprintln!("error: {err}");
}

fn parse_args() -> Result<CliConfig, String> {
    let mut args = std::env::args().skip(1);

    let command = match args.next().as_deref() {
        Some("compile") => Command::Compile,
        Some("validate") => Command::Validate,
        Some("-h") | Some("--help") => {
            print_help();
            std::process::exit(0);
        }
        Some("-V") | Some("--version") => {
            println!("pulsar {}", env!("CARGO_PKG_VERSION"));
            std::process::exit(0);
        }
        Some(other) => return Err(format!("error: unknown command '{other}'\n\n{}", help_text())),
        None => return Err(format!("error: no command given\n\n{}", help_text())),
    };

    let mut rules: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut options = CompileOptions::default();
    let mut color = std::io::stdout().is_terminal();
    let mut json = false;

    fn take_value(args: &mut std::iter::Skip<std::env::Args>, flag: &str) -> Result<String, String> {
        args.next().ok_or_else(|| format!("error: {flag} expects a value"))
    }

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--json" => json = true,
            "-r" | "--rules" => rules = Some(PathBuf::from(take_value(&mut args, "--rules")?)),
            "-c" | "--config" => config = Some(PathBuf::from(take_value(&mut args, "--config")?)),
            "-o" | "--output" => output = Some(PathBuf::from(take_value(&mut args, "--output")?)),
            "--group-size" => {
                options.max_rules_per_file = parse_number(&take_value(&mut args, "--group-size")?, "--group-size")?;
            }
            "--no-group-parallel" => options.group_parallel_rules = false,
            "--validation" => {
                options.validation_level = take_value(&mut args, "--validation")?
                    .parse()
                    .map_err(|err| format!("error: {err}"))?;
            }
            "--max-depth" => {
                options.max_dependency_depth = parse_number(&take_value(&mut args, "--max-depth")?, "--max-depth")?;
            }
            "--complexity" => {
                options.complexity_threshold = parse_number(&take_value(&mut args, "--complexity")?, "--complexity")?;
            }
            _ if arg.starts_with("--rules=") => {
                rules = Some(PathBuf::from(arg.trim_start_matches("--rules=")));
            }
            _ if arg.starts_with("--config=") => {
                config = Some(PathBuf::from(arg.trim_start_matches("--config=")));
            }
            _ if arg.starts_with("--output=") => {
                output = Some(PathBuf::from(arg.trim_start_matches("--output=")));
            }
            _ => return Err(format!("error: unknown option '{arg}'")),
        }
    }

    let rules = rules.ok_or_else(|| format!("error: --rules is required\n\n{}", help_text()))?;
    let config = config.ok_or_else(|| format!("error: --config is required\n\n{}", help_text()))?;
    if matches!(command, Command::Compile) && output.is_none() {
        return Err(format!("error: compile requires --output\n\n{}", help_text()));
    }

    Ok(CliConfig { command, rules, config, output, options, color, json })
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, String> {
    value.parse().map_err(|_| format!("error: {flag} expects a number, got '{value}'"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "pulsar {version}

Compiles a sensor-rules DSL into the Beacon evaluator.

Usage:
  pulsar compile  --rules <path> --config <path> --output <dir> [OPTIONS]
  pulsar validate --rules <path> --config <path> [OPTIONS]

Options:
  -r, --rules <path>       Rule file, or directory of .yaml/.yml rule files.
  -c, --config <path>      System configuration document (validSensors, ...).
  -o, --output <dir>       Directory the Beacon project is emitted into.
  --group-size <n>         Max rules per emitted group file. Default: 100.
  --no-group-parallel      Walk layers linearly instead of chunking per layer.
  --validation <level>     strict | normal | relaxed. Default: normal.
  --max-depth <n>          Soft dependency-depth limit. Default: 10.
  --complexity <n>         Per-rule complexity warning threshold. Default: 100.
  --json                   Print findings as JSON lines instead of a report.
  --color                  Force ANSI color output.
  --no-color               Disable ANSI color output.
  -h, --help               Show this help message.
  -V, --version            Print version information.

Exit codes:
  0  Success.
  1  Compilation, validation or emission failed.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION")
    )
}
