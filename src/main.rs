use std::path::Path;
use std::process;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use treelint::config::{find_config_file, load_config, merge_config};
use treelint::engine::CancelToken;
use treelint::location::LineIndex;
use treelint::registry::RuleRegistry;
use treelint::{lint_path, FileReport, LinterOptions};

#[derive(ValueEnum, Clone, Debug)]
enum OutputFormat {
    Terminal,
    Json,
    Github,
}

/// Exit codes used by the linter
mod exit_codes {
    pub const SUCCESS: i32 = 0; // No violations found
    pub const VIOLATIONS_FOUND: i32 = 1; // Violations remain after the run
    pub const FILE_ERROR: i32 = 3; // File not found or I/O error
}

#[derive(Parser, Debug)]
#[command(
    name = "treelint",
    author,
    version,
    about = "Lint and autocorrect source files with an ordered rule set",
    long_about = "Lint and autocorrect source files with an ordered rule set.\n\nIf no paths are provided, the current directory is checked recursively."
)]
struct Args {
    /// Paths to analyze (files or directories)
    #[arg(default_value = ".")]
    paths: Vec<String>,

    /// Path to a configuration file (treelint.toml)
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Apply autocorrections and write them back to the files
    #[arg(long = "fix")]
    fix: bool,

    /// Output format
    #[arg(
        short = 'f',
        long = "output-format",
        value_enum,
        default_value = "terminal"
    )]
    output_format: OutputFormat,

    /// Enable only specific rules or glob patterns (can be repeated)
    #[arg(short = 'e', long = "enable")]
    enable: Vec<String>,

    /// Disable specific rules or glob patterns (can be repeated)
    #[arg(short = 'd', long = "disable")]
    disable: Vec<String>,

    /// Also run rules marked experimental
    #[arg(long = "experimental")]
    experimental: bool,

    /// Maximum stabilization passes per file
    #[arg(long = "max-passes")]
    max_passes: Option<usize>,

    /// Number of threads to use (0 = auto)
    #[arg(short = 'j', long = "threads", default_value = "0")]
    threads: usize,

    /// Disable parallel processing
    #[arg(long = "no-parallel")]
    no_parallel: bool,

    /// Skip files whose path contains this component (can be repeated)
    #[arg(long = "skip")]
    skip: Vec<String>,

    /// Only lint files with these extensions when walking directories
    #[arg(long = "ext")]
    ext: Vec<String>,

    /// List the available rules and exit
    #[arg(long = "list-rules")]
    list_rules: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let registry = RuleRegistry::standard();

    if args.list_rules {
        for rule in registry.rules() {
            println!("{:<22} since {:<8} {}", rule.id(), rule.since(), rule.description());
        }
        return Ok(());
    }

    // Configuration file: explicit path, or nearest treelint.toml above
    // the first linted path.
    let config = if let Some(config_path) = &args.config {
        load_config(Some(Path::new(config_path)))
    } else {
        let start = Path::new(&args.paths[0]);
        let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
        find_config_file(&start)
            .and_then(|p| load_config(Some(&p)))
            .or_else(|| load_config(None))
    };

    let (selection, skip_patterns) =
        merge_config(config.as_ref(), &args.enable, &args.disable, &args.skip);

    let autocorrect = args.fix || config.as_ref().and_then(|c| c.autocorrect).unwrap_or(false);
    let mut selection = selection;
    selection.include_experimental |= args.experimental;

    let mut extensions = args.ext.clone();
    if extensions.is_empty() {
        if let Some(cfg) = &config {
            extensions = cfg.extensions.clone();
        }
    }

    let options = LinterOptions {
        threads: if args.no_parallel { 1 } else { args.threads },
        selection,
        autocorrect,
        write: autocorrect,
        max_passes: args
            .max_passes
            .or_else(|| config.as_ref().and_then(|c| c.max_passes))
            .unwrap_or(LinterOptions::default().max_passes),
        skip_patterns,
        extensions,
        rule_options: config.map(|c| c.rules).unwrap_or_default(),
    };

    let cancel = CancelToken::new();
    let mut reports = Vec::new();
    let mut files_analyzed = 0;
    let mut had_file_errors = false;

    for path_str in &args.paths {
        let path = Path::new(path_str);
        if !path.exists() {
            eprintln!("Error: path not found: {}", path.display());
            had_file_errors = true;
            continue;
        }
        match lint_path(path, &registry, &options, &cancel) {
            Ok(result) => {
                files_analyzed += result.files_analyzed;
                had_file_errors |= result.files_with_errors > 0;
                reports.extend(result.files);
            }
            Err(error) => {
                eprintln!("Error processing path {}: {error}", path.display());
                had_file_errors = true;
            }
        }
    }

    match args.output_format {
        OutputFormat::Terminal => report_terminal(&reports),
        OutputFormat::Json => report_json(&reports)?,
        OutputFormat::Github => report_github(&reports),
    }

    let remaining: usize = reports.iter().map(|r| r.outcome.violations.len()).sum();
    let fixed: usize = reports.iter().map(|r| r.outcome.corrected.len()).sum();
    eprintln!(
        "{files_analyzed} file(s) checked, {remaining} violation(s) remaining, {fixed} fixed"
    );

    let exit_code = if had_file_errors {
        exit_codes::FILE_ERROR
    } else if remaining > 0 {
        exit_codes::VIOLATIONS_FOUND
    } else {
        exit_codes::SUCCESS
    };
    if exit_code != exit_codes::SUCCESS {
        process::exit(exit_code);
    }
    Ok(())
}

fn report_terminal(reports: &[FileReport]) {
    for report in reports {
        let outcome = &report.outcome;
        println!(
            "{} ({} violation(s), {} fixed)",
            report.path.display(),
            outcome.violations.len(),
            outcome.corrected.len()
        );
        let line_index = LineIndex::new(outcome.text.clone());
        for violation in &outcome.violations {
            let (line, column) = line_index.get_location(violation.offset);
            println!(
                "  {line}:{column}: {}: {}",
                violation.rule_id, violation.message
            );
        }
        if !outcome.converged {
            println!("  warning: autocorrection did not converge; output is from the last completed pass");
        }
    }
}

fn report_json(reports: &[FileReport]) -> Result<()> {
    use serde_json::json;

    let files: Vec<_> = reports
        .iter()
        .map(|report| {
            let line_index = LineIndex::new(report.outcome.text.clone());
            let violations: Vec<_> = report
                .outcome
                .violations
                .iter()
                .map(|v| {
                    let (line, column) = line_index.get_location(v.offset);
                    json!({
                        "rule": v.rule_id,
                        "line": line,
                        "column": column,
                        "offset": v.offset,
                        "message": v.message,
                        "fixed": false,
                    })
                })
                .collect();
            json!({
                "file": report.path.display().to_string(),
                "violations": violations,
                "fixed": report.outcome.corrected,
                "passes": report.outcome.passes,
                "converged": report.outcome.converged,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json!({ "files": files }))?);
    Ok(())
}

fn report_github(reports: &[FileReport]) {
    for report in reports {
        let line_index = LineIndex::new(report.outcome.text.clone());
        for violation in &report.outcome.violations {
            let (line, column) = line_index.get_location(violation.offset);
            println!(
                "::warning file={},line={line},col={column},title={}::{}",
                report.path.display(),
                violation.rule_id,
                violation.message
            );
        }
    }
}
