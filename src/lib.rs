#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! treelint: a rule-driven lint and autocorrection engine for syntax trees.
//!
//! The engine walks a parsed tree, runs an ordered set of rules that each
//! inspect and optionally rewrite fragments of it, and iterates until no
//! rule performs further edits. Results are deterministic and idempotent:
//! running the engine on its own output is a no-op.

pub mod config;
pub mod engine;
pub mod location;
pub mod models;
pub mod parser;
pub mod registry;
pub mod rules;
pub mod suppress;
pub mod tree;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;
use tracing::warn;

use crate::engine::{CancelToken, Engine, EngineOptions, FileOutcome, DEFAULT_MAX_PASSES};
use crate::parser::LineParser;
use crate::registry::{ConfigError, RuleRegistry, RuleSelection};

/// Options for one linter run.
#[derive(Clone)]
pub struct LinterOptions {
    /// Worker threads; 0 picks rayon's default.
    pub threads: usize,
    pub selection: RuleSelection,
    /// Apply fixes while linting.
    pub autocorrect: bool,
    /// Write corrected text back to the source files.
    pub write: bool,
    pub max_passes: usize,
    pub skip_patterns: Vec<String>,
    /// Extensions to lint when walking directories; empty accepts all.
    pub extensions: Vec<String>,
    pub rule_options: HashMap<String, toml::Table>,
}

impl Default for LinterOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            selection: RuleSelection::default(),
            autocorrect: false,
            write: false,
            max_passes: DEFAULT_MAX_PASSES,
            skip_patterns: vec![],
            extensions: vec![],
            rule_options: HashMap::new(),
        }
    }
}

/// Outcome of one file's processing.
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Aggregate result of a run.
pub struct RunResult {
    /// Reports for files with something to say: remaining violations,
    /// applied fixes, or a convergence warning. Sorted by path.
    pub files: Vec<FileReport>,
    pub files_analyzed: usize,
    pub files_with_errors: usize,
    pub config_errors: Vec<ConfigError>,
}

/// Find lintable files under a directory.
pub fn find_source_files(path: &Path, extensions: &[String], skip_patterns: &[String]) -> Vec<PathBuf> {
    use walkdir::{DirEntry, WalkDir};

    let is_excluded = |entry: &DirEntry| -> bool {
        entry.path().components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| skip_patterns.iter().any(|pattern| name == pattern))
        })
    };

    let mut files = Vec::new();
    let walker = WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_excluded(e));
    for entry in walker.filter_map(std::result::Result::ok) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        if extensions.is_empty() || extensions.iter().any(|e| e == extension) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}

/// Lint (and with `autocorrect` fix) a single in-memory buffer.
pub fn lint_text(
    source: &str,
    file_path: &str,
    registry: &RuleRegistry,
    options: &LinterOptions,
) -> (FileOutcome, Vec<ConfigError>) {
    let resolved = registry.resolve(&options.selection);
    let engine = Engine::new(
        resolved.order,
        EngineOptions {
            autocorrect: options.autocorrect,
            max_passes: options.max_passes,
            rule_options: options.rule_options.clone(),
        },
    );
    let outcome = engine.run(&LineParser, source, file_path, &CancelToken::new());
    (outcome, resolved.errors)
}

/// Main linting entry point: process a file or directory tree.
pub fn lint_path(
    path: &Path,
    registry: &RuleRegistry,
    options: &LinterOptions,
    cancel: &CancelToken,
) -> Result<RunResult> {
    if options.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(options.threads)
            .build_global()
            .ok();
    }

    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        find_source_files(path, &options.extensions, &options.skip_patterns)
    };
    let files_analyzed = files.len();

    // The resolved order is computed once and shared read-only by every
    // file worker; configuration errors are reported once per run.
    let resolved = registry.resolve(&options.selection);
    for error in &resolved.errors {
        warn!(%error, "configuration error; continuing with degraded ordering");
    }
    let config_errors = resolved.errors;
    let engine = Engine::new(
        resolved.order,
        EngineOptions {
            autocorrect: options.autocorrect,
            max_passes: options.max_passes,
            rule_options: options.rule_options.clone(),
        },
    );

    let results: Vec<(PathBuf, Result<FileOutcome>)> = files
        .par_iter()
        .map(|file| (file.clone(), process_file(file, &engine, options, cancel)))
        .collect();

    let mut reports = Vec::new();
    let mut files_with_errors = 0;
    for (file, result) in results {
        match result {
            Ok(outcome) => {
                if !outcome.violations.is_empty()
                    || !outcome.corrected.is_empty()
                    || !outcome.converged
                {
                    reports.push(FileReport {
                        path: file,
                        outcome,
                    });
                }
            }
            Err(error) => {
                warn!(file = %file.display(), %error, "failed to process file");
                files_with_errors += 1;
            }
        }
    }
    reports.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(RunResult {
        files: reports,
        files_analyzed,
        files_with_errors,
        config_errors,
    })
}

fn process_file(
    path: &Path,
    engine: &Engine,
    options: &LinterOptions,
    cancel: &CancelToken,
) -> Result<FileOutcome> {
    let source = fs::read_to_string(path)?;
    let outcome = engine.run(
        &LineParser,
        &source,
        &path.to_string_lossy(),
        cancel,
    );
    if options.write && !outcome.cancelled && outcome.text != source {
        fs::write(path, &outcome.text)?;
    }
    Ok(outcome)
}
