//! Inject-all command.
//!
//! Batch-renders every template under the given (or configured) roots.

use std::path::PathBuf;

use crate::cli::inject::{print_summary, report};
use crate::cli::{output, Globals};
use crate::core::batch::Batch;
use crate::core::processor::{Processor, Target};
use crate::error::{ConfigError, Result};

/// Flags for `inject-all`.
pub struct Flags {
    pub dry_run: bool,
    pub backup: bool,
    pub exclude: Vec<String>,
    pub workers: Option<usize>,
    pub vault: Option<String>,
    pub json: bool,
}

/// Render everything under `roots`.
pub fn execute(globals: &Globals, roots: Vec<PathBuf>, flags: Flags) -> Result<i32> {
    let mut settings = globals.settings()?;
    settings.templates.exclude.extend(flags.exclude);
    if let Some(workers) = flags.workers {
        settings.templates.workers = workers;
    }
    settings.validate()?;

    let roots = if roots.is_empty() {
        settings.templates.roots.clone()
    } else {
        roots
    };
    if roots.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "templates.roots",
            reason: "no template roots configured; pass one or set templates.roots".to_string(),
        }
        .into());
    }

    let processor = Processor::from_settings(settings)?;
    let mut options = globals.options(None, flags.vault);
    options.dry_run = flags.dry_run;
    options.backup = flags.backup;
    options.target = Target::Derived;

    let batch = Batch::new(&processor);
    let files = batch.discover(&roots)?;
    if files.is_empty() && !flags.json {
        output::dimmed("no templates found");
        return Ok(0);
    }

    let summary = batch.run_files(&files, &options)?;

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary.exit_code());
    }

    for result in &summary.results {
        report(result, flags.dry_run)?;
    }
    print_summary(&summary);
    Ok(summary.exit_code())
}
