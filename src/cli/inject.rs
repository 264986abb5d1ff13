//! Inject command.
//!
//! Renders one template (or every template in a directory, or stdin).

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::{output, read_stdin, Globals};
use crate::core::batch::{self, Batch, BatchSummary};
use crate::core::format::Format;
use crate::core::processor::{ProcessingResult, Status, Target, STDIN_LABEL};
use crate::error::{ConfigError, Result};

/// Flags for `inject`.
pub struct Flags {
    pub format: Option<Format>,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub backup: bool,
    pub vault: Option<String>,
}

/// Render the template at `path`, or stdin when `path` is absent or `-`.
pub fn execute(globals: &Globals, path: Option<&Path>, flags: Flags) -> Result<i32> {
    let processor = globals.processor()?;
    let mut options = globals.options(flags.format, flags.vault);
    options.dry_run = flags.dry_run;
    options.backup = flags.backup;
    options.target = match flags.output {
        Some(out) => Target::File(out),
        None => Target::Derived,
    };

    let Some(path) = path.filter(|p| *p != Path::new("-")) else {
        if options.target == Target::Derived {
            options.target = Target::Buffer;
        }
        let bytes = read_stdin()?;
        let result = processor.process_bytes(Path::new(STDIN_LABEL), bytes, &options)?;
        return report(&result, flags.dry_run);
    };

    if path.is_dir() {
        if matches!(options.target, Target::File(_)) {
            return Err(ConfigError::Usage(
                "--output cannot be used with a directory".to_string(),
            )
            .into());
        }
        let summary = Batch::new(&processor).run(&[path.to_path_buf()], &options)?;
        for result in &summary.results {
            report(result, flags.dry_run)?;
        }
        print_summary(&summary);
        return Ok(summary.exit_code());
    }

    let result = processor.process(path, &options)?;
    report(&result, flags.dry_run)
}

/// Print one result and return its exit code.
pub(crate) fn report(result: &ProcessingResult, dry_run: bool) -> Result<i32> {
    let template = output::path(result.template_path.display());

    if dry_run {
        if let (Some(diff), Some(out)) = (&result.diff, &result.output_path) {
            output::header(&format!("{} → {} (dry run)", template, output::path(out.display())));
            if diff.is_unchanged() {
                output::dimmed("  no changes");
            } else {
                output::diff(diff);
            }
        } else if let Some(rendered) = &result.rendered {
            let mut stdout = std::io::stdout();
            stdout.write_all(rendered.expose().as_bytes())?;
            stdout.flush()?;
        }
    }

    match result.status {
        Status::Skipped => {
            output::warn(&format!(
                "skipped {}: {}",
                template,
                result.message.as_deref().unwrap_or("not a template")
            ));
        }
        Status::Failed => report_failure(result),
        Status::Rendered if dry_run => {}
        Status::Rendered => {
            if let Some(rendered) = &result.rendered {
                let mut stdout = std::io::stdout();
                stdout.write_all(rendered.expose().as_bytes())?;
                stdout.flush()?;
            } else if let Some(out) = &result.output_path {
                if result.written {
                    output::success(&format!("rendered {} → {}", template, output::path(out.display())));
                    if let Some(backup) = &result.backup_path {
                        output::kv("backup:", backup.display());
                    }
                } else {
                    output::dimmed(&format!("{} unchanged", out.display()));
                }
            }
        }
    }

    Ok(batch::exit_code([result]))
}

fn report_failure(result: &ProcessingResult) {
    let template = output::path(result.template_path.display());
    output::error(&format!(
        "{}: {}",
        template,
        result.message.as_deref().unwrap_or("failed")
    ));
    for missing in &result.missing_tokens {
        eprintln!("  • {}: {}", output::key(&missing.token), missing.reason);
    }
    if result.needs_auth() {
        output::hint("run: op signin");
    }
}

/// Print batch totals.
pub(crate) fn print_summary(summary: &BatchSummary) {
    output::section("Summary");
    output::kv("rendered:", summary.rendered);
    output::kv("skipped: ", summary.skipped);
    output::kv("failed:  ", summary.failed);
    if summary.cancelled {
        output::warn("run cancelled before every template was processed");
    }
}
