//! Diff command.
//!
//! Renders in dry-run mode and shows how the output file would change.

use std::path::{Path, PathBuf};

use crate::cli::inject::report;
use crate::cli::{output, Globals};
use crate::core::format::Format;
use crate::core::processor::{Status, Target};
use crate::error::{OutputError, Result};

/// Compare the rendering of `path` against its output file.
pub fn execute(
    globals: &Globals,
    path: &Path,
    format: Option<Format>,
    destination: Option<PathBuf>,
    vault: Option<String>,
) -> Result<i32> {
    let processor = globals.processor()?;
    let mut options = globals.options(format, vault);
    options.dry_run = true;
    options.target = match destination {
        Some(out) => Target::File(out),
        None => Target::Derived,
    };

    let result = processor.process(path, &options)?;
    if result.status != Status::Rendered {
        return report(&result, false);
    }

    let (Some(diff), Some(out)) = (&result.diff, &result.output_path) else {
        return Err(OutputError::NoDestination(path.to_path_buf()).into());
    };

    output::header(&format!(
        "{} → {}",
        output::path(path.display()),
        output::path(out.display())
    ));
    if diff.is_unchanged() {
        output::dimmed("  no changes");
    } else {
        output::diff(diff);
        output::dimmed(&format!(
            "  {} added, {} removed",
            diff.added().len(),
            diff.removed().len()
        ));
    }
    Ok(0)
}
