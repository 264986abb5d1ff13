//! Validate command.
//!
//! Reports a template's format and tokens without writing anything.

use std::path::Path;

use crate::cli::{is_stdin, output, read_stdin, Globals};
use crate::core::format::Format;
use crate::core::processor::{TokenSource, ValidationReport, STDIN_LABEL};
use crate::error::Result;

/// Validate the template at `path` (or stdin).
pub fn execute(
    globals: &Globals,
    path: Option<&Path>,
    format: Option<Format>,
    resolve: bool,
    vault: Option<String>,
    json: bool,
) -> Result<i32> {
    let processor = globals.processor()?;
    let options = globals.options(format, vault);

    let report = match path {
        Some(path) if !is_stdin(Some(path)) => processor.validate(path, &options, resolve)?,
        _ => processor.validate_bytes(Path::new(STDIN_LABEL), read_stdin()?, &options, resolve)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, resolve);
    }

    Ok(if report.is_ok() { 0 } else { 1 })
}

fn print_report(report: &ValidationReport, resolve: bool) {
    let path = output::path(report.path.display());
    if report.binary {
        output::warn(&format!("{} is not a text file", path));
        return;
    }

    output::header(&path);
    match report.format {
        Some(format) => output::kv("format:", format),
        None => output::kv("format:", "none (no tokens)"),
    }
    let mixed: Vec<String> = report
        .counts
        .iter()
        .filter(|c| c.matches > 0 && Some(c.format) != report.format)
        .map(|c| format!("{} ({})", c.format, c.matches))
        .collect();
    if !mixed.is_empty() {
        output::kv("also:  ", mixed.join(", "));
    }
    output::kv("tokens:", report.tokens.len());

    if !report.tokens.is_empty() {
        output::section("Tokens");
        for check in &report.tokens {
            let source = match check.source {
                TokenSource::Env => "env".to_string(),
                TokenSource::Vault => check.reference.clone().unwrap_or_default(),
            };
            let state = match (resolve, check.resolved) {
                (false, _) | (true, None) => String::new(),
                (true, Some(true)) => match &check.account {
                    Some(account) => format!("  ✓ {}", account),
                    None => "  ✓".to_string(),
                },
                (true, Some(false)) => format!(
                    "  ✗ {}",
                    check.error.as_deref().unwrap_or("unresolved")
                ),
            };
            output::list_item(&format!("{} → {}{}", output::key(&check.token), source, state));
        }
    }

    if !report.malformed.is_empty() {
        output::section("Malformed");
        for bad in &report.malformed {
            output::list_item(&bad.to_string());
        }
    }

    if report.is_ok() {
        output::success("template is valid");
    } else {
        output::error("template has problems");
    }
}
