//! Run command.
//!
//! Executes a command with a rendered dotenv template as extra environment.

use std::path::Path;

use crate::cli::inject::report;
use crate::cli::Globals;
use crate::core::env;
use crate::core::format::Format;
use crate::core::processor::{Status, Target};
use crate::error::{ConfigError, Result};

/// Render `template` and run `command` with its variables set.
pub fn execute(
    globals: &Globals,
    template: &Path,
    format: Option<Format>,
    vault: Option<String>,
    command: &[String],
) -> Result<i32> {
    let Some((program, args)) = command.split_first() else {
        return Err(ConfigError::Usage("no command specified".to_string()).into());
    };

    let processor = globals.processor()?;
    let mut options = globals.options(format, vault);
    options.target = Target::Buffer;

    let result = processor.process(template, &options)?;
    if result.status != Status::Rendered {
        let code = report(&result, false)?;
        return Ok(code.max(1));
    }

    let pairs = match &result.rendered {
        Some(rendered) => env::parse(rendered.expose()),
        None => Vec::new(),
    };
    tracing::debug!(vars = pairs.len(), program = %program, "spawning");

    let mut cmd = std::process::Command::new(program);
    cmd.args(args);
    for (key, value) in &pairs {
        cmd.env(key, value.as_str());
    }

    let status = cmd.status()?;
    Ok(status.code().unwrap_or(1))
}
