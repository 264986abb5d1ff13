//! Command-line interface.

pub mod cache;
pub mod completions;
pub mod diff;
pub mod inject;
pub mod inject_all;
pub mod output;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::core::constants;
use crate::core::config::Settings;
use crate::core::format::Format;
use crate::core::processor::{ProcessOptions, Processor};
use crate::core::reference::ReferenceDefaults;
use crate::error::{ConfigError, Result};

/// Sigil - render secret templates from an external vault CLI.
#[derive(Parser)]
#[command(
    name = "sigil",
    about = "Render secret templates from an external vault CLI",
    version
)]
pub struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true, env = constants::env::DEBUG)]
    pub verbose: bool,

    /// Config file (default: <config dir>/sigil/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Account to try first
    #[arg(long, global = true)]
    pub account: Option<String>,

    /// Bypass the secret cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Render one template, a directory of templates, or stdin
    Inject {
        /// Template file or directory (`-` or omitted: stdin)
        path: Option<PathBuf>,
        /// Token grammar (skip detection)
        #[arg(short, long)]
        format: Option<Format>,
        /// Output file (default: template path without its suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Show what would be written without writing
        #[arg(long)]
        dry_run: bool,
        /// Back up an existing output file before overwriting
        #[arg(long)]
        backup: bool,
        /// Vault for tokens that name none
        #[arg(long)]
        vault: Option<String>,
    },

    /// Render every template under the configured roots
    InjectAll {
        /// Roots to search (default: templates.roots)
        roots: Vec<PathBuf>,
        /// Show what would be written without writing
        #[arg(long)]
        dry_run: bool,
        /// Do not back up existing output files
        #[arg(long)]
        no_backup: bool,
        /// Glob of paths to skip (repeatable)
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,
        /// Templates processed concurrently
        #[arg(short, long)]
        workers: Option<usize>,
        /// Vault for tokens that name none
        #[arg(long)]
        vault: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report format and tokens without writing anything
    Validate {
        /// Template file (`-` or omitted: stdin)
        path: Option<PathBuf>,
        /// Token grammar (skip detection)
        #[arg(short, long)]
        format: Option<Format>,
        /// Also check that every token resolves
        #[arg(long)]
        resolve: bool,
        /// Vault for tokens that name none
        #[arg(long)]
        vault: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how rendering would change the output file
    Diff {
        /// Template file
        path: PathBuf,
        /// Token grammar (skip detection)
        #[arg(short, long)]
        format: Option<Format>,
        /// Output file to compare against
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Vault for tokens that name none
        #[arg(long)]
        vault: Option<String>,
    },

    /// Run a command with a rendered dotenv template as its environment
    Run {
        /// Dotenv template
        #[arg(short, long, value_name = "FILE")]
        template: PathBuf,
        /// Token grammar (skip detection)
        #[arg(short, long)]
        format: Option<Format>,
        /// Vault for tokens that name none
        #[arg(long)]
        vault: Option<String>,
        /// Command and arguments to run
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Manage the secret cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Cache subcommands.
#[derive(Subcommand)]
pub enum CacheAction {
    /// Resolve and cache every secret the given templates need
    Warm {
        /// Templates or directories (default: templates.roots)
        paths: Vec<PathBuf>,
        /// Vault for tokens that name none
        #[arg(long)]
        vault: Option<String>,
    },

    /// Delete the cache directory
    Clear,

    /// Show cache location and entry counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Global flags shared by every command.
pub struct Globals {
    pub config: Option<PathBuf>,
    pub account: Option<String>,
    pub no_cache: bool,
}

impl Globals {
    /// Load settings and apply flag overrides.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if self.no_cache {
            settings.cache.enabled = false;
        }
        Ok(settings)
    }

    /// Processing options carrying `--account` and `vault`.
    pub fn options(&self, format: Option<Format>, vault: Option<String>) -> ProcessOptions {
        ProcessOptions {
            format,
            defaults: ReferenceDefaults {
                vault,
                account: self.account.clone(),
            },
            ..ProcessOptions::default()
        }
    }

    pub fn processor(&self) -> Result<Processor> {
        Processor::from_settings(self.settings()?)
    }
}

/// Whether `path` means stdin.
fn is_stdin(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p == Path::new("-"))
}

/// Read a template piped on stdin.
fn read_stdin() -> Result<Vec<u8>> {
    if atty::is(atty::Stream::Stdin) {
        return Err(ConfigError::Usage(
            "no template given; pass a path or pipe one on stdin".to_string(),
        )
        .into());
    }
    let mut bytes = Vec::new();
    std::io::stdin().read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Execute a command. Returns the process exit code.
pub fn execute(cli: Cli) -> Result<i32> {
    use Command::*;

    let globals = Globals {
        config: cli.config,
        account: cli.account,
        no_cache: cli.no_cache,
    };

    match cli.command {
        Inject {
            path,
            format,
            output,
            dry_run,
            backup,
            vault,
        } => inject::execute(
            &globals,
            path.as_deref(),
            inject::Flags {
                format,
                output,
                dry_run,
                backup,
                vault,
            },
        ),
        InjectAll {
            roots,
            dry_run,
            no_backup,
            exclude,
            workers,
            vault,
            json,
        } => inject_all::execute(
            &globals,
            roots,
            inject_all::Flags {
                dry_run,
                backup: !no_backup,
                exclude,
                workers,
                vault,
                json,
            },
        ),
        Validate {
            path,
            format,
            resolve,
            vault,
            json,
        } => validate::execute(&globals, path.as_deref(), format, resolve, vault, json),
        Diff {
            path,
            format,
            output,
            vault,
        } => diff::execute(&globals, &path, format, output, vault),
        Run {
            template,
            format,
            vault,
            command,
        } => run::execute(&globals, &template, format, vault, &command),
        Cache { action } => match action {
            CacheAction::Warm { paths, vault } => cache::warm(&globals, paths, vault),
            CacheAction::Clear => cache::clear(&globals),
            CacheAction::Status { json } => cache::status(&globals, json),
        },
        Completions { shell } => completions::execute(shell),
    }
}
