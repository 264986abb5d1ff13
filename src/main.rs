//! Sigil - render secret templates from an external vault CLI.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sigil::cli::output;
use sigil::cli::{execute, Cli};
use sigil::core::constants::env;

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(env::LOG).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("sigil=debug")
        } else {
            EnvFilter::new("sigil=warn")
        }
    });

    // Logs go to stderr; stdout carries rendered output.
    let json = std::env::var(env::LOG_FORMAT).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
    });
    let plain_layer = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .init();

    match execute(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::error(&e.to_string());
            if let Some(hint) = e.hint() {
                output::hint(hint);
            }
            std::process::exit(e.exit_code());
        }
    }
}
