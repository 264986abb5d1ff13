//! Dotenv parsing for `run`.
//!
//! A rendered dotenv template becomes the child process environment.

use zeroize::Zeroizing;

/// One `KEY=VALUE` pair. The value is wiped on drop.
pub type EnvPair = (String, Zeroizing<String>);

/// Parse dotenv-style `KEY=VALUE` lines.
///
/// Skips blank lines and `#` comments, accepts an optional `export `
/// prefix, and strips one layer of matching single or double quotes.
/// Lines without `=` or with an empty key are ignored.
pub fn parse(contents: &str) -> Vec<EnvPair> {
    let mut pairs = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            pairs.push((key.to_string(), Zeroizing::new(unquote(value.trim()).to_string())));
        }
    }

    pairs
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
