//! Token grammar detection.
//!
//! A template uses exactly one token grammar. Detection walks the grammars
//! in precedence order (most specific first) and picks the first one with
//! at least one match, so a generic pattern never swallows a specific one.

use regex::Regex;
use serde::Serialize;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::ConfigError;

/// Supported token grammars, in detection precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// `{{ op://[account/]vault/item/field }}`
    VaultPath,
    /// `${NAME}`
    BracedEnv,
    /// `{{NAME}}`
    DoubleBrace,
    /// `%%NAME%%`
    CustomMarker,
    /// `$NAME`
    BareEnv,
}

/// Match count for one grammar, as reported by `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatCount {
    pub format: Format,
    pub matches: usize,
}

static VAULT_PATH_PROBE: OnceLock<Regex> = OnceLock::new();
static VAULT_PATH: OnceLock<Regex> = OnceLock::new();
static BRACED_ENV: OnceLock<Regex> = OnceLock::new();
static DOUBLE_BRACE: OnceLock<Regex> = OnceLock::new();
static CUSTOM_MARKER: OnceLock<Regex> = OnceLock::new();
static BARE_ENV: OnceLock<Regex> = OnceLock::new();

fn compile(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("token grammar is a valid regex"))
}

impl Format {
    /// All grammars, highest precedence first.
    pub const ALL: [Format; 5] = [
        Format::VaultPath,
        Format::BracedEnv,
        Format::DoubleBrace,
        Format::CustomMarker,
        Format::BareEnv,
    ];

    /// Name used on the command line and in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Format::VaultPath => "vault-path",
            Format::BracedEnv => "braced-env",
            Format::DoubleBrace => "double-brace",
            Format::CustomMarker => "custom-marker",
            Format::BareEnv => "bare-env",
        }
    }

    /// Extraction and substitution pattern. Capture group 1 is the token name.
    ///
    /// For `VaultPath` this matches every double-brace expression, so that
    /// a `{{NAME}}` in a vault-path template is seen as a malformed path
    /// rather than silently ignored.
    pub fn pattern(&self) -> &'static Regex {
        match self {
            Format::VaultPath => compile(&VAULT_PATH, r"\{\{\s*([^{}]*?)\s*\}\}"),
            Format::BracedEnv => compile(&BRACED_ENV, r"\$\{([A-Z][A-Z0-9_]*)\}"),
            Format::DoubleBrace => compile(&DOUBLE_BRACE, r"\{\{([A-Z][A-Z0-9_]*)\}\}"),
            Format::CustomMarker => compile(&CUSTOM_MARKER, r"%%([A-Z][A-Z0-9_]*)%%"),
            Format::BareEnv => compile(&BARE_ENV, r"\$([A-Z][A-Z0-9_]*)\b"),
        }
    }

    /// Detection pattern. Only differs from [`Format::pattern`] for
    /// `VaultPath`, which requires a scheme-qualified path to claim a file.
    fn probe(&self) -> &'static Regex {
        match self {
            Format::VaultPath => compile(
                &VAULT_PATH_PROBE,
                r"\{\{\s*[a-z][a-z0-9+.-]*://[^{}]*?\s*\}\}",
            ),
            other => other.pattern(),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vault-path" | "vault" | "op" => Ok(Format::VaultPath),
            "braced-env" | "braced" => Ok(Format::BracedEnv),
            "double-brace" | "double-brace-simple" | "mustache" => Ok(Format::DoubleBrace),
            "custom-marker" | "marker" => Ok(Format::CustomMarker),
            "bare-env" | "env" => Ok(Format::BareEnv),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

/// Count matches for every grammar, in precedence order.
pub fn count(content: &str) -> Vec<FormatCount> {
    Format::ALL
        .iter()
        .map(|format| FormatCount {
            format: *format,
            matches: format.probe().find_iter(content).count(),
        })
        .collect()
}

/// Detect the dominant grammar of a template.
///
/// Returns `None` when no grammar matches; a template without tokens is
/// valid and renders to itself.
pub fn detect(content: &str) -> Option<Format> {
    Format::ALL
        .into_iter()
        .find(|format| format.probe().is_match(content))
}
