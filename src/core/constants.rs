//! Constants used throughout sigil.
//!
//! Centralizes file names, defaults and environment variable names.

/// Application directory name under the config and cache roots.
pub const APP_DIR: &str = "sigil";

/// Configuration file name inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Default vault provider binary.
pub const DEFAULT_PROVIDER: &str = "op";

/// URI scheme of vault-path tokens handled by the default provider.
pub const DEFAULT_SCHEME: &str = "op";

/// Vault used when neither the token, the CLI nor the account names one.
pub const DEFAULT_VAULT: &str = "Private";

/// Field read for simple tokens.
pub const DEFAULT_FIELD: &str = "password";

/// Default cache time-to-live in seconds.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default per-call provider timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Template suffixes recognized by batch discovery.
pub const TEMPLATE_SUFFIXES: &[&str] = &[".tpl", ".tmpl", ".template"];

/// Version-control metadata directories never searched for templates.
pub const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Bytes inspected by the binary-content heuristic.
pub const BINARY_SNIFF_LEN: usize = 8000;

/// Marker substituted for unresolved tokens in dry-run output.
pub const MISSING_MARKER_PREFIX: &str = "<<missing:";

/// Environment variable names.
pub mod env {
    pub const CONFIG: &str = "SIGIL_CONFIG";
    pub const CACHE: &str = "SIGIL_CACHE";
    pub const CACHE_TTL: &str = "SIGIL_CACHE_TTL";
    pub const CACHE_DIR: &str = "SIGIL_CACHE_DIR";
    pub const ACCOUNT: &str = "SIGIL_ACCOUNT";
    pub const PROVIDER: &str = "SIGIL_PROVIDER";
    pub const DEBUG: &str = "SIGIL_DEBUG";
    pub const LOG: &str = "SIGIL_LOG";
    pub const LOG_FORMAT: &str = "SIGIL_LOG_FORMAT";
}
