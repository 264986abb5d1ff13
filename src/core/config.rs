//! Configuration file management.
//!
//! Loads `config.toml` from the user config directory (or `$SIGIL_CONFIG`),
//! then layers environment variable overrides on top. Command-line flags are
//! applied last by the CLI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::constants::{self, env};
use crate::core::token::Token;
use crate::core::types::AccountName;
use crate::error::{ConfigError, Result};

/// User configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Account tried first when a token names none.
    pub default_account: Option<AccountName>,
    /// Vault used when neither token, flag nor account names one.
    pub default_vault: String,
    /// Field read for simple tokens.
    pub default_field: String,
    /// Simple tokens consult the process environment before the vault.
    pub env_fallback: bool,
    /// Accounts in fallback order.
    pub accounts: Vec<AccountConfig>,
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub templates: TemplateConfig,
    /// Simple token name to vault path (`op://vault/item/field`).
    pub aliases: BTreeMap<String, String>,
}

/// One provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: AccountName,
    /// Default vault for this account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,
}

/// External provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider binary name or path.
    pub command: String,
    /// URI scheme accepted in vault-path tokens.
    pub scheme: String,
    /// Per-call timeout.
    pub timeout_secs: u64,
}

/// Secret cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Batch discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub roots: Vec<PathBuf>,
    pub suffixes: Vec<String>,
    pub exclude: Vec<String>,
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_account: None,
            default_vault: constants::DEFAULT_VAULT.to_string(),
            default_field: constants::DEFAULT_FIELD.to_string(),
            env_fallback: true,
            accounts: Vec::new(),
            provider: ProviderConfig::default(),
            cache: CacheConfig::default(),
            templates: TemplateConfig::default(),
            aliases: BTreeMap::new(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            command: constants::DEFAULT_PROVIDER.to_string(),
            scheme: constants::DEFAULT_SCHEME.to_string(),
            timeout_secs: constants::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: constants::DEFAULT_TTL_SECS,
            dir: None,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            suffixes: constants::TEMPLATE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude: Vec::new(),
            workers: 1,
        }
    }
}

impl Settings {
    /// Default config file location (`<config_dir>/sigil/config.toml`).
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;
        Ok(dir.join(constants::APP_DIR).join(constants::CONFIG_FILE))
    }

    /// Load settings from `path`, or the default location, then apply
    /// environment overrides.
    ///
    /// A missing file is not an error; defaults are used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or if the
    /// merged settings fail validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var_os(env::CONFIG) {
                Some(p) => PathBuf::from(p),
                None => Self::default_path()?,
            },
        };

        let mut settings = Self::from_file(&path)?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a config file. A missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            debug!("no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;

        debug!(
            accounts = settings.accounts.len(),
            aliases = settings.aliases.len(),
            "config loaded"
        );
        Ok(settings)
    }

    /// Apply `SIGIL_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(env::CACHE) {
            self.cache.enabled = parse_flag(env::CACHE, &value)?;
        }
        if let Some(value) = lookup(env::CACHE_TTL) {
            self.cache.ttl_secs =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: env::CACHE_TTL,
                        reason: format!("not a number of seconds: {}", value),
                    })?;
        }
        if let Some(value) = lookup(env::CACHE_DIR).filter(|v| !v.is_empty()) {
            self.cache.dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(env::ACCOUNT).filter(|v| !v.is_empty()) {
            self.default_account = Some(value);
        }
        if let Some(value) = lookup(env::PROVIDER).filter(|v| !v.is_empty()) {
            self.provider.command = value;
        }
        Ok(())
    }

    fn expand_paths(&mut self) {
        let expand = |p: &Path| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref());
        self.templates.roots = self.templates.roots.iter().map(|p| expand(p.as_path())).collect();
        self.cache.dir = self.cache.dir.as_deref().map(expand);
    }

    /// Directory holding cached secrets.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let base = dirs::cache_dir().ok_or(ConfigError::NoDirectory("cache"))?;
                Ok(base.join(constants::APP_DIR))
            }
        }
    }

    /// Configured default vault of `account`, if any.
    pub fn account_vault(&self, account: &str) -> Option<&str> {
        self.accounts
            .iter()
            .find(|a| a.name == account)
            .and_then(|a| a.vault.as_deref())
    }

    /// Check the settings for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        debug!("validating config");

        let mut names = std::collections::HashSet::new();
        for account in &self.accounts {
            if account.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "accounts",
                    reason: "account name is empty".to_string(),
                }
                .into());
            }
            if !names.insert(account.name.as_str()) {
                return Err(ConfigError::DuplicateAccount(account.name.clone()).into());
            }
        }

        if self.provider.command.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "provider.command",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if self.provider.scheme.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "provider.scheme",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "provider.timeout_secs",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        if self.templates.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "templates.workers",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        for suffix in &self.templates.suffixes {
            if !suffix.starts_with('.') || suffix.len() < 2 {
                return Err(ConfigError::InvalidValue {
                    field: "templates.suffixes",
                    reason: format!("suffix must start with '.': {}", suffix),
                }
                .into());
            }
        }
        for pattern in &self.templates.exclude {
            glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidValue {
                field: "templates.exclude",
                reason: format!("{}: {}", pattern, e),
            })?;
        }

        for (name, path) in &self.aliases {
            if let Err(bad) = Token::parse_path(path) {
                return Err(ConfigError::InvalidValue {
                    field: "aliases",
                    reason: format!("{} = {}: {}", name, path, bad.reason),
                }
                .into());
            }
        }

        Ok(())
    }
}

fn parse_flag(field: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field,
            reason: format!("expected a boolean, got '{}'", value),
        }
        .into()),
    }
}
