//! Error types.
//!
//! A top-level [`Error`] wraps one enum per concern so callers can match on
//! the failing subsystem. Token and reference problems found while rendering
//! a template are not errors; they are collected on the
//! [`ProcessingResult`](crate::core::processor::ProcessingResult).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("duplicate account: {0}")]
    DuplicateAccount(String),

    #[error("unknown format: {0} (expected one of: vault-path, braced-env, double-brace, custom-marker, bare-env)")]
    UnknownFormat(String),

    #[error("unable to determine {0} directory")]
    NoDirectory(&'static str),

    #[error("{0}")]
    Usage(String),
}

/// Template loading and parsing errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} looks like a binary file")]
    Binary(PathBuf),
}

/// Outcome of resolving one reference across every candidate account.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("secret not found: {reference} (tried: {})", .tried.join(", "))]
    NotFound {
        reference: String,
        tried: Vec<String>,
    },

    #[error("authentication required for account {account}")]
    AuthRequired { account: String },

    #[error("secret provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Errors reported by a single call to the external provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("item not found: {0}")]
    NotFound(String),

    #[error("not signed in to account {account}")]
    NotAuthenticated { account: String },

    #[error("provider timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("provider failed: {0}")]
    Failed(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Cache store errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache directory {path} is not usable: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write cache entry: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("cache lock poisoned")]
    Poisoned,
}

/// Output writing errors.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup of {path} failed: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no output path for {0} (use --output)")]
    NoDestination(PathBuf),
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Resolve(ResolveError::ProviderUnavailable(_))
            | Error::Resolve(ResolveError::AuthRequired { .. }) => 3,
            Error::Config(_) | Error::Output(OutputError::NoDestination(_)) => 2,
            _ => 1,
        }
    }

    /// Remediation hint shown under the error, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Resolve(ResolveError::ProviderUnavailable(_)) => {
                Some("install the vault CLI or set SIGIL_PROVIDER to its path")
            }
            Error::Resolve(ResolveError::AuthRequired { .. }) => Some("run: op signin"),
            Error::Cache(CacheError::Directory { .. }) => {
                Some("set SIGIL_CACHE_DIR or disable caching with SIGIL_CACHE=0")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
