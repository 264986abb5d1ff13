//! Template processing.
//!
//! Drives one template through detection, extraction, resolution (via the
//! cache), substitution and output. Rendering is all-or-nothing: a template
//! with any unresolved or malformed token is never written. Token-level
//! problems are collected on the [`ProcessingResult`]; only
//! environment-level failures (provider missing, cache unusable) are
//! returned as `Err`.

use regex::Captures;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::cache::CacheManager;
use crate::core::config::Settings;
use crate::core::constants;
use crate::core::diff::Diff;
use crate::core::format::{self, Format, FormatCount};
use crate::core::output;
use crate::core::provider::OnePassword;
use crate::core::reference::{Lookup, ReferenceDefaults, SecretReference};
use crate::core::resolver::{Resolved, Resolver};
use crate::core::token::{self, MalformedToken, Token, TokenSet};
use crate::core::types::SecretValue;
use crate::error::{Error, ResolveError, Result, TemplateError};

/// Label used for templates read from stdin.
pub const STDIN_LABEL: &str = "<stdin>";

/// A loaded template. Never mutated after parsing.
#[derive(Debug, Clone)]
pub struct Template {
    path: PathBuf,
    raw_content: String,
    format: Option<Format>,
    tokens: TokenSet,
    malformed: Vec<MalformedToken>,
}

impl Template {
    /// Detect (unless `format` is given) and extract tokens.
    pub fn parse(path: impl Into<PathBuf>, raw_content: String, format: Option<Format>) -> Self {
        let format = format.or_else(|| format::detect(&raw_content));
        let extraction = format
            .map(|f| token::extract(&raw_content, f))
            .unwrap_or_default();

        Self {
            path: path.into(),
            raw_content,
            format,
            tokens: extraction.tokens,
            malformed: extraction.malformed,
        }
    }

    /// Move vault-path tokens whose scheme is not `scheme` to the malformed
    /// list.
    pub fn restrict_scheme(&mut self, scheme: &str) {
        let mut kept = TokenSet::new();
        for token in self.tokens.iter() {
            match token.scheme() {
                Some(s) if s != scheme => self.malformed.push(MalformedToken {
                    raw: token.raw_name().to_string(),
                    reason: format!("unsupported scheme '{}'", s),
                }),
                _ => {
                    kept.insert(token.clone());
                }
            }
        }
        self.tokens = kept;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw_content(&self) -> &str {
        &self.raw_content
    }

    /// Detected or overridden grammar; `None` when the template has no tokens.
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }

    pub fn malformed(&self) -> &[MalformedToken] {
        &self.malformed
    }
}

/// Where rendered output goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Target {
    /// The template path minus its suffix. Kept in memory when the name has
    /// no recognized suffix.
    #[default]
    Derived,
    /// An explicit path.
    File(PathBuf),
    /// Never written; returned on the result.
    Buffer,
}

/// Per-invocation processing options.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Skip detection and use this grammar.
    pub format: Option<Format>,
    pub target: Target,
    pub dry_run: bool,
    pub backup: bool,
    /// `--account` / `--vault` flags.
    pub defaults: ReferenceDefaults,
}

/// Outcome of processing one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Rendered,
    Skipped,
    Failed,
}

/// Why a token was left unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingKind {
    Malformed,
    NotFound,
    AuthRequired,
}

/// A token that could not be substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingToken {
    pub token: String,
    pub kind: MissingKind,
    pub reason: String,
}

/// Per-template result.
///
/// `rendered` and `diff` may contain secrets and are never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub template_path: PathBuf,
    pub status: Status,
    pub format: Option<Format>,
    /// Unique tokens found.
    pub tokens: usize,
    pub missing_tokens: Vec<MissingToken>,
    pub output_path: Option<PathBuf>,
    pub backup_path: Option<PathBuf>,
    /// Whether the output file was (re)written.
    pub written: bool,
    pub message: Option<String>,
    #[serde(skip)]
    pub rendered: Option<SecretValue>,
    #[serde(skip)]
    pub diff: Option<Diff>,
}

impl ProcessingResult {
    fn new(path: &Path) -> Self {
        Self {
            template_path: path.to_path_buf(),
            status: Status::Rendered,
            format: None,
            tokens: 0,
            missing_tokens: Vec::new(),
            output_path: None,
            backup_path: None,
            written: false,
            message: None,
            rendered: None,
            diff: None,
        }
    }

    fn skipped(path: &Path, message: impl Into<String>) -> Self {
        Self {
            status: Status::Skipped,
            message: Some(message.into()),
            ..Self::new(path)
        }
    }

    fn failed(path: &Path, message: impl Into<String>) -> Self {
        Self::new(path).fail(message)
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        self.status = Status::Failed;
        self.message = Some(message.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    /// Whether any token failed because an account needs to sign in.
    pub fn needs_auth(&self) -> bool {
        self.missing_tokens
            .iter()
            .any(|m| m.kind == MissingKind::AuthRequired)
    }
}

/// Output of substitution.
pub struct Rendering {
    pub output: SecretValue,
    pub missing: Vec<MissingToken>,
}

/// Where a token's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    Env,
    Vault,
}

/// One token in a validation report.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCheck {
    pub token: String,
    pub source: TokenSource,
    /// Address the token maps to (vault tokens only).
    pub reference: Option<String>,
    /// `None` unless resolution was requested.
    pub resolved: Option<bool>,
    pub account: Option<String>,
    pub error: Option<String>,
}

/// Parse-only report for `validate`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub binary: bool,
    pub format: Option<Format>,
    pub counts: Vec<FormatCount>,
    pub tokens: Vec<TokenCheck>,
    pub malformed: Vec<MalformedToken>,
}

impl ValidationReport {
    /// No malformed tokens and nothing known to be unresolvable.
    pub fn is_ok(&self) -> bool {
        self.malformed.is_empty() && self.tokens.iter().all(|t| t.resolved != Some(false))
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Processes templates against one resolver and cache.
pub struct Processor {
    settings: Settings,
    resolver: Resolver,
    cache: CacheManager,
    env: EnvLookup,
    provider_ready: OnceLock<std::result::Result<(), ResolveError>>,
}

impl Processor {
    pub fn new(settings: Settings, resolver: Resolver, cache: CacheManager) -> Self {
        Self {
            settings,
            resolver,
            cache,
            env: Box::new(|key| std::env::var(key).ok()),
            provider_ready: OnceLock::new(),
        }
    }

    /// Processor over the configured `op`-compatible provider and cache.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the cache directory is unusable.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let provider = OnePassword::new(
            settings.provider.command.clone(),
            settings.provider.scheme.clone(),
            Duration::from_secs(settings.provider.timeout_secs),
        );
        let cache = CacheManager::from_settings(&settings)?;
        Ok(Self::new(settings, Resolver::new(provider), cache))
    }

    /// Replace the environment used by the env layer.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Parse `content` as a template, rejecting foreign vault schemes.
    pub fn parse(&self, path: &Path, content: String, format: Option<Format>) -> Template {
        let mut template = Template::parse(path, content, format);
        template.restrict_scheme(&self.settings.provider.scheme);
        debug!(
            path = %path.display(),
            format = template.format().map(|f| f.name()).unwrap_or("none"),
            tokens = template.tokens().len(),
            malformed = template.malformed().len(),
            "template parsed"
        );
        template
    }

    /// Process the template at `path`.
    ///
    /// Read failures and binary files are reported on the result.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for environment-level failures.
    pub fn process(&self, path: &Path, options: &ProcessOptions) -> Result<ProcessingResult> {
        match std::fs::read(path) {
            Ok(bytes) => self.process_bytes(path, bytes, options),
            Err(source) => {
                let err = TemplateError::Read {
                    path: path.to_path_buf(),
                    source,
                };
                warn!(error = %err, "cannot read template");
                Ok(ProcessingResult::failed(path, err.to_string()))
            }
        }
    }

    /// Process template bytes labelled `path` (e.g. stdin).
    pub fn process_bytes(
        &self,
        path: &Path,
        bytes: Vec<u8>,
        options: &ProcessOptions,
    ) -> Result<ProcessingResult> {
        let content = match decode(path, bytes) {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %path.display(), "skipping binary file");
                return Ok(ProcessingResult::skipped(path, err.to_string()));
            }
        };
        let template = self.parse(path, content, options.format);
        self.process_template(&template, options)
    }

    /// Render a parsed template and write it according to `options`.
    pub fn process_template(
        &self,
        template: &Template,
        options: &ProcessOptions,
    ) -> Result<ProcessingResult> {
        let path = template.path();
        let mut result = ProcessingResult::new(path);
        result.format = template.format();
        result.tokens = template.tokens().len();

        let destination = match &options.target {
            Target::Derived => output::output_path_for(path, &self.settings.templates.suffixes),
            Target::File(p) => Some(p.clone()),
            Target::Buffer => None,
        };
        result.output_path = destination.clone();

        let rendering = self.render(template, options)?;
        if !rendering.missing.is_empty() {
            let count = rendering.missing.len();
            result = result.fail(format!("{} unresolved token(s)", count));
            result.missing_tokens = rendering.missing;
        }

        if options.dry_run {
            if let Some(dest) = &destination {
                let current = std::fs::read_to_string(dest).unwrap_or_default();
                result.diff = Some(Diff::compute(&current, rendering.output.expose()));
            }
            result.rendered = Some(rendering.output);
            return Ok(result);
        }

        if result.is_failed() {
            warn!(path = %path.display(), missing = result.missing_tokens.len(), "template not rendered");
            return Ok(result);
        }

        let Some(dest) = destination else {
            result.rendered = Some(rendering.output);
            return Ok(result);
        };

        if output::matches_existing(&dest, rendering.output.expose()) {
            debug!(path = %dest.display(), "output unchanged");
            result.message = Some("unchanged".to_string());
            return Ok(result);
        }

        if options.backup {
            match output::backup(&dest) {
                Ok(saved) => result.backup_path = saved,
                Err(err) => return Ok(result.fail(err.to_string())),
            }
        }
        if let Err(err) = output::atomic_write(&dest, rendering.output.expose().as_bytes()) {
            warn!(error = %err, "write failed");
            return Ok(result.fail(err.to_string()));
        }

        result.written = true;
        info!(template = %path.display(), output = %dest.display(), "template rendered");
        Ok(result)
    }

    /// Resolve every token and substitute.
    ///
    /// Unresolved tokens stay as written, or become `<<missing:NAME>>`
    /// markers in dry-run mode.
    pub fn render(&self, template: &Template, options: &ProcessOptions) -> Result<Rendering> {
        let mut missing: Vec<MissingToken> = template
            .malformed()
            .iter()
            .map(|bad| MissingToken {
                token: bad.raw.clone(),
                kind: MissingKind::Malformed,
                reason: bad.reason.clone(),
            })
            .collect();

        let Some(format) = template.format() else {
            return Ok(Rendering {
                output: SecretValue::new(template.raw_content()),
                missing,
            });
        };

        let mut values: HashMap<&str, SecretValue> = HashMap::new();
        for token in template.tokens() {
            match self.resolve_token(token, &options.defaults)? {
                Ok(value) => {
                    values.insert(token.raw_name(), value);
                }
                Err(miss) => missing.push(miss),
            }
        }

        let output = format
            .pattern()
            .replace_all(template.raw_content(), |caps: &Captures| {
                let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
                match values.get(name) {
                    Some(value) => value.expose().to_string(),
                    None if options.dry_run => {
                        format!("{}{}>>", constants::MISSING_MARKER_PREFIX, name)
                    }
                    None => caps[0].to_string(),
                }
            });

        Ok(Rendering {
            output: SecretValue::new(output.into_owned()),
            missing,
        })
    }

    /// Resolve one lookup through the cache.
    pub fn lookup(&self, lookup: &Lookup) -> Result<Resolved> {
        self.cache
            .get_or_resolve(lookup, self.cache.ttl_secs(), || self.resolve_uncached(lookup))
    }

    /// Resolve one lookup with the provider, bypassing the cache.
    pub fn resolve_uncached(&self, lookup: &Lookup) -> std::result::Result<Resolved, ResolveError> {
        self.provider_ready
            .get_or_init(|| self.resolver.check())
            .clone()?;
        self.resolver.resolve(lookup)
    }

    /// Value from the process environment for simple tokens.
    fn from_env(&self, token: &Token) -> Option<SecretValue> {
        if token.is_path() || !self.settings.env_fallback {
            return None;
        }
        (self.env)(token.raw_name())
            .filter(|v| !v.is_empty())
            .map(SecretValue::new)
    }

    fn lookup_for(&self, token: &Token, defaults: &ReferenceDefaults) -> Lookup {
        let reference = SecretReference::from_token(token, &self.settings, defaults);
        Lookup::new(reference, &self.settings, defaults)
    }

    /// Resolve one token. The inner `Err` is a token-level miss.
    fn resolve_token(
        &self,
        token: &Token,
        defaults: &ReferenceDefaults,
    ) -> Result<std::result::Result<SecretValue, MissingToken>> {
        if let Some(value) = self.from_env(token) {
            debug!(token = token.raw_name(), "resolved from environment");
            return Ok(Ok(value));
        }

        let lookup = self.lookup_for(token, defaults);
        match self.lookup(&lookup) {
            Ok(resolved) => {
                debug!(
                    token = token.raw_name(),
                    account = resolved.account.as_deref().unwrap_or("(default)"),
                    cached = resolved.cached,
                    "token resolved"
                );
                Ok(Ok(resolved.value))
            }
            Err(Error::Resolve(ResolveError::ProviderUnavailable(reason))) => {
                Err(ResolveError::ProviderUnavailable(reason).into())
            }
            Err(Error::Resolve(err)) => {
                let kind = match err {
                    ResolveError::AuthRequired { .. } => MissingKind::AuthRequired,
                    _ => MissingKind::NotFound,
                };
                warn!(token = token.raw_name(), error = %err, "token unresolved");
                Ok(Err(MissingToken {
                    token: token.raw_name().to_string(),
                    kind,
                    reason: err.to_string(),
                }))
            }
            Err(other) => Err(other),
        }
    }

    /// Lookups a template needs from the vault (env-served tokens excluded).
    pub fn lookups(&self, template: &Template, defaults: &ReferenceDefaults) -> Vec<Lookup> {
        let mut seen = std::collections::HashSet::new();
        template
            .tokens()
            .iter()
            .filter(|token| self.from_env(token).is_none())
            .map(|token| self.lookup_for(token, defaults))
            .filter(|lookup| seen.insert(lookup.key().to_string()))
            .collect()
    }

    /// Parse-only check of the template at `path`, optionally resolving
    /// each token. Values are never returned.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Read` if the file cannot be read, and
    /// environment-level failures when `resolve` is set.
    pub fn validate(
        &self,
        path: &Path,
        options: &ProcessOptions,
        resolve: bool,
    ) -> Result<ValidationReport> {
        let bytes = std::fs::read(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.validate_bytes(path, bytes, options, resolve)
    }

    /// [`validate`](Self::validate) for in-memory content.
    pub fn validate_bytes(
        &self,
        path: &Path,
        bytes: Vec<u8>,
        options: &ProcessOptions,
        resolve: bool,
    ) -> Result<ValidationReport> {
        let content = match decode(path, bytes) {
            Ok(content) => content,
            Err(_) => {
                return Ok(ValidationReport {
                    path: path.to_path_buf(),
                    binary: true,
                    format: None,
                    counts: Vec::new(),
                    tokens: Vec::new(),
                    malformed: Vec::new(),
                })
            }
        };

        let counts = format::count(&content);
        let template = self.parse(path, content, options.format);

        let mut tokens = Vec::with_capacity(template.tokens().len());
        for token in template.tokens() {
            let mut check = TokenCheck {
                token: token.raw_name().to_string(),
                source: TokenSource::Vault,
                reference: None,
                resolved: None,
                account: None,
                error: None,
            };

            if self.from_env(token).is_some() {
                check.source = TokenSource::Env;
                check.resolved = resolve.then_some(true);
                tokens.push(check);
                continue;
            }

            let lookup = self.lookup_for(token, &options.defaults);
            check.reference = Some(lookup.reference.to_string());
            if resolve {
                match self.lookup(&lookup) {
                    Ok(resolved) => {
                        check.resolved = Some(true);
                        check.account = resolved.account;
                    }
                    Err(Error::Resolve(ResolveError::ProviderUnavailable(reason))) => {
                        return Err(ResolveError::ProviderUnavailable(reason).into());
                    }
                    Err(Error::Resolve(err)) => {
                        check.resolved = Some(false);
                        check.error = Some(err.to_string());
                    }
                    Err(other) => return Err(other),
                }
            }
            tokens.push(check);
        }

        Ok(ValidationReport {
            path: path.to_path_buf(),
            binary: false,
            format: template.format(),
            counts,
            tokens,
            malformed: template.malformed().to_vec(),
        })
    }
}

/// Template bytes as text, or `Binary` when they do not look like text.
fn decode(path: &Path, bytes: Vec<u8>) -> std::result::Result<String, TemplateError> {
    if output::is_binary(&bytes) {
        return Err(TemplateError::Binary(path.to_path_buf()));
    }
    String::from_utf8(bytes).map_err(|_| TemplateError::Binary(path.to_path_buf()))
}
