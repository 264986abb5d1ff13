//! Secret addresses.
//!
//! A [`SecretReference`] is a token merged with defaults. A [`Lookup`] pins
//! the reference to the ordered list of (account, vault) candidates it will
//! be resolved against, and carries the cache key derived from both.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::config::Settings;
use crate::core::token::Token;
use crate::core::types::AccountName;

/// Fully-qualified address of one secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SecretReference {
    /// Account named by the token itself.
    pub account: Option<AccountName>,
    /// Vault named by the token or the `--vault` flag.
    pub vault: Option<String>,
    pub item: String,
    pub field: String,
}

/// Per-invocation inputs merged into references.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDefaults {
    /// `--vault` flag.
    pub vault: Option<String>,
    /// `--account` flag; overrides the configured default account.
    pub account: Option<AccountName>,
}

impl SecretReference {
    pub fn new(item: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            account: None,
            vault: None,
            item: item.into(),
            field: field.into(),
        }
    }

    pub fn with_vault(mut self, vault: impl Into<String>) -> Self {
        self.vault = Some(vault.into());
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Build a reference from a token.
    ///
    /// Path tokens use their own hints. Simple tokens go through the alias
    /// table first and otherwise read `item = NAME, field = default_field`.
    /// A token vault hint wins over the `--vault` flag.
    pub fn from_token(token: &Token, settings: &Settings, defaults: &ReferenceDefaults) -> Self {
        let aliased = if token.is_path() {
            None
        } else {
            settings
                .aliases
                .get(token.raw_name())
                .and_then(|path| Token::parse_path(path).ok())
        };
        let source = aliased.as_ref().unwrap_or(token);

        let item = source.item_hint().unwrap_or(token.raw_name()).to_string();
        let field = source
            .field_hint()
            .unwrap_or(settings.default_field.as_str())
            .to_string();

        Self {
            account: source.account_hint().map(str::to_string),
            vault: source
                .vault_hint()
                .map(str::to_string)
                .or_else(|| defaults.vault.clone()),
            item,
            field,
        }
    }
}

impl std::fmt::Display for SecretReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(account) = &self.account {
            write!(f, "{}/", account)?;
        }
        write!(
            f,
            "{}/{}/{}",
            self.vault.as_deref().unwrap_or("*"),
            self.item,
            self.field
        )
    }
}

/// One account to try, with the vault chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Candidate {
    /// `None` means the provider's currently active account.
    pub account: Option<AccountName>,
    pub vault: String,
}

impl Candidate {
    /// Account label for diagnostics.
    pub fn label(&self) -> &str {
        self.account.as_deref().unwrap_or("(default)")
    }
}

/// A reference bound to its candidate list and cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lookup {
    pub reference: SecretReference,
    pub candidates: Vec<Candidate>,
    #[serde(skip)]
    key: String,
}

impl Lookup {
    /// Order candidates and derive the cache key.
    ///
    /// Order: the token's account, then the default account (`--account`
    /// flag, else configured), then remaining configured accounts. With no
    /// accounts at all, one candidate targets the provider's active account.
    ///
    /// Vault per candidate: reference vault, else the account's configured
    /// vault, else the global default vault.
    pub fn new(reference: SecretReference, settings: &Settings, defaults: &ReferenceDefaults) -> Self {
        let mut accounts: Vec<&str> = Vec::new();
        if let Some(account) = reference.account.as_deref() {
            push_unique(&mut accounts, account);
        }
        if let Some(account) = defaults
            .account
            .as_deref()
            .or(settings.default_account.as_deref())
        {
            push_unique(&mut accounts, account);
        }
        for account in &settings.accounts {
            push_unique(&mut accounts, &account.name);
        }

        let vault_for = |account: Option<&str>| -> String {
            reference
                .vault
                .clone()
                .or_else(|| account.and_then(|a| settings.account_vault(a)).map(str::to_string))
                .unwrap_or_else(|| settings.default_vault.clone())
        };

        let candidates: Vec<Candidate> = if accounts.is_empty() {
            vec![Candidate {
                account: None,
                vault: vault_for(None),
            }]
        } else {
            accounts
                .into_iter()
                .map(|a| Candidate {
                    account: Some(a.to_string()),
                    vault: vault_for(Some(a)),
                })
                .collect()
        };

        let key = cache_key(&candidates, &reference);
        Self {
            reference,
            candidates,
            key,
        }
    }

    /// Deterministic cache key for this lookup.
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn push_unique<'a>(list: &mut Vec<&'a str>, name: &'a str) {
    if !list.contains(&name) {
        list.push(name);
    }
}

/// SHA-256 over the candidate signature plus item and field.
///
/// The key never includes token text, so two templates that address the
/// same secret through the same accounts share one entry, while the same
/// item reached through different accounts never collides.
fn cache_key(candidates: &[Candidate], reference: &SecretReference) -> String {
    let mut hasher = Sha256::new();
    for candidate in candidates {
        hasher.update(candidate.account.as_deref().unwrap_or("").as_bytes());
        hasher.update([0x1f]);
        hasher.update(candidate.vault.as_bytes());
        hasher.update([0x1e]);
    }
    hasher.update([0x1d]);
    hasher.update(reference.item.as_bytes());
    hasher.update([0x1f]);
    hasher.update(reference.field.as_bytes());

    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
