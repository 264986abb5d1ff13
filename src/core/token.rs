//! Token extraction.
//!
//! Pulls the ordered set of unique placeholders out of a template body for
//! a given [`Format`]. Order is first-seen so dry-run output and diffs are
//! stable and auditable.

use serde::Serialize;
use std::collections::HashSet;

use crate::core::format::Format;

/// An unresolved placeholder.
///
/// For simple grammars only `raw_name` is set. For vault paths the hints
/// carry the parsed path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    raw_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    account_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vault_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_hint: Option<String>,
}

impl Token {
    /// A bare-name token (`${NAME}`, `{{NAME}}`, `%%NAME%%`, `$NAME`).
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            raw_name: name.into(),
            scheme: None,
            account_hint: None,
            vault_hint: None,
            item_hint: None,
            field_hint: None,
        }
    }

    /// Parse a `scheme://[account/]vault/item/field` path.
    pub fn parse_path(raw: &str) -> Result<Self, MalformedToken> {
        let malformed = |reason: &str| MalformedToken {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, path) = raw
            .split_once("://")
            .ok_or_else(|| malformed("expected scheme://vault/item/field"))?;

        let scheme_ok = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase())
            && scheme
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+.-".contains(c));
        if !scheme_ok {
            return Err(malformed("invalid scheme"));
        }

        let segments: Vec<&str> = path.split('/').map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(malformed("empty path segment"));
        }

        let (account, vault, item, field) = match segments.as_slice() {
            [vault, item, field] => (None, *vault, *item, *field),
            [account, vault, item, field] => (Some(*account), *vault, *item, *field),
            _ => {
                return Err(malformed(&format!(
                    "expected 3 or 4 path segments, found {}",
                    segments.len()
                )))
            }
        };

        Ok(Self {
            raw_name: raw.to_string(),
            scheme: Some(scheme.to_string()),
            account_hint: account.map(str::to_string),
            vault_hint: Some(vault.to_string()),
            item_hint: Some(item.to_string()),
            field_hint: Some(field.to_string()),
        })
    }

    /// The placeholder text as written (name, or full path for vault paths).
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn account_hint(&self) -> Option<&str> {
        self.account_hint.as_deref()
    }

    pub fn vault_hint(&self) -> Option<&str> {
        self.vault_hint.as_deref()
    }

    pub fn item_hint(&self) -> Option<&str> {
        self.item_hint.as_deref()
    }

    pub fn field_hint(&self) -> Option<&str> {
        self.field_hint.as_deref()
    }

    /// Whether this token carries a full vault path.
    pub fn is_path(&self) -> bool {
        self.item_hint.is_some()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw_name)
    }
}

/// A placeholder whose text does not fit its grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedToken {
    pub raw: String,
    pub reason: String,
}

impl std::fmt::Display for MalformedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.raw, self.reason)
    }
}

/// Tokens unique by raw name, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    tokens: Vec<Token>,
    seen: HashSet<String>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token. Returns `false` if its raw name was already present.
    pub fn insert(&mut self, token: Token) -> bool {
        if self.seen.contains(token.raw_name()) {
            return false;
        }
        self.seen.insert(token.raw_name().to_string());
        self.tokens.push(token);
        true
    }

    pub fn contains(&self, raw_name: &str) -> bool {
        self.seen.contains(raw_name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tokens.iter().map(Token::raw_name).collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<'a> IntoIterator for &'a TokenSet {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for TokenSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tokens.serialize(serializer)
    }
}

/// Result of scanning one template body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub tokens: TokenSet,
    pub malformed: Vec<MalformedToken>,
}

/// Extract the unique tokens of `format` from `content`.
///
/// Malformed vault paths are collected separately and never stop the scan.
pub fn extract(content: &str, format: Format) -> Extraction {
    let mut extraction = Extraction::default();
    let mut malformed_seen = HashSet::new();

    for caps in format.pattern().captures_iter(content) {
        let raw = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();

        match format {
            Format::VaultPath => match Token::parse_path(raw) {
                Ok(token) => {
                    extraction.tokens.insert(token);
                }
                Err(bad) => {
                    if malformed_seen.insert(bad.raw.clone()) {
                        extraction.malformed.push(bad);
                    }
                }
            },
            _ => {
                extraction.tokens.insert(Token::simple(raw));
            }
        }
    }

    extraction
}
