//! Secret resolution across accounts.
//!
//! One machine can be signed in to several provider accounts, and the same
//! item name may live in any of them. The resolver walks the candidate list
//! of a [`Lookup`] in order and returns the first hit.

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::provider::SecretProvider;
use crate::core::reference::Lookup;
use crate::core::types::SecretValue;
use crate::error::{ProviderError, ResolveError};

/// A successfully resolved secret.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved {
    #[serde(skip)]
    pub value: SecretValue,
    /// Account the value came from (`None` = provider's active account).
    pub account: Option<String>,
    /// Candidates that were tried and failed before the hit.
    pub tried: Vec<String>,
    /// Served from the cache without a provider call.
    pub cached: bool,
}

/// Resolves lookups through a [`SecretProvider`].
pub struct Resolver {
    provider: Box<dyn SecretProvider>,
}

impl Resolver {
    pub fn new(provider: impl SecretProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
        }
    }

    /// Check that the provider can run at all.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::ProviderUnavailable` if the provider binary is
    /// missing.
    pub fn check(&self) -> Result<(), ResolveError> {
        debug!(provider = self.provider.name(), "checking provider");
        self.provider
            .check()
            .map_err(|e| ResolveError::ProviderUnavailable(e.to_string()))
    }

    /// Resolve a lookup by trying each candidate account in order.
    ///
    /// # Errors
    ///
    /// - `NotFound` when every candidate misses, listing the accounts tried
    /// - `AuthRequired` as soon as one candidate is not signed in; later
    ///   candidates are not tried for this reference
    /// - `ProviderUnavailable` when the provider cannot be started
    pub fn resolve(&self, lookup: &Lookup) -> Result<Resolved, ResolveError> {
        let reference = &lookup.reference;
        let mut tried = Vec::new();

        for candidate in &lookup.candidates {
            let label = candidate.label().to_string();
            debug!(
                account = %label,
                vault = %candidate.vault,
                item = %reference.item,
                field = %reference.field,
                "trying candidate"
            );

            match self.provider.read(
                candidate.account.as_deref(),
                &candidate.vault,
                &reference.item,
                &reference.field,
            ) {
                Ok(value) => {
                    debug!(account = %label, skipped = tried.len(), "resolved");
                    return Ok(Resolved {
                        value,
                        account: candidate.account.clone(),
                        tried,
                        cached: false,
                    });
                }
                Err(ProviderError::NotFound(_)) => tried.push(label),
                Err(ProviderError::NotAuthenticated { account }) => {
                    return Err(ResolveError::AuthRequired { account });
                }
                Err(ProviderError::Unavailable(reason)) => {
                    return Err(ResolveError::ProviderUnavailable(reason));
                }
                Err(err @ (ProviderError::Timeout(_) | ProviderError::Failed(_))) => {
                    warn!(account = %label, error = %err, "provider call failed, trying next account");
                    tried.push(format!("{} ({})", label, err));
                }
            }
        }

        Err(ResolveError::NotFound {
            reference: reference.to_string(),
            tried,
        })
    }
}
