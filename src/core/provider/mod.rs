//! External secret providers.
//!
//! The resolver only talks to a [`SecretProvider`]. Process spawning and
//! parsing of CLI output live behind this trait.
//!
//! ## Adding a New Provider
//!
//! 1. Implement the `SecretProvider` trait
//! 2. Add the implementation in a new file (e.g., `bitwarden.rs`)
//! 3. Re-export from this module

mod onepassword;
mod fake;

pub use fake::StaticProvider;
pub use onepassword::OnePassword;

use crate::core::types::SecretValue;
use crate::error::ProviderError;

/// A vault that can read one field of one item.
pub trait SecretProvider: Send + Sync {
    /// Provider name for display.
    fn name(&self) -> &'static str;

    /// Read a single field.
    ///
    /// # Arguments
    ///
    /// * `account` - Account to use, or `None` for the provider's active one
    /// * `vault` - Vault name
    /// * `item` - Item name
    /// * `field` - Field label
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` when the item or field does not
    /// exist in this account, `NotAuthenticated` when the account session is
    /// missing, `Timeout` or `Failed` for other per-call failures, and
    /// `Unavailable` when the provider cannot run at all.
    fn read(
        &self,
        account: Option<&str>,
        vault: &str,
        item: &str,
        field: &str,
    ) -> Result<SecretValue, ProviderError>;

    /// Check that the provider can be invoked at all.
    fn check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

impl<P: SecretProvider + ?Sized> SecretProvider for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(
        &self,
        account: Option<&str>,
        vault: &str,
        item: &str,
        field: &str,
    ) -> Result<SecretValue, ProviderError> {
        (**self).read(account, vault, item, field)
    }

    fn check(&self) -> Result<(), ProviderError> {
        (**self).check()
    }
}

impl<P: SecretProvider + ?Sized> SecretProvider for std::sync::Arc<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(
        &self,
        account: Option<&str>,
        vault: &str,
        item: &str,
        field: &str,
    ) -> Result<SecretValue, ProviderError> {
        (**self).read(account, vault, item, field)
    }

    fn check(&self) -> Result<(), ProviderError> {
        (**self).check()
    }
}
