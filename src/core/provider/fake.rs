//! In-memory provider.
//!
//! Serves secrets from a fixed table. Used by tests and benchmarks to run
//! the resolution pipeline without spawning processes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::SecretProvider;
use crate::core::types::SecretValue;
use crate::error::ProviderError;

type Address = (Option<String>, String, String, String);

/// Provider backed by a fixed table of secrets.
#[derive(Default)]
pub struct StaticProvider {
    secrets: HashMap<Address, String>,
    signed_out: HashSet<String>,
    hung: HashSet<String>,
    delay: Option<Duration>,
    unavailable: bool,
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret readable through `account` (`None` = active account).
    pub fn with_secret(
        mut self,
        account: Option<&str>,
        vault: &str,
        item: &str,
        field: &str,
        value: &str,
    ) -> Self {
        self.secrets.insert(
            (
                account.map(str::to_string),
                vault.to_string(),
                item.to_string(),
                field.to_string(),
            ),
            value.to_string(),
        );
        self
    }

    /// Mark an account as not signed in.
    pub fn signed_out(mut self, account: &str) -> Self {
        self.signed_out.insert(account.to_string());
        self
    }

    /// Make every call through `account` time out.
    pub fn hung(mut self, account: &str) -> Self {
        self.hung.insert(account.to_string());
        self
    }

    /// Behave like a provider whose binary is missing.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Sleep this long in every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `read` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Accounts used by each call, in order (`(default)` for `None`).
    pub fn accounts_called(&self) -> Vec<String> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl SecretProvider for StaticProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.unavailable {
            return Err(ProviderError::Unavailable("static provider disabled".into()));
        }
        Ok(())
    }

    fn read(
        &self,
        account: Option<&str>,
        vault: &str,
        item: &str,
        field: &str,
    ) -> Result<SecretValue, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let label = account.unwrap_or("(default)").to_string();
        if let Ok(mut log) = self.log.lock() {
            log.push(label.clone());
        }

        if self.unavailable {
            return Err(ProviderError::Unavailable("static provider disabled".into()));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.signed_out.contains(&label) {
            return Err(ProviderError::NotAuthenticated { account: label });
        }
        if self.hung.contains(&label) {
            return Err(ProviderError::Timeout(Duration::from_secs(30)));
        }

        let address = (
            account.map(str::to_string),
            vault.to_string(),
            item.to_string(),
            field.to_string(),
        );
        self.secrets
            .get(&address)
            .map(|v| SecretValue::new(v.as_str()))
            .ok_or_else(|| ProviderError::NotFound(format!("{}/{}/{}", vault, item, field)))
    }
}
