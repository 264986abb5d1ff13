//! 1Password CLI provider.
//!
//! Reads secrets with `op read`.
//!
//! ## Requirements
//!
//! - `op` CLI must be installed (or `SIGIL_PROVIDER` must point at it)
//! - Each account used must be signed in (`op signin --account <name>`)
//!
//! ## Invocation
//!
//! ```bash
//! op read --no-newline [--account my.1password.com] "op://Private/GitHub/token"
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::SecretProvider;
use crate::core::types::SecretValue;
use crate::error::ProviderError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Phrases `op` prints when an item, vault or field does not exist.
const NOT_FOUND_MARKERS: &[&str] = &[
    "isn't an item",
    "isn't a vault",
    "isn't a field",
    "could not find",
    "no item found",
    "not found",
    "does not have a field",
];

/// Phrases `op` prints when the session is missing or expired.
const AUTH_MARKERS: &[&str] = &[
    "not currently signed in",
    "not signed in",
    "no accounts configured",
    "session expired",
    "authorization prompt dismissed",
    "you are not authorized",
    "account is not signed in",
];

/// `op` CLI provider.
pub struct OnePassword {
    program: String,
    scheme: String,
    timeout: Duration,
}

impl OnePassword {
    /// Create a provider that runs `program` with the given URI scheme.
    pub fn new(program: impl Into<String>, scheme: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            scheme: scheme.into(),
            timeout,
        }
    }

    /// Resolve the binary on `PATH` (or as a direct path).
    fn locate(&self) -> Result<PathBuf, ProviderError> {
        which::which(&self.program).map_err(|_| {
            ProviderError::Unavailable(format!("'{}' not found on PATH", self.program))
        })
    }

    fn uri(&self, vault: &str, item: &str, field: &str) -> String {
        format!("{}://{}/{}/{}", self.scheme, vault, item, field)
    }

    /// Wait for `child`, killing it after the timeout.
    ///
    /// Pipes are drained on helper threads so a chatty child cannot block on
    /// a full pipe while we poll.
    fn wait_with_timeout(&self, mut child: Child) -> Result<(i32, Vec<u8>, Vec<u8>), ProviderError> {
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProviderError::Timeout(self.timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(ProviderError::Failed(format!("wait failed: {}", e))),
            }
        };

        let out = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let err = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
        Ok((status.code().unwrap_or(-1), out, err))
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

/// Map a failed `op` invocation onto a provider error.
fn classify(stderr: &str, account: Option<&str>, uri: &str) -> ProviderError {
    let lower = stderr.to_ascii_lowercase();
    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        return ProviderError::NotAuthenticated {
            account: account.unwrap_or("(default)").to_string(),
        };
    }
    if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
        return ProviderError::NotFound(uri.to_string());
    }
    ProviderError::Failed(stderr.trim().lines().last().unwrap_or("unknown error").to_string())
}

impl SecretProvider for OnePassword {
    fn name(&self) -> &'static str {
        "1password"
    }

    fn check(&self) -> Result<(), ProviderError> {
        let path = self.locate()?;
        debug!(provider = %path.display(), "provider located");
        Ok(())
    }

    fn read(
        &self,
        account: Option<&str>,
        vault: &str,
        item: &str,
        field: &str,
    ) -> Result<SecretValue, ProviderError> {
        let uri = self.uri(vault, item, field);
        trace!(account = account.unwrap_or("(default)"), %uri, "reading secret");

        let mut cmd = Command::new(&self.program);
        cmd.args(["read", "--no-newline"]);
        if let Some(account) = account {
            cmd.args(["--account", account]);
        }
        cmd.arg(&uri)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            ProviderError::Unavailable(format!("failed to spawn {}: {}", self.program, e))
        })?;

        let (code, stdout, stderr) = self.wait_with_timeout(child)?;
        if code != 0 {
            let stderr = String::from_utf8_lossy(&stderr);
            let err = classify(&stderr, account, &uri);
            trace!(code, error = %err, "provider call failed");
            return Err(err);
        }

        let value = String::from_utf8(stdout)
            .map_err(|_| ProviderError::Failed(format!("{} returned non-UTF-8 data", uri)))?;
        trace!(len = value.len(), "secret read");
        Ok(SecretValue::new(value))
    }
}
