//! Test support utilities for sigil integration tests.
//!
//! Each [`Test`] owns a temp project dir, a temp home and a fake `op`
//! script whose secrets live as plain files under the home dir.

#![allow(dead_code)]

pub mod commands;

#[allow(unused_imports)]
pub use assertions::*;

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Account directory used for calls without `--account`.
pub const ACTIVE_ACCOUNT: &str = "_";

/// Fake `op` CLI.
///
/// Secrets are files at `<root>/<account>/<vault>/<item>/<field>`. A
/// `.signed-out` file in an account dir makes every read fail with an
/// authentication error. Each call is appended to `<root>/calls.log`.
const FAKE_OP: &str = r#"#!/bin/sh
root="__ROOT__"
account="_"
uri=""
while [ $# -gt 0 ]; do
  case "$1" in
    --account) account="$2"; shift 2 ;;
    read|--no-newline) shift ;;
    *) uri="$1"; shift ;;
  esac
done
echo "$account $uri" >> "$root/calls.log"
if [ -e "$root/$account/.signed-out" ]; then
  echo "[ERROR] account is not signed in" >&2
  exit 1
fi
path="${uri#*://}"
if [ -f "$root/$account/$path" ]; then
  cat "$root/$account/$path"
  exit 0
fi
echo "[ERROR] \"$path\" isn't an item in this account" >&2
exit 1
"#;

/// Test environment with isolated temp directories.
///
/// No process-global state is mutated; child processes get their
/// environment and working directory explicitly.
pub struct Test {
    /// Temporary directory for the test project
    pub dir: TempDir,
    /// Temporary home directory (config, cache, fake vault)
    pub home: TempDir,
}

impl Test {
    /// Create an empty environment with the fake `op` installed.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");
        let t = Self { dir, home };

        fs::create_dir_all(t.vault_root()).expect("failed to create vault root");
        let script = FAKE_OP.replace("__ROOT__", &t.vault_root().to_string_lossy());
        fs::write(t.op_path(), script).expect("failed to write fake op");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(t.op_path(), fs::Permissions::from_mode(0o755))
                .expect("failed to chmod fake op");
        }
        t
    }

    /// Environment whose config file has `config` as its contents.
    pub fn with_config(config: &str) -> Self {
        let t = Self::new();
        t.write_config(config);
        t
    }

    pub fn vault_root(&self) -> PathBuf {
        self.home.path().join("vault")
    }

    pub fn op_path(&self) -> PathBuf {
        self.home.path().join("op")
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.path().join("config.toml")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.home.path().join("cache")
    }

    pub fn write_config(&self, config: &str) {
        fs::write(self.config_path(), config).expect("failed to write config");
    }

    /// Store a secret readable through `account` (`None`: active account).
    pub fn secret(&self, account: Option<&str>, vault: &str, item: &str, field: &str, value: &str) {
        let dir = self
            .vault_root()
            .join(account.unwrap_or(ACTIVE_ACCOUNT))
            .join(vault)
            .join(item);
        fs::create_dir_all(&dir).expect("failed to create item dir");
        fs::write(dir.join(field), value).expect("failed to write secret");
    }

    /// Make every read through `account` fail as not signed in.
    pub fn sign_out(&self, account: &str) {
        let dir = self.vault_root().join(account);
        fs::create_dir_all(&dir).expect("failed to create account dir");
        fs::write(dir.join(".signed-out"), "").expect("failed to write marker");
    }

    /// Number of times the fake `op` was invoked.
    pub fn op_calls(&self) -> usize {
        fs::read_to_string(self.vault_root().join("calls.log"))
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    /// Write a project file, creating parent dirs.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, contents).expect("failed to write file");
        path
    }

    /// Read a project file.
    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.dir.path().join(rel)).expect("failed to read file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.dir.path().join(rel).exists()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Files in `rel` whose names start with `prefix`.
    pub fn files_starting_with(&self, rel: &str, prefix: &str) -> Vec<PathBuf> {
        let dir: &Path = &self.dir.path().join(rel);
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .expect("failed to list dir")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with(prefix))
                    .unwrap_or(false)
            })
            .collect();
        found.sort();
        found
    }
}
