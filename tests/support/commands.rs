//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a sigil command with an isolated environment.
    ///
    /// Returns a Command configured with:
    /// - HOME and XDG dirs inside the temporary home
    /// - `SIGIL_CONFIG`, `SIGIL_CACHE_DIR` and `SIGIL_PROVIDER` pointing at
    ///   the test's config, cache and fake `op`
    /// - colors off, and the project dir as working directory
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("sigil").expect("failed to find sigil binary");
        for var in ["SIGIL_ACCOUNT", "SIGIL_CACHE", "SIGIL_CACHE_TTL", "SIGIL_LOG", "SIGIL_DEBUG"] {
            cmd.env_remove(var);
        }
        cmd.env("HOME", self.home.path());
        cmd.env("XDG_CONFIG_HOME", self.home.path().join(".config"));
        cmd.env("XDG_CACHE_HOME", self.home.path().join(".cache"));
        cmd.env("SIGIL_CONFIG", self.config_path());
        cmd.env("SIGIL_CACHE_DIR", self.cache_dir());
        cmd.env("SIGIL_PROVIDER", self.op_path());
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run `sigil <args>`.
    pub fn sigil(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run sigil")
    }

    /// Run `sigil <args>` with `stdin` piped in.
    pub fn sigil_stdin(&self, args: &[&str], stdin: &str) -> Output {
        self.cmd()
            .args(args)
            .write_stdin(stdin)
            .output()
            .expect("failed to run sigil")
    }

    /// Shortcut for `sigil inject <path>`.
    pub fn inject(&self, path: &str) -> Output {
        self.sigil(&["inject", path])
    }

    /// Shortcut for `sigil run -t <template> -- <cmd>`.
    pub fn run(&self, template: &str, cmd: &[&str]) -> Output {
        let mut args = vec!["run", "-t", template, "--"];
        args.extend_from_slice(cmd);
        self.sigil(&args)
    }
}
