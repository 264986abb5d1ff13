//! Tests for `sigil inject`.

use crate::support::*;

#[test]
fn test_inject_renders_next_to_template() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "# app\nDB=${SIGIL_T_DB}\nPORT=5432\n");

    let output = t.inject("app.env.tpl");
    assert_success(&output);
    assert_stdout_contains(&output, "rendered");
    assert_eq!(t.read("app.env"), "# app\nDB=s3cret\nPORT=5432\n");
}

#[cfg(unix)]
#[test]
fn test_inject_output_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    assert_success(&t.inject("app.env.tpl"));
    let mode = std::fs::metadata(t.path("app.env")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_inject_vault_path_tokens() {
    let t = Test::new();
    t.secret(None, "Infra", "GitHub", "token", "ghp_123");
    t.write("gh.conf.tpl", "token = {{ op://Infra/GitHub/token }}\n");

    assert_success(&t.inject("gh.conf.tpl"));
    assert_eq!(t.read("gh.conf"), "token = ghp_123\n");
}

#[test]
fn test_inject_missing_secret_writes_nothing() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\nKEY=${SIGIL_T_MISSING}\n");

    let output = t.inject("app.env.tpl");
    assert_exit_code(&output, 1);
    assert_stderr_contains(&output, "SIGIL_T_MISSING");
    assert!(!t.exists("app.env"));
}

#[test]
fn test_inject_explicit_output() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("template.txt", "db: %%SIGIL_T_DB%%\n");

    let output = t.sigil(&["inject", "template.txt", "-o", "out/rendered.yml"]);
    assert_success(&output);
    assert_eq!(t.read("out/rendered.yml"), "db: s3cret\n");
}

#[test]
fn test_inject_without_suffix_prints_to_stdout() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("template.txt", "db: {{SIGIL_T_DB}}\n");

    let output = t.inject("template.txt");
    assert_success(&output);
    assert_eq!(stdout(&output), "db: s3cret\n");
}

#[test]
fn test_inject_from_stdin() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");

    let output = t.sigil_stdin(&["inject"], "url=postgres://app:${SIGIL_T_DB}@db\n");
    assert_success(&output);
    assert_eq!(stdout(&output), "url=postgres://app:s3cret@db\n");
}

#[test]
fn test_inject_dry_run_shows_diff_and_writes_nothing() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\nKEY=${SIGIL_T_MISSING}\n");

    let output = t.sigil(&["inject", "app.env.tpl", "--dry-run"]);
    assert_exit_code(&output, 1);
    assert_stdout_contains(&output, "+DB=s3cret");
    assert_stdout_contains(&output, "+KEY=<<missing:SIGIL_T_MISSING>>");
    assert!(!t.exists("app.env"));
}

#[test]
fn test_inject_backup_only_when_changed() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");
    t.write("app.env", "DB=old\n");

    assert_success(&t.sigil(&["inject", "app.env.tpl", "--backup"]));
    let backups = t.files_starting_with(".", "app.env.bak.");
    assert_eq!(backups.len(), 1);
    assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), "DB=old\n");

    let output = t.sigil(&["inject", "app.env.tpl", "--backup"]);
    assert_success(&output);
    assert_stdout_contains(&output, "unchanged");
    assert_eq!(t.files_starting_with(".", "app.env.bak.").len(), 1);
}

#[test]
fn test_inject_no_tokens_copies_verbatim() {
    let t = Test::new();
    t.write("plain.conf.tpl", "listen 8080\n");

    assert_success(&t.inject("plain.conf.tpl"));
    assert_eq!(t.read("plain.conf"), "listen 8080\n");
    assert_eq!(t.op_calls(), 0);
}

#[test]
fn test_inject_uses_cache_on_second_run() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    assert_success(&t.inject("app.env.tpl"));
    assert_eq!(t.op_calls(), 1);

    std::fs::remove_file(t.path("app.env")).unwrap();
    assert_success(&t.inject("app.env.tpl"));
    assert_eq!(t.op_calls(), 1);
    assert_eq!(t.read("app.env"), "DB=s3cret\n");
}

#[test]
fn test_inject_no_cache_calls_provider_each_time() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    assert_success(&t.sigil(&["--no-cache", "inject", "app.env.tpl"]));
    assert_success(&t.sigil(&["--no-cache", "inject", "-o", "second.env", "app.env.tpl"]));
    assert_eq!(t.op_calls(), 2);
    assert!(!t.cache_dir().exists());
}

#[test]
fn test_inject_env_fallback_wins_for_simple_tokens() {
    let t = Test::new();
    t.write("app.env.tpl", "MODE=${SIGIL_T_MODE}\n");

    let output = t
        .cmd()
        .env("SIGIL_T_MODE", "from-env")
        .args(["inject", "app.env.tpl"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(t.read("app.env"), "MODE=from-env\n");
    assert_eq!(t.op_calls(), 0);
}

#[test]
fn test_inject_falls_back_across_accounts() {
    let t = Test::with_config(
        r#"
[[accounts]]
name = "personal"

[[accounts]]
name = "work"
vault = "Engineering"
"#,
    );
    t.secret(Some("work"), "Engineering", "SIGIL_T_API", "password", "from-work");
    t.write("api.env.tpl", "API=${SIGIL_T_API}\n");

    assert_success(&t.inject("api.env.tpl"));
    assert_eq!(t.read("api.env"), "API=from-work\n");
    assert_eq!(t.op_calls(), 2);
}

#[test]
fn test_inject_account_flag_is_tried_first() {
    let t = Test::with_config(
        r#"
[[accounts]]
name = "personal"

[[accounts]]
name = "work"
"#,
    );
    t.secret(Some("personal"), "Private", "SIGIL_T_API", "password", "personal");
    t.secret(Some("work"), "Private", "SIGIL_T_API", "password", "work");
    t.write("api.env.tpl", "API=${SIGIL_T_API}\n");

    assert_success(&t.sigil(&["--account", "work", "inject", "api.env.tpl"]));
    assert_eq!(t.read("api.env"), "API=work\n");
}

#[test]
fn test_inject_alias_maps_simple_token() {
    let t = Test::with_config(
        r#"
[aliases]
SIGIL_T_GH = "op://Infra/GitHub/token"
"#,
    );
    t.secret(None, "Infra", "GitHub", "token", "ghp_alias");
    t.write("gh.env.tpl", "GH=${SIGIL_T_GH}\n");

    assert_success(&t.inject("gh.env.tpl"));
    assert_eq!(t.read("gh.env"), "GH=ghp_alias\n");
}

#[test]
fn test_inject_vault_flag_overrides_default() {
    let t = Test::new();
    t.secret(None, "Staging", "SIGIL_T_DB", "password", "staging");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    assert_success(&t.sigil(&["inject", "app.env.tpl", "--vault", "Staging"]));
    assert_eq!(t.read("app.env"), "DB=staging\n");
}

#[test]
fn test_inject_binary_file_is_skipped() {
    let t = Test::new();
    std::fs::write(t.path("blob.tpl"), [0u8, 159, 146, 150]).unwrap();

    let output = t.inject("blob.tpl");
    assert_success(&output);
    assert_stderr_contains(&output, "skipped");
    assert!(!t.exists("blob"));
}

#[test]
fn test_inject_directory_renders_all() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("conf/a.env.tpl", "A=${SIGIL_T_DB}\n");
    t.write("conf/b.env.tpl", "B=${SIGIL_T_DB}\n");

    let output = t.inject("conf");
    assert_success(&output);
    assert_stdout_contains(&output, "Summary");
    assert_eq!(t.read("conf/a.env"), "A=s3cret\n");
    assert_eq!(t.read("conf/b.env"), "B=s3cret\n");
}

#[test]
fn test_inject_directory_rejects_output_flag() {
    let t = Test::new();
    t.write("conf/a.env.tpl", "A=${SIGIL_T_DB}\n");

    let output = t.sigil(&["inject", "conf", "--output", "merged.env"]);
    assert_exit_code(&output, 2);
    assert_stderr_contains(&output, "--output cannot be used with a directory");
    assert!(!t.exists("merged.env"));
    assert_eq!(t.op_calls(), 0);
}
