//! Exit codes and error hints.

use crate::support::*;

#[test]
fn test_missing_provider_exits_3() {
    let t = Test::new();
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    let output = t
        .cmd()
        .env("SIGIL_PROVIDER", t.home.path().join("no-such-op"))
        .args(["inject", "app.env.tpl"])
        .output()
        .unwrap();
    assert_exit_code(&output, 3);
    assert_stderr_contains(&output, "not found");
    assert_stderr_contains(&output, "SIGIL_PROVIDER");
    assert!(!t.exists("app.env"));
}

#[test]
fn test_signed_out_exits_3_with_hint() {
    let t = Test::new();
    t.sign_out(ACTIVE_ACCOUNT);
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    let output = t.inject("app.env.tpl");
    assert_exit_code(&output, 3);
    assert_stderr_contains(&output, "op signin");
}

#[test]
fn test_signed_out_account_stops_fallback() {
    let t = Test::with_config(
        r#"
[[accounts]]
name = "personal"

[[accounts]]
name = "work"
"#,
    );
    t.sign_out("personal");
    t.secret(Some("work"), "Private", "SIGIL_T_DB", "password", "unused");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    let output = t.inject("app.env.tpl");
    assert_exit_code(&output, 3);
    assert_eq!(t.op_calls(), 1);
}

#[test]
fn test_invalid_config_exits_2() {
    let t = Test::with_config("[templates]\nworkers = 0\n");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    let output = t.inject("app.env.tpl");
    assert_exit_code(&output, 2);
    assert_stderr_contains(&output, "templates.workers");
}

#[test]
fn test_unparseable_config_exits_2() {
    let t = Test::with_config("accounts = not toml");

    let output = t.sigil(&["cache", "status"]);
    assert_exit_code(&output, 2);
    assert_stderr_contains(&output, "invalid config");
}

#[test]
fn test_missing_template_fails() {
    let t = Test::new();

    let output = t.inject("nope.tpl");
    assert_exit_code(&output, 1);
    assert_stderr_contains(&output, "nope.tpl");
}

#[test]
fn test_completions() {
    let t = Test::new();

    let output = t.sigil(&["completions", "bash"]);
    assert_success(&output);
    assert_stdout_contains(&output, "sigil");
}
