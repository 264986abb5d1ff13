//! Tests for `sigil cache`.

use crate::support::*;

#[test]
fn test_cache_status_counts_entries() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");
    assert_success(&t.inject("app.env.tpl"));

    let output = t.sigil(&["cache", "status", "--json"]);
    assert_success(&output);
    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(status["enabled"], true);
    assert_eq!(status["live"], 1);
    assert_eq!(status["purged"], 0);
    assert_eq!(status["ttl_secs"], 300);
}

#[test]
fn test_cache_entries_never_hold_plain_token_names() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");
    assert_success(&t.inject("app.env.tpl"));

    let names: Vec<String> = std::fs::read_dir(t.cache_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(!names[0].contains("SIGIL_T_DB"));
}

#[test]
fn test_cache_expired_entries_are_refetched() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    let inject = |out: &str| {
        t.cmd()
            .env("SIGIL_CACHE_TTL", "0")
            .args(["inject", "app.env.tpl", "-o", out])
            .output()
            .unwrap()
    };
    assert_success(&inject("one.env"));
    assert_success(&inject("two.env"));
    assert_eq!(t.op_calls(), 2);
}

#[test]
fn test_expired_entries_are_removed_from_disk() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    let output = t
        .cmd()
        .env("SIGIL_CACHE_TTL", "0")
        .args(["inject", "app.env.tpl"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(std::fs::read_dir(t.cache_dir()).unwrap().count(), 1);

    let output = t.sigil(&["cache", "status", "--json"]);
    assert_success(&output);
    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(status["live"], 0);
    assert_eq!(std::fs::read_dir(t.cache_dir()).unwrap().count(), 0);
}

#[test]
fn test_cache_clear() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");
    assert_success(&t.inject("app.env.tpl"));

    let output = t.sigil(&["cache", "clear"]);
    assert_success(&output);
    assert_stdout_contains(&output, "removed 1");

    std::fs::remove_file(t.path("app.env")).unwrap();
    assert_success(&t.inject("app.env.tpl"));
    assert_eq!(t.op_calls(), 2);
}

#[test]
fn test_cache_warm_then_inject_offline() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.secret(None, "Infra", "GitHub", "token", "ghp_1");
    t.write("conf/app.env.tpl", "DB=${SIGIL_T_DB}\n");
    t.write("conf/gh.conf.tpl", "t={{ op://Infra/GitHub/token }}\n");

    let output = t.sigil(&["cache", "warm", "conf"]);
    assert_success(&output);
    assert_stdout_contains(&output, "warmed 2");
    assert_eq!(t.op_calls(), 2);

    assert_success(&t.sigil(&["inject-all", "conf"]));
    assert_eq!(t.op_calls(), 2);
    assert_eq!(t.read("conf/gh.conf"), "t=ghp_1\n");
}

#[test]
fn test_cache_warm_reports_failures() {
    let t = Test::new();
    t.write("app.env.tpl", "DB=${SIGIL_T_NOPE}\n");

    let output = t.sigil(&["cache", "warm", "app.env.tpl"]);
    assert_exit_code(&output, 1);
    assert_stderr_contains(&output, "SIGIL_T_NOPE");
}

#[test]
fn test_cache_warm_disabled_is_noop() {
    let t = Test::new();
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    let output = t.sigil(&["--no-cache", "cache", "warm", "app.env.tpl"]);
    assert_success(&output);
    assert_stderr_contains(&output, "disabled");
    assert_eq!(t.op_calls(), 0);
}
