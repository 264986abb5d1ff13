//! Tests for `sigil inject-all`.

use crate::support::*;

fn project() -> Test {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.secret(None, "Private", "SIGIL_T_API", "password", "k-123");
    t.write("conf/app.env.tpl", "DB=${SIGIL_T_DB}\n");
    t.write("conf/nested/api.env.tmpl", "API=${SIGIL_T_API}\n");
    t.write("conf/.git/hooks.tpl", "ignored ${SIGIL_T_DB}\n");
    t.write("conf/README.md", "not a template ${SIGIL_T_DB}\n");
    t
}

#[test]
fn test_inject_all_renders_every_template() {
    let t = project();

    let output = t.sigil(&["inject-all", "conf"]);
    assert_success(&output);
    assert_eq!(t.read("conf/app.env"), "DB=s3cret\n");
    assert_eq!(t.read("conf/nested/api.env"), "API=k-123\n");
    assert!(!t.exists("conf/.git/hooks"));
    assert_stdout_contains(&output, "rendered:");
}

#[test]
fn test_inject_all_roots_from_config() {
    let t = project();
    t.write_config(&format!(
        "[templates]\nroots = [\"{}\"]\n",
        t.path("conf").display()
    ));

    assert_success(&t.sigil(&["inject-all"]));
    assert!(t.exists("conf/app.env"));
}

#[test]
fn test_inject_all_without_roots_is_config_error() {
    let t = Test::new();
    let output = t.sigil(&["inject-all"]);
    assert_exit_code(&output, 2);
    assert_stderr_contains(&output, "templates.roots");
}

#[test]
fn test_inject_all_continues_past_failures() {
    let t = project();
    t.write("conf/broken.env.tpl", "X=${SIGIL_T_NOPE}\n");

    let output = t.sigil(&["inject-all", "conf", "--workers", "3"]);
    assert_exit_code(&output, 1);
    assert!(t.exists("conf/app.env"));
    assert!(t.exists("conf/nested/api.env"));
    assert!(!t.exists("conf/broken.env"));
    assert_stderr_contains(&output, "SIGIL_T_NOPE");
}

#[test]
fn test_inject_all_backs_up_by_default() {
    let t = project();
    t.write("conf/app.env", "DB=old\n");

    assert_success(&t.sigil(&["inject-all", "conf"]));
    assert_eq!(t.files_starting_with("conf", "app.env.bak.").len(), 1);

    t.write("conf/app.env", "DB=older\n");
    assert_success(&t.sigil(&["inject-all", "conf", "--no-backup"]));
    assert_eq!(t.files_starting_with("conf", "app.env.bak.").len(), 1);
    assert_eq!(t.read("conf/app.env"), "DB=s3cret\n");
}

#[test]
fn test_inject_all_exclude_glob() {
    let t = project();

    assert_success(&t.sigil(&["inject-all", "conf", "--exclude", "nested/*"]));
    assert!(t.exists("conf/app.env"));
    assert!(!t.exists("conf/nested/api.env"));
}

#[test]
fn test_inject_all_dry_run_writes_nothing() {
    let t = project();

    let output = t.sigil(&["inject-all", "conf", "--dry-run"]);
    assert_success(&output);
    assert_stdout_contains(&output, "+DB=s3cret");
    assert!(!t.exists("conf/app.env"));
}

#[test]
fn test_inject_all_json_summary() {
    let t = project();

    let output = t.sigil(&["inject-all", "conf", "--json"]);
    assert_success(&output);
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["rendered"], 2);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["results"].as_array().unwrap().len(), 2);
    assert_stdout_excludes(&output, "s3cret");
}

#[test]
fn test_inject_all_signed_out_exits_3() {
    let t = project();
    t.sign_out(ACTIVE_ACCOUNT);

    let output = t.sigil(&["inject-all", "conf"]);
    assert_exit_code(&output, 3);
    assert_stderr_contains(&output, "op signin");
}
