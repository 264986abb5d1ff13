//! Tests for `sigil diff`.

use crate::support::*;

#[test]
fn test_diff_shows_changed_lines() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "new-pass");
    t.write("app.env.tpl", "HOST=db\nDB=${SIGIL_T_DB}\n");
    t.write("app.env", "HOST=db\nDB=old-pass\n");

    let output = t.sigil(&["diff", "app.env.tpl"]);
    assert_success(&output);
    assert_stdout_contains(&output, "-DB=old-pass");
    assert_stdout_contains(&output, "+DB=new-pass");
    assert_stdout_excludes(&output, "HOST=db");
    assert_eq!(t.read("app.env"), "HOST=db\nDB=old-pass\n");
}

#[test]
fn test_diff_no_changes() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "same");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");
    t.write("app.env", "DB=same\n");

    let output = t.sigil(&["diff", "app.env.tpl"]);
    assert_success(&output);
    assert_stdout_contains(&output, "no changes");
}

#[test]
fn test_diff_needs_destination() {
    let t = Test::new();
    t.write("template.txt", "plain\n");

    let output = t.sigil(&["diff", "template.txt"]);
    assert_exit_code(&output, 2);
    assert_stderr_contains(&output, "--output");
}

#[test]
fn test_diff_against_explicit_output() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("template.txt", "DB=${SIGIL_T_DB}\n");

    let output = t.sigil(&["diff", "template.txt", "-o", "missing.env"]);
    assert_success(&output);
    assert_stdout_contains(&output, "+DB=s3cret");
    assert!(!t.exists("missing.env"));
}
