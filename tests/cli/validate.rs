//! Tests for `sigil validate`.

use crate::support::*;

#[test]
fn test_validate_reports_format_and_tokens() {
    let t = Test::new();
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\nAPI=${SIGIL_T_API}\nDB2=${SIGIL_T_DB}\n");

    let output = t.sigil(&["validate", "app.env.tpl"]);
    assert_success(&output);
    assert_stdout_contains(&output, "braced-env");
    assert_stdout_contains(&output, "SIGIL_T_DB");
    assert_stdout_contains(&output, "*/SIGIL_T_API/password");
    assert_eq!(t.op_calls(), 0);
}

#[test]
fn test_validate_lists_only_other_grammars_present() {
    let t = Test::new();
    t.write("single.env.tpl", "DB=${SIGIL_T_DB}\n");
    t.write("mixed.env.tpl", "DB=${SIGIL_T_DB}\nPW=%%SIGIL_T_PW%%\n");

    let output = t.sigil(&["validate", "single.env.tpl"]);
    assert_success(&output);
    assert_stdout_excludes(&output, "also:");

    let output = t.sigil(&["validate", "mixed.env.tpl"]);
    assert_stdout_contains(&output, "also:");
    assert_stdout_contains(&output, "custom-marker (1)");
    assert_stdout_excludes(&output, "double-brace");
    assert_stdout_excludes(&output, "bare-env");
}

#[test]
fn test_validate_json_has_no_values() {
    let t = Test::new();
    t.secret(None, "Private", "SIGIL_T_DB", "password", "s3cret");
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    let output = t.sigil(&["validate", "app.env.tpl", "--resolve", "--json"]);
    assert_success(&output);
    assert_stdout_excludes(&output, "s3cret");

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["format"], "braced-env");
    assert_eq!(report["tokens"][0]["token"], "SIGIL_T_DB");
    assert_eq!(report["tokens"][0]["resolved"], true);
    assert_eq!(report["tokens"][0]["source"], "vault");
}

#[test]
fn test_validate_resolve_reports_missing() {
    let t = Test::new();
    t.write("app.env.tpl", "DB=${SIGIL_T_NOPE}\n");

    let output = t.sigil(&["validate", "app.env.tpl", "--resolve"]);
    assert_exit_code(&output, 1);
    assert_stdout_contains(&output, "not found");
}

#[test]
fn test_validate_malformed_vault_path() {
    let t = Test::new();
    t.write("gh.conf.tpl", "a={{ op://Infra/GitHub/token }}\nb={{ op://only-two/parts }}\n");

    let output = t.sigil(&["validate", "gh.conf.tpl"]);
    assert_exit_code(&output, 1);
    assert_stdout_contains(&output, "Malformed");
    assert_stdout_contains(&output, "op://only-two/parts");
}

#[test]
fn test_validate_forced_format() {
    let t = Test::new();
    t.write("mixed.tpl", "a=${SIGIL_T_A}\nb=%%SIGIL_T_B%%\n");

    let output = t.sigil(&["validate", "mixed.tpl", "--format", "custom-marker", "--json"]);
    assert_success(&output);
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["format"], "custom-marker");
    assert_eq!(report["tokens"].as_array().unwrap().len(), 1);
}

#[test]
fn test_validate_unknown_format_is_usage_error() {
    let t = Test::new();
    t.write("app.env.tpl", "DB=${SIGIL_T_DB}\n");

    let output = t.sigil(&["validate", "app.env.tpl", "--format", "yaml"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "yaml");
}

#[test]
fn test_validate_stdin() {
    let t = Test::new();

    let output = t.sigil_stdin(&["validate", "-"], "x=%%SIGIL_T_X%%\n");
    assert_success(&output);
    assert_stdout_contains(&output, "custom-marker");
}
