//! End-to-end tests for the `dynq` binary.

use std::path::PathBuf;
use std::process::{Command, Output};

fn dynq_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dynq"))
}

fn dynq(args: &[&str]) -> Output {
    Command::new(dynq_bin())
        .args(args)
        .env_remove("DYNQ_LOG")
        .output()
        .expect("failed to run dynq")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ── check ────────────────────────────────────────────────────────────

#[test]
fn check_prints_type_and_tree() {
    let output = dynq(&["check", "--param", "x:Decimal", "x == 5"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "type: Boolean\ntree: (x == 5)\n");
}

#[test]
fn check_with_result_type() {
    let output = dynq(&["check", "--result-type", "Int64?", "1 + 2"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("type: Int64?\n"));
}

// ── eval ─────────────────────────────────────────────────────────────

#[test]
fn eval_prints_the_value() {
    let output = dynq(&["eval", "1 + 2 * 3"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "7\n");
}

#[test]
fn eval_binds_parameters() {
    let output = dynq(&[
        "eval",
        "--it",
        "Int32=41",
        "--param",
        "name:String=Ada",
        "name + \": \" + (it + 1)",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "Ada: 42\n");
}

#[test]
fn eval_json_output() {
    let output = dynq(&["eval", "--json", "\"ab\" & \"cd\""]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(json["type"], "String");
    assert_eq!(json["value"], "abcd");
}

#[test]
fn eval_requires_values() {
    let output = dynq(&["eval", "--param", "x:Int32", "x + 1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("parameter 'x' has no value"));
}

#[test]
fn eval_reports_runtime_errors() {
    let output = dynq(&["eval", "1 / 0"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("attempted to divide by zero"));
}

// ── order ────────────────────────────────────────────────────────────

#[test]
fn order_prints_each_key() {
    let output = dynq(&["order", "--param", "n:Int32", "n desc, n * 2"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "n descending\n(n * 2) ascending\n");
}

// ── Diagnostics ──────────────────────────────────────────────────────

#[test]
fn parse_errors_render_with_codes() {
    let output = dynq(&["check", "--no-color", "1 + foo"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("E0300"), "stderr: {err}");
    assert!(err.contains("unknown identifier 'foo'"), "stderr: {err}");
}

#[test]
fn parse_errors_as_json() {
    let output = dynq(&["check", "--json", "1 + foo"]);
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_str(stderr(&output).trim()).unwrap();
    assert_eq!(json["code"], "E0300");
    assert_eq!(json["severity"], "error");
    assert_eq!(json["spans"][0]["start"], 4);
}

#[test]
fn bad_parameter_declarations_are_rejected() {
    let output = dynq(&["check", "--param", "x:Widget", "x"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown type 'Widget'"));
}
