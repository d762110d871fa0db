//! End-to-end tests for the codeloop binary
//!
//! Every test runs inside a fresh directory with a `.git` marker so config
//! discovery never escapes into the surrounding filesystem. No test reaches
//! a model: `solve` is only exercised up to its fatal pre-flight checks.

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const TEMPLATE: &str = "def f():\n    # TODO: body\n    ...\ndef g():\n    return 1\n";

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    dir
}

fn codeloop(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("codeloop"));
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = workspace();
    codeloop(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("solve"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("graph"));
}

#[test]
fn validate_conforming_candidate() {
    let dir = workspace();
    fs::write(dir.path().join("template.py"), TEMPLATE).unwrap();
    fs::write(
        dir.path().join("candidate.py"),
        "def f():\n    x = 1\n    return x\ndef g():\n    return 1\n",
    )
    .unwrap();

    codeloop(dir.path())
        .args(["validate", "--template", "template.py", "--candidate", "candidate.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"))
        .stdout(predicate::str::contains("\"feedback\": null"));
}

#[test]
fn validate_non_conforming_candidate_exits_3() {
    let dir = workspace();
    fs::write(dir.path().join("template.py"), TEMPLATE).unwrap();
    fs::write(
        dir.path().join("candidate.py"),
        "def f():\n    x = 1\n    return x\ndef g():\n    return 2\n",
    )
    .unwrap();

    codeloop(dir.path())
        .args(["validate", "--template", "template.py", "--candidate", "candidate.py"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("\"valid\": false"))
        .stdout(predicate::str::contains("marked with # TODO:!"));
}

#[test]
fn validate_honours_sentinel_from_config() {
    let dir = workspace();
    fs::create_dir(dir.path().join(".codeloop")).unwrap();
    fs::write(
        dir.path().join(".codeloop/config.toml"),
        "[defaults]\nsentinel = \"# EDIT:\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("template.py"), "def f():\n    # EDIT: here\n    ...\n").unwrap();
    fs::write(dir.path().join("candidate.py"), "def f():\n    return 3\n").unwrap();

    codeloop(dir.path())
        .args(["validate", "--template", "template.py", "--candidate", "candidate.py"])
        .assert()
        .success();

    codeloop(dir.path())
        .args([
            "validate",
            "--template",
            "template.py",
            "--candidate",
            "candidate.py",
            "--sentinel",
            "# TODO:",
        ])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("marked with # TODO:!"));
}

#[test]
fn validate_missing_file_is_usage_error() {
    let dir = workspace();
    fs::write(dir.path().join("template.py"), TEMPLATE).unwrap();

    codeloop(dir.path())
        .args(["validate", "--template", "template.py", "--candidate", "nope.py"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("candidate"));
}

#[test]
fn graph_json_shows_scaffold() {
    let dir = workspace();
    codeloop(dir.path())
        .args(["graph", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("output/measurements/runtime.py"))
        .stdout(predicate::str::contains(
            "from output.cases import <function-or-variable-name>",
        ))
        .stdout(predicate::str::contains("\"language\": \"python\""));
}

#[test]
fn graph_text_uses_project_name() {
    let dir = workspace();
    codeloop(dir.path())
        .args(["--project-name", "demo", "graph"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo/solution.py"))
        .stdout(predicate::str::contains("from demo.measurements.memory import"));
}

#[test]
fn unsupported_language_is_usage_error() {
    let dir = workspace();
    codeloop(dir.path())
        .args(["--language", "cobol", "graph"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cobol"));
}

#[test]
fn invalid_config_value_is_reported() {
    let dir = workspace();
    fs::create_dir(dir.path().join(".codeloop")).unwrap();
    fs::write(dir.path().join(".codeloop/config.toml"), "[defaults]\nsteps = 0\n").unwrap();

    codeloop(dir.path())
        .args(["graph"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("steps"))
        .stderr(predicate::str::contains("Suggestions:"));
}

#[test]
fn explicit_missing_config_is_reported() {
    let dir = workspace();
    codeloop(dir.path())
        .args(["--config", "missing.toml", "graph"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn solve_without_runner_fails_before_generation() {
    let dir = workspace();
    fs::write(dir.path().join("problem.md"), "Add two numbers.").unwrap();

    codeloop(dir.path())
        .args([
            "solve",
            "--problem",
            "problem.md",
            "--runner",
            "codeloop-no-such-runner",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("codeloop-no-such-runner"));

    assert!(!dir.path().join("output").exists());
}

#[test]
fn solve_rejects_malformed_template_flag() {
    let dir = workspace();
    codeloop(dir.path())
        .args(["solve", "--problem", "p.md", "--template", "solution"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("NAME=PATH"));
}
