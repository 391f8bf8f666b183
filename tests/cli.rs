use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::{TempDir, tempdir};

/// `lore` isolated from the user's config and caches, rooted at `project`.
fn lore(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lore").unwrap();
    cmd.env_remove("LORE_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", project.join(".xdg"))
        .env("LORE_GIT_CACHE_DIR", project.join(".cache"))
        .arg("--project")
        .arg(project);
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

fn project_with_override() -> TempDir {
    let dir = tempdir().unwrap();
    let topic = dir
        .path()
        .join(".lore/knowledge/domains/performance/calcfields-in-loops.md");
    std::fs::create_dir_all(topic.parent().unwrap()).unwrap();
    std::fs::write(&topic, "---\ntitle: Team CalcFields rule\n---\nOurs.\n").unwrap();
    dir
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("lore").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("lore").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_stats_json() {
    let dir = tempdir().unwrap();
    let json = json_output(lore(dir.path()).args(["--json", "stats"]));
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"]["unique_topics"], 9);
    assert_eq!(json["data"]["index"]["total_topics"], 9);
}

#[test]
fn test_resolve_builtin_topic() {
    let dir = tempdir().unwrap();
    lore(dir.path())
        .args(["resolve", "performance/calcfields-in-loops"])
        .assert()
        .success()
        .stdout(predicate::str::contains("performance/calcfields-in-loops"));
}

#[test]
fn test_project_layer_overrides_builtin() {
    let dir = project_with_override();
    let json = json_output(lore(dir.path()).args(["--json", "resolve", "performance/calcfields-in-loops"]));
    assert_eq!(json["data"]["source_layer"], "project");
    assert_eq!(json["data"]["overridden_layers"][0], "embedded");

    let overrides = json_output(lore(dir.path()).args(["--json", "overrides"]));
    assert_eq!(overrides["data"][0]["id"], "performance/calcfields-in-loops");
}

#[test]
fn test_missing_topic_reports_structured_error() {
    let dir = tempdir().unwrap();
    lore(dir.path())
        .args(["--json", "resolve", "performance/no-such-topic"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("TOPIC_NOT_FOUND"));
}

#[test]
fn test_search_ranks_matching_topic_first() {
    let dir = tempdir().unwrap();
    let json = json_output(lore(dir.path()).args([
        "--json",
        "search",
        "Customer.SetLoadFields(Name); if Customer.FindSet() then;",
    ]));
    assert_eq!(json["data"][0]["topic_id"], "performance/setloadfields-before-findset");
    assert_eq!(json["data"][0]["score"], 1.0);
}

#[test]
fn test_analyze_reports_constructs() {
    let dir = tempdir().unwrap();
    let json = json_output(lore(dir.path()).args(["--json", "analyze", "Rec.FindSet(); Rec.FindSet(); Rec.CalcFields(Amount);"]));
    assert_eq!(json["data"]["constructs"], serde_json::json!(["FindSet", "CalcFields"]));
}

#[test]
fn test_suggest_by_name() {
    let dir = tempdir().unwrap();
    lore(dir.path())
        .args(["suggest", "sam"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sam Coder"));
}

#[test]
fn test_invalid_config_fails_before_loading() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("lore.toml");
    std::fs::write(&config, "[[layers]]\nname = \"remote\"\npriority = 5\ntype = \"git\"\n").unwrap();

    lore(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("layers")
        .assert()
        .failure()
        .stderr(predicate::str::contains("url: required for git layers"));
}
