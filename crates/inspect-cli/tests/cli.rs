//! Integration tests that drive the built `retrieval-inspector` binary.
//!
//! Only the paths that never need a live Docker daemon are exercised:
//! `extract`, dry runs, configuration errors, and an unreachable daemon.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const PROMPT: &str = "<code>\n[start of README.md]\nhi\n[end of README.md]\n[start of src/app.py]\nx = 1\n[end of src/app.py]\n[start of src/util.py]\ny = 2\n[end of src/util.py]\n</code>\n";

fn write_dataset(dir: &Path) -> Result<()> {
    let records = [
        serde_json::json!({ "instance_id": "octo__app-1", "text": PROMPT }),
        serde_json::json!({ "instance_id": "octo__app-2", "text": "no block" }),
    ];
    let lines: Vec<String> = records.iter().map(ToString::to_string).collect();
    fs::write(dir.join("dev.jsonl"), lines.join("\n"))?;
    Ok(())
}

fn inspector(dir: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_retrieval-inspector"))
        .args(args)
        .arg("--config")
        .arg(dir.join("inspector.yml"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()?;
    Ok(output)
}

#[test]
fn test_extract_table() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_dataset(temp_dir.path())?;

    let output = inspector(
        temp_dir.path(),
        &["extract", "--dataset-path", ".", "--split", "dev"],
    )?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("octo__app-1  2 paths"));
    assert!(stdout.contains("  src/app.py"));
    assert!(stdout.contains("  src/util.py"));
    assert!(stdout.contains("octo__app-2  skipped: code block not found"));
    Ok(())
}

#[test]
fn test_extract_json() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_dataset(temp_dir.path())?;

    let output = inspector(
        temp_dir.path(),
        &["extract", "--dataset-path", "dev.jsonl", "--format", "json"],
    )?;
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["instance_id"], "octo__app-1");
    assert_eq!(
        records[0]["paths"],
        serde_json::json!(["src/app.py", "src/util.py"])
    );
    assert!(records[0].get("miss").is_none());
    assert!(records[1]["miss"].as_str().unwrap().contains("code block"));
    Ok(())
}

#[test]
fn test_dry_run_prints_plan_without_docker() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_dataset(temp_dir.path())?;
    fs::write(
        temp_dir.path().join("inspector.yml"),
        "run_id: dry\ndataset:\n  path: .\n  split: dev\npreflight:\n  enabled: true\n",
    )?;

    let output = inspector(
        temp_dir.path(),
        &["run", "--editor", "code", "--dry-run", "--mount-root", "/tmp/inspect"],
    )?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");

    assert!(stderr.contains("Dry run"));
    assert!(stderr.contains("sweb.eval.octo__app-1.dry"));
    assert!(stderr.contains("/tmp/inspect/output/octo__app-1:/output:rw"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 planned, 1 skipped, 0 failed"));
    Ok(())
}

#[test]
fn test_dry_run_respects_instance_filter() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_dataset(temp_dir.path())?;

    let output = inspector(
        temp_dir.path(),
        &[
            "run",
            "--dataset-path",
            "dev.jsonl",
            "--editor",
            "code",
            "--dry-run",
            "--instance-id",
            "octo__app-2",
        ],
    )?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("octo__app-1"));
    assert!(stdout.contains("0 planned, 1 skipped, 0 failed"));
    Ok(())
}

#[test]
fn test_run_without_editor_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_dataset(temp_dir.path())?;

    let output = inspector(temp_dir.path(), &["run", "--dataset-path", "dev.jsonl"])?;
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("editor binary is required"));
    Ok(())
}

#[test]
fn test_unreachable_docker_daemon_fails_at_startup() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_dataset(temp_dir.path())?;

    let output = Command::new(env!("CARGO_BIN_EXE_retrieval-inspector"))
        .args(["run", "--dataset-path", "dev.jsonl", "--editor", "code"])
        .arg("--config")
        .arg(temp_dir.path().join("inspector.yml"))
        .current_dir(temp_dir.path())
        .env_remove("RUST_LOG")
        .env("DOCKER_HOST", "unix:///nonexistent/docker.sock")
        .output()?;
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Docker"), "stderr: {stderr}");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("0 failed"));
    Ok(())
}

#[test]
fn test_missing_dataset_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let output = inspector(
        temp_dir.path(),
        &["extract", "--dataset-path", "missing-dir", "--split", "dev"],
    )?;
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load dataset"));
    Ok(())
}
