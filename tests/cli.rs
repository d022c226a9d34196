//! Binary-level round trips for the `triage` CLI.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn triage_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("triage");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Providers disabled: intake and inspection work without network.
    let config_content = format!(
        r#"[db]
path = "{}/data/triage.sqlite"

[images]
root = "{}/images"

[dedup]
window_hours = 24
image_hash_threshold = 5
text_similarity_threshold = 0.90
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("triage.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_triage(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = triage_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run triage binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_triage(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_triage(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_triage(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_submit_records_pending_submission() {
    let (_tmp, config_path) = setup_test_env();

    run_triage(&config_path, &["init"]);
    let (stdout, stderr, success) = run_triage(
        &config_path,
        &["submit", "--text", "There's a big pothole near Sector 14 crossing"],
    );
    assert!(success, "submit failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("submitted"));

    let (stdout, _, success) = run_triage(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Submissions:  1"));
    assert!(stdout.contains("pending"));
}

#[test]
fn test_submit_requires_text_or_image() {
    let (_tmp, config_path) = setup_test_env();

    run_triage(&config_path, &["init"]);
    let (_, stderr, success) = run_triage(&config_path, &["submit"]);
    assert!(!success, "submit with no input must fail");
    assert!(stderr.contains("Nothing to submit"));
}

#[test]
fn test_process_requires_classifier() {
    let (_tmp, config_path) = setup_test_env();

    run_triage(&config_path, &["init"]);
    run_triage(&config_path, &["submit", "--text", "pothole"]);

    let (_, stderr, success) = run_triage(&config_path, &["process"]);
    assert!(!success, "process must refuse to run without a classifier");
    assert!(stderr.contains("Classifier provider is disabled"));
}

#[test]
fn test_issues_empty() {
    let (_tmp, config_path) = setup_test_env();

    run_triage(&config_path, &["init"]);
    let (stdout, _, success) = run_triage(&config_path, &["issues"]);
    assert!(success);
    assert!(stdout.contains("No issues."));
}
