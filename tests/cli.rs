//! CLI integration tests. These run the built `docket` binary against a
//! scratch config; everything that needs a live provider is covered by the
//! in-process pipeline tests instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docket_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docket");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[db]
path = "{}/data/docket.sqlite"

[chunking]
max_chars = 1000
overlap_chars = 100

[server]
bind = "127.0.0.1:7431"
"#,
        root.display()
    );

    let config_path = root.join("docket.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docket(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docket_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docket binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docket(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("docket.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_docket(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_docket(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_documents_empty_group() {
    let (_tmp, config_path) = setup_test_env();

    run_docket(&config_path, &["init"]);
    let (stdout, _, success) = run_docket(&config_path, &["documents", "--group", "g1"]);
    assert!(success);
    assert!(stdout.contains("No documents"));
}

#[test]
fn test_ingest_errors_when_embedding_disabled() {
    let (tmp, config_path) = setup_test_env();

    run_docket(&config_path, &["init"]);
    let file = tmp.path().join("notes.txt");
    fs::write(&file, "The sky is blue.").unwrap();

    let (_, stderr, success) = run_docket(
        &config_path,
        &[
            "ingest",
            "--group",
            "g1",
            "--file",
            file.to_str().unwrap(),
            "--content-type",
            "text/plain",
        ],
    );
    assert!(!success, "ingest should fail when embedding disabled");
    assert!(
        stderr.contains("disabled"),
        "Should mention disabled, got: {}",
        stderr
    );
}

#[test]
fn test_ask_empty_question_is_client_error() {
    let (_tmp, config_path) = setup_test_env();

    run_docket(&config_path, &["init"]);
    let (_, stderr, success) = run_docket(&config_path, &["ask", "--group", "g1", "  "]);
    assert!(!success, "Empty question should fail");
    assert!(
        stderr.contains("question must not be empty"),
        "Should mention empty question, got: {}",
        stderr
    );
}

#[test]
fn test_ask_errors_when_providers_disabled() {
    let (_tmp, config_path) = setup_test_env();

    run_docket(&config_path, &["init"]);
    let (_, stderr, success) =
        run_docket(&config_path, &["ask", "--group", "g1", "What color is the sky?"]);
    assert!(!success, "ask should fail when providers disabled");
    assert!(
        stderr.contains("disabled"),
        "Should mention disabled, got: {}",
        stderr
    );
}

#[test]
fn test_invalid_chunking_config_rejected() {
    let (tmp, _) = setup_test_env();

    let bad = format!(
        r#"[db]
path = "{}/data/docket.sqlite"

[chunking]
max_chars = 100
overlap_chars = 100

[server]
bind = "127.0.0.1:7431"
"#,
        tmp.path().display()
    );
    let bad_path = tmp.path().join("bad.toml");
    fs::write(&bad_path, bad).unwrap();

    let (_, stderr, success) = run_docket(&bad_path, &["init"]);
    assert!(!success, "Config with overlap == max_chars should be rejected");
    assert!(
        stderr.contains("overlap_chars"),
        "Should mention overlap_chars, got: {}",
        stderr
    );
}

#[test]
fn test_unknown_provider_rejected() {
    let (tmp, _) = setup_test_env();

    let bad = format!(
        r#"[db]
path = "{}/data/docket.sqlite"

[chunking]

[embedding]
provider = "gemini"
model = "embedding-001"
dims = 768

[server]
bind = "127.0.0.1:7431"
"#,
        tmp.path().display()
    );
    let bad_path = tmp.path().join("bad.toml");
    fs::write(&bad_path, bad).unwrap();

    let (_, stderr, success) = run_docket(&bad_path, &["init"]);
    assert!(!success);
    assert!(
        stderr.contains("Unknown embedding provider"),
        "Should mention unknown provider, got: {}",
        stderr
    );
}
