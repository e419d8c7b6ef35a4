use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn verifier_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("verifier");
    path
}

fn setup_test_env(extra_config: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let kb_dir = root.join("knowledge_base");
    fs::create_dir_all(kb_dir.join("math")).unwrap();
    fs::write(
        kb_dir.join("math/calculus.txt"),
        "Title: Calculus\n\nCalculus is the study of change.",
    )
    .unwrap();
    fs::write(
        kb_dir.join("biology.txt"),
        "Title: Biology\n\nBiology is the study of living things.",
    )
    .unwrap();
    fs::write(kb_dir.join("notes.md"), "Not part of the corpus.").unwrap();

    let config_content = format!(
        r#"[corpus]
dir = "{}/knowledge_base"
include_globs = ["**/*.txt"]

[embedding]
provider = "disabled"

[grading]
provider = "disabled"

[logging]
level = "warn"
{}
"#,
        root.display(),
        extra_config
    );

    let config_path = config_dir.join("verifier.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_verifier(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(verifier_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .expect("failed to run verifier");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_corpus_lists_documents_in_path_order() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, stderr, success) = run_verifier(&config, &["corpus"]);
    assert!(success, "corpus failed: {}", stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "unexpected output: {}", stdout);
    assert!(lines[0].starts_with("doc_0\tbiology.txt"));
    assert!(lines[1].starts_with("doc_1\tmath/calculus.txt"));
    assert!(!stdout.contains("notes.md"));
}

#[test]
fn test_corpus_missing_directory_is_empty() {
    let (tmp, config) = setup_test_env("");
    fs::remove_dir_all(tmp.path().join("knowledge_base")).unwrap();

    let (stdout, _stderr, success) = run_verifier(&config, &["corpus"]);
    assert!(success);
    assert!(stdout.contains("No documents found"));
}

#[test]
fn test_verify_reports_embedding_failure_as_json() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, _stderr, success) = run_verifier(
        &config,
        &[
            "verify",
            "--question",
            "What is calculus?",
            "--answer",
            "It's about derivatives.",
        ],
    );
    assert!(!success);

    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["kind"], "embedding_failure");
    assert!(body.get("raw_text").is_none());
}

#[test]
fn test_index_errors_when_embedding_disabled() {
    let (_tmp, config) = setup_test_env("");
    let (_stdout, stderr, success) = run_verifier(&config, &["index"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_top_k_rejected() {
    let (_tmp, config) = setup_test_env("\n[retrieval]\ntop_k = 0\n");
    let (_stdout, stderr, success) = run_verifier(&config, &["corpus"]);
    assert!(!success);
    assert!(stderr.contains("top_k"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("absent.toml");
    let output = Command::new(verifier_binary())
        .current_dir(tmp.path())
        .arg("--config")
        .arg(&config)
        .arg("corpus")
        .output()
        .expect("failed to run verifier");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No documents found"));
}
