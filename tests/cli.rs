use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn casectx_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_casectx"))
}

/// Temp dir with a small corpus under `refs/` and a config pointing at it.
fn setup_test_env(port: u16) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let refs = root.join("refs");
    fs::create_dir_all(refs.join("a")).unwrap();
    fs::create_dir_all(refs.join("b")).unwrap();
    fs::write(refs.join("a/case1.txt"), "数据库 性能 问题 排查").unwrap();
    fs::write(refs.join("b/case2.txt"), "市场 营销 策略 分析").unwrap();
    fs::write(refs.join("a/broken.txt"), [0x00u8, 0xFF, 0x01, 0xFE]).unwrap();
    fs::write(refs.join("a/ignored.pdf"), "数据库").unwrap();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[corpus]
root = "{}/refs"

[retrieval]
budget = 2000

[cache]
ttl_secs = 60

[server]
bind = "127.0.0.1:{}"
"#,
        root.display(),
        port
    );

    let config_path = config_dir.join("casectx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_casectx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = casectx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run casectx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_context_prints_only_the_context() {
    let (_tmp, config_path) = setup_test_env(0);

    let (stdout, stderr, success) = run_casectx(&config_path, &["context", "数据库连接超时问题"]);
    assert!(success, "context failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(stdout, "[a] 数据库 性能 问题 排查\n");
}

#[test]
fn test_context_budget_truncates() {
    let (_tmp, config_path) = setup_test_env(0);

    let (stdout, _, success) =
        run_casectx(&config_path, &["context", "数据库问题", "--budget", "6"]);
    assert!(success);
    assert_eq!(stdout.trim_end_matches('\n').chars().count(), 6);
    assert_eq!(stdout, "[a] 数据\n");
}

#[test]
fn test_context_json() {
    let (_tmp, config_path) = setup_test_env(0);

    let (stdout, stderr, success) =
        run_casectx(&config_path, &["context", "数据库连接超时问题", "--json"]);
    assert!(success, "context --json failed: {}", stderr);

    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["budget"], 2000);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["path"], "a/case1.txt");
    assert_eq!(entries[0]["category"], "a");
    assert_eq!(entries[0]["truncated"], false);
    assert!(entries[0]["score"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_context_zero_budget_fails() {
    let (_tmp, config_path) = setup_test_env(0);

    let (_, stderr, success) = run_casectx(&config_path, &["context", "数据库", "--budget", "0"]);
    assert!(!success);
    assert!(stderr.contains("invalid budget"), "stderr: {}", stderr);
}

#[test]
fn test_context_empty_query_fails() {
    let (_tmp, config_path) = setup_test_env(0);

    let (_, stderr, success) = run_casectx(&config_path, &["context", "   "]);
    assert!(!success);
    assert!(stderr.contains("query must not be empty"), "stderr: {}", stderr);
}

#[test]
fn test_context_missing_root_is_empty() {
    let (tmp, config_path) = setup_test_env(0);
    let missing = tmp.path().join("nowhere");

    let (stdout, _, success) = run_casectx(
        &config_path,
        &["context", "数据库", "--root", missing.to_str().unwrap()],
    );
    assert!(success);
    assert_eq!(stdout, "");
}

#[test]
fn test_search_lists_relevant_documents() {
    let (_tmp, config_path) = setup_test_env(0);

    let (stdout, stderr, success) =
        run_casectx(&config_path, &["search", "数据库连接超时问题", "--explain"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("1. ["));
    assert!(stdout.contains("a / a/case1.txt"));
    assert!(!stdout.contains("case2.txt"));
    assert!(stdout.contains("shared: 据库 数据 问题"), "stdout: {}", stdout);
    assert!(stdout.contains("category match: no"));
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env(0);

    let (stdout, _, success) = run_casectx(&config_path, &["search", "完全无关"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_scan_lists_documents_and_skipped() {
    let (_tmp, config_path) = setup_test_env(0);

    let (stdout, stderr, success) = run_casectx(&config_path, &["scan"]);
    assert!(success, "scan failed: {}", stderr);
    assert!(stdout.contains("a/case1.txt"));
    assert!(stdout.contains("b/case2.txt"));
    assert!(!stdout.contains("ignored.pdf"));
    assert!(stdout.contains("Skipped 1 file(s):"));
    assert!(stdout.contains("a/broken.txt"));
    assert!(stderr.contains("skipping reference file"));
}

#[test]
fn test_stats() {
    let (_tmp, config_path) = setup_test_env(0);

    let (stdout, stderr, success) = run_casectx(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Documents:   2"));
    assert!(stdout.contains("Skipped:     1"));
    assert!(stdout.contains("By category:"));
    assert!(stdout.contains("UTF-8"));
}

#[test]
fn test_missing_config_uses_defaults() {
    let (tmp, _config_path) = setup_test_env(0);
    let refs = tmp.path().join("refs");
    let absent = tmp.path().join("config/absent.toml");

    let (stdout, stderr, success) = run_casectx(
        &absent,
        &["context", "数据库问题", "--root", refs.to_str().unwrap()],
    );
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.starts_with("[a] "));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[retrieval]\ncategory_bonus = 2.0\n").unwrap();

    let (_, stderr, success) = run_casectx(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("category_bonus"), "stderr: {}", stderr);
}

// ============ HTTP server ============

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn start_server(config_path: &Path) -> std::process::Child {
    Command::new(casectx_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("serve")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to start server: {}", e))
}

/// Poll `/health` until the server answers.
fn wait_for_server(port: u16) {
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        std::thread::sleep(std::time::Duration::from_millis(100));
        if let Ok(resp) = reqwest::blocking::get(&url) {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

#[test]
fn test_server_endpoints() {
    let port = find_free_port();
    let (_tmp, config_path) = setup_test_env(port);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    let client = reqwest::blocking::Client::new();
    let base = format!("http://127.0.0.1:{}", port);

    let health: serde_json::Value = reqwest::blocking::get(format!("{}/health", base))
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert!(health["version"].is_string());

    let resp = client
        .post(format!("{}/tools/context", base))
        .json(&serde_json::json!({ "query": "数据库连接超时问题", "budget": 500 }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["text"], "[a] 数据库 性能 问题 排查");
    assert_eq!(body["budget"], 500);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);

    let resp = client
        .post(format!("{}/tools/search", base))
        .json(&serde_json::json!({ "query": "数据库问题", "limit": 5 }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["path"], "a/case1.txt");
    assert!(results[0]["score"].is_f64());
    assert!(results[0]["snippet"].is_string());

    let resp = client
        .post(format!("{}/tools/context", base))
        .json(&serde_json::json!({ "query": "  " }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = client
        .post(format!("{}/tools/context", base))
        .json(&serde_json::json!({ "query": "数据库", "budget": 0 }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 400);

    server.kill().ok();
    server.wait().ok();
}
