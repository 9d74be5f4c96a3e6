use std::process::{Command, Output};

use anyhow::Context as _;
use paketprobe_testserver::{CacheMode, TestServer, TestServerOptions};

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn ensure_exit(out: &Output, expected: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out.status) == expected,
        "expected exit code {expected}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

async fn run_binary(args: Vec<String>) -> anyhow::Result<Output> {
    let exe = env!("CARGO_BIN_EXE_paketprobe");
    tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .args(&args)
            .env_remove("PAKETPROBE_BASE_URL")
            .env_remove("RUST_LOG")
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run paketprobe binary")
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn invalid_flags_exit_2() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_paketprobe");

    let out = Command::new(exe)
        .arg("cache")
        .arg("--delay")
        .arg("10x")
        .output()
        .context("run paketprobe binary")?;

    ensure_exit(&out, 2)
}

#[test]
fn invalid_base_url_exit_2() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_paketprobe");

    let out = Command::new(exe)
        .arg("cache")
        .arg("not-a-url")
        .arg("--no-save")
        .output()
        .context("run paketprobe binary")?;

    ensure_exit(&out, 2)?;
    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(stderr.contains("invalid base url"), "stderr:\n{stderr}");
    Ok(())
}

#[test]
fn help_exits_0() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_paketprobe");
    let out = Command::new(exe)
        .arg("--help")
        .output()
        .context("run paketprobe binary")?;
    ensure_exit(&out, 0)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cache_check_passes_and_saves_results() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir().context("tempdir")?;
    let results = dir.path().join("results.json");

    let out = run_binary(args(&[
        "cache",
        server.base_url(),
        "--delay",
        "10ms",
        "--output",
        "json",
        "--results-file",
        &results.display().to_string(),
    ]))
    .await?;
    server.shutdown().await;

    ensure_exit(&out, 0)?;

    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()
        .context("stdout is not NDJSON")?;
    anyhow::ensure!(lines.len() == 4, "expected 3 outcomes and a summary:\n{stdout}");
    anyhow::ensure!(lines[0]["kind"] == "outcome" && lines[0]["cache_status"] == "MISS");
    anyhow::ensure!(lines[1]["cache_status"] == "HIT" && lines[2]["cache_status"] == "HIT");
    anyhow::ensure!(lines[3]["kind"] == "summary");
    anyhow::ensure!(lines[3]["verdict"] == "correct");
    anyhow::ensure!(lines[3]["passed"] == true);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&results).context("read results")?)
            .context("parse results")?;
    anyhow::ensure!(saved["results"].as_array().map(Vec::len) == Some(3));
    anyhow::ensure!(saved["endpoint"].as_str().is_some_and(|e| e.ends_with("/api/paket?limit=10")));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cache_check_without_cache_still_passes() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerOptions {
        cache_mode: CacheMode::Disabled,
        ..TestServerOptions::default()
    })
    .await
    .context("start test server")?;

    let out = run_binary(args(&["cache", server.base_url(), "--delay", "0s", "--no-save"])).await?;
    server.shutdown().await;

    ensure_exit(&out, 0)?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(stdout.contains("verdict: multiple_misses"), "stdout:\n{stdout}");
    anyhow::ensure!(stdout.contains("PASSED: 3/3"), "stdout:\n{stdout}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unhealthy_server_exit_1() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerOptions {
        health_status: 500,
        ..TestServerOptions::default()
    })
    .await
    .context("start test server")?;
    let dir = tempfile::tempdir().context("tempdir")?;
    let results = dir.path().join("results.json");

    let out = run_binary(args(&[
        "cache",
        server.base_url(),
        "--results-file",
        &results.display().to_string(),
    ]))
    .await?;
    let cached_requests = server.stats().cached_requests();
    server.shutdown().await;

    ensure_exit(&out, 1)?;
    anyhow::ensure!(cached_requests == 0);
    anyhow::ensure!(!results.exists(), "no results file expected after a failed health check");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn too_few_successes_exit_1() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let out = run_binary(args(&[
        "cache",
        server.base_url(),
        "--requests",
        "2",
        "--min-successes",
        "3",
        "--delay",
        "0s",
        "--no-save",
    ]))
    .await?;
    server.shutdown().await;

    ensure_exit(&out, 1)?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(stdout.contains("FAILED: 2/2 requests succeeded (minimum 3)"), "stdout:\n{stdout}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crud_suites_pass_exit_0() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let out = run_binary(args(&[
        "crud",
        "--url",
        server.base_url(),
        "--no-prompt",
        "--suite-pause",
        "0s",
        "--output",
        "json",
    ]))
    .await?;
    server.shutdown().await;

    ensure_exit(&out, 0)?;

    let stdout = String::from_utf8_lossy(&out.stdout);
    let suites: Vec<serde_json::Value> = stdout
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter(|v| v["kind"] == "suite")
        .collect();
    let names: Vec<&str> = suites.iter().filter_map(|v| v["suite"].as_str()).collect();
    anyhow::ensure!(names == ["paket", "users", "favorites", "compatibility"], "suites: {names:?}");
    anyhow::ensure!(suites.iter().all(|v| v["all_passed"] == true), "stdout:\n{stdout}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crud_single_suite_from_port() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let port = server.addr().port().to_string();

    let out = run_binary(args(&["crud", &port, "127.0.0.1", "--suite", "paket", "--no-prompt"])).await?;
    server.shutdown().await;

    ensure_exit(&out, 0)?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(stdout.contains("[paket] PASS Create Paket"), "stdout:\n{stdout}");
    anyhow::ensure!(stdout.contains("PASSED: 10/10 steps passed"), "stdout:\n{stdout}");
    Ok(())
}

#[tokio::test]
async fn crud_unreachable_exit_1() -> anyhow::Result<()> {
    let out = run_binary(args(&["crud", "--url", "http://127.0.0.1:1", "--no-prompt"])).await?;
    ensure_exit(&out, 1)?;
    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(stderr.contains("server not reachable"), "stderr:\n{stderr}");
    Ok(())
}
