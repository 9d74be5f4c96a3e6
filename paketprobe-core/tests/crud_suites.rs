use std::time::Duration;

use paketprobe_core::Error;
use paketprobe_core::api::{ApiClient, DEFAULT_API_TIMEOUT, NewPaket, PaketQuery};
use paketprobe_core::suite::{SuiteKind, SuiteReport, health_gate, run_all, run_suite};
use paketprobe_http::HttpClient;
use paketprobe_testserver::{TestServer, TestServerOptions};

async fn server(options: TestServerOptions) -> TestServer {
    TestServer::start_with(options)
        .await
        .unwrap_or_else(|e| panic!("failed to start test server: {e}"))
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(HttpClient::default(), base_url, DEFAULT_API_TIMEOUT)
}

fn failed_steps(report: &SuiteReport) -> Vec<String> {
    report
        .steps
        .iter()
        .filter(|s| !s.passed)
        .map(|s| format!("{}: expected {}, got {}", s.name, s.expected, s.actual))
        .collect()
}

fn step_passed(report: &SuiteReport, name: &str) -> anyhow::Result<()> {
    let step = report
        .steps
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| anyhow::anyhow!("step `{name}` was not recorded"))?;
    anyhow::ensure!(
        step.passed,
        "{name}: expected {}, got {}",
        step.expected,
        step.actual
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn paket_suite_passes_against_mock() -> anyhow::Result<()> {
    let server = server(TestServerOptions::default()).await;
    let report = run_suite(&client(server.base_url()), SuiteKind::Paket, None).await;

    anyhow::ensure!(report.all_passed(), "failed: {:?}", failed_steps(&report));
    anyhow::ensure!(report.total() == 10, "steps: {}", report.total());
    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn users_suite_passes_against_mock() -> anyhow::Result<()> {
    let server = server(TestServerOptions::default()).await;
    let report = run_suite(&client(server.base_url()), SuiteKind::Users, None).await;

    anyhow::ensure!(report.all_passed(), "failed: {:?}", failed_steps(&report));
    // Registration yields a session, so the standalone login step is skipped.
    anyhow::ensure!(report.total() == 10, "steps: {}", report.total());
    anyhow::ensure!(!report.steps.iter().any(|s| s.name == "User Login"));
    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn favorites_suite_passes_against_mock() -> anyhow::Result<()> {
    let server = server(TestServerOptions::default()).await;
    let report = run_suite(&client(server.base_url()), SuiteKind::Favorites, None).await;

    anyhow::ensure!(report.all_passed(), "failed: {:?}", failed_steps(&report));
    anyhow::ensure!(report.total() == 13, "steps: {}", report.total());
    step_passed(&report, "Check Favorite Status")?;
    step_passed(&report, "Check Removed Favorite Status")?;
    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn compatibility_suite_passes_against_mock() -> anyhow::Result<()> {
    let server = server(TestServerOptions::default()).await;
    let report = run_suite(&client(server.base_url()), SuiteKind::Compatibility, None).await;

    anyhow::ensure!(report.all_passed(), "failed: {:?}", failed_steps(&report));
    anyhow::ensure!(report.total() == 10, "steps: {}", report.total());
    for name in [
        "API Documentation",
        "Create Paket with Hash",
        "Add Favorite by Hash",
        "Check Favorite by Hash",
        "Remove Favorite by Hash",
        "Delete Created Paket",
    ] {
        step_passed(&report, name)?;
    }
    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_all_runs_every_suite_in_order() -> anyhow::Result<()> {
    let server = server(TestServerOptions::default()).await;
    let reports = run_all(&client(server.base_url()), Duration::ZERO, None).await?;

    let order: Vec<SuiteKind> = reports.iter().map(|r| r.suite).collect();
    anyhow::ensure!(order == SuiteKind::ALL);
    for report in &reports {
        anyhow::ensure!(
            report.all_passed(),
            "{} failed: {:?}",
            report.suite,
            failed_steps(report)
        );
    }
    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unhealthy_server_stops_run_all() -> anyhow::Result<()> {
    let server = server(TestServerOptions {
        health_status: 500,
        ..TestServerOptions::default()
    })
    .await;

    let api = client(server.base_url());
    anyhow::ensure!(matches!(
        health_gate(&api).await,
        Err(Error::Connectivity { .. })
    ));
    let res = run_all(&api, Duration::ZERO, None).await;
    anyhow::ensure!(res.is_err());
    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn transport_error_aborts_suite_with_one_failed_step() -> anyhow::Result<()> {
    let report = run_suite(&client("http://127.0.0.1:1"), SuiteKind::Paket, None).await;

    anyhow::ensure!(report.total() == 1);
    anyhow::ensure!(report.failed() == 1);
    anyhow::ensure!(report.aborted.is_some());
    anyhow::ensure!(!report.all_passed());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn paket_writes_invalidate_cached_list() -> anyhow::Result<()> {
    let server = server(TestServerOptions::default()).await;
    let api = client(server.base_url());

    let before = api.list_paket(&PaketQuery::default()).await?;
    let paket = NewPaket::with_defaults("Invalidation Check", "INV001", 1_000.0, 1);
    let created = api.create_paket(&paket).await?;
    anyhow::ensure!(created.status == 201 && created.success());

    let after = api.list_paket(&PaketQuery::default()).await?;
    let len = |r: &paketprobe_core::api::ApiReply| r.data().as_array().map_or(0, Vec::len);
    anyhow::ensure!(len(&after) == len(&before) + 1);
    anyhow::ensure!(server.stats().cache_hits() == 0);
    server.shutdown().await;
    Ok(())
}
