use std::fmt::Write as _;

use paketprobe_core::cache::CacheVerdict;
use paketprobe_core::suite::SuiteReport;

use super::format::*;
use crate::output::{CacheReport, SaveStatus};

pub(crate) fn render_cache(report: &CacheReport<'_>) -> String {
    let summary = report.summary;
    let mut out = String::new();

    out.push_str("\nsummary\n");
    writeln!(
        &mut out,
        "  requests: {} (successful {}, {})",
        summary.total,
        summary.successes,
        format_percent(summary.success_percent())
    )
    .ok();
    writeln!(
        &mut out,
        "  cache: hits {} misses {}",
        summary.hits, summary.misses
    )
    .ok();

    match &summary.latency {
        Some(l) => {
            writeln!(
                &mut out,
                "  latency: mean={} min={} max={}",
                format_ms(l.mean_ms),
                format_ms(l.min_ms),
                format_ms(l.max_ms)
            )
            .ok();
        }
        None => out.push_str("  latency: n/a\n"),
    }

    if let Some(imp) = &summary.improvement {
        writeln!(
            &mut out,
            "  improvement: first MISS {} -> first HIT {} ({} faster)",
            format_ms(imp.miss_ms),
            format_ms(imp.hit_ms),
            format_percent(imp.percent)
        )
        .ok();
    }

    out.push_str("\nrequests\n");
    out.push_str(&format_outcome_table(&report.run.outcomes));

    out.push_str("\nanalysis\n");
    writeln!(
        &mut out,
        "  verdict: {} ({})",
        summary.verdict,
        summary.verdict.description()
    )
    .ok();
    if summary.verdict != CacheVerdict::Correct {
        let statuses = report
            .run
            .outcomes
            .iter()
            .map(format_cache_status)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(&mut out, "  observed: [{statuses}]").ok();
    }

    match report.save {
        SaveStatus::Skipped => {}
        SaveStatus::Saved(path) => {
            writeln!(&mut out, "  results: saved to {}", path.display()).ok();
        }
        SaveStatus::Failed { path, error } => {
            writeln!(
                &mut out,
                "  results: failed to save to {} ({error})",
                path.display()
            )
            .ok();
        }
    }

    out.push('\n');
    let status = if report.passed() { "PASSED" } else { "FAILED" };
    writeln!(
        &mut out,
        "{status}: {}/{} requests succeeded (minimum {})",
        summary.successes, summary.total, report.min_successes
    )
    .ok();

    out
}

pub(crate) fn render_suites(reports: &[SuiteReport]) -> String {
    let mut out = String::new();

    out.push_str("\nsummary\n");
    let mut total = 0;
    let mut passed = 0;
    for r in reports {
        total += r.total();
        passed += r.passed();

        writeln!(
            &mut out,
            "  {}: {}/{} passed ({})",
            r.suite.title(),
            r.passed(),
            r.total(),
            format_percent(r.success_percent())
        )
        .ok();
        if let Some(reason) = &r.aborted {
            writeln!(&mut out, "    aborted: {reason}").ok();
        }
        for step in r.steps.iter().filter(|s| !s.passed) {
            writeln!(
                &mut out,
                "    failed: {} (expected {}, got {})",
                step.name, step.expected, step.actual
            )
            .ok();
        }
    }

    let all_passed = reports.iter().all(SuiteReport::all_passed);
    let rate = if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    };
    writeln!(
        &mut out,
        "\n{}: {passed}/{total} steps passed ({})",
        if all_passed { "PASSED" } else { "FAILED" },
        format_percent(rate)
    )
    .ok();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use paketprobe_core::cache::{CacheRun, CacheStatus, RequestOutcome, RunSummary};
    use paketprobe_core::suite::{StepResult, SuiteKind};
    use std::path::PathBuf;

    fn outcome(seq: u32, status: CacheStatus, latency_ms: f64) -> RequestOutcome {
        RequestOutcome {
            sequence_number: seq,
            status_code: 200,
            latency_ms,
            cache_status: status,
            cache_status_raw: status.to_string(),
            cache_key: "paket:list::1:10".to_string(),
            cache_ttl: "1800".to_string(),
            record_counts: None,
            succeeded: true,
            error: None,
            error_kind: None,
        }
    }

    fn run(outcomes: Vec<RequestOutcome>) -> CacheRun {
        CacheRun {
            base_url: "http://localhost:3000".to_string(),
            endpoint: "http://localhost:3000/api/paket?limit=10".to_string(),
            outcomes,
        }
    }

    #[test]
    fn cache_report_for_working_cache() {
        let run = run(vec![
            outcome(1, CacheStatus::Miss, 120.0),
            outcome(2, CacheStatus::Hit, 15.0),
            outcome(3, CacheStatus::Hit, 12.0),
        ]);
        let summary = RunSummary::from_outcomes(&run.outcomes);
        let save = SaveStatus::Saved(PathBuf::from("cache_test_results.json"));
        let text = render_cache(&CacheReport {
            run: &run,
            summary: &summary,
            save: &save,
            min_successes: 2,
        });

        assert!(text.contains("requests: 3 (successful 3, 100.0%)"));
        assert!(text.contains("latency: mean=49.00ms min=12.00ms max=120.00ms"));
        assert!(text.contains("(87.5% faster)"));
        assert!(text.contains("verdict: correct"));
        assert!(!text.contains("observed:"));
        assert!(text.contains("results: saved to cache_test_results.json"));
        assert!(text.ends_with("PASSED: 3/3 requests succeeded (minimum 2)\n"));
    }

    #[test]
    fn cache_report_without_successes() {
        let mut failed = outcome(1, CacheStatus::Error, 5.0);
        failed.status_code = 0;
        failed.succeeded = false;
        let run = run(vec![failed]);
        let summary = RunSummary::from_outcomes(&run.outcomes);
        let text = render_cache(&CacheReport {
            run: &run,
            summary: &summary,
            save: &SaveStatus::Skipped,
            min_successes: 2,
        });

        assert!(text.contains("latency: n/a"));
        assert!(!text.contains("improvement:"));
        assert!(text.contains("observed: [ERROR]"));
        assert!(!text.contains("results:"));
        assert!(text.contains("FAILED: 0/1 requests succeeded"));
    }

    #[test]
    fn suite_summary_lists_failures() {
        let reports = vec![
            SuiteReport {
                suite: SuiteKind::Paket,
                steps: vec![StepResult::check("Health Check", "success", "status 200 success=true", true)],
                aborted: None,
            },
            SuiteReport {
                suite: SuiteKind::Users,
                steps: vec![StepResult::check(
                    "User Registration",
                    "completed call",
                    "connection refused",
                    false,
                )],
                aborted: Some("connection refused".to_string()),
            },
        ];
        let text = render_suites(&reports);
        assert!(text.contains("Paket CRUD: 1/1 passed (100.0%)"));
        assert!(text.contains("aborted: connection refused"));
        assert!(text.contains("failed: User Registration (expected completed call, got connection refused)"));
        assert!(text.contains("FAILED: 1/2 steps passed (50.0%)"));
    }
}
