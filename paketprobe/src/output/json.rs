use serde::Serialize;
use std::io::Write as _;
use std::sync::Arc;

use paketprobe_core::cache::{
    CacheCheckConfig, CacheVerdict, Improvement, LatencyStats, OutcomeFn, RequestOutcome,
};
use paketprobe_core::suite::{StepFn, StepResult, SuiteKind, SuiteReport};
use paketprobe_core::target::ResolvedTarget;

use super::{CacheReport, OutputFormatter, SaveStatus};

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_cache_header(&self, _config: &CacheCheckConfig, _endpoint_url: &str) {}

    fn cache_progress(&self, _total: u32) -> Option<OutcomeFn> {
        Some(Arc::new(move |outcome: &RequestOutcome| {
            emit_json_line(&JsonOutcomeLine {
                kind: "outcome",
                outcome,
            });
        }))
    }

    fn print_cache_summary(&self, report: &CacheReport<'_>) -> anyhow::Result<()> {
        emit_json_line(&build_summary_line(report));
        Ok(())
    }

    fn print_crud_header(&self, _target: &ResolvedTarget, _suites: &[SuiteKind]) {}

    fn crud_progress(&self) -> Option<StepFn> {
        Some(Arc::new(move |suite: SuiteKind, step: &StepResult| {
            emit_json_line(&JsonStepLine {
                kind: "step",
                suite,
                step,
            });
        }))
    }

    fn print_crud_summary(&self, reports: &[SuiteReport]) -> anyhow::Result<()> {
        for report in reports {
            emit_json_line(&build_suite_line(report));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonOutcomeLine<'a> {
    pub kind: &'static str,
    #[serde(flatten)]
    pub outcome: &'a RequestOutcome,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine<'a> {
    pub kind: &'static str,
    pub server_url: &'a str,
    pub endpoint: &'a str,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub success_rate_pct: f64,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub latency_ms: Option<LatencyStats>,
    pub improvement: Option<Improvement>,
    pub verdict: CacheVerdict,
    pub verdict_description: &'static str,
    pub min_successes: usize,
    pub passed: bool,
    pub results_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonStepLine<'a> {
    pub kind: &'static str,
    pub suite: SuiteKind,
    #[serde(flatten)]
    pub step: &'a StepResult,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSuiteLine<'a> {
    pub kind: &'static str,
    pub suite: SuiteKind,
    pub title: &'static str,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub success_rate_pct: f64,
    pub all_passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<&'a str>,
}

pub(crate) fn build_summary_line<'a>(report: &'a CacheReport<'a>) -> JsonSummaryLine<'a> {
    let summary = report.summary;
    let (results_file, save_error) = match report.save {
        SaveStatus::Skipped => (None, None),
        SaveStatus::Saved(path) => (Some(path.display().to_string()), None),
        SaveStatus::Failed { path, error } => {
            (Some(path.display().to_string()), Some(error.as_str()))
        }
    };

    JsonSummaryLine {
        kind: "summary",
        server_url: &report.run.base_url,
        endpoint: &report.run.endpoint,
        total_requests: summary.total,
        successful_requests: summary.successes,
        success_rate_pct: summary.success_percent(),
        cache_hits: summary.hits,
        cache_misses: summary.misses,
        latency_ms: summary.latency,
        improvement: summary.improvement,
        verdict: summary.verdict,
        verdict_description: summary.verdict.description(),
        min_successes: report.min_successes,
        passed: report.passed(),
        results_file,
        save_error,
    }
}

pub(crate) fn build_suite_line(report: &SuiteReport) -> JsonSuiteLine<'_> {
    JsonSuiteLine {
        kind: "suite",
        suite: report.suite,
        title: report.suite.title(),
        total: report.total(),
        passed: report.passed(),
        failed: report.failed(),
        success_rate_pct: report.success_percent(),
        all_passed: report.all_passed(),
        aborted: report.aborted.as_deref(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
