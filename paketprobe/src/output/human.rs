use std::sync::Arc;

mod format;
mod progress;
mod summary;

use paketprobe_core::cache::{CacheCheckConfig, CacheTarget, OutcomeFn, RequestOutcome};
use paketprobe_core::suite::{StepFn, StepResult, SuiteKind, SuiteReport};
use paketprobe_core::target::ResolvedTarget;

use format::{format_duration, format_outcome_line};
use progress::HumanProgress;
use summary::{render_cache, render_suites};

use super::{CacheReport, OutputFormatter};

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_cache_header(&self, config: &CacheCheckConfig, endpoint_url: &str) {
        println!("server: {}", config.base_url);
        println!("endpoint: {endpoint_url}");
        if let CacheTarget::Paket { limit } = config.target {
            println!("target: paket (limit={limit})");
        } else {
            println!("target: stats");
        }
        println!(
            "requests: {} delay={} timeout={}",
            config.requests,
            format_duration(config.delay),
            format_duration(config.timeout)
        );
        println!();
    }

    fn cache_progress(&self, total: u32) -> Option<OutcomeFn> {
        self.progress.start("cache", Some(u64::from(total)));
        let progress = self.progress.clone();
        Some(Arc::new(move |outcome: &RequestOutcome| {
            let line = format_outcome_line(outcome, total);
            progress.println(&line, format!("last={}", outcome.cache_status));
        }))
    }

    fn print_cache_summary(&self, report: &CacheReport<'_>) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render_cache(report));
        Ok(())
    }

    fn print_crud_header(&self, target: &ResolvedTarget, suites: &[SuiteKind]) {
        println!("server: {} (from {})", target.base_url, target.source);
        let names = suites
            .iter()
            .map(|s| s.title())
            .collect::<Vec<_>>()
            .join(", ");
        println!("suites: {names}");
        println!();
    }

    fn crud_progress(&self) -> Option<StepFn> {
        self.progress.start("crud", None);
        let progress = self.progress.clone();
        Some(Arc::new(move |suite: SuiteKind, step: &StepResult| {
            let mark = if step.passed { "PASS" } else { "FAIL" };
            let mut line = format!("[{suite}] {mark} {}", step.name);
            if !step.passed {
                line.push_str(&format!(" (expected {}, got {})", step.expected, step.actual));
            }
            if let Some(detail) = &step.detail {
                line.push_str(&format!("\n    {detail}"));
            }
            progress.println(&line, suite.title().to_string());
        }))
    }

    fn print_crud_summary(&self, reports: &[SuiteReport]) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render_suites(reports));
        Ok(())
    }

    fn finish_progress(&self) {
        self.progress.finish();
    }
}
