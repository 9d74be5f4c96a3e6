use std::path::PathBuf;

use paketprobe_core::cache::{CacheCheckConfig, CacheRun, OutcomeFn, RunSummary};
use paketprobe_core::suite::{StepFn, SuiteKind, SuiteReport};
use paketprobe_core::target::ResolvedTarget;

use crate::cli::OutputFormat;

mod human;
mod json;

/// What happened to the results file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SaveStatus {
    Skipped,
    Saved(PathBuf),
    Failed { path: PathBuf, error: String },
}

pub(crate) struct CacheReport<'a> {
    pub run: &'a CacheRun,
    pub summary: &'a RunSummary,
    pub save: &'a SaveStatus,
    pub min_successes: usize,
}

impl CacheReport<'_> {
    pub(crate) fn passed(&self) -> bool {
        self.summary.passed(self.min_successes)
    }
}

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_cache_header(&self, config: &CacheCheckConfig, endpoint_url: &str);
    fn cache_progress(&self, total: u32) -> Option<OutcomeFn>;
    fn print_cache_summary(&self, report: &CacheReport<'_>) -> anyhow::Result<()>;

    fn print_crud_header(&self, target: &ResolvedTarget, suites: &[SuiteKind]);
    fn crud_progress(&self) -> Option<StepFn>;
    fn print_crud_summary(&self, reports: &[SuiteReport]) -> anyhow::Result<()>;

    /// Clears any live progress display; called before errors are printed.
    fn finish_progress(&self) {}
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
