use std::path::Path;

use anyhow::Context as _;
use paketprobe_core::cache::{
    CacheCheckConfig, CacheDriver, CacheRun, CacheTarget, ResultsFile, RunSummary,
};
use paketprobe_core::target;
use paketprobe_http::HttpClient;

use crate::cli::{CacheArgs, CacheTargetArg};
use crate::exit_codes::ExitCode;
use crate::output::{self, CacheReport, SaveStatus};
use crate::run_error::RunError;

pub(crate) async fn run(args: CacheArgs) -> Result<ExitCode, RunError> {
    let config = config_from_args(&args)?;
    let out = output::formatter(args.output);

    let driver = CacheDriver::new(HttpClient::default(), config)?;
    out.print_cache_header(driver.config(), &driver.endpoint_url());

    let observer = out.cache_progress(driver.config().requests);
    let run = match driver.run(observer).await {
        Ok(run) => run,
        Err(err) => {
            out.finish_progress();
            return Err(err.into());
        }
    };

    let summary = RunSummary::from_outcomes(&run.outcomes);
    let save = if args.no_save {
        SaveStatus::Skipped
    } else {
        save_results(&run, &args.results_file)
    };

    let report = CacheReport {
        run: &run,
        summary: &summary,
        save: &save,
        min_successes: args.min_successes,
    };
    out.print_cache_summary(&report)
        .context("failed to print summary")
        .map_err(RunError::Failed)?;

    Ok(ExitCode::from_passed(report.passed()))
}

fn config_from_args(args: &CacheArgs) -> Result<CacheCheckConfig, RunError> {
    let base_url = target::normalize_base_url(&args.base_url)?;
    let target = match args.target {
        CacheTargetArg::Paket => CacheTarget::Paket { limit: args.limit },
        CacheTargetArg::Stats => CacheTarget::Stats,
    };
    let health_path = if args.health_path.starts_with('/') {
        args.health_path.clone()
    } else {
        format!("/{}", args.health_path)
    };

    Ok(CacheCheckConfig {
        base_url,
        target,
        requests: args.requests,
        delay: args.delay,
        timeout: args.timeout,
        health_path,
        ..CacheCheckConfig::default()
    })
}

/// A failed write is reported but never fails the run.
fn save_results(run: &CacheRun, path: &Path) -> SaveStatus {
    match ResultsFile::new(run, chrono::Utc::now()).save(path) {
        Ok(()) => SaveStatus::Saved(path.to_path_buf()),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to save results");
            SaveStatus::Failed {
                path: path.to_path_buf(),
                error: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser as _;

    fn cache_args(args: &[&str]) -> CacheArgs {
        let cli = Cli::try_parse_from(["paketprobe", "cache"].into_iter().chain(args.iter().copied()))
            .unwrap_or_else(|e| panic!("parse: {e}"));
        match cli.command {
            Command::Cache(args) => args,
            Command::Crud(_) => panic!("expected cache command"),
        }
    }

    #[test]
    fn config_normalizes_url_and_health_path() {
        let args = cache_args(&["http://localhost:4000/", "--health-path", "health", "--target", "stats"]);
        let config = config_from_args(&args).unwrap_or_else(|e| panic!("config: {e}"));
        assert_eq!(config.base_url, "http://localhost:4000");
        assert_eq!(config.health_path, "/health");
        assert_eq!(config.target, CacheTarget::Stats);
    }

    #[test]
    fn invalid_base_url_is_invalid_input() {
        let args = cache_args(&["ftp://localhost"]);
        let err = config_from_args(&args).err();
        assert_eq!(err.map(|e| e.exit_code()), Some(ExitCode::InvalidInput));
    }

    #[test]
    fn unwritable_results_file_is_reported() {
        let run = CacheRun {
            base_url: "http://localhost:3000".to_string(),
            endpoint: "http://localhost:3000/api/stats".to_string(),
            outcomes: Vec::new(),
        };
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("missing").join("results.json");
        assert!(matches!(save_results(&run, &path), SaveStatus::Failed { .. }));

        let path = dir.path().join("results.json");
        assert_eq!(save_results(&run, &path), SaveStatus::Saved(path.clone()));
    }
}
