use std::io;

use anyhow::Context as _;
use paketprobe_core::api::ApiClient;
use paketprobe_core::suite::{self, SuiteKind};
use paketprobe_core::target::{self, BASE_URL_ENV, ResolvedTarget, TargetInputs, TargetSource};
use paketprobe_http::HttpClient;

use crate::cli::CrudArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::prompt;
use crate::run_error::RunError;

pub(crate) async fn run(args: CrudArgs) -> Result<ExitCode, RunError> {
    let target = resolve_target(&args)?;
    tracing::debug!(base_url = %target.base_url, source = %target.source, "resolved target");

    let out = output::formatter(args.output);
    let client = ApiClient::new(HttpClient::default(), &target.base_url, args.timeout);

    let suites: Vec<SuiteKind> = match args.suite.kind() {
        Some(kind) => vec![kind],
        None => SuiteKind::ALL.to_vec(),
    };
    out.print_crud_header(&target, &suites);

    let observer = out.crud_progress();
    let res = match args.suite.kind() {
        Some(kind) => match suite::health_gate(&client).await {
            Ok(()) => Ok(vec![suite::run_suite(&client, kind, observer).await]),
            Err(err) => Err(err),
        },
        None => suite::run_all(&client, args.suite_pause, observer).await,
    };
    let reports = match res {
        Ok(reports) => reports,
        Err(err) => {
            out.finish_progress();
            return Err(err.into());
        }
    };

    out.print_crud_summary(&reports)
        .context("failed to print summary")
        .map_err(RunError::Failed)?;

    let all_passed = reports.iter().all(suite::SuiteReport::all_passed);
    Ok(ExitCode::from_passed(all_passed))
}

/// `--url`, then `PORT [HOST]`, then the environment, then an interactive prompt,
/// then the default.
fn resolve_target(args: &CrudArgs) -> Result<ResolvedTarget, RunError> {
    let inputs = TargetInputs {
        url: args.url.clone(),
        port: args.port.map(|p| p.to_string()),
        host: args.host.clone(),
        env_url: std::env::var(BASE_URL_ENV).ok(),
    };
    if let Some(resolved) = target::resolve(&inputs)? {
        return Ok(resolved);
    }

    if prompt::should_prompt(args.no_prompt) {
        let base_url = prompt::ask_base_url(&mut io::stdin().lock(), &mut io::stdout())
            .context("failed to read target from prompt")
            .map_err(RunError::InvalidInput)?;
        return Ok(ResolvedTarget {
            base_url,
            source: TargetSource::Prompt,
        });
    }

    Ok(target::default_target(&target::default_crud_base_url()))
}
