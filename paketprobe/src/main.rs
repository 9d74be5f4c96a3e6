mod cache_run;
mod cli;
mod crud_run;
mod exit_codes;
mod logging;
mod output;
mod prompt;
mod run_error;

use clap::Parser;
use mimalloc::MiMalloc;

use exit_codes::ExitCode;
use run_error::RunError;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    let cli = match cli::Cli::try_parse() {
        Ok(v) => v,
        Err(err) => {
            use clap::error::ErrorKind;
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Success.as_i32(),
                _ => ExitCode::InvalidInput.as_i32(),
            };
            std::process::exit(code);
        }
    };

    logging::init(cli.verbose);

    let result = tokio::select! {
        res = dispatch(cli.command) => res,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            Ok(ExitCode::Failed)
        }
    };

    let code = match result {
        Ok(code) => code.as_i32(),
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code().as_i32()
        }
    };

    std::process::exit(code);
}

async fn dispatch(command: cli::Command) -> Result<ExitCode, RunError> {
    match command {
        cli::Command::Cache(args) => cache_run::run(args).await,
        cli::Command::Crud(args) => crud_run::run(args).await,
    }
}
