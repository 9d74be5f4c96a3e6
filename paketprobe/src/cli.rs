use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use paketprobe_core::cache::{DEFAULT_HEALTH_PATH, DEFAULT_MIN_SUCCESSES, DEFAULT_RESULTS_FILE};
use paketprobe_core::suite::SuiteKind;
use paketprobe_core::target::{BASE_URL_ENV, DEFAULT_CACHE_BASE_URL};

/// Accepts humantime durations (`250ms`, `1m 30s`); a bare number means seconds.
fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s)
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report.
    HumanReadable,
    /// Emit JSON lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CacheTargetArg {
    /// `GET /api/paket?limit=N`
    Paket,
    /// `GET /api/stats`
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SuiteArg {
    All,
    Paket,
    Users,
    Favorites,
    Compatibility,
}

impl SuiteArg {
    /// `None` means every suite.
    pub fn kind(self) -> Option<SuiteKind> {
        match self {
            Self::All => None,
            Self::Paket => Some(SuiteKind::Paket),
            Self::Users => Some(SuiteKind::Users),
            Self::Favorites => Some(SuiteKind::Favorites),
            Self::Compatibility => Some(SuiteKind::Compatibility),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "paketprobe",
    author,
    version,
    about = "Black-box checks for the paket procurement API",
    long_about = "paketprobe drives a running paket API over HTTP.\n\n`cache` sends a few sequential GET requests to a cached endpoint and checks the X-Cache-Status headers.\n`crud` runs the paket, user, favorites and compatibility suites and reports every step.",
    after_help = "Examples:\n  paketprobe cache\n  paketprobe cache http://localhost:3000 --requests 5 --delay 500ms\n  paketprobe cache --target stats --output json\n  paketprobe crud 3001\n  paketprobe crud --url http://api.internal:8080 --suite favorites --no-prompt"
)]
pub struct Cli {
    /// Enable debug logging on stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify that a cached endpoint misses once and then hits
    Cache(CacheArgs),

    /// Run the CRUD suites against the API
    Crud(CrudArgs),
}

#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Base URL of the API server
    #[arg(env = BASE_URL_ENV, default_value = DEFAULT_CACHE_BASE_URL)]
    pub base_url: String,

    /// Cached endpoint to exercise
    #[arg(long, value_enum, default_value_t = CacheTargetArg::Paket)]
    pub target: CacheTargetArg,

    /// `limit` query parameter for the paket target
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,

    /// Number of sequential requests
    #[arg(short = 'n', long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub requests: u32,

    /// Pause between requests (e.g. 1s, 250ms)
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub delay: Duration,

    /// Per-request timeout
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Health path requested before the run starts
    #[arg(long, default_value = DEFAULT_HEALTH_PATH)]
    pub health_path: String,

    /// Successful requests needed for the run to pass
    #[arg(long, default_value_t = DEFAULT_MIN_SUCCESSES)]
    pub min_successes: usize,

    /// Where the raw results are written
    #[arg(long, default_value = DEFAULT_RESULTS_FILE)]
    pub results_file: PathBuf,

    /// Do not write the results file
    #[arg(long)]
    pub no_save: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct CrudArgs {
    /// Port of the API server on HOST
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Host of the API server (defaults to localhost)
    pub host: Option<String>,

    /// Full base URL; takes precedence over PORT/HOST
    #[arg(long)]
    pub url: Option<String>,

    /// Suite to run
    #[arg(long, value_enum, default_value_t = SuiteArg::All)]
    pub suite: SuiteArg,

    /// Per-request timeout
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Pause between suites when running all of them
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub suite_pause: Duration,

    /// Never ask for host/port interactively
    #[arg(long)]
    pub no_prompt: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("paketprobe").chain(args.iter().copied()))
    }

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn durations_accept_units_and_bare_seconds() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("2"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn cache_defaults() -> Result<(), clap::Error> {
        let cli = parse(&["cache", "http://localhost:4000"])?;
        let Command::Cache(args) = cli.command else {
            panic!("expected cache command");
        };
        assert_eq!(args.base_url, "http://localhost:4000");
        assert_eq!(args.requests, 3);
        assert_eq!(args.delay, Duration::from_secs(1));
        assert_eq!(args.timeout, Duration::from_secs(30));
        assert_eq!(args.target, CacheTargetArg::Paket);
        assert_eq!(args.min_successes, 2);
        assert_eq!(args.results_file, PathBuf::from("cache_test_results.json"));
        assert!(!args.no_save);
        Ok(())
    }

    #[test]
    fn zero_requests_is_a_usage_error() {
        let err = parse(&["cache", "--requests", "0"]).err();
        assert!(err.is_some());
    }

    #[test]
    fn crud_positional_port_and_host() -> Result<(), clap::Error> {
        let cli = parse(&["-v", "crud", "8080", "api.local", "--suite", "users"])?;
        assert!(cli.verbose);
        let Command::Crud(args) = cli.command else {
            panic!("expected crud command");
        };
        assert_eq!(args.port, Some(8080));
        assert_eq!(args.host.as_deref(), Some("api.local"));
        assert_eq!(args.suite.kind(), Some(SuiteKind::Users));
        assert_eq!(args.timeout, Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn crud_compatibility_suite_is_selectable() -> Result<(), clap::Error> {
        let cli = parse(&["crud", "--suite", "compatibility"])?;
        let Command::Crud(args) = cli.command else {
            panic!("expected crud command");
        };
        assert_eq!(args.suite.kind(), Some(SuiteKind::Compatibility));
        Ok(())
    }

    #[test]
    fn crud_rejects_bad_port() {
        assert!(parse(&["crud", "70000"]).is_err());
        assert!(parse(&["crud", "0"]).is_err());
        assert!(parse(&["crud", "abc"]).is_err());
    }
}
