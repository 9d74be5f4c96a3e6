use std::net::SocketAddr;

use anyhow::Context as _;
use paketprobe_testserver::{CacheMode, TestServerOptions, TestServerStats};
use tokio::net::TcpListener;
use tokio::time::Duration;

const USAGE: &str = "paketprobe-testserver

USAGE:
  paketprobe-testserver [--bind 127.0.0.1:0] [--no-cache | --no-cache-headers]
                        [--health-status 200] [--stall-request N] [--stall-ms 5000]

OUTPUT:
  Prints HTTP_URL=<url> to stdout once ready.";

#[derive(Debug)]
struct ServerArgs {
    bind: SocketAddr,
    options: TestServerOptions,
}

/// `Ok(None)` when help was requested.
fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<ServerArgs>> {
    let mut parsed = ServerArgs {
        bind: SocketAddr::from(([127, 0, 0, 1], 0)),
        options: TestServerOptions::default(),
    };

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--bind" => {
                parsed.bind = value("--bind")?.parse().context("invalid --bind address")?;
            }
            "--no-cache" => parsed.options.cache_mode = CacheMode::Disabled,
            "--no-cache-headers" => parsed.options.cache_mode = CacheMode::NoHeaders,
            "--health-status" => {
                parsed.options.health_status = value("--health-status")?
                    .parse()
                    .context("invalid --health-status")?;
            }
            "--stall-request" => {
                let n: u64 = value("--stall-request")?
                    .parse()
                    .context("invalid --stall-request")?;
                parsed.options.stall_request = Some(n);
            }
            "--stall-ms" => {
                let ms: u64 = value("--stall-ms")?.parse().context("invalid --stall-ms")?;
                parsed.options.stall_for = Duration::from_millis(ms);
            }
            "-h" | "--help" => return Ok(None),
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Some(parsed))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args(std::env::args().skip(1))? else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    let addr = listener.local_addr()?;
    let app = paketprobe_testserver::router(args.options, TestServerStats::default());

    println!("HTTP_URL=http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Option<ServerArgs>> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn failure_injection_flags() -> anyhow::Result<()> {
        let args = parse(&["--no-cache-headers", "--stall-request", "2", "--stall-ms", "750"])?
            .context("expected args")?;
        assert_eq!(args.options.cache_mode, CacheMode::NoHeaders);
        assert_eq!(args.options.stall_request, Some(2));
        assert_eq!(args.options.stall_for, Duration::from_millis(750));
        assert_eq!(args.bind.port(), 0);
        Ok(())
    }

    #[test]
    fn help_and_errors() {
        assert!(matches!(parse(&["--help"]), Ok(None)));
        assert!(parse(&["--bind"]).is_err());
        assert!(parse(&["--health-status", "abc"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
    }
}
