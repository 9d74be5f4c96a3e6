use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] paketprobe_http::Error),

    #[error("server not reachable at {url}: {reason}")]
    Connectivity { url: String, reason: String },

    #[error("invalid base url `{0}` (expected http:// or https://)")]
    InvalidBaseUrl(String),

    #[error("invalid port `{0}` (expected 1-65535)")]
    InvalidPort(String),

    #[error("`requests` must be a positive integer")]
    InvalidRequestCount,

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write results file `{}`: {source}", path.display())]
    WriteResults {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read results file `{}`: {source}", path.display())]
    ReadResults {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("results file `{}` is not valid: {source}", path.display())]
    ParseResults {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
