use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Stable, machine-readable failure class recorded next to `ERROR` outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HttpTransportErrorKind {
    InvalidUrl,
    UnsupportedScheme,
    InvalidRequest,
    Connect,
    Request,
    Timeout,
    BodyRead,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url `{0}`")]
    InvalidUrl(String),

    #[error("unsupported scheme in `{0}` (expected http:// or https://)")]
    UnsupportedScheme(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No connection could be established (refused, unreachable, connect timeout).
    #[error("cannot connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    BodyRead(#[from] hyper::Error),
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl Error {
    /// Splits hyper client failures into connect and request errors.
    pub(crate) fn from_client(url: &str, err: hyper_util::client::legacy::Error) -> Self {
        if err.is_connect() {
            let reason = std::error::Error::source(&err)
                .map_or_else(|| err.to_string(), ToString::to_string);
            return Self::Connect {
                url: url.to_string(),
                reason,
            };
        }
        Self::Request {
            url: url.to_string(),
            source: err,
        }
    }

    #[must_use]
    pub fn transport_error_kind(&self) -> HttpTransportErrorKind {
        match self {
            Self::InvalidUrl(_) => HttpTransportErrorKind::InvalidUrl,
            Self::UnsupportedScheme(_) => HttpTransportErrorKind::UnsupportedScheme,
            Self::InvalidRequest(_) => HttpTransportErrorKind::InvalidRequest,
            Self::Connect { .. } => HttpTransportErrorKind::Connect,
            Self::Request { .. } => HttpTransportErrorKind::Request,
            Self::Timeout(_) => HttpTransportErrorKind::Timeout,
            Self::BodyRead(_) => HttpTransportErrorKind::BodyRead,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_uses_milliseconds() {
        let err = Error::Timeout(Duration::from_millis(300));
        assert_eq!(err.to_string(), "request timed out after 300ms");
        assert_eq!(err.transport_error_kind().to_string(), "timeout");
    }
}
