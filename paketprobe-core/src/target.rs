//! Base URL resolution for both commands.
//!
//! Resolution is pure: callers pass in whatever the command line and the
//! environment supplied, and get back the URL together with where it came from.
//! Interactive prompting is left to the binary.

use crate::{Error, Result};

pub const BASE_URL_ENV: &str = "PAKETPROBE_BASE_URL";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_CACHE_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_CRUD_PORT: u16 = 3001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TargetSource {
    Flag,
    Positional,
    Env,
    Prompt,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub base_url: String,
    pub source: TargetSource,
}

/// Raw inputs, highest precedence first.
#[derive(Debug, Clone, Default)]
pub struct TargetInputs {
    /// Full base URL given with a flag (or as the cache command's positional).
    pub url: Option<String>,
    pub port: Option<String>,
    pub host: Option<String>,
    pub env_url: Option<String>,
}

/// Applies flag > positional port/host > env precedence.
///
/// Returns `Ok(None)` when nothing was supplied; the caller then prompts or
/// falls back to a default.
pub fn resolve(inputs: &TargetInputs) -> Result<Option<ResolvedTarget>> {
    if let Some(url) = non_empty(inputs.url.as_deref()) {
        return Ok(Some(ResolvedTarget {
            base_url: normalize_base_url(url)?,
            source: TargetSource::Flag,
        }));
    }

    if let Some(port) = non_empty(inputs.port.as_deref()) {
        let host = non_empty(inputs.host.as_deref()).unwrap_or(DEFAULT_HOST);
        return Ok(Some(ResolvedTarget {
            base_url: base_url_from_host_port(host, port)?,
            source: TargetSource::Positional,
        }));
    }

    if let Some(url) = non_empty(inputs.env_url.as_deref()) {
        return Ok(Some(ResolvedTarget {
            base_url: normalize_base_url(url)?,
            source: TargetSource::Env,
        }));
    }

    Ok(None)
}

pub fn default_target(base_url: &str) -> ResolvedTarget {
    ResolvedTarget {
        base_url: base_url.trim_end_matches('/').to_string(),
        source: TargetSource::Default,
    }
}

pub fn default_crud_base_url() -> String {
    format!("http://{DEFAULT_HOST}:{DEFAULT_CRUD_PORT}")
}

/// Validates scheme and host and strips trailing slashes.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = url::Url::parse(trimmed).map_err(|_| Error::InvalidBaseUrl(raw.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Error::InvalidBaseUrl(raw.to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

pub fn base_url_from_host_port(host: &str, port: &str) -> Result<String> {
    let port_num = port
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| Error::InvalidPort(port.to_string()))?;
    normalize_base_url(&format!("http://{}:{port_num}", host.trim()))
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}
