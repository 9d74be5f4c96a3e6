use std::time::Duration;

use paketprobe_http::HttpResponse;
use serde::{Deserialize, Serialize};

pub const NOT_AVAILABLE: &str = "N/A";

pub(crate) const HEADER_CACHE_STATUS: &str = "x-cache-status";
pub(crate) const HEADER_CACHE_KEY: &str = "x-cache-key";
pub(crate) const HEADER_CACHE_TTL: &str = "x-cache-ttl";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Transport failure; no response was received.
    Error,
    /// A response arrived but the status header was absent or unrecognized.
    Unknown,
}

impl CacheStatus {
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("HIT") => Self::Hit,
            Some(v) if v.eq_ignore_ascii_case("MISS") => Self::Miss,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub returned: u64,
    pub total: u64,
}

/// One observed request of a cache run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    /// 1-based position in the run.
    pub sequence_number: u32,
    /// `0` when no response was received.
    pub status_code: u16,
    pub latency_ms: f64,
    pub cache_status: CacheStatus,
    /// `X-Cache-Status` exactly as received, or `N/A`.
    pub cache_status_raw: String,
    pub cache_key: String,
    pub cache_ttl: String,
    pub record_counts: Option<RecordCounts>,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl RequestOutcome {
    pub(crate) fn from_response(
        sequence_number: u32,
        elapsed: Duration,
        res: &HttpResponse,
        record_counts: RecordCounts,
    ) -> Self {
        let header = |name: &str| {
            res.header(name)
                .map_or_else(|| NOT_AVAILABLE.to_string(), str::to_string)
        };
        let raw_status = res.header(HEADER_CACHE_STATUS);

        Self {
            sequence_number,
            status_code: res.status,
            latency_ms: round_ms(elapsed),
            cache_status: CacheStatus::from_header(raw_status),
            cache_status_raw: raw_status.unwrap_or(NOT_AVAILABLE).to_string(),
            cache_key: header(HEADER_CACHE_KEY),
            cache_ttl: header(HEADER_CACHE_TTL),
            record_counts: Some(record_counts),
            succeeded: res.status == 200,
            error: None,
            error_kind: None,
        }
    }

    pub(crate) fn transport_failure(
        sequence_number: u32,
        elapsed: Duration,
        err: &paketprobe_http::Error,
    ) -> Self {
        Self {
            sequence_number,
            status_code: 0,
            latency_ms: round_ms(elapsed),
            cache_status: CacheStatus::Error,
            cache_status_raw: NOT_AVAILABLE.to_string(),
            cache_key: NOT_AVAILABLE.to_string(),
            cache_ttl: NOT_AVAILABLE.to_string(),
            record_counts: None,
            succeeded: false,
            error: Some(err.to_string()),
            error_kind: Some(err.transport_error_kind().to_string()),
        }
    }

    pub fn is_hit(&self) -> bool {
        self.cache_status == CacheStatus::Hit
    }
}

/// Milliseconds rounded to two decimals.
fn round_ms(elapsed: Duration) -> f64 {
    let hundredths = (elapsed.as_nanos() + 5_000) / 10_000;
    hundredths as f64 / 100.0
}
