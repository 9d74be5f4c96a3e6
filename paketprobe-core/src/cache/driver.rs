use std::sync::Arc;
use std::time::{Duration, Instant};

use paketprobe_http::{HttpClient, HttpRequest, HttpResponse};
use serde_json::Value;

use super::outcome::{RecordCounts, RequestOutcome};
use crate::{Error, Result};

pub const DEFAULT_HEALTH_PATH: &str = "/api/health";

/// Called with each outcome as soon as it is recorded.
pub type OutcomeFn = Arc<dyn Fn(&RequestOutcome) + Send + Sync + 'static>;

/// Cached endpoint under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTarget {
    /// `GET /api/paket?limit=N`
    Paket { limit: u32 },
    /// `GET /api/stats`
    Stats,
}

impl Default for CacheTarget {
    fn default() -> Self {
        Self::Paket { limit: 10 }
    }
}

impl CacheTarget {
    pub fn path_and_query(&self) -> String {
        match self {
            Self::Paket { limit } => format!("/api/paket?limit={limit}"),
            Self::Stats => "/api/stats".to_string(),
        }
    }

    /// Record counts shown next to each request; anything unparseable counts as zero.
    pub fn record_counts(&self, body: &Value) -> RecordCounts {
        let num = |v: Option<&Value>| v.and_then(Value::as_u64).unwrap_or(0);
        match self {
            Self::Paket { .. } => RecordCounts {
                returned: body
                    .get("data")
                    .and_then(Value::as_array)
                    .map_or(0, |rows| rows.len() as u64),
                total: num(body.pointer("/pagination/total")),
            },
            Self::Stats => RecordCounts {
                returned: num(body.get("thisMonthCount")),
                total: num(body.get("totalTender")),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheCheckConfig {
    pub base_url: String,
    pub target: CacheTarget,
    pub requests: u32,
    /// Pause between consecutive requests (none after the last).
    pub delay: Duration,
    pub timeout: Duration,
    pub health_path: String,
    pub health_timeout: Duration,
}

impl Default for CacheCheckConfig {
    fn default() -> Self {
        Self {
            base_url: crate::target::DEFAULT_CACHE_BASE_URL.to_string(),
            target: CacheTarget::default(),
            requests: 3,
            delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            health_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheRun {
    pub base_url: String,
    /// Full URL of the cached endpoint.
    pub endpoint: String,
    pub outcomes: Vec<RequestOutcome>,
}

#[derive(Debug, Clone)]
pub struct CacheDriver {
    client: HttpClient,
    config: CacheCheckConfig,
}

impl CacheDriver {
    pub fn new(client: HttpClient, config: CacheCheckConfig) -> Result<Self> {
        if config.requests == 0 {
            return Err(Error::InvalidRequestCount);
        }
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CacheCheckConfig {
        &self.config
    }

    pub fn endpoint_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url,
            self.config.target.path_and_query()
        )
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.config.base_url, self.config.health_path)
    }

    /// Single health request; anything but a 200 (with a non-false `success`
    /// flag when the body is JSON) is a connectivity failure.
    pub async fn check_health(&self) -> Result<()> {
        let url = self.health_url();
        let req = HttpRequest::get(url.clone()).with_timeout(self.config.health_timeout);

        let res = self
            .client
            .request(req)
            .await
            .map_err(|err| Error::Connectivity {
                url: url.clone(),
                reason: err.to_string(),
            })?;

        if res.status != 200 {
            return Err(Error::Connectivity {
                url,
                reason: format!("health check returned status {}", res.status),
            });
        }

        let reported_failure = serde_json::from_slice::<Value>(&res.body)
            .ok()
            .and_then(|body| body.get("success").and_then(Value::as_bool))
            == Some(false);
        if reported_failure {
            return Err(Error::Connectivity {
                url,
                reason: "health check reported success=false".to_string(),
            });
        }

        tracing::debug!(url = %url, "health check passed");
        Ok(())
    }

    /// Checks server health, then issues the configured number of requests one at a time.
    ///
    /// Per-request failures are recorded as outcomes; only the health check can fail the run.
    pub async fn run(&self, observer: Option<OutcomeFn>) -> Result<CacheRun> {
        self.check_health().await?;

        let endpoint = self.endpoint_url();
        let total = self.config.requests;
        let mut outcomes = Vec::with_capacity(total as usize);

        for seq in 1..=total {
            let outcome = self.request_once(seq, &endpoint).await;
            if let Some(observer) = &observer {
                observer(&outcome);
            }
            outcomes.push(outcome);

            if seq < total && !self.config.delay.is_zero() {
                tokio::time::sleep(self.config.delay).await;
            }
        }

        Ok(CacheRun {
            base_url: self.config.base_url.clone(),
            endpoint,
            outcomes,
        })
    }

    async fn request_once(&self, seq: u32, endpoint: &str) -> RequestOutcome {
        let req = HttpRequest::get(endpoint).with_timeout(self.config.timeout);
        let started = Instant::now();
        let res = self.client.request(req).await;
        let elapsed = started.elapsed();

        match res {
            Ok(res) => {
                let counts = self.counts_for(&res);
                let outcome = RequestOutcome::from_response(seq, elapsed, &res, counts);
                tracing::debug!(
                    seq,
                    status = outcome.status_code,
                    cache = %outcome.cache_status,
                    latency_ms = outcome.latency_ms,
                    "cache request completed"
                );
                outcome
            }
            Err(err) => {
                tracing::warn!(
                    seq,
                    kind = %err.transport_error_kind(),
                    error = %err,
                    "cache request failed"
                );
                RequestOutcome::transport_failure(seq, elapsed, &err)
            }
        }
    }

    fn counts_for(&self, res: &HttpResponse) -> RecordCounts {
        if res.status != 200 {
            return RecordCounts::default();
        }
        match serde_json::from_slice::<Value>(&res.body) {
            Ok(body) => self.config.target.record_counts(&body),
            Err(err) => {
                tracing::debug!(error = %err, "response body is not json");
                RecordCounts::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paket_counts_come_from_data_and_pagination() {
        let body = json!({
            "success": true,
            "data": [{"id": 1}, {"id": 2}],
            "pagination": {"total": 42, "page": 1, "limit": 10},
        });
        let counts = CacheTarget::Paket { limit: 10 }.record_counts(&body);
        assert_eq!(counts, RecordCounts { returned: 2, total: 42 });
    }

    #[test]
    fn stats_counts_come_from_tender_fields() {
        let body = json!({"totalTender": 1200, "thisMonthCount": 35});
        let counts = CacheTarget::Stats.record_counts(&body);
        assert_eq!(counts, RecordCounts { returned: 35, total: 1200 });
    }

    #[test]
    fn malformed_bodies_count_as_zero() {
        let counts = CacheTarget::default().record_counts(&json!({"data": "nope"}));
        assert_eq!(counts, RecordCounts::default());
    }

    #[test]
    fn zero_requests_are_rejected() {
        let config = CacheCheckConfig {
            requests: 0,
            ..CacheCheckConfig::default()
        };
        assert!(matches!(
            CacheDriver::new(HttpClient::default(), config),
            Err(Error::InvalidRequestCount)
        ));
    }

    #[test]
    fn urls_are_built_from_base_and_target() {
        let config = CacheCheckConfig {
            base_url: "http://127.0.0.1:3000".to_string(),
            target: CacheTarget::Paket { limit: 5 },
            ..CacheCheckConfig::default()
        };
        let driver = CacheDriver::new(HttpClient::default(), config)
            .unwrap_or_else(|e| panic!("driver: {e}"));
        assert_eq!(driver.endpoint_url(), "http://127.0.0.1:3000/api/paket?limit=5");
        assert_eq!(driver.health_url(), "http://127.0.0.1:3000/api/health");
    }
}
