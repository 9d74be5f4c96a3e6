//! CRUD check suites against a running API.
//!
//! Each suite is a fixed sequence of calls. Every check becomes a [`StepResult`];
//! rendering is left to the caller (optionally live, through a [`StepFn`]).

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::api::{ApiClient, ApiReply};
use crate::{Error, Result};

mod compatibility;
mod favorites;
mod paket;
mod users;

pub use favorites::SAMPLE_MD5_HASHES;

pub const DEFAULT_SUITE_PAUSE: Duration = Duration::from_secs(1);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SuiteKind {
    Paket,
    Users,
    Favorites,
    Compatibility,
}

impl SuiteKind {
    pub const ALL: [SuiteKind; 4] = [
        Self::Paket,
        Self::Users,
        Self::Favorites,
        Self::Compatibility,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Paket => "Paket CRUD",
            Self::Users => "User CRUD",
            Self::Favorites => "Favorites CRUD",
            Self::Compatibility => "Compatibility",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub name: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StepResult {
    pub fn check(
        name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        passed: bool,
    ) -> Self {
        Self {
            name: name.into(),
            expected: expected.into(),
            actual: actual.into(),
            passed,
            detail: None,
        }
    }

    pub fn expect_success(name: impl Into<String>, reply: &ApiReply) -> Self {
        Self::check(name, "success", reply.describe(), reply.success())
    }

    pub fn expect_failure(name: impl Into<String>, reply: &ApiReply) -> Self {
        Self::check(name, "failure", reply.describe(), !reply.success())
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    pub suite: SuiteKind,
    pub steps: Vec<StepResult>,
    /// Set when the suite stopped early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl SuiteReport {
    pub fn total(&self) -> usize {
        self.steps.len()
    }

    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|s| s.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.aborted.is_none() && self.passed() == self.total()
    }

    pub fn success_percent(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.passed() as f64 / self.total() as f64 * 100.0
    }
}

/// Called with each step as soon as it is recorded.
pub type StepFn = Arc<dyn Fn(SuiteKind, &StepResult) + Send + Sync + 'static>;

/// Reason a suite stopped before its last step.
#[derive(Debug)]
pub(crate) struct Aborted(String);

pub(crate) struct Recorder {
    suite: SuiteKind,
    steps: Vec<StepResult>,
    observer: Option<StepFn>,
}

impl Recorder {
    fn new(suite: SuiteKind, observer: Option<StepFn>) -> Self {
        Self {
            suite,
            steps: Vec::new(),
            observer,
        }
    }

    pub(crate) fn record(&mut self, step: StepResult) -> bool {
        tracing::debug!(suite = %self.suite, step = %step.name, passed = step.passed, "step recorded");
        if let Some(observer) = &self.observer {
            observer(self.suite, &step);
        }
        let passed = step.passed;
        self.steps.push(step);
        passed
    }

    /// Unwraps a call result; a transport error fails the step and stops the suite.
    pub(crate) fn call<T>(&mut self, name: &str, res: Result<T>) -> std::result::Result<T, Aborted> {
        res.map_err(|err| self.abort(name, err.to_string()))
    }

    pub(crate) fn abort(&mut self, name: &str, reason: impl Into<String>) -> Aborted {
        let reason = reason.into();
        tracing::warn!(suite = %self.suite, step = name, %reason, "suite aborted");
        self.record(StepResult::check(name, "completed call", reason.clone(), false));
        Aborted(reason)
    }

    fn finish(self, outcome: std::result::Result<(), Aborted>) -> SuiteReport {
        SuiteReport {
            suite: self.suite,
            steps: self.steps,
            aborted: outcome.err().map(|Aborted(reason)| reason),
        }
    }
}

/// Suffix that keeps generated emails and hashes unique across runs.
pub(crate) fn run_stamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn data_len(reply: &ApiReply) -> usize {
    reply.data().as_array().map_or(0, Vec::len)
}

pub async fn run_suite(client: &ApiClient, kind: SuiteKind, observer: Option<StepFn>) -> SuiteReport {
    tracing::debug!(suite = %kind, base_url = client.base_url(), "running suite");
    let mut rec = Recorder::new(kind, observer);
    let outcome = match kind {
        SuiteKind::Paket => paket::run(client, &mut rec).await,
        SuiteKind::Users => users::run(client, &mut rec).await,
        SuiteKind::Favorites => favorites::run(client, &mut rec).await,
        SuiteKind::Compatibility => compatibility::run(client, &mut rec).await,
    };
    rec.finish(outcome)
}

/// Fails unless `GET /health` answers with `success: true`.
pub async fn health_gate(client: &ApiClient) -> Result<()> {
    let url = format!("{}/health", client.base_url());
    match client.health().await {
        Ok(reply) if reply.success() => Ok(()),
        Ok(reply) => Err(Error::Connectivity {
            url,
            reason: format!("health check failed: {}", reply.describe()),
        }),
        Err(err) => Err(Error::Connectivity {
            url,
            reason: err.to_string(),
        }),
    }
}

/// Health gate, then every suite in order with `pause` between them.
pub async fn run_all(
    client: &ApiClient,
    pause: Duration,
    observer: Option<StepFn>,
) -> Result<Vec<SuiteReport>> {
    health_gate(client).await?;

    let mut reports = Vec::with_capacity(SuiteKind::ALL.len());
    for (i, kind) in SuiteKind::ALL.into_iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        reports.push(run_suite(client, kind, observer.clone()).await);
    }
    Ok(reports)
}
