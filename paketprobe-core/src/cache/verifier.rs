use serde::Serialize;

use super::outcome::{CacheStatus, RequestOutcome};

pub const DEFAULT_MIN_SUCCESSES: usize = 2;

/// Advisory reading of the observed cache statuses. Never affects pass/fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CacheVerdict {
    /// First request missed, every later one hit.
    Correct,
    /// More than one non-HIT among successful requests.
    MultipleMisses,
    /// No successful request was served from cache.
    NoHits,
    Unexpected,
}

impl CacheVerdict {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Correct => "cache is working: first request MISS, subsequent requests HIT",
            Self::MultipleMisses => "cache may not be working: more than one MISS",
            Self::NoHits => "cache is not working: no HIT responses",
            Self::Unexpected => "unexpected cache behavior",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Latency gain of the first HIT over the first MISS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Improvement {
    pub miss_ms: f64,
    pub hit_ms: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub successes: usize,
    pub hits: usize,
    /// `MISS` outcomes among successes; `UNKNOWN` counts as neither.
    pub misses: usize,
    /// `None` when nothing succeeded.
    pub latency: Option<LatencyStats>,
    pub improvement: Option<Improvement>,
    pub verdict: CacheVerdict,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[RequestOutcome]) -> Self {
        let successes: Vec<&RequestOutcome> = outcomes.iter().filter(|o| o.succeeded).collect();
        let hits = successes.iter().filter(|o| o.is_hit()).count();
        let misses = successes
            .iter()
            .filter(|o| o.cache_status == CacheStatus::Miss)
            .count();

        let latency = (!successes.is_empty()).then(|| {
            let values = successes.iter().map(|o| o.latency_ms);
            LatencyStats {
                mean_ms: values.clone().sum::<f64>() / successes.len() as f64,
                min_ms: values.clone().fold(f64::INFINITY, f64::min),
                max_ms: values.fold(f64::NEG_INFINITY, f64::max),
            }
        });

        let first_miss = successes
            .iter()
            .find(|o| o.cache_status == CacheStatus::Miss);
        let first_hit = successes.iter().find(|o| o.is_hit());
        let improvement = match (first_miss, first_hit) {
            (Some(miss), Some(hit)) if miss.latency_ms > 0.0 => Some(Improvement {
                miss_ms: miss.latency_ms,
                hit_ms: hit.latency_ms,
                percent: (miss.latency_ms - hit.latency_ms) / miss.latency_ms * 100.0,
            }),
            _ => None,
        };

        Self {
            total: outcomes.len(),
            successes: successes.len(),
            hits,
            misses,
            latency,
            improvement,
            verdict: classify(outcomes),
        }
    }

    pub fn success_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successes as f64 / self.total as f64 * 100.0
    }

    /// A run passes on successful request count alone.
    pub fn passed(&self, min_successes: usize) -> bool {
        self.successes >= min_successes
    }
}

/// Rules are checked in order; the first that matches wins.
pub fn classify(outcomes: &[RequestOutcome]) -> CacheVerdict {
    if let [first, rest @ ..] = outcomes
        && !rest.is_empty()
        && !first.is_hit()
        && rest.iter().all(RequestOutcome::is_hit)
    {
        return CacheVerdict::Correct;
    }

    let successes = outcomes.iter().filter(|o| o.succeeded);
    let non_hits = successes.clone().filter(|o| !o.is_hit()).count();
    let hits = successes.filter(|o| o.is_hit()).count();

    if non_hits > 1 {
        CacheVerdict::MultipleMisses
    } else if hits == 0 {
        CacheVerdict::NoHits
    } else {
        CacheVerdict::Unexpected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::outcome::{NOT_AVAILABLE, RecordCounts};
    use CacheStatus::{Hit, Miss, Unknown};

    fn outcome(seq: u32, status: CacheStatus, latency_ms: f64, succeeded: bool) -> RequestOutcome {
        RequestOutcome {
            sequence_number: seq,
            status_code: if succeeded { 200 } else { 0 },
            latency_ms,
            cache_status: status,
            cache_status_raw: status.to_string(),
            cache_key: "paket:list".to_string(),
            cache_ttl: NOT_AVAILABLE.to_string(),
            record_counts: Some(RecordCounts::default()),
            succeeded,
            error: None,
            error_kind: None,
        }
    }

    fn run(statuses: &[(CacheStatus, f64, bool)]) -> Vec<RequestOutcome> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, (s, l, ok))| outcome(i as u32 + 1, *s, *l, *ok))
            .collect()
    }

    #[test]
    fn miss_then_hits_is_correct_with_stats() {
        let outcomes = run(&[(Miss, 120.0, true), (Hit, 15.0, true), (Hit, 12.0, true)]);
        let summary = RunSummary::from_outcomes(&outcomes);

        assert_eq!(summary.verdict, CacheVerdict::Correct);
        assert_eq!(summary.successes, 3);
        assert_eq!(summary.hits, 2);
        assert_eq!(summary.misses, 1);

        let latency = summary.latency.unwrap_or_else(|| panic!("no latency stats"));
        assert!((latency.mean_ms - 49.0).abs() < 1e-9);
        assert!((latency.min_ms - 12.0).abs() < 1e-9);
        assert!((latency.max_ms - 120.0).abs() < 1e-9);

        let improvement = summary.improvement.unwrap_or_else(|| panic!("no improvement"));
        assert!((improvement.percent - 87.5).abs() < 1e-9);
        assert!(summary.passed(DEFAULT_MIN_SUCCESSES));
    }

    #[test]
    fn all_misses_are_multiple_misses_but_still_pass() {
        let outcomes = run(&[(Miss, 50.0, true), (Miss, 48.0, true), (Miss, 51.0, true)]);
        let summary = RunSummary::from_outcomes(&outcomes);
        assert_eq!(summary.verdict, CacheVerdict::MultipleMisses);
        assert_eq!(summary.improvement, None);
        assert!(summary.passed(2));
    }

    #[test]
    fn first_hit_is_not_correct() {
        let outcomes = run(&[(Hit, 10.0, true), (Hit, 9.0, true), (Hit, 8.0, true)]);
        assert_eq!(classify(&outcomes), CacheVerdict::Unexpected);
    }

    #[test]
    fn missing_headers_only_are_multiple_misses() {
        let outcomes = run(&[(Unknown, 10.0, true), (Unknown, 9.0, true)]);
        assert_eq!(classify(&outcomes), CacheVerdict::MultipleMisses);
    }

    #[test]
    fn unknown_statuses_are_neither_hits_nor_misses() {
        let outcomes = run(&[(Unknown, 10.0, true), (Unknown, 9.0, true), (Unknown, 8.0, true)]);
        let summary = RunSummary::from_outcomes(&outcomes);
        assert_eq!(summary.successes, 3);
        assert_eq!(summary.hits, 0);
        assert_eq!(summary.misses, 0);
        assert_eq!(summary.improvement, None);
        assert_eq!(summary.verdict, CacheVerdict::MultipleMisses);
    }

    #[test]
    fn single_miss_is_no_hits() {
        let outcomes = run(&[(Miss, 10.0, true)]);
        let summary = RunSummary::from_outcomes(&outcomes);
        assert_eq!(summary.verdict, CacheVerdict::NoHits);
        assert!(!summary.passed(2));
    }

    #[test]
    fn failed_middle_request_is_excluded_from_stats() {
        let outcomes = run(&[(Miss, 100.0, true), (CacheStatus::Error, 30_000.0, false), (Hit, 10.0, true)]);
        let summary = RunSummary::from_outcomes(&outcomes);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.successes, 2);
        assert!((summary.success_percent() - 200.0 / 3.0).abs() < 1e-9);
        let latency = summary.latency.unwrap_or_else(|| panic!("no latency stats"));
        assert!((latency.mean_ms - 55.0).abs() < 1e-9);
        assert_eq!(summary.verdict, CacheVerdict::Unexpected);
        assert!(summary.passed(2));
    }

    #[test]
    fn nothing_succeeded_has_no_average() {
        let outcomes = run(&[(CacheStatus::Error, 5.0, false), (CacheStatus::Error, 5.0, false)]);
        let summary = RunSummary::from_outcomes(&outcomes);
        assert_eq!(summary.latency, None);
        assert_eq!(summary.verdict, CacheVerdict::NoHits);
        assert!(!summary.passed(2));
    }
}
