//! Cache verification: a strictly sequential burst of identical GETs against a
//! cached endpoint, followed by classification of the observed cache statuses.

mod driver;
mod outcome;
mod persist;
mod verifier;

pub use driver::{
    CacheCheckConfig, CacheDriver, CacheRun, CacheTarget, DEFAULT_HEALTH_PATH, OutcomeFn,
};
pub use outcome::{CacheStatus, NOT_AVAILABLE, RecordCounts, RequestOutcome};
pub use persist::{DEFAULT_RESULTS_FILE, ResultsFile};
pub use verifier::{
    CacheVerdict, DEFAULT_MIN_SUCCESSES, Improvement, LatencyStats, RunSummary, classify,
};
