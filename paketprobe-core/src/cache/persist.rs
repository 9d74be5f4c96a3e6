use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::driver::CacheRun;
use super::outcome::RequestOutcome;
use crate::{Error, Result};

pub const DEFAULT_RESULTS_FILE: &str = "cache_test_results.json";

/// On-disk record of one cache run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsFile {
    pub test_time: DateTime<Utc>,
    pub server_url: String,
    pub endpoint: String,
    pub results: Vec<RequestOutcome>,
}

impl ResultsFile {
    pub fn new(run: &CacheRun, test_time: DateTime<Utc>) -> Self {
        Self {
            test_time,
            server_url: run.base_url.clone(),
            endpoint: run.endpoint.clone(),
            results: run.outcomes.clone(),
        }
    }

    /// Writes pretty JSON, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_err = |source| Error::WriteResults {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|err| write_err(std::io::Error::other(err)))?;
        writer.write_all(b"\n").map_err(write_err)?;
        writer.flush().map_err(write_err)?;

        tracing::debug!(path = %path.display(), results = self.results.len(), "saved cache results");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::ReadResults {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::ParseResults {
            path: path.to_path_buf(),
            source,
        })
    }
}
