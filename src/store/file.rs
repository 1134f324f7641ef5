//! JSON file-backed suite store
//!
//! Persists suites and run results as pretty-printed JSON under a base
//! directory, one file per record.

use async_trait::async_trait;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{StoreError, SuiteStore};
use crate::models::{SuiteStatus, TestResults, TestSuite};

/// File layout:
///
/// ```text
/// <base>/suites/<suite_id>.json
/// <base>/results/<results_id>.json
/// ```
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Store rooted in the platform data directory
    pub fn default_dir() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("suiterun");
        Self::new(base_dir)
    }

    fn suites_dir(&self) -> PathBuf {
        self.base_dir.join("suites")
    }

    fn results_dir(&self) -> PathBuf {
        self.base_dir.join("results")
    }

    fn suite_path(&self, id: &str) -> PathBuf {
        self.suites_dir().join(format!("{id}.json"))
    }

    fn results_path(&self, id: &str) -> PathBuf {
        self.results_dir().join(format!("{id}.json"))
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, value)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Latest stored results for a suite, if any
    pub fn latest_results(&self, suite_id: &str) -> Result<Option<TestResults>, StoreError> {
        let dir = self.results_dir();
        if !dir.exists() {
            return Ok(None);
        }

        let mut latest: Option<TestResults> = None;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match Self::read_json::<TestResults>(&path) {
                    Ok(results) if results.suite_id == suite_id => {
                        let newer = latest
                            .as_ref()
                            .map(|l| results.started_at > l.started_at)
                            .unwrap_or(true);
                        if newer {
                            latest = Some(results);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("skipping unreadable results file {}: {e}", path.display());
                    }
                }
            }
        }

        Ok(latest)
    }

    /// Export one run's case results as CSV
    pub fn export_csv(&self, results: &TestResults, path: &Path) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::other)?;

        writer
            .write_record(["case_id", "name", "status", "duration_ms", "error"])
            .map_err(std::io::Error::other)?;

        for case in &results.case_results {
            writer
                .write_record([
                    case.case_id.clone(),
                    case.name.clone(),
                    case.status.to_string(),
                    case.duration_ms.to_string(),
                    case.error.clone().unwrap_or_default(),
                ])
                .map_err(std::io::Error::other)?;
        }
        writer.flush()?;

        info!("Exported results to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl SuiteStore for FileStore {
    async fn save(&self, suite: &TestSuite) -> Result<(), StoreError> {
        let path = self.suite_path(&suite.id);
        Self::write_json(&path, suite)?;
        debug!("Saved suite to {}", path.display());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<TestSuite, StoreError> {
        let path = self.suite_path(id);
        if !path.exists() {
            return Err(StoreError::SuiteNotFound { id: id.to_string() });
        }
        Self::read_json(&path)
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<TestSuite>, StoreError> {
        let dir = self.suites_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut suites = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match Self::read_json::<TestSuite>(&path) {
                    Ok(suite) if suite.owner == owner => suites.push(suite),
                    Ok(_) => {}
                    Err(e) => {
                        warn!("skipping unreadable suite file {}: {e}", path.display());
                    }
                }
            }
        }

        suites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(suites)
    }

    async fn update_status(&self, id: &str, status: SuiteStatus) -> Result<(), StoreError> {
        let mut suite = self.load(id).await?;
        suite.status = status;
        suite.updated_at = chrono::Utc::now();
        self.save(&suite).await
    }

    async fn save_results(&self, results: &TestResults) -> Result<(), StoreError> {
        let path = self.results_path(&results.id);
        Self::write_json(&path, results)?;
        info!("Saved test results to {}", path.display());
        Ok(())
    }

    async fn load_results(&self, id: &str) -> Result<TestResults, StoreError> {
        let path = self.results_path(id);
        if !path.exists() {
            return Err(StoreError::ResultsNotFound { id: id.to_string() });
        }
        Self::read_json(&path)
    }
}
