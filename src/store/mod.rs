//! Suite and result persistence
//!
//! The engine only sees the [`SuiteStore`] trait; the file-backed store is
//! the default for the CLI and the in-memory store backs tests.

#![allow(dead_code)]

mod file;

pub use file::FileStore;

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{SuiteStatus, TestResults, TestSuite};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("suite not found: {id}")]
    SuiteNotFound { id: String },

    #[error("results not found: {id}")]
    ResultsNotFound { id: String },

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// System of record for suites between runs
#[async_trait]
pub trait SuiteStore: Send + Sync {
    async fn save(&self, suite: &TestSuite) -> Result<(), StoreError>;

    async fn load(&self, id: &str) -> Result<TestSuite, StoreError>;

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<TestSuite>, StoreError>;

    async fn update_status(&self, id: &str, status: SuiteStatus) -> Result<(), StoreError>;

    async fn save_results(&self, results: &TestResults) -> Result<(), StoreError>;

    async fn load_results(&self, id: &str) -> Result<TestResults, StoreError>;
}

/// In-memory store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    suites: RwLock<HashMap<String, TestSuite>>,
    results: RwLock<HashMap<String, TestResults>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SuiteStore for MemoryStore {
    async fn save(&self, suite: &TestSuite) -> Result<(), StoreError> {
        self.suites
            .write()
            .await
            .insert(suite.id.clone(), suite.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<TestSuite, StoreError> {
        self.suites
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::SuiteNotFound { id: id.to_string() })
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<TestSuite>, StoreError> {
        let mut suites: Vec<TestSuite> = self
            .suites
            .read()
            .await
            .values()
            .filter(|s| s.owner == owner)
            .cloned()
            .collect();
        suites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(suites)
    }

    async fn update_status(&self, id: &str, status: SuiteStatus) -> Result<(), StoreError> {
        let mut suites = self.suites.write().await;
        let suite = suites
            .get_mut(id)
            .ok_or_else(|| StoreError::SuiteNotFound { id: id.to_string() })?;
        suite.status = status;
        suite.updated_at = Utc::now();
        Ok(())
    }

    async fn save_results(&self, results: &TestResults) -> Result<(), StoreError> {
        self.results
            .write()
            .await
            .insert(results.id.clone(), results.clone());
        Ok(())
    }

    async fn load_results(&self, id: &str) -> Result<TestResults, StoreError> {
        self.results
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ResultsNotFound { id: id.to_string() })
    }
}

/// Store wrapper that fails every write; exercises best-effort persistence.
#[cfg(test)]
pub struct FailingResultsStore {
    pub inner: MemoryStore,
}

#[cfg(test)]
#[async_trait]
impl SuiteStore for FailingResultsStore {
    async fn save(&self, suite: &TestSuite) -> Result<(), StoreError> {
        self.inner.save(suite).await
    }

    async fn load(&self, id: &str) -> Result<TestSuite, StoreError> {
        self.inner.load(id).await
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<TestSuite>, StoreError> {
        self.inner.list_by_owner(owner).await
    }

    async fn update_status(&self, id: &str, status: SuiteStatus) -> Result<(), StoreError> {
        self.inner.update_status(id, status).await
    }

    async fn save_results(&self, _results: &TestResults) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk on fire")))
    }

    async fn load_results(&self, id: &str) -> Result<TestResults, StoreError> {
        self.inner.load_results(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TargetType;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let suite = TestSuite::new("alice", "smoke", TargetType::Agent, "agent-1");
        store.save(&suite).await.unwrap();

        let loaded = store.load(&suite.id).await.unwrap();
        assert_eq!(loaded.name, "smoke");

        store
            .update_status(&suite.id, SuiteStatus::Ready)
            .await
            .unwrap();
        assert_eq!(
            store.load(&suite.id).await.unwrap().status,
            SuiteStatus::Ready
        );
    }

    #[tokio::test]
    async fn missing_suite_is_not_found() {
        let store = MemoryStore::new();
        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::SuiteNotFound { .. }));
    }

    #[tokio::test]
    async fn list_by_owner_filters() {
        let store = MemoryStore::new();
        store
            .save(&TestSuite::new("alice", "a", TargetType::Agent, "t"))
            .await
            .unwrap();
        store
            .save(&TestSuite::new("bob", "b", TargetType::Persona, "t"))
            .await
            .unwrap();

        let alices = store.list_by_owner("alice").await.unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].name, "a");
        assert!(store.list_by_owner("carol").await.unwrap().is_empty());
    }
}
