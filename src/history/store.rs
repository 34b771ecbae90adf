//! Historical game store interface and the in-memory implementation

use crate::error::HistoryError;
use crate::types::HistoricalGameRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Source of raw historical team-outcome records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoricalGameStore: Send + Sync {
    /// Fetch every record for `source_key`
    ///
    /// Malformed rows are skipped by the implementation; only a failure to
    /// reach or identify the source is an error.
    async fn fetch(&self, source_key: &str) -> Result<Vec<HistoricalGameRecord>, HistoryError>;
}

/// In-memory history store
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    sources: RwLock<HashMap<String, Vec<HistoricalGameRecord>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the records of one source
    pub fn insert(&self, source_key: impl Into<String>, games: Vec<HistoricalGameRecord>) {
        if let Ok(mut sources) = self.sources.write() {
            sources.insert(source_key.into(), games);
        }
    }

    /// Append one record to a source, creating it if needed
    pub fn push(&self, source_key: &str, game: HistoricalGameRecord) {
        if let Ok(mut sources) = self.sources.write() {
            sources.entry(source_key.to_string()).or_default().push(game);
        }
    }
}

#[async_trait]
impl HistoricalGameStore for InMemoryHistoryStore {
    async fn fetch(&self, source_key: &str) -> Result<Vec<HistoricalGameRecord>, HistoryError> {
        let sources = self.sources.read().map_err(|_| HistoryError::Unavailable {
            source_key: source_key.to_string(),
            reason: "Failed to acquire history read lock".to_string(),
        })?;

        sources
            .get(source_key)
            .cloned()
            .ok_or_else(|| HistoryError::Unrankable {
                source_key: source_key.to_string(),
                reason: "no such history source".to_string(),
            })
    }
}
