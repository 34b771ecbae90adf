//! Time-limited, single-flight cache in front of a history store
//!
//! Concurrent requests for the same source share one in-flight fetch. Fetched
//! records are reused until the time-to-live runs out; failures are never
//! cached.

use crate::error::HistoryError;
use crate::history::store::HistoricalGameStore;
use crate::types::HistoricalGameRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct CachedHistory {
    games: Vec<HistoricalGameRecord>,
    fetched_at: Instant,
}

type Slot = Arc<tokio::sync::Mutex<Option<CachedHistory>>>;

/// Caching wrapper for any [`HistoricalGameStore`]
pub struct CachedHistoryStore {
    inner: Arc<dyn HistoricalGameStore>,
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl CachedHistoryStore {
    pub fn new(inner: Arc<dyn HistoricalGameStore>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the cached records of one source
    pub fn invalidate(&self, source_key: &str) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.remove(source_key);
        }
    }

    fn slot(&self, source_key: &str) -> Result<Slot, HistoryError> {
        let mut slots = self.slots.lock().map_err(|_| HistoryError::Unavailable {
            source_key: source_key.to_string(),
            reason: "Failed to acquire history cache lock".to_string(),
        })?;
        Ok(slots.entry(source_key.to_string()).or_default().clone())
    }
}

#[async_trait]
impl HistoricalGameStore for CachedHistoryStore {
    async fn fetch(&self, source_key: &str) -> Result<Vec<HistoricalGameRecord>, HistoryError> {
        let slot = self.slot(source_key)?;

        // Held across the fetch so later callers wait for this one
        let mut cached = slot.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!(
                    "History cache hit - source: '{}', games: {}",
                    source_key,
                    entry.games.len()
                );
                return Ok(entry.games.clone());
            }
        }

        debug!("History cache miss - source: '{}'", source_key);
        let games = self.inner.fetch(source_key).await?;
        *cached = Some(CachedHistory {
            games: games.clone(),
            fetched_at: Instant::now(),
        });
        Ok(games)
    }
}
