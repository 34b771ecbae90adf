//! Historical game data for skill ratings
//!
//! This module defines the history store interface, the CSV sheet store,
//! an in-memory store and a TTL cache with single-flight fetching.

pub mod cache;
pub mod sheet;
pub mod store;

// Re-export commonly used types
pub use cache::CachedHistoryStore;
pub use sheet::{parse_history_csv, CsvHistoryStore, CsvLocation};
pub use store::{HistoricalGameStore, InMemoryHistoryStore};
