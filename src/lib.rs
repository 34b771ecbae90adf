//! Team Shuffle - Skill-balanced team matchmaking
//!
//! This crate enumerates every way to split a roster into teams, orders the
//! resulting matches randomly or by fitted skill ratings, and hands them out
//! one at a time from a per-session cursor.

pub mod config;
pub mod error;
pub mod history;
pub mod matchmaking;
pub mod metrics;
pub mod rating;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{HistoryError, MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use history::{CachedHistoryStore, CsvHistoryStore, HistoricalGameStore};
pub use matchmaking::{
    MatchmakingSession, OrderingStrategy, PartitionGenerator, RandomOrdering,
    SkillBalancedOrdering,
};
pub use rating::{RatingBook, SkillRatingModel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
