//! Match enumeration, ordering and per-session draw sequences
//!
//! This module contains the partition generator, the ordering strategies and
//! the session that caches one ordered sequence per strategy.

pub mod ordering;
pub mod partition;
pub mod selector;
pub mod session;

// Re-export commonly used types
pub use ordering::{
    balance_score, sort_by_balance, OrderingStrategy, RandomOrdering, SkillBalancedOrdering,
};
pub use partition::{GeneratorOptions, PartitionGenerator, MIN_PARTICIPANTS};
pub use selector::MatchSelector;
pub use session::{MatchmakingSession, SessionStats, SharedSelector};
