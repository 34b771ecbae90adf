//! Configuration management for the team-shuffle engine
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{
    parse_team_sizes, validate_config, AppConfig, HistorySettings, MatchmakingSettings,
    ServiceSettings,
};
pub use rating::RatingConfig;
