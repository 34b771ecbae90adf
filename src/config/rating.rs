//! Rating model configuration

use serde::{Deserialize, Serialize};

/// Tuning for the skill rating regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// A game this many days old counts half as much as one played today
    pub half_life_days: f64,
    /// Rating given to the average participant, and to unrated participants
    pub baseline: i64,
    /// Rating points per standard deviation of skill
    pub scale: f64,
    /// Length of the current season in days
    pub season_length_days: i64,
    /// Games a participant must play within the season to be ranked in it
    pub season_placement_games: usize,
    /// Relative ridge damping applied to the normal equations
    pub ridge: f64,
}

impl RatingConfig {
    /// Longest season a configuration may ask for
    pub const MAX_SEASON_LENGTH_DAYS: i64 = 36_500;
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            half_life_days: 60.0,
            baseline: 2500,
            scale: 1000.0,
            season_length_days: 120,
            season_placement_games: 3,
            ridge: 1e-6,
        }
    }
}
