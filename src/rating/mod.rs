//! Skill ratings fitted from historical team outcomes
//!
//! This module provides season windows, the weighted regression behind the
//! ratings, the rating model itself and leaderboard ordering.

pub mod leaderboard;
pub mod model;
pub mod regression;
pub mod season;

// Re-export commonly used types
pub use leaderboard::{leaderboard, LeaderboardEntry};
pub use model::{RatingBook, SkillRatingModel};
pub use regression::{DesignMatrix, RegressionFit, RegressionSolver, WeightedLeastSquares};
pub use season::{SeasonSelection, SeasonWindow};
