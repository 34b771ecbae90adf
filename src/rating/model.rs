//! Skill rating model fitted from historical team outcomes
//!
//! Each qualifying game becomes one regression row: +1 for participants on
//! team one, −1 for team two, 0 otherwise, regressed onto the normalized
//! score differential. Rows are weighted by total game score and by an
//! exponential age decay. The fitted coefficients are z-scored and mapped
//! onto the rating scale.
//!
//! The fit carries an intercept, which absorbs any bias towards whichever
//! team a history lists first. Only the per-participant coefficients become
//! ratings.

use crate::config::RatingConfig;
use crate::rating::regression::{DesignMatrix, RegressionSolver, WeightedLeastSquares};
use crate::rating::season::{SeasonSelection, SeasonWindow};
use crate::types::{HistoricalGameRecord, ParticipantId, RatingMap};
use crate::utils::{days_since, mean, sample_std_dev};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ratings for one history, with the lookup chain used for balancing
#[derive(Debug, Clone, Default)]
pub struct RatingBook {
    current: RatingMap,
    all_time: RatingMap,
    default_rating: i64,
}

impl RatingBook {
    pub fn new(current: RatingMap, all_time: RatingMap, default_rating: i64) -> Self {
        Self {
            current,
            all_time,
            default_rating,
        }
    }

    /// Current-season rating, else all-time rating, else none
    pub fn get(&self, participant: &ParticipantId) -> Option<i64> {
        self.current
            .get(participant)
            .or_else(|| self.all_time.get(participant))
            .copied()
    }

    /// Like [`RatingBook::get`] but unrated participants get the neutral default
    pub fn rating_for(&self, participant: &ParticipantId) -> i64 {
        self.get(participant).unwrap_or(self.default_rating)
    }

    pub fn current(&self) -> &RatingMap {
        &self.current
    }

    pub fn all_time(&self) -> &RatingMap {
        &self.all_time
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.all_time.is_empty()
    }
}

/// Regression-based skill rating model
#[derive(Debug, Clone)]
pub struct SkillRatingModel {
    config: RatingConfig,
    solver: Arc<dyn RegressionSolver>,
}

impl SkillRatingModel {
    pub fn new(config: RatingConfig) -> Self {
        let solver = Arc::new(WeightedLeastSquares::new(config.ridge));
        Self { config, solver }
    }

    pub fn with_solver(config: RatingConfig, solver: Arc<dyn RegressionSolver>) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// The rolling season for this model's configuration
    pub fn current_season(&self) -> SeasonWindow {
        SeasonWindow::current(&self.config)
    }

    /// Ratings for `window`, falling back to all-time when nobody is active
    ///
    /// Never fails: no data or a degenerate fit yields an empty map.
    pub fn ratings(
        &self,
        games: &[HistoricalGameRecord],
        window: &SeasonWindow,
        now: DateTime<Utc>,
    ) -> RatingMap {
        let selection = window.select(games, now);
        if selection.active.is_empty() && !window.is_all_time() {
            info!(
                "No active participants in season window {:?}, falling back to all-time",
                window
            );
            return self.fit(&SeasonWindow::all_time().select(games, now), now);
        }
        self.fit(&selection, now)
    }

    /// Current-season and all-time ratings together
    pub fn rating_book(&self, games: &[HistoricalGameRecord], now: DateTime<Utc>) -> RatingBook {
        let current = self.ratings(games, &self.current_season(), now);
        let all_time = self.ratings(games, &SeasonWindow::all_time(), now);
        RatingBook::new(current, all_time, self.config.baseline)
    }

    /// Fit one selection with no fallback
    pub fn fit(&self, selection: &SeasonSelection<'_>, now: DateTime<Utc>) -> RatingMap {
        let participants: Vec<ParticipantId> = selection.active.iter().copied().collect();
        if participants.is_empty() || selection.games.is_empty() {
            debug!("Nothing to rate - games: {}", selection.games.len());
            return RatingMap::new();
        }

        let design = self.design_matrix(&selection.games, &participants);
        let target: Vec<f64> = selection
            .games
            .iter()
            .map(|g| g.normalized_differential())
            .collect();
        let weights: Vec<f64> = selection
            .games
            .iter()
            .map(|g| self.game_weight(g, now))
            .collect();

        let fit = match self.solver.solve(&design, &target, &weights) {
            Ok(fit) => fit,
            Err(e) => {
                warn!(
                    "Rating fit skipped - games: {}, participants: {}, reason: {}",
                    selection.games.len(),
                    participants.len(),
                    e
                );
                return RatingMap::new();
            }
        };

        let ratings = self.normalize(&participants, &fit.coefficients);
        debug!(
            "Fitted ratings - games: {}, participants: {}, rated: {}, intercept: {:.4}",
            selection.games.len(),
            participants.len(),
            ratings.len(),
            fit.intercept
        );
        ratings
    }

    /// Row weight: total game score scaled by `0.5 ^ (age / half-life)`
    pub fn game_weight(&self, game: &HistoricalGameRecord, now: DateTime<Utc>) -> f64 {
        let age_days = days_since(game.played_at, now);
        let decay = 0.5_f64.powf(age_days / self.config.half_life_days);
        decay * game.total_score()
    }

    fn design_matrix(
        &self,
        games: &[&HistoricalGameRecord],
        participants: &[ParticipantId],
    ) -> DesignMatrix {
        let mut design = DesignMatrix::zeros(games.len(), participants.len());
        for (row, game) in games.iter().enumerate() {
            for (col, participant) in participants.iter().enumerate() {
                design.set(row, col, game.team_modifier(participant));
            }
        }
        design
    }

    fn normalize(&self, participants: &[ParticipantId], coefficients: &[f64]) -> RatingMap {
        let (Some(average), Some(std_dev)) = (mean(coefficients), sample_std_dev(coefficients))
        else {
            warn!("Cannot normalize fewer than two coefficients");
            return RatingMap::new();
        };
        if !(std_dev > f64::EPSILON) || !std_dev.is_finite() {
            warn!("Fitted coefficients have no spread, ratings are undefined");
            return RatingMap::new();
        }

        participants
            .iter()
            .zip(coefficients)
            .map(|(participant, coefficient)| {
                let z = (coefficient - average) / std_dev;
                let rating = (z * self.config.scale + self.config.baseline as f64) as i64;
                (*participant, rating)
            })
            .collect()
    }
}

impl Default for SkillRatingModel {
    fn default() -> Self {
        Self::new(RatingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegressionError;
    use crate::rating::regression::RegressionFit;
    use chrono::Duration;

    fn game(
        days_ago: i64,
        one: &[ParticipantId],
        one_score: u32,
        two: &[ParticipantId],
        two_score: u32,
    ) -> HistoricalGameRecord {
        HistoricalGameRecord {
            played_at: Utc::now() - Duration::days(days_ago),
            team_one: one.iter().copied().collect(),
            team_one_score: one_score,
            team_two: two.iter().copied().collect(),
            team_two_score: two_score,
        }
    }

    #[test]
    fn test_dominant_team_rates_higher() {
        let games: Vec<_> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    game(i, &[1, 2, 3, 4], 3000, &[5, 6, 7, 8], 1000)
                } else {
                    game(i, &[5, 6, 7, 8], 900, &[1, 2, 3, 4], 2700)
                }
            })
            .collect();

        let model = SkillRatingModel::default();
        let ratings = model.ratings(&games, &model.current_season(), Utc::now());
        assert_eq!(ratings.len(), 8);

        let weakest_winner = [1, 2, 3, 4].iter().map(|p| ratings[p]).min().unwrap();
        let strongest_loser = [5, 6, 7, 8].iter().map(|p| ratings[p]).max().unwrap();
        assert!(weakest_winner > strongest_loser);
    }

    #[test]
    fn test_ratings_centered_on_baseline() {
        let games = vec![
            game(1, &[1, 2], 300, &[3, 4], 100),
            game(2, &[1, 3], 250, &[2, 4], 150),
            game(3, &[1, 4], 220, &[2, 3], 180),
            game(4, &[2, 3], 100, &[1, 4], 300),
        ];
        let model = SkillRatingModel::default();
        let ratings = model.ratings(&games, &SeasonWindow::all_time(), Utc::now());

        let average = ratings.values().sum::<i64>() as f64 / ratings.len() as f64;
        assert!((average - 2500.0).abs() < 2.0, "average {}", average);
        assert!(ratings[&1] > ratings[&4]);
    }

    #[test]
    fn test_older_games_weigh_less() {
        // Same line-up, opposite results; only the dates differ
        let recent_win = vec![
            game(1, &[1, 2], 800, &[3, 4], 200),
            game(2, &[3, 4], 200, &[1, 2], 800),
            game(90, &[1, 2], 200, &[3, 4], 800),
            game(91, &[3, 4], 800, &[1, 2], 200),
        ];
        let old_win = vec![
            game(90, &[1, 2], 800, &[3, 4], 200),
            game(91, &[3, 4], 200, &[1, 2], 800),
            game(1, &[1, 2], 200, &[3, 4], 800),
            game(2, &[3, 4], 800, &[1, 2], 200),
        ];

        let model = SkillRatingModel::default();
        let now = Utc::now();
        let a = model.ratings(&recent_win, &SeasonWindow::all_time(), now);
        let b = model.ratings(&old_win, &SeasonWindow::all_time(), now);

        assert!(a[&1] > a[&3]);
        assert!(b[&1] < b[&3]);
    }

    #[test]
    fn test_listing_order_does_not_inflate_ratings() {
        // Results follow y = 0.5 + 0.1 * x4: team one always wins, and wins
        // bigger with participant 4. Participant 1 is listed first in five
        // of the six games but contributes nothing.
        let games = vec![
            game(1, &[1, 2], 70, &[3, 4], 30),
            game(2, &[1, 3], 70, &[2, 4], 30),
            game(3, &[1, 4], 80, &[2, 3], 20),
            game(4, &[1, 2], 70, &[3, 4], 30),
            game(5, &[1, 4], 80, &[2, 3], 20),
            game(6, &[2, 3], 70, &[1, 4], 30),
        ];
        let model = SkillRatingModel::default();
        let ratings = model.ratings(&games, &model.current_season(), Utc::now());
        assert_eq!(ratings.len(), 4);

        assert!(ratings[&4] > ratings[&1] + 1000);
        for participant in [2, 3] {
            assert!((ratings[&participant] - ratings[&1]).abs() <= 2);
        }
    }

    #[test]
    fn test_game_weight_half_life() {
        let model = SkillRatingModel::default();
        let now = Utc::now();
        let fresh = HistoricalGameRecord {
            played_at: now,
            ..game(0, &[1], 600, &[2], 400)
        };
        let aged = HistoricalGameRecord {
            played_at: now - Duration::days(60),
            ..fresh.clone()
        };

        assert!((model.game_weight(&fresh, now) - 1000.0).abs() < 1e-9);
        assert!((model.game_weight(&aged, now) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_history_is_empty() {
        let model = SkillRatingModel::default();
        assert!(model
            .ratings(&[], &model.current_season(), Utc::now())
            .is_empty());
        assert!(model.rating_book(&[], Utc::now()).is_empty());
    }

    #[test]
    fn test_single_game_is_degenerate() {
        let model = SkillRatingModel::default();
        let games = vec![game(1, &[1, 2], 300, &[3, 4], 100)];
        assert!(model
            .ratings(&games, &SeasonWindow::all_time(), Utc::now())
            .is_empty());
    }

    #[test]
    fn test_falls_back_to_all_time() {
        // Two recent games: below the three placement games of the season
        let games = vec![
            game(1, &[1, 2], 300, &[3, 4], 100),
            game(2, &[2, 4], 100, &[1, 3], 300),
            game(400, &[1, 4], 300, &[2, 3], 100),
        ];
        let model = SkillRatingModel::default();
        let now = Utc::now();

        let season = model.current_season().select(&games, now);
        assert!(season.active.is_empty());

        let ratings = model.ratings(&games, &model.current_season(), now);
        assert_eq!(ratings.len(), 4);
        assert!(ratings[&1] > ratings[&4]);
    }

    #[test]
    fn test_rating_book_lookup_chain() {
        let current: RatingMap = [(1, 3000)].into_iter().collect();
        let all_time: RatingMap = [(1, 2000), (2, 2200)].into_iter().collect();
        let book = RatingBook::new(current, all_time, 2500);

        assert_eq!(book.rating_for(&1), 3000);
        assert_eq!(book.rating_for(&2), 2200);
        assert_eq!(book.rating_for(&3), 2500);
        assert_eq!(book.get(&3), None);
    }

    #[derive(Debug)]
    struct FailingSolver;

    impl RegressionSolver for FailingSolver {
        fn solve(
            &self,
            _design: &DesignMatrix,
            _target: &[f64],
            _weights: &[f64],
        ) -> Result<RegressionFit, RegressionError> {
            Err(RegressionError::NonFinite)
        }
    }

    #[test]
    fn test_solver_failure_is_recovered() {
        let model = SkillRatingModel::with_solver(RatingConfig::default(), Arc::new(FailingSolver));
        let games = vec![
            game(1, &[1, 2], 300, &[3, 4], 100),
            game(2, &[1, 3], 300, &[2, 4], 100),
        ];
        assert!(model
            .ratings(&games, &SeasonWindow::all_time(), Utc::now())
            .is_empty());
    }
}
