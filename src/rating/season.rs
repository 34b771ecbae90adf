//! Season windows over historical games
//!
//! A season keeps only games played within its cutoff and ranks only the
//! participants who played enough of those games.

use crate::config::RatingConfig;
use crate::types::{HistoricalGameRecord, ParticipantId};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};

/// Recency and activity filter over historical games
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonWindow {
    /// Games older than this many days are ignored; `None` keeps everything
    pub cutoff_days: Option<i64>,
    /// Games a participant needs inside the window to be active
    pub minimum_games: usize,
}

/// Games and active participants selected by a [`SeasonWindow`]
#[derive(Debug, Clone, Default)]
pub struct SeasonSelection<'a> {
    pub games: Vec<&'a HistoricalGameRecord>,
    pub active: BTreeSet<ParticipantId>,
}

impl SeasonWindow {
    pub fn new(cutoff_days: Option<i64>, minimum_games: usize) -> Self {
        Self {
            cutoff_days,
            minimum_games,
        }
    }

    /// The rolling season from the rating configuration
    pub fn current(config: &RatingConfig) -> Self {
        Self::new(
            Some(config.season_length_days),
            config.season_placement_games,
        )
    }

    /// Every game ever played, no placement requirement
    pub fn all_time() -> Self {
        Self::new(None, 0)
    }

    pub fn is_all_time(&self) -> bool {
        self.cutoff_days.is_none() && self.minimum_games == 0
    }

    /// Filter `games` to this window as seen at `now`
    pub fn select<'a>(
        &self,
        games: &'a [HistoricalGameRecord],
        now: DateTime<Utc>,
    ) -> SeasonSelection<'a> {
        let selected: Vec<&HistoricalGameRecord> = match self.cutoff_days {
            // Cutoffs too long to represent keep every game
            Some(days) => match Duration::try_days(days) {
                Some(cutoff) => games
                    .iter()
                    .filter(|g| now.signed_duration_since(g.played_at) < cutoff)
                    .collect(),
                None => games.iter().collect(),
            },
            None => games.iter().collect(),
        };

        let mut played: HashMap<ParticipantId, usize> = HashMap::new();
        for game in &selected {
            for participant in game.participants() {
                *played.entry(*participant).or_insert(0) += 1;
            }
        }

        let active = played
            .into_iter()
            .filter(|(_, count)| *count >= self.minimum_games)
            .map(|(participant, _)| participant)
            .collect();

        SeasonSelection {
            games: selected,
            active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(days_ago: i64, one: &[ParticipantId], two: &[ParticipantId]) -> HistoricalGameRecord {
        HistoricalGameRecord {
            played_at: Utc::now() - Duration::days(days_ago),
            team_one: one.iter().copied().collect(),
            team_one_score: 1200,
            team_two: two.iter().copied().collect(),
            team_two_score: 900,
        }
    }

    #[test]
    fn test_current_window_filters_old_games() {
        let games = vec![game(1, &[1], &[2]), game(10, &[1], &[3]), game(200, &[4], &[5])];
        let window = SeasonWindow::new(Some(120), 0);
        let selection = window.select(&games, Utc::now());

        assert_eq!(selection.games.len(), 2);
        assert_eq!(selection.active, [1, 2, 3].into_iter().collect());
    }

    #[test]
    fn test_placement_threshold() {
        let games = vec![
            game(1, &[1, 2], &[3, 4]),
            game(2, &[1, 3], &[2, 4]),
            game(3, &[1, 4], &[2, 5]),
        ];
        let window = SeasonWindow::new(Some(120), 3);
        let selection = window.select(&games, Utc::now());

        assert_eq!(selection.games.len(), 3);
        assert_eq!(selection.active, [1, 2].into_iter().collect());
    }

    #[test]
    fn test_too_few_recent_games_leaves_no_active_participants() {
        let games = vec![game(1, &[1], &[2]), game(2, &[1], &[2]), game(300, &[1], &[2])];
        let current = SeasonWindow::current(&RatingConfig::default());
        assert!(current.select(&games, Utc::now()).active.is_empty());

        let all_time = SeasonWindow::all_time().select(&games, Utc::now());
        assert_eq!(all_time.games.len(), 3);
        assert_eq!(all_time.active, [1, 2].into_iter().collect());
    }

    #[test]
    fn test_unrepresentable_cutoff_keeps_everything() {
        let games = vec![game(1, &[1], &[2]), game(5000, &[1], &[2])];
        let selection = SeasonWindow::new(Some(i64::MAX), 0).select(&games, Utc::now());
        assert_eq!(selection.games.len(), 2);
    }

    #[test]
    fn test_empty_history() {
        let selection = SeasonWindow::all_time().select(&[], Utc::now());
        assert!(selection.games.is_empty());
        assert!(selection.active.is_empty());
        assert!(SeasonWindow::all_time().is_all_time());
    }
}
