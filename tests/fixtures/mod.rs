//! Test fixtures and mock implementations for integration testing

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use team_shuffle::error::HistoryError;
use team_shuffle::history::HistoricalGameStore;
use team_shuffle::types::{HistoricalGameRecord, ParticipantId};

/// History store that counts fetches and can be switched into a failure mode
#[derive(Debug, Default)]
pub struct CountingHistoryStore {
    games: Vec<HistoricalGameRecord>,
    failure: Mutex<Option<HistoryError>>,
    delay: Option<std::time::Duration>,
    fetches: AtomicUsize,
}

impl CountingHistoryStore {
    pub fn new(games: Vec<HistoricalGameRecord>) -> Self {
        Self {
            games,
            ..Self::default()
        }
    }

    /// Every fetch sleeps for `delay` before answering
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every following fetch fail with `error`
    pub fn fail_with(&self, error: HistoryError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }

    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoricalGameStore for CountingHistoryStore {
    async fn fetch(&self, _source_key: &str) -> Result<Vec<HistoricalGameRecord>, HistoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().ok().and_then(|f| f.clone());
        match failure {
            Some(error) => Err(error),
            None => Ok(self.games.clone()),
        }
    }
}

pub fn unavailable(source_key: &str) -> HistoryError {
    HistoryError::Unavailable {
        source_key: source_key.to_string(),
        reason: "connection reset".to_string(),
    }
}

/// One game, `days_ago` days before `now`
pub fn game(
    now: DateTime<Utc>,
    days_ago: i64,
    (team_one, team_one_score): (&[ParticipantId], u32),
    (team_two, team_two_score): (&[ParticipantId], u32),
) -> HistoricalGameRecord {
    HistoricalGameRecord {
        played_at: now - Duration::days(days_ago),
        team_one: team_one.iter().copied().collect(),
        team_one_score,
        team_two: team_two.iter().copied().collect(),
        team_two_score,
    }
}

/// Eight-player league where participant 1 is the strongest and 8 the weakest
///
/// Teams rotate through several splits and the team with the lower id sum
/// wins by a margin proportional to the strength gap.
pub fn ranked_league(now: DateTime<Utc>, days_ago: i64) -> Vec<HistoricalGameRecord> {
    let splits: [([ParticipantId; 4], [ParticipantId; 4]); 8] = [
        ([1, 2, 3, 4], [5, 6, 7, 8]),
        ([1, 3, 5, 7], [2, 4, 6, 8]),
        ([1, 4, 6, 7], [2, 3, 5, 8]),
        ([1, 2, 7, 8], [3, 4, 5, 6]),
        ([2, 4, 5, 7], [1, 3, 6, 8]),
        ([3, 4, 7, 8], [1, 2, 5, 6]),
        ([1, 2, 5, 8], [3, 4, 6, 7]),
        ([1, 6, 7, 8], [2, 3, 4, 5]),
    ];

    splits
        .iter()
        .enumerate()
        .map(|(i, (one, two))| {
            let one_sum: i64 = one.iter().sum();
            let two_sum: i64 = two.iter().sum();
            let one_score = (100 + 4 * (two_sum - one_sum)) as u32;
            let two_score = (100 + 4 * (one_sum - two_sum)) as u32;
            game(
                now,
                days_ago + i as i64,
                (one.as_slice(), one_score),
                (two.as_slice(), two_score),
            )
        })
        .collect()
}

/// Write a history sheet for `source_key` into `dir`
pub fn write_history_csv(dir: &Path, source_key: &str, games: &[HistoricalGameRecord]) {
    let mut contents = String::from("team_one,score_one,team_two,score_two,date\n");
    for game in games {
        let one: Vec<ParticipantId> = game.team_one.iter().copied().collect();
        let two: Vec<ParticipantId> = game.team_two.iter().copied().collect();
        contents.push_str(&format!(
            "\"{:?}\",{},\"{:?}\",{},{}\n",
            one,
            game.team_one_score,
            two,
            game.team_two_score,
            game.played_at.format("%m/%d/%Y")
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", source_key)), contents).unwrap();
}
