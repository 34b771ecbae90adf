//! Ordering strategies for enumerated matches
//!
//! A strategy turns the unordered set of possible matches into the sequence
//! a session hands out. Strategies are cached by [`OrderingStrategy::key`],
//! so two strategies that would produce different sequences must report
//! different keys.

use crate::error::{MatchmakingError, Result};
use crate::history::HistoricalGameStore;
use crate::metrics::MetricsCollector;
use crate::rating::{RatingBook, SkillRatingModel};
use crate::types::Match;
use crate::utils::{current_timestamp, mean, spread};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Trait for ordering a set of matches into a draw sequence
#[async_trait]
pub trait OrderingStrategy: Send + Sync {
    /// Short strategy name, used as a metrics label
    fn name(&self) -> &'static str;

    /// Cache key for sequences built by this strategy
    fn key(&self) -> String;

    /// Put `matches` in the order they should be handed out
    async fn order(&self, matches: Vec<Match>) -> Result<Vec<Match>>;
}

/// Uniform random permutation
#[derive(Debug, Clone, Default)]
pub struct RandomOrdering {
    seed: Option<u64>,
}

impl RandomOrdering {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reproducible ordering for a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

#[async_trait]
impl OrderingStrategy for RandomOrdering {
    fn name(&self) -> &'static str {
        "random"
    }

    fn key(&self) -> String {
        "random".to_string()
    }

    async fn order(&self, mut matches: Vec<Match>) -> Result<Vec<Match>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        matches.shuffle(&mut rng);
        debug!("Shuffled {} matches", matches.len());
        Ok(matches)
    }
}

/// Most evenly matched first, by fitted skill ratings
pub struct SkillBalancedOrdering {
    store: Arc<dyn HistoricalGameStore>,
    source_key: String,
    model: Arc<SkillRatingModel>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl SkillBalancedOrdering {
    pub fn new(
        store: Arc<dyn HistoricalGameStore>,
        source_key: impl Into<String>,
        model: Arc<SkillRatingModel>,
    ) -> Self {
        Self {
            store,
            source_key: source_key.into(),
            model,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Fetch history and fit current-season and all-time ratings
    pub async fn rating_book(&self) -> Result<RatingBook> {
        let games = match self.store.fetch(&self.source_key).await {
            Ok(games) => {
                self.record_fetch("success", games.len());
                games
            }
            Err(e) => {
                let outcome = if e.is_retryable() {
                    "unavailable"
                } else {
                    "unrankable"
                };
                self.record_fetch(outcome, 0);
                warn!("Failed to fetch history for '{}': {}", self.source_key, e);
                return Err(MatchmakingError::RankingUnavailable(e).into());
            }
        };

        let model = self.model.clone();
        let start = std::time::Instant::now();
        let book = tokio::task::spawn_blocking(move || {
            model.rating_book(&games, current_timestamp())
        })
        .await
        .map_err(|e| MatchmakingError::InternalError {
            message: format!("Rating task failed: {}", e),
        })?;

        if let Some(metrics) = &self.metrics {
            let (outcome, ratings) = if !book.current().is_empty() {
                ("fitted", book.current())
            } else if !book.all_time().is_empty() {
                ("fallback", book.all_time())
            } else {
                ("empty", book.current())
            };
            let values: Vec<i64> = ratings.values().copied().collect();
            metrics.record_rating_fit(outcome, &values, start.elapsed());
        }

        info!(
            "Fitted ratings for '{}' - current: {}, all-time: {}",
            self.source_key,
            book.current().len(),
            book.all_time().len()
        );
        Ok(book)
    }

    fn record_fetch(&self, outcome: &str, records: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.record_history_fetch(outcome, records);
        }
    }
}

#[async_trait]
impl OrderingStrategy for SkillBalancedOrdering {
    fn name(&self) -> &'static str {
        "skill_balanced"
    }

    fn key(&self) -> String {
        format!("skill_balanced:{}", self.source_key)
    }

    async fn order(&self, mut matches: Vec<Match>) -> Result<Vec<Match>> {
        let book = self.rating_book().await?;
        sort_by_balance(&mut matches, &book);
        Ok(matches)
    }
}

/// Spread between the strongest and weakest team's mean rating
///
/// Lower is more even. Benched participants do not count.
pub fn balance_score(m: &Match, book: &RatingBook) -> f64 {
    let team_means: Vec<f64> = m
        .teams()
        .filter_map(|team| {
            let ratings: Vec<f64> = team.iter().map(|p| book.rating_for(p) as f64).collect();
            mean(&ratings)
        })
        .collect();
    spread(&team_means)
}

/// Stable sort, most even first
pub fn sort_by_balance(matches: &mut [Match], book: &RatingBook) {
    let mut scored: Vec<(f64, Match)> = matches
        .iter()
        .map(|m| (balance_score(m, book), m.clone()))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    for (slot, (_, m)) in matches.iter_mut().zip(scored) {
        *slot = m;
    }
}
