//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for match enumeration, sequence
//! caching, rating fits and history fetches.

use crate::matchmaking::session::SessionStats;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the matchmaking engine
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Enumeration and sequence metrics
    matchmaking_metrics: MatchmakingMetrics,

    /// Rating model metrics
    rating_metrics: RatingMetrics,

    /// History store metrics
    history_metrics: HistoryMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Enumeration and sequence metrics
#[derive(Clone)]
pub struct MatchmakingMetrics {
    /// Total matches produced by the partition generator
    pub matches_enumerated_total: IntCounter,

    /// Ordered sequences built, by strategy
    pub sequences_built_total: IntCounterVec,

    /// Cached sequences discarded after a roster change
    pub sequence_invalidations_total: IntCounter,

    /// Draws by outcome (match, exhausted, not_enough_participants)
    pub draws_total: IntCounterVec,

    /// Participants on the current roster
    pub roster_size: IntGauge,
}

/// Rating model metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Fits by outcome (fitted, fallback, empty)
    pub rating_fits_total: IntCounterVec,

    /// Participants rated by the latest fit
    pub rated_participants: IntGauge,

    /// Rating distribution of the latest fit
    pub rating_distribution: Histogram,
}

/// History store metrics
#[derive(Clone)]
pub struct HistoryMetrics {
    /// Fetches by outcome (success, unavailable, unrankable)
    pub history_fetches_total: IntCounterVec,

    /// Records returned by the latest fetch
    pub history_records: IntGauge,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Partition enumeration time
    pub enumeration_duration: Histogram,

    /// Rating fit time
    pub rating_fit_duration: Histogram,

    /// Ordering time by strategy
    pub ordering_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let matchmaking_metrics = MatchmakingMetrics::new(&registry)?;
        let rating_metrics = RatingMetrics::new(&registry)?;
        let history_metrics = HistoryMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            matchmaking_metrics,
            rating_metrics,
            history_metrics,
            performance_metrics,
        })
    }

    pub fn matchmaking(&self) -> &MatchmakingMetrics {
        &self.matchmaking_metrics
    }

    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    pub fn history(&self) -> &HistoryMetrics {
        &self.history_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Update gauges from session stats
    pub fn update_from_session_stats(&self, stats: &SessionStats) {
        self.matchmaking_metrics
            .roster_size
            .set(stats.roster_size as i64);
    }

    /// Record one partition enumeration
    pub fn record_enumeration(&self, matches: usize, duration: Duration) {
        self.matchmaking_metrics
            .matches_enumerated_total
            .inc_by(matches as u64);

        self.performance_metrics
            .enumeration_duration
            .observe(duration.as_secs_f64());
    }

    /// Record an ordered sequence being built
    pub fn record_sequence_built(&self, strategy: &str, duration: Duration) {
        self.matchmaking_metrics
            .sequences_built_total
            .with_label_values(&[strategy])
            .inc();

        self.performance_metrics
            .ordering_duration
            .with_label_values(&[strategy])
            .observe(duration.as_secs_f64());
    }

    /// Record cached sequences being discarded
    pub fn record_invalidation(&self, discarded: usize) {
        self.matchmaking_metrics
            .sequence_invalidations_total
            .inc_by(discarded as u64);
    }

    /// Record one draw from a sequence
    pub fn record_draw(&self, outcome: &str) {
        self.matchmaking_metrics
            .draws_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a rating fit
    pub fn record_rating_fit(&self, outcome: &str, ratings: &[i64], duration: Duration) {
        self.rating_metrics
            .rating_fits_total
            .with_label_values(&[outcome])
            .inc();

        self.rating_metrics
            .rated_participants
            .set(ratings.len() as i64);

        for rating in ratings {
            self.rating_metrics
                .rating_distribution
                .observe(*rating as f64);
        }

        self.performance_metrics
            .rating_fit_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a history fetch
    pub fn record_history_fetch(&self, outcome: &str, records: usize) {
        self.history_metrics
            .history_fetches_total
            .with_label_values(&[outcome])
            .inc();

        if outcome == "success" {
            self.history_metrics.history_records.set(records as i64);
        }
    }

    /// Render every registered metric in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl MatchmakingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_enumerated_total = IntCounter::new(
            "team_shuffle_matches_enumerated_total",
            "Total matches produced by enumeration",
        )?;
        registry.register(Box::new(matches_enumerated_total.clone()))?;

        let sequences_built_total = IntCounterVec::new(
            Opts::new(
                "team_shuffle_sequences_built_total",
                "Ordered match sequences built",
            ),
            &["strategy"],
        )?;
        registry.register(Box::new(sequences_built_total.clone()))?;

        let sequence_invalidations_total = IntCounter::new(
            "team_shuffle_sequence_invalidations_total",
            "Cached sequences discarded after roster changes",
        )?;
        registry.register(Box::new(sequence_invalidations_total.clone()))?;

        let draws_total = IntCounterVec::new(
            Opts::new("team_shuffle_draws_total", "Draws by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(draws_total.clone()))?;

        let roster_size =
            IntGauge::new("team_shuffle_roster_size", "Participants on the roster")?;
        registry.register(Box::new(roster_size.clone()))?;

        Ok(Self {
            matches_enumerated_total,
            sequences_built_total,
            sequence_invalidations_total,
            draws_total,
            roster_size,
        })
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rating_fits_total = IntCounterVec::new(
            Opts::new("team_shuffle_rating_fits_total", "Rating fits by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(rating_fits_total.clone()))?;

        let rated_participants = IntGauge::new(
            "team_shuffle_rated_participants",
            "Participants rated by the latest fit",
        )?;
        registry.register(Box::new(rated_participants.clone()))?;

        let rating_distribution = Histogram::with_opts(
            HistogramOpts::new(
                "team_shuffle_rating_distribution",
                "Fitted rating distribution",
            )
            .buckets(vec![
                1000.0, 1500.0, 2000.0, 2250.0, 2500.0, 2750.0, 3000.0, 3500.0, 4000.0,
            ]),
        )?;
        registry.register(Box::new(rating_distribution.clone()))?;

        Ok(Self {
            rating_fits_total,
            rated_participants,
            rating_distribution,
        })
    }
}

impl HistoryMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let history_fetches_total = IntCounterVec::new(
            Opts::new(
                "team_shuffle_history_fetches_total",
                "History fetches by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(history_fetches_total.clone()))?;

        let history_records = IntGauge::new(
            "team_shuffle_history_records",
            "Records returned by the latest history fetch",
        )?;
        registry.register(Box::new(history_records.clone()))?;

        Ok(Self {
            history_fetches_total,
            history_records,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let enumeration_duration = Histogram::with_opts(
            HistogramOpts::new(
                "team_shuffle_enumeration_duration_seconds",
                "Partition enumeration time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(enumeration_duration.clone()))?;

        let rating_fit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "team_shuffle_rating_fit_duration_seconds",
                "Rating fit time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(rating_fit_duration.clone()))?;

        let ordering_duration = HistogramVec::new(
            HistogramOpts::new(
                "team_shuffle_ordering_duration_seconds",
                "Match ordering time",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["strategy"],
        )?;
        registry.register(Box::new(ordering_duration.clone()))?;

        Ok(Self {
            enumeration_duration,
            rating_fit_duration,
            ordering_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _matchmaking = collector.matchmaking();
        let _rating = collector.rating();
        let _history = collector.history();
        let _performance = collector.performance();
    }

    #[test]
    fn test_enumeration_and_draws() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_enumeration(35, Duration::from_micros(120));
        collector.record_sequence_built("random", Duration::from_millis(1));
        collector.record_draw("match");
        collector.record_draw("match");
        collector.record_draw("exhausted");
        collector.record_invalidation(2);

        let matchmaking = collector.matchmaking();
        assert_eq!(matchmaking.matches_enumerated_total.get(), 35);
        assert_eq!(matchmaking.draws_total.with_label_values(&["match"]).get(), 2);
        assert_eq!(matchmaking.sequence_invalidations_total.get(), 2);
    }

    #[test]
    fn test_rating_and_history_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_rating_fit("fitted", &[2400, 2600], Duration::from_micros(50));
        collector.record_history_fetch("success", 12);
        collector.record_history_fetch("unavailable", 0);

        assert_eq!(collector.rating().rated_participants.get(), 2);
        assert_eq!(collector.history().history_records.get(), 12);
    }

    #[test]
    fn test_gather_text() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        collector.record_enumeration(1, Duration::from_micros(1));

        let text = collector.gather_text().unwrap();
        assert!(text.contains("team_shuffle_matches_enumerated_total 1"));
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}
