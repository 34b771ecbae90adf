//! Metrics for the matchmaking engine
//!
//! Prometheus counters, gauges and histograms for enumeration, sequence
//! caching, rating fits and history fetches.

pub mod collector;

pub use collector::{
    HistoryMetrics, MatchmakingMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics,
    RatingMetrics,
};
