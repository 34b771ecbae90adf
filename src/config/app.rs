//! Main application configuration
//!
//! This module defines the primary configuration structures for the team-shuffle
//! engine, including environment variable and TOML file loading and validation.

use crate::config::rating::RatingConfig;
use crate::types::TeamSizeSpec;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
    pub history: HistorySettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Where historical game records come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Directory holding one `<source>.csv` file per history source
    pub directory: Option<PathBuf>,
    /// CSV export URL with a `{source}` placeholder
    pub url_template: Option<String>,
    /// How long fetched history is reused, in seconds
    pub cache_ttl_seconds: u64,
    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Team capacities used when a session does not name its own
    pub default_team_sizes: Vec<usize>,
    /// Shrink capacities round-robin when the roster is short
    pub distribute_evenly: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "team-shuffle".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            directory: None,
            url_template: None,
            cache_ttl_seconds: 1800, // 30 minutes
            request_timeout_seconds: 30,
        }
    }
}

impl HistorySettings {
    /// HTTP request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            default_team_sizes: vec![4, 4],
            distribute_evenly: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Rating settings
        if let Ok(half_life) = env::var("RATING_HALF_LIFE_DAYS") {
            self.rating.half_life_days = half_life
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_HALF_LIFE_DAYS value: {}", half_life))?;
        }
        if let Ok(baseline) = env::var("RATING_BASELINE") {
            self.rating.baseline = baseline
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_BASELINE value: {}", baseline))?;
        }
        if let Ok(scale) = env::var("RATING_SCALE") {
            self.rating.scale = scale
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_SCALE value: {}", scale))?;
        }
        if let Ok(days) = env::var("SEASON_LENGTH_DAYS") {
            self.rating.season_length_days = days
                .parse()
                .map_err(|_| anyhow!("Invalid SEASON_LENGTH_DAYS value: {}", days))?;
        }
        if let Ok(games) = env::var("SEASON_PLACEMENT_GAMES") {
            self.rating.season_placement_games = games
                .parse()
                .map_err(|_| anyhow!("Invalid SEASON_PLACEMENT_GAMES value: {}", games))?;
        }

        // History settings
        if let Ok(dir) = env::var("HISTORY_DIR") {
            self.history.directory = Some(PathBuf::from(dir));
        }
        if let Ok(template) = env::var("HISTORY_URL_TEMPLATE") {
            self.history.url_template = Some(template);
        }
        if let Ok(ttl) = env::var("HISTORY_CACHE_TTL_SECONDS") {
            self.history.cache_ttl_seconds = ttl
                .parse()
                .map_err(|_| anyhow!("Invalid HISTORY_CACHE_TTL_SECONDS value: {}", ttl))?;
        }
        if let Ok(timeout) = env::var("HISTORY_REQUEST_TIMEOUT_SECONDS") {
            self.history.request_timeout_seconds = timeout.parse().map_err(|_| {
                anyhow!("Invalid HISTORY_REQUEST_TIMEOUT_SECONDS value: {}", timeout)
            })?;
        }

        // Matchmaking settings
        if let Ok(sizes) = env::var("DEFAULT_TEAM_SIZES") {
            self.matchmaking.default_team_sizes = parse_team_sizes(&sizes)
                .map_err(|_| anyhow!("Invalid DEFAULT_TEAM_SIZES value: {}", sizes))?;
        }
        if let Ok(distribute) = env::var("DISTRIBUTE_EVENLY") {
            self.matchmaking.distribute_evenly = distribute
                .parse()
                .map_err(|_| anyhow!("Invalid DISTRIBUTE_EVENLY value: {}", distribute))?;
        }

        Ok(())
    }

    /// Get history cache time-to-live as Duration
    pub fn history_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.history.cache_ttl_seconds)
    }

    /// Default team sizes as a validated spec
    pub fn default_team_sizes(&self) -> Result<TeamSizeSpec> {
        TeamSizeSpec::new(self.matchmaking.default_team_sizes.clone())
    }
}

/// Parse a comma separated capacity list such as `4,4`
pub fn parse_team_sizes(value: &str) -> Result<Vec<usize>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| anyhow!("Invalid team size: {}", s))
        })
        .collect()
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate rating settings
    if !(config.rating.half_life_days > 0.0) {
        return Err(anyhow!("Rating half-life must be positive"));
    }
    if !(config.rating.scale > 0.0) {
        return Err(anyhow!("Rating scale must be positive"));
    }
    if !(1..=RatingConfig::MAX_SEASON_LENGTH_DAYS).contains(&config.rating.season_length_days) {
        return Err(anyhow!(
            "Season length must be between 1 and {} days",
            RatingConfig::MAX_SEASON_LENGTH_DAYS
        ));
    }
    if !(config.rating.ridge >= 0.0) {
        return Err(anyhow!("Ridge damping cannot be negative"));
    }

    // Validate history settings
    if let Some(template) = &config.history.url_template {
        if !template.contains("{source}") {
            return Err(anyhow!("History URL template must contain {{source}}"));
        }
    }
    if config.history.request_timeout_seconds == 0 {
        return Err(anyhow!("History request timeout must be greater than 0"));
    }

    // Validate matchmaking settings
    config.default_team_sizes()?;

    Ok(())
}
