//! Main entry point for the team-shuffle command line tool
//!
//! Enumerates team splits for a roster and prints them in random or
//! skill-balanced order, or prints a skill leaderboard for a history source.

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use team_shuffle::config::{validate_config, AppConfig};
use team_shuffle::history::{CachedHistoryStore, CsvHistoryStore, HistoricalGameStore};
use team_shuffle::matchmaking::{
    GeneratorOptions, MatchmakingSession, OrderingStrategy, RandomOrdering, SkillBalancedOrdering,
};
use team_shuffle::metrics::MetricsCollector;
use team_shuffle::rating::{leaderboard, SkillRatingModel};
use team_shuffle::types::{MatchDraw, ParticipantId, TeamSizeSpec};
use tracing::{error, info};

/// How matches are ordered before they are handed out
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Uniformly random order
    Random,
    /// Most evenly skill-matched first
    Skill,
}

/// Team Shuffle - enumerate and rank team splits
#[derive(Parser)]
#[command(
    name = "team-shuffle",
    version,
    about = "Split a roster into teams, randomly or balanced by skill",
    long_about = "Team Shuffle enumerates every way to split a roster into teams of the \
                 requested sizes and hands the matches out one at a time, either in random \
                 order or ordered by skill ratings fitted from historical game results."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Participants to split into teams
    #[arg(
        short,
        long,
        value_name = "IDS",
        value_delimiter = ',',
        allow_negative_numbers = true,
        help = "Comma separated participant ids"
    )]
    roster: Vec<ParticipantId>,

    /// Team capacities
    #[arg(
        short,
        long,
        value_name = "SIZES",
        value_delimiter = ',',
        help = "Comma separated team sizes, e.g. 4,4 (defaults to the configured sizes)"
    )]
    teams: Vec<usize>,

    /// Ordering strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Random)]
    strategy: Strategy,

    /// History directory override
    #[arg(long, value_name = "DIR", help = "Directory holding <source>.csv history files")]
    history_dir: Option<PathBuf>,

    /// History source key
    #[arg(long, value_name = "KEY", help = "History source used for skill ratings")]
    source: Option<String>,

    /// Number of matches to draw
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Seed for reproducible random ordering
    #[arg(long)]
    seed: Option<u64>,

    /// Print the leaderboard for --source instead of drawing matches
    #[arg(long)]
    leaderboard: bool,

    /// Print collected metrics before exiting
    #[arg(long)]
    print_metrics: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment, file and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(history_dir) = &args.history_dir {
        config.history.directory = Some(history_dir.clone());
    }

    if !args.teams.is_empty() {
        config.matchmaking.default_team_sizes = args.teams.clone();
    }

    validate_config(&config)?;
    Ok(config)
}

fn build_history_store(config: &AppConfig) -> Result<Arc<dyn HistoricalGameStore>> {
    let store = CsvHistoryStore::from_settings(&config.history)?;
    Ok(Arc::new(CachedHistoryStore::new(
        Arc::new(store),
        config.history_cache_ttl(),
    )))
}

fn skill_ordering(
    args: &Args,
    config: &AppConfig,
    metrics: Arc<MetricsCollector>,
) -> Result<SkillBalancedOrdering> {
    let source = args
        .source
        .clone()
        .ok_or_else(|| anyhow!("--source is required for skill ratings"))?;
    let store = build_history_store(config)?;
    let model = Arc::new(SkillRatingModel::new(config.rating.clone()));
    Ok(SkillBalancedOrdering::new(store, source, model).with_metrics(metrics))
}

async fn run_leaderboard(
    args: &Args,
    config: &AppConfig,
    metrics: Arc<MetricsCollector>,
) -> Result<()> {
    let ordering = skill_ordering(args, config, metrics)?;
    let book = ordering.rating_book().await?;
    let ratings = if book.current().is_empty() {
        book.all_time()
    } else {
        book.current()
    };

    let lobby = (!args.roster.is_empty()).then_some(args.roster.as_slice());
    let entries = leaderboard(ratings, lobby);
    if entries.is_empty() {
        println!("No ratings for '{}'", ordering.source_key());
        return Ok(());
    }

    for entry in entries {
        match entry.rating {
            Some(rating) => println!("{:>3}. {:<20} {}", entry.rank, entry.participant, rating),
            None => println!("{:>3}. {:<20} unrated", entry.rank, entry.participant),
        }
    }
    Ok(())
}

async fn run_shuffle(args: &Args, config: &AppConfig, metrics: Arc<MetricsCollector>) -> Result<()> {
    if args.roster.is_empty() {
        return Err(anyhow!("--roster is required"));
    }

    let team_sizes: TeamSizeSpec = config.default_team_sizes()?;
    let options = GeneratorOptions {
        distribute_evenly: config.matchmaking.distribute_evenly,
    };
    let session = MatchmakingSession::with_metrics(team_sizes, options, metrics.clone());
    session.update_roster(args.roster.iter().copied())?;

    let strategy: Box<dyn OrderingStrategy> = match args.strategy {
        Strategy::Random => match args.seed {
            Some(seed) => Box::new(RandomOrdering::seeded(seed)),
            None => Box::new(RandomOrdering::new()),
        },
        Strategy::Skill => Box::new(skill_ordering(args, config, metrics)?),
    };

    info!(
        "Drawing {} matches - session: {}, strategy: '{}'",
        args.count,
        session.id(),
        strategy.key()
    );

    for _ in 0..args.count {
        match session.next_match_or_random(strategy.as_ref()).await? {
            MatchDraw::Drawn { number, r#match } => println!("Match {}: {}", number, r#match),
            MatchDraw::Exhausted => {
                println!("No more matches");
                break;
            }
            MatchDraw::NotEnoughParticipants {
                available,
                required,
            } => {
                println!(
                    "Not enough participants: {} available, {} required",
                    available, required
                );
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(
        "{} v{} starting",
        config.service.name,
        team_shuffle::VERSION
    );

    let metrics = Arc::new(MetricsCollector::new()?);

    let result = if args.leaderboard {
        run_leaderboard(&args, &config, metrics.clone()).await
    } else {
        run_shuffle(&args, &config, metrics.clone()).await
    };

    if args.print_metrics {
        print!("{}", metrics.gather_text()?);
    }

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
