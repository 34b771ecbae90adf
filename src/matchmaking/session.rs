//! Matchmaking session with per-strategy sequence caching
//!
//! A session owns one roster and team-size spec. Each ordering strategy gets
//! its own cached sequence and cursor, keyed by [`OrderingStrategy::key`].
//! Any roster mutation bumps the roster generation and drops every cached
//! sequence; the next request rebuilds from scratch.
//!
//! Sequences are built with no lock held. When a build finishes the
//! generation is checked again, and a build made for an outdated roster is
//! discarded and retried.
//!
//! A strategy that fell back to random ordering stays on the random cursor
//! until the next roster mutation.

use crate::error::{MatchmakingError, Result};
use crate::matchmaking::ordering::{OrderingStrategy, RandomOrdering};
use crate::matchmaking::partition::{GeneratorOptions, PartitionGenerator, MIN_PARTICIPANTS};
use crate::matchmaking::selector::MatchSelector;
use crate::metrics::MetricsCollector;
use crate::types::{MatchDraw, ParticipantId, SessionId, TeamSizeSpec};
use crate::utils::generate_session_id;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// A cached sequence and its cursor
pub type SharedSelector = Arc<Mutex<MatchSelector>>;

/// Statistics about session operations
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Current number of participants on the roster
    pub roster_size: usize,
    /// Roster generation, bumped on every mutation
    pub generation: u64,
    /// Total number of sequences built
    pub sequences_built: u64,
    /// Total number of cached sequences discarded
    pub sequences_invalidated: u64,
    /// Total number of matches handed out
    pub matches_drawn: u64,
    /// Builds thrown away because the roster changed underneath them
    pub stale_builds: u64,
}

#[derive(Debug)]
struct SessionState {
    roster: BTreeSet<ParticipantId>,
    team_sizes: TeamSizeSpec,
    generation: u64,
    sequences: HashMap<String, SharedSelector>,
    /// Strategy keys currently served by the random sequence
    fallbacks: HashSet<String>,
}

/// One roster and its cached match sequences
pub struct MatchmakingSession {
    id: SessionId,
    state: RwLock<SessionState>,
    generator: PartitionGenerator,
    stats: RwLock<SessionStats>,
    metrics_collector: Arc<MetricsCollector>,
}

impl MatchmakingSession {
    /// Create a session with an empty roster
    pub fn new(team_sizes: TeamSizeSpec) -> Self {
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_metrics(team_sizes, GeneratorOptions::default(), metrics_collector)
    }

    /// Create a session with generator options and a metrics collector
    pub fn with_metrics(
        team_sizes: TeamSizeSpec,
        options: GeneratorOptions,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            id: generate_session_id(),
            state: RwLock::new(SessionState {
                roster: BTreeSet::new(),
                team_sizes,
                generation: 0,
                sequences: HashMap::new(),
                fallbacks: HashSet::new(),
            }),
            generator: PartitionGenerator::with_options(options),
            stats: RwLock::new(SessionStats::default()),
            metrics_collector,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current roster, sorted
    pub fn roster(&self) -> Result<Vec<ParticipantId>> {
        let state = self.read_state()?;
        Ok(state.roster.iter().copied().collect())
    }

    pub fn team_sizes(&self) -> Result<TeamSizeSpec> {
        Ok(self.read_state()?.team_sizes.clone())
    }

    pub fn generation(&self) -> Result<u64> {
        Ok(self.read_state()?.generation)
    }

    /// Get session statistics
    pub fn stats(&self) -> Result<SessionStats> {
        let stats = self.stats.read().map_err(|_| MatchmakingError::InternalError {
            message: "Failed to acquire stats read lock".to_string(),
        })?;
        Ok(stats.clone())
    }

    /// Replace the roster with a new snapshot
    pub fn update_roster(&self, snapshot: impl IntoIterator<Item = ParticipantId>) -> Result<()> {
        let mut state = self.write_state()?;
        state.roster = snapshot.into_iter().collect();
        info!(
            "Roster updated - session: {}, participants: {}",
            self.id,
            state.roster.len()
        );
        self.invalidate_locked(&mut state)
    }

    pub fn add_participant(&self, participant: ParticipantId) -> Result<()> {
        let mut state = self.write_state()?;
        if !state.roster.insert(participant) {
            return Err(MatchmakingError::DuplicateParticipant {
                participant_id: participant,
            }
            .into());
        }
        debug!("Participant {} joined session {}", participant, self.id);
        self.invalidate_locked(&mut state)
    }

    pub fn remove_participant(&self, participant: ParticipantId) -> Result<()> {
        let mut state = self.write_state()?;
        if !state.roster.remove(&participant) {
            return Err(MatchmakingError::ParticipantNotFound {
                participant_id: participant,
            }
            .into());
        }
        debug!("Participant {} left session {}", participant, self.id);
        self.invalidate_locked(&mut state)
    }

    pub fn set_team_sizes(&self, team_sizes: TeamSizeSpec) -> Result<()> {
        let mut state = self.write_state()?;
        info!(
            "Team sizes changed - session: {}, sizes: {}",
            self.id, team_sizes
        );
        state.team_sizes = team_sizes;
        self.invalidate_locked(&mut state)
    }

    /// Drop every cached sequence
    pub fn invalidate(&self) -> Result<()> {
        let mut state = self.write_state()?;
        self.invalidate_locked(&mut state)
    }

    /// The cached sequence for `key`, if one has been built since the last mutation
    pub fn cached_sequence(&self, key: &str) -> Result<Option<SharedSelector>> {
        Ok(self.read_state()?.sequences.get(key).cloned())
    }

    /// Next match in the sequence ordered by `strategy`
    pub async fn next_match(&self, strategy: &dyn OrderingStrategy) -> Result<MatchDraw> {
        let key = strategy.key();

        loop {
            let (roster, team_sizes, generation) = {
                let state = self.read_state()?;
                if let Some(selector) = state.sequences.get(&key) {
                    let selector = selector.clone();
                    drop(state);
                    return self.draw(&selector);
                }
                let roster: Vec<ParticipantId> = state.roster.iter().copied().collect();
                (roster, state.team_sizes.clone(), state.generation)
            };

            if roster.len() < MIN_PARTICIPANTS {
                self.metrics_collector.record_draw("not_enough_participants");
                return Ok(MatchDraw::NotEnoughParticipants {
                    available: roster.len(),
                    required: MIN_PARTICIPANTS,
                });
            }

            let selector = self.build(roster, team_sizes, strategy).await?;

            let cached = {
                let mut state = self.write_state()?;
                if state.generation == generation {
                    // A concurrent build for the same key may have won; keep its cursor
                    Some(
                        state
                            .sequences
                            .entry(key.clone())
                            .or_insert_with(|| Arc::new(Mutex::new(selector)))
                            .clone(),
                    )
                } else {
                    None
                }
            };

            match cached {
                Some(selector) => return self.draw(&selector),
                None => {
                    debug!(
                        "Discarding stale '{}' sequence for session {}",
                        key, self.id
                    );
                    self.update_stats(|stats| stats.stale_builds += 1)?;
                }
            }
        }
    }

    /// Like [`MatchmakingSession::next_match`], but falls back to random
    /// ordering while history is temporarily unavailable
    ///
    /// Once a strategy has fallen back, later draws continue the random
    /// sequence without retrying it until the roster changes.
    pub async fn next_match_or_random(&self, strategy: &dyn OrderingStrategy) -> Result<MatchDraw> {
        let key = strategy.key();
        let (falling_back, generation) = {
            let state = self.read_state()?;
            (state.fallbacks.contains(&key), state.generation)
        };
        if falling_back {
            return self.next_match(&RandomOrdering::new()).await;
        }

        match self.next_match(strategy).await {
            Ok(draw) => Ok(draw),
            Err(e) => {
                let retryable = matches!(
                    e.downcast_ref::<MatchmakingError>(),
                    Some(MatchmakingError::RankingUnavailable(history)) if history.is_retryable()
                );
                if !retryable {
                    return Err(e);
                }
                warn!(
                    "Ranking unavailable for '{}', falling back to random ordering: {}",
                    key, e
                );
                {
                    let mut state = self.write_state()?;
                    if state.generation == generation {
                        state.fallbacks.insert(key);
                    }
                }
                self.next_match(&RandomOrdering::new()).await
            }
        }
    }

    /// Whether draws for `key` are currently served by the random fallback
    pub fn is_falling_back(&self, key: &str) -> Result<bool> {
        Ok(self.read_state()?.fallbacks.contains(key))
    }

    async fn build(
        &self,
        roster: Vec<ParticipantId>,
        team_sizes: TeamSizeSpec,
        strategy: &dyn OrderingStrategy,
    ) -> Result<MatchSelector> {
        let timer = self.metrics_collector.start_timer();
        let generator = self.generator.clone();
        let matches = tokio::task::spawn_blocking(move || generator.generate(&roster, &team_sizes))
            .await
            .map_err(|e| MatchmakingError::InternalError {
                message: format!("Enumeration task failed: {}", e),
            })?;
        self.metrics_collector
            .record_enumeration(matches.len(), timer.stop());

        let timer = self.metrics_collector.start_timer();
        let ordered = strategy.order(matches.into_iter().collect()).await?;
        self.metrics_collector
            .record_sequence_built(strategy.name(), timer.stop());
        self.update_stats(|stats| stats.sequences_built += 1)?;

        info!(
            "Built match sequence - session: {}, strategy: '{}', matches: {}",
            self.id,
            strategy.key(),
            ordered.len()
        );
        Ok(MatchSelector::new(ordered))
    }

    fn draw(&self, selector: &SharedSelector) -> Result<MatchDraw> {
        let draw = {
            let mut selector = selector.lock().map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire selector lock".to_string(),
            })?;
            selector.draw()
        };

        match &draw {
            MatchDraw::Drawn { number, .. } => {
                debug!("Drew match {} in session {}", number, self.id);
                self.metrics_collector.record_draw("match");
                self.update_stats(|stats| stats.matches_drawn += 1)?;
            }
            _ => {
                debug!("Sequence exhausted in session {}", self.id);
                self.metrics_collector.record_draw("exhausted");
            }
        }
        Ok(draw)
    }

    fn invalidate_locked(&self, state: &mut SessionState) -> Result<()> {
        let discarded = state.sequences.len();
        state.sequences.clear();
        state.fallbacks.clear();
        state.generation += 1;

        if discarded > 0 {
            info!(
                "Invalidated {} cached sequences for session {}",
                discarded, self.id
            );
        }
        self.metrics_collector.record_invalidation(discarded);

        let roster_size = state.roster.len();
        let generation = state.generation;
        self.update_stats(|stats| {
            stats.roster_size = roster_size;
            stats.generation = generation;
            stats.sequences_invalidated += discarded as u64;
        })?;

        if let Ok(stats) = self.stats() {
            self.metrics_collector.update_from_session_stats(&stats);
        }
        Ok(())
    }

    fn update_stats(&self, update: impl FnOnce(&mut SessionStats)) -> Result<()> {
        let mut stats = self.stats.write().map_err(|_| MatchmakingError::InternalError {
            message: "Failed to acquire stats write lock".to_string(),
        })?;
        update(&mut stats);
        Ok(())
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, SessionState>> {
        Ok(self.state.read().map_err(|_| MatchmakingError::InternalError {
            message: "Failed to acquire session read lock".to_string(),
        })?)
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, SessionState>> {
        Ok(self.state.write().map_err(|_| MatchmakingError::InternalError {
            message: "Failed to acquire session write lock".to_string(),
        })?)
    }
}
