//! Common types used throughout the matchmaking engine

use crate::error::{MatchmakingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;

/// Unique, stable identifier for a participant (chat-platform user id)
pub type ParticipantId = i64;

/// Unique identifier for a matchmaking session
pub type SessionId = Uuid;

/// Participant → integer skill rating
pub type RatingMap = HashMap<ParticipantId, i64>;

/// Unordered set of participants playing together
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Team(BTreeSet<ParticipantId>);

impl Team {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.0.contains(participant)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticipantId> + '_ {
        self.0.iter()
    }

    pub fn members(&self) -> &BTreeSet<ParticipantId> {
        &self.0
    }
}

impl FromIterator<ParticipantId> for Team {
    fn from_iter<I: IntoIterator<Item = ParticipantId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "[{}]", members.join(", "))
    }
}

/// One way of splitting the roster into teams
///
/// Teams are unordered, so two matches listing the same teams in a different
/// order compare equal. `bench` holds participants left out because the
/// roster was larger than the requested capacity; it is empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Match {
    teams: BTreeSet<Team>,
    bench: Team,
}

impl Match {
    pub fn new(teams: impl IntoIterator<Item = Team>, bench: Team) -> Self {
        Self {
            teams: teams.into_iter().filter(|t| !t.is_empty()).collect(),
            bench,
        }
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> + '_ {
        self.teams.iter()
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn bench(&self) -> &Team {
        &self.bench
    }

    /// Every participant placed on a team
    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> + '_ {
        self.teams.iter().flat_map(|t| t.iter())
    }

    pub fn team_of(&self, participant: &ParticipantId) -> Option<&Team> {
        self.teams.iter().find(|t| t.contains(participant))
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let teams: Vec<String> = self.teams.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", teams.join(" vs "))?;
        if !self.bench.is_empty() {
            write!(f, " (sitting out: {})", self.bench)?;
        }
        Ok(())
    }
}

/// Ordered list of desired team capacities, e.g. `[4, 4]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct TeamSizeSpec(Vec<usize>);

impl TeamSizeSpec {
    /// Create a spec; every capacity must be positive. An empty list is allowed.
    pub fn new(sizes: Vec<usize>) -> Result<Self> {
        Ok(Self::try_from(sizes)?)
    }

    pub fn sizes(&self) -> &[usize] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_capacity(&self) -> usize {
        self.0.iter().sum()
    }

    /// Shrink capacities so they sum to `roster_len`
    ///
    /// Units are handed out round-robin in listed order, so every slot gets a
    /// participant before any slot gets a second one. Ties go to the
    /// earliest-listed slot. Capacities are returned unchanged when the roster
    /// fills them.
    pub fn distribute(&self, roster_len: usize) -> Vec<usize> {
        if roster_len >= self.total_capacity() {
            return self.0.clone();
        }

        let mut shrunk = vec![0; self.0.len()];
        let mut remaining = roster_len;
        let mut index = 0;
        while remaining > 0 {
            if shrunk[index] < self.0[index] {
                shrunk[index] += 1;
                remaining -= 1;
            }
            index = (index + 1) % self.0.len();
        }
        shrunk
    }
}

impl TryFrom<Vec<usize>> for TeamSizeSpec {
    type Error = MatchmakingError;

    fn try_from(sizes: Vec<usize>) -> std::result::Result<Self, Self::Error> {
        if let Some(index) = sizes.iter().position(|&s| s == 0) {
            return Err(MatchmakingError::InvalidTeamSizes {
                reason: format!("team {} has capacity 0", index + 1),
            });
        }
        Ok(Self(sizes))
    }
}

impl From<TeamSizeSpec> for Vec<usize> {
    fn from(spec: TeamSizeSpec) -> Self {
        spec.0
    }
}

impl fmt::Display for TeamSizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "[{}]", sizes.join(", "))
    }
}

/// One played game between two teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalGameRecord {
    pub played_at: DateTime<Utc>,
    pub team_one: BTreeSet<ParticipantId>,
    pub team_one_score: u32,
    pub team_two: BTreeSet<ParticipantId>,
    pub team_two_score: u32,
}

impl HistoricalGameRecord {
    pub fn total_score(&self) -> f64 {
        f64::from(self.team_one_score) + f64::from(self.team_two_score)
    }

    /// (score one − score two) / (score one + score two), in [-1, 1]
    pub fn normalized_differential(&self) -> f64 {
        let total = self.total_score();
        if total == 0.0 {
            return 0.0;
        }
        (f64::from(self.team_one_score) - f64::from(self.team_two_score)) / total
    }

    /// +1 on team one, −1 on team two, 0 when absent
    pub fn team_modifier(&self, participant: &ParticipantId) -> f64 {
        if self.team_one.contains(participant) {
            1.0
        } else if self.team_two.contains(participant) {
            -1.0
        } else {
            0.0
        }
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> + '_ {
        self.team_one.iter().chain(self.team_two.iter())
    }
}

/// Result of asking a session for its next match
#[derive(Debug, Clone, PartialEq)]
pub enum MatchDraw {
    /// The next match, numbered from 1
    Drawn { number: usize, r#match: Match },
    /// Every match in the sequence has been handed out
    Exhausted,
    /// The roster cannot form a match at all
    NotEnoughParticipants { available: usize, required: usize },
}

impl MatchDraw {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, MatchDraw::Exhausted)
    }

    pub fn into_match(self) -> Option<(usize, Match)> {
        match self {
            MatchDraw::Drawn { number, r#match } => Some((number, r#match)),
            _ => None,
        }
    }
}
