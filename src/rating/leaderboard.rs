//! Leaderboard ordering of fitted ratings

use crate::types::{ParticipantId, RatingMap};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// One leaderboard line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub participant: ParticipantId,
    /// `None` for lobby members without a rating
    pub rating: Option<i64>,
}

/// Rank participants by rating, highest first
///
/// Without a lobby filter every rated participant is listed. With one, only
/// lobby members are listed; unrated members follow the rated ones with no
/// rating. Ties are broken by participant id.
pub fn leaderboard(ratings: &RatingMap, lobby: Option<&[ParticipantId]>) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<(ParticipantId, Option<i64>)> = match lobby {
        Some(members) => {
            let mut members = members.to_vec();
            members.sort_unstable();
            members.dedup();
            members
                .into_iter()
                .map(|p| (p, ratings.get(&p).copied()))
                .collect()
        }
        None => ratings.iter().map(|(p, r)| (*p, Some(*r))).collect(),
    };

    rows.sort_by_key(|(participant, rating)| {
        (Reverse(rating.is_some()), Reverse(*rating), *participant)
    });

    rows.into_iter()
        .enumerate()
        .map(|(i, (participant, rating))| LeaderboardEntry {
            rank: i + 1,
            participant,
            rating,
        })
        .collect()
}
