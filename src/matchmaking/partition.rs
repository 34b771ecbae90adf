//! Enumeration of every distinct way to split a roster into teams
//!
//! The generator walks the team-size list depth first. At each level it picks
//! every combination of the next team size from the remaining pool and recurses
//! on what is left. Teams accumulated along the path are kept on an explicit
//! stack and turned into a [`Match`] once the size list is exhausted. Matches
//! are collected into an ordered set, which removes the duplicates produced by
//! equal-sized teams being picked in a different order.

use crate::types::{Match, ParticipantId, Team, TeamSizeSpec};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A single participant can never form a match
pub const MIN_PARTICIPANTS: usize = 2;

/// Options controlling how capacities are applied to the roster
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Shrink capacities round-robin when the roster is smaller than the
    /// requested total, instead of filling early teams first
    pub distribute_evenly: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            distribute_evenly: true,
        }
    }
}

/// Partition generator
#[derive(Debug, Clone, Default)]
pub struct PartitionGenerator {
    options: GeneratorOptions,
}

impl PartitionGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GeneratorOptions) -> Self {
        Self { options }
    }

    /// Every distinct match for `roster` under `spec`
    ///
    /// An empty spec, or a roster below [`MIN_PARTICIPANTS`], yields no
    /// matches. Participants beyond the total capacity sit out on the match's
    /// bench, one match per distinct selection.
    pub fn generate(&self, roster: &[ParticipantId], spec: &TeamSizeSpec) -> BTreeSet<Match> {
        let mut matches = BTreeSet::new();

        let mut pool = roster.to_vec();
        pool.sort_unstable();
        pool.dedup();
        if pool.len() != roster.len() {
            warn!(
                "Roster contained {} duplicate participant(s), ignoring them",
                roster.len() - pool.len()
            );
        }

        if spec.is_empty() || pool.len() < MIN_PARTICIPANTS {
            debug!(
                "No matches possible - roster: {}, team sizes: {}",
                pool.len(),
                spec
            );
            return matches;
        }

        let sizes = if self.options.distribute_evenly {
            spec.distribute(pool.len())
        } else {
            spec.sizes().to_vec()
        };

        let mut teams = Vec::with_capacity(sizes.len());
        assign_teams(&pool, &sizes, &mut teams, &mut matches);

        debug!(
            "Enumerated {} matches - roster: {}, requested: {}, effective sizes: {:?}",
            matches.len(),
            pool.len(),
            spec,
            sizes
        );
        matches
    }
}

fn assign_teams(
    pool: &[ParticipantId],
    sizes: &[usize],
    teams: &mut Vec<Team>,
    matches: &mut BTreeSet<Match>,
) {
    let Some((&size, rest)) = sizes.split_first() else {
        let bench: Team = pool.iter().copied().collect();
        matches.insert(Match::new(teams.iter().cloned(), bench));
        return;
    };

    // Not enough left to fill this team: it takes whatever remains
    if pool.len() < size {
        teams.push(pool.iter().copied().collect());
        assign_teams(&[], rest, teams, matches);
        teams.pop();
        return;
    }

    for_each_combination(pool, size, |chosen, remaining| {
        teams.push(chosen.iter().copied().collect());
        assign_teams(remaining, rest, teams, matches);
        teams.pop();
    });
}

/// Visit every `k`-combination of `pool` together with its complement
fn for_each_combination<F>(pool: &[ParticipantId], k: usize, mut visit: F)
where
    F: FnMut(&[ParticipantId], &[ParticipantId]),
{
    let n = pool.len();
    debug_assert!(k <= n);

    let mut indices: Vec<usize> = (0..k).collect();
    let mut chosen = Vec::with_capacity(k);
    let mut remaining = Vec::with_capacity(n - k);

    loop {
        chosen.clear();
        remaining.clear();
        let mut next = 0;
        for (i, participant) in pool.iter().enumerate() {
            if next < k && indices[next] == i {
                chosen.push(*participant);
                next += 1;
            } else {
                remaining.push(*participant);
            }
        }
        visit(&chosen, &remaining);

        let Some(i) = (0..k).rev().find(|&i| indices[i] < i + n - k) else {
            return;
        };
        indices[i] += 1;
        for j in i + 1..k {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roster(n: usize) -> Vec<ParticipantId> {
        (1..=n as ParticipantId).collect()
    }

    fn generate(n: usize, sizes: &[usize]) -> BTreeSet<Match> {
        let spec = TeamSizeSpec::new(sizes.to_vec()).unwrap();
        PartitionGenerator::new().generate(&roster(n), &spec)
    }

    #[test]
    fn test_two_teams_of_four() {
        assert_eq!(generate(8, &[4, 4]).len(), 35);
    }

    #[test]
    fn test_one_versus_four() {
        let matches = generate(5, &[1, 4]);
        assert_eq!(matches.len(), 5);
        for m in &matches {
            let mut sizes: Vec<usize> = m.teams().map(|t| t.len()).collect();
            sizes.sort();
            assert_eq!(sizes, vec![1, 4]);
        }
    }

    #[test]
    fn test_three_teams_of_two() {
        assert_eq!(generate(6, &[2, 2, 2]).len(), 15);
    }

    #[test]
    fn test_all_singletons() {
        let matches = generate(5, &[1, 1, 1, 1, 1]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches.iter().next().unwrap().team_count(), 5);
    }

    #[test]
    fn test_no_participants() {
        assert!(generate(0, &[2, 2]).is_empty());
    }

    #[test]
    fn test_single_participant() {
        assert!(generate(1, &[2, 2]).is_empty());
        assert!(generate(1, &[1]).is_empty());
    }

    #[test]
    fn test_empty_team_sizes_yield_no_matches() {
        assert!(generate(5, &[]).is_empty());
    }

    #[test]
    fn test_surplus_participants_sit_out() {
        let matches = generate(5, &[1, 2]);
        assert_eq!(matches.len(), 30);
        for m in &matches {
            assert_eq!(m.bench().len(), 2);
            assert_eq!(m.participants().count(), 3);
        }
    }

    #[test]
    fn test_not_enough_participants_shrinks_evenly() {
        let matches = generate(2, &[1, 2]);
        assert_eq!(matches.len(), 1);
        let only = matches.into_iter().next().unwrap();
        assert_eq!(only.team_count(), 2);
        assert!(only.teams().all(|t| t.len() == 1));
    }

    #[test]
    fn test_shrunk_capacities_fill_every_team() {
        // [4, 4] with five participants plays as [3, 2]
        let matches = generate(5, &[4, 4]);
        assert_eq!(matches.len(), 10);
        for m in &matches {
            let mut sizes: Vec<usize> = m.teams().map(|t| t.len()).collect();
            sizes.sort();
            assert_eq!(sizes, vec![2, 3]);
        }
    }

    #[test]
    fn test_last_team_absorbs_remaining_pool() {
        let generator = PartitionGenerator::with_options(GeneratorOptions {
            distribute_evenly: false,
        });
        let spec = TeamSizeSpec::new(vec![4, 4]).unwrap();
        let matches = generator.generate(&roster(5), &spec);

        assert_eq!(matches.len(), 5);
        for m in &matches {
            let mut sizes: Vec<usize> = m.teams().map(|t| t.len()).collect();
            sizes.sort();
            assert_eq!(sizes, vec![1, 4]);
        }
    }

    #[test]
    fn test_duplicate_roster_entries_are_ignored() {
        let spec = TeamSizeSpec::new(vec![1, 1]).unwrap();
        let matches = PartitionGenerator::new().generate(&[7, 7, 9], &spec);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_combinations_visit_complements() {
        let mut seen = Vec::new();
        for_each_combination(&[1, 2, 3], 2, |chosen, rest| {
            seen.push((chosen.to_vec(), rest.to_vec()));
        });
        assert_eq!(
            seen,
            vec![
                (vec![1, 2], vec![3]),
                (vec![1, 3], vec![2]),
                (vec![2, 3], vec![1]),
            ]
        );

        let mut empty_visits = 0;
        for_each_combination(&[1, 2], 0, |chosen, rest| {
            assert!(chosen.is_empty());
            assert_eq!(rest, &[1, 2]);
            empty_visits += 1;
        });
        assert_eq!(empty_visits, 1);
    }

    proptest! {
        #[test]
        fn prop_matches_cover_roster_without_overlap(
            n in 2usize..8,
            sizes in prop::collection::vec(1usize..4, 1..4),
        ) {
            let spec = TeamSizeSpec::new(sizes).unwrap();
            let players = roster(n);
            let matches = PartitionGenerator::new().generate(&players, &spec);
            prop_assert!(!matches.is_empty());

            for m in &matches {
                let mut seen: Vec<ParticipantId> = m.participants().copied().collect();
                seen.extend(m.bench().iter().copied());
                let placed = seen.len();
                seen.sort();
                seen.dedup();
                prop_assert_eq!(seen.len(), placed);
                prop_assert_eq!(&seen, &players);

                if n <= spec.total_capacity() {
                    prop_assert!(m.bench().is_empty());
                }
            }
        }
    }
}
