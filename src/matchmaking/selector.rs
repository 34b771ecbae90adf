//! Cursor over one ordered match sequence

use crate::types::{Match, MatchDraw};

/// Hands out the matches of one ordered sequence, one per call
#[derive(Debug, Clone, Default)]
pub struct MatchSelector {
    matches: Vec<Match>,
    position: usize,
}

impl MatchSelector {
    pub fn new(matches: Vec<Match>) -> Self {
        Self {
            matches,
            position: 0,
        }
    }

    /// The next match numbered from 1, or `Exhausted` on every call past the end
    pub fn draw(&mut self) -> MatchDraw {
        match self.matches.get(self.position) {
            Some(m) => {
                self.position += 1;
                MatchDraw::Drawn {
                    number: self.position,
                    r#match: m.clone(),
                }
            }
            None => MatchDraw::Exhausted,
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Matches drawn so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.matches.len() - self.position
    }
}
