//! Read-only bracket view.

use super::models::Match;
use super::resolver::Bracket;
use super::shape::BracketShape;
use crate::tournament::Tournament;
use serde::{Deserialize, Serialize};

/// Matches of one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub round_number: u32,
    pub matches: Vec<Match>,
}

/// A tournament with its bracket grouped by round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketView {
    pub tournament: Tournament,
    pub shape: BracketShape,
    pub rounds: Vec<RoundView>,
    /// Whether the final match has a winner
    pub ready_to_finalize: bool,
}

impl BracketView {
    pub fn new(tournament: Tournament, bracket: &Bracket) -> Self {
        let shape = bracket.shape();
        let rounds = (1..=shape.rounds())
            .map(|round_number| RoundView {
                round_number,
                matches: bracket.round(round_number).cloned().collect(),
            })
            .collect();

        Self {
            tournament,
            shape,
            rounds,
            ready_to_finalize: bracket.is_decided(),
        }
    }

    /// Look up a round
    pub fn round(&self, round_number: u32) -> Option<&RoundView> {
        self.rounds.iter().find(|r| r.round_number == round_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::resolver::tests::built;
    use crate::tournament::TournamentStatus;

    #[test]
    fn test_view_groups_matches_by_round() {
        let bracket = built(5);
        let tournament = Tournament {
            id: 1,
            name: "Weekend Cup".to_string(),
            organizer_id: 3,
            is_team_based: false,
            status: TournamentStatus::Ongoing,
            champion: None,
            completed_at: None,
        };

        let view = BracketView::new(tournament, &bracket);
        assert_eq!(view.rounds.len(), 3);
        assert_eq!(view.round(1).map(|r| r.matches.len()), Some(4));
        assert_eq!(view.round(2).map(|r| r.matches.len()), Some(2));
        assert_eq!(view.round(3).map(|r| r.matches.len()), Some(1));
        assert!(!view.ready_to_finalize);
    }
}
