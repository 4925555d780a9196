//! The closed set of bracket operations.

use super::models::MatchId;
use super::resolver::Advancement;
use crate::tournament::{Champion, EntrantId, TournamentId};
use serde::{Deserialize, Serialize};

/// A bracket operation, as submitted by an organizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BracketCommand {
    BuildBracket {
        tournament_id: TournamentId,
    },
    SetMatchWinner {
        match_id: MatchId,
        winner_id: EntrantId,
    },
    ResetMatch {
        match_id: MatchId,
    },
    ResetMatchCascading {
        match_id: MatchId,
    },
    ResetAllMatches {
        tournament_id: TournamentId,
    },
    FinalizeTournament {
        tournament_id: TournamentId,
        final_match_id: MatchId,
        winner_id: EntrantId,
    },
}

impl BracketCommand {
    /// Stable operation name, used in logs and metric labels
    pub fn name(&self) -> &'static str {
        match self {
            BracketCommand::BuildBracket { .. } => "build_bracket",
            BracketCommand::SetMatchWinner { .. } => "set_match_winner",
            BracketCommand::ResetMatch { .. } => "reset_match",
            BracketCommand::ResetMatchCascading { .. } => "reset_match_cascading",
            BracketCommand::ResetAllMatches { .. } => "reset_all_matches",
            BracketCommand::FinalizeTournament { .. } => "finalize_tournament",
        }
    }

    /// Tournament the command names directly, if any.
    ///
    /// Match-level commands only name a match; its tournament has to be
    /// looked up.
    pub fn tournament_id(&self) -> Option<TournamentId> {
        match *self {
            BracketCommand::BuildBracket { tournament_id }
            | BracketCommand::ResetAllMatches { tournament_id }
            | BracketCommand::FinalizeTournament { tournament_id, .. } => Some(tournament_id),
            BracketCommand::SetMatchWinner { .. }
            | BracketCommand::ResetMatch { .. }
            | BracketCommand::ResetMatchCascading { .. } => None,
        }
    }

    /// Match the command targets, for match-level commands
    pub fn match_id(&self) -> Option<MatchId> {
        match *self {
            BracketCommand::SetMatchWinner { match_id, .. }
            | BracketCommand::ResetMatch { match_id }
            | BracketCommand::ResetMatchCascading { match_id } => Some(match_id),
            BracketCommand::BuildBracket { .. }
            | BracketCommand::ResetAllMatches { .. }
            | BracketCommand::FinalizeTournament { .. } => None,
        }
    }
}

/// Result of building a bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub tournament_id: TournamentId,
    /// Confirmed entrants seeded into round 1
    pub entrants: usize,
    pub rounds: u32,
    pub bracket_size: usize,
    pub matches_created: usize,
    pub byes: usize,
}

/// Result of a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    pub tournament_id: TournamentId,
    /// Number of row changes written
    pub changes: usize,
}

/// Outcome of [`BracketCommand`] execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum CommandOutcome {
    Built(BuildSummary),
    WinnerSet(Advancement),
    Reset(ResetSummary),
    Finalized(Champion),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_commands_name_no_tournament() {
        let command = BracketCommand::SetMatchWinner {
            match_id: 4,
            winner_id: 2,
        };
        assert_eq!(command.tournament_id(), None);
        assert_eq!(command.match_id(), Some(4));
        assert_eq!(command.name(), "set_match_winner");
    }

    #[test]
    fn test_tournament_commands_name_their_tournament() {
        let command = BracketCommand::FinalizeTournament {
            tournament_id: 7,
            final_match_id: 30,
            winner_id: 2,
        };
        assert_eq!(command.tournament_id(), Some(7));
        assert_eq!(command.match_id(), None);
    }
}
