//! Bracket error types.

use super::models::MatchId;
use crate::tournament::{EntrantId, TournamentId, TournamentStatus};
use thiserror::Error;

/// Coarse classification of a [`BracketError`], used by callers to decide
/// how to report it (validation vs. conflict vs. internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Precondition violated; resubmitting the same request will fail again
    Validation,
    /// Target does not exist
    NotFound,
    /// State changed underneath the request; refresh and retry may succeed
    Conflict,
    /// Caller is not allowed to mutate this tournament
    Forbidden,
    /// Persistence or data integrity failure
    Internal,
}

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Tournament not found
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Match not found
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Entrant not confirmed for the tournament
    #[error("Entrant {0} is not confirmed for this tournament")]
    EntrantNotFound(EntrantId),

    /// Bracket already built
    #[error("Bracket already exists for tournament {0}")]
    AlreadyExists(TournamentId),

    /// Bracket not built yet
    #[error("Bracket has not been generated for tournament {0}")]
    BracketNotBuilt(TournamentId),

    /// Too few confirmed entrants
    #[error("Need at least 2 participants, have {0}")]
    InsufficientEntrants(usize),

    /// More entrants than the largest supported bracket
    #[error("Too many participants for one bracket: {0}")]
    TooManyEntrants(usize),

    /// Winner is not one of the match participants
    #[error("Entrant {winner_id} is not a participant of match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        winner_id: EntrantId,
    },

    /// Match is waiting for a participant
    #[error("Match {0} does not have both participants yet")]
    MatchNotReady(MatchId),

    /// Match is no longer scheduled (already completed or a bye)
    #[error("Match {0} is not scheduled")]
    NotScheduled(MatchId),

    /// Match result changed since it was read
    #[error("Match {0} was modified concurrently")]
    ConcurrentModification(MatchId),

    /// Bracket rows changed between read and write
    #[error("Bracket of tournament {0} changed while the request was processed")]
    StaleBracket(TournamentId),

    /// Byes have no organizer-decided outcome
    #[error("Match {0} is a bye and cannot be reset")]
    ByeNotResettable(MatchId),

    /// Match is not the final of its tournament
    #[error("Match {0} is not the final match")]
    NotFinalMatch(MatchId),

    /// Match belongs to another tournament
    #[error("Match {match_id} does not belong to tournament {tournament_id}")]
    MatchTournamentMismatch {
        match_id: MatchId,
        tournament_id: TournamentId,
    },

    /// Tournament status does not allow the operation
    #[error("Tournament {tournament_id} is {status}")]
    InvalidTournamentState {
        tournament_id: TournamentId,
        status: TournamentStatus,
    },

    /// Tournament already finalized
    #[error("Tournament {0} is already completed")]
    AlreadyCompleted(TournamentId),

    /// Caller capability does not cover this tournament
    #[error("Not allowed to manage tournament {0}")]
    Forbidden(TournamentId),

    /// Database operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Stored rows violate a bracket invariant
    #[error("Corrupt bracket data: {0}")]
    Corrupt(String),
}

impl BracketError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::Database(_)
            | BracketError::Timeout(_)
            | BracketError::Corrupt(_) => ErrorKind::Internal,
            BracketError::TournamentNotFound(_)
            | BracketError::MatchNotFound(_)
            | BracketError::BracketNotBuilt(_) => ErrorKind::NotFound,
            BracketError::NotScheduled(_)
            | BracketError::ConcurrentModification(_)
            | BracketError::StaleBracket(_)
            | BracketError::AlreadyCompleted(_) => ErrorKind::Conflict,
            BracketError::Forbidden(_) => ErrorKind::Forbidden,
            BracketError::EntrantNotFound(_)
            | BracketError::AlreadyExists(_)
            | BracketError::InsufficientEntrants(_)
            | BracketError::TooManyEntrants(_)
            | BracketError::InvalidWinner { .. }
            | BracketError::MatchNotReady(_)
            | BracketError::ByeNotResettable(_)
            | BracketError::NotFinalMatch(_)
            | BracketError::MatchTournamentMismatch { .. }
            | BracketError::InvalidTournamentState { .. } => ErrorKind::Validation,
        }
    }

    /// Get a client-safe error message
    ///
    /// Database errors and corrupt rows are reported generically so SQL
    /// details never reach the client.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
