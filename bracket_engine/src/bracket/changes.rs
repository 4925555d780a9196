//! Mutation sets produced by bracket operations.
//!
//! Every operation computes the full list of row changes up front and hands
//! it to the repository, which applies it in one transaction. A guard that
//! fails on any change aborts the whole set.
//!
//! A set computed by [`Bracket`](super::resolver::Bracket) also carries the
//! bracket it was computed from. The repository refuses to apply it unless
//! the stored rows still match that basis, so a set is never replayed over
//! rows another operation has changed since they were read.

use super::models::{Match, MatchId, MatchStatus, Slot};
use super::errors::{BracketError, BracketResult};
use crate::tournament::{Champion, EntrantId, TournamentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single match row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MatchChange {
    /// Record a winner. Only applies while the match is still scheduled and
    /// the winner occupies one of its slots.
    Complete {
        match_id: MatchId,
        winner_id: EntrantId,
        completed_at: DateTime<Utc>,
    },
    /// Clear a result. Only applies while the match is completed with
    /// `previous_winner`.
    Reopen {
        match_id: MatchId,
        previous_winner: EntrantId,
    },
    /// Clear winner, status and completion time, keeping participants
    ClearResult { match_id: MatchId },
    /// Clear participants as well as the result
    ClearMatch { match_id: MatchId },
    /// Plain assignment of a participant slot
    SetSlot {
        match_id: MatchId,
        slot: Slot,
        entrant_id: Option<EntrantId>,
    },
}

impl MatchChange {
    /// Match the change targets
    pub fn match_id(&self) -> MatchId {
        match *self {
            MatchChange::Complete { match_id, .. }
            | MatchChange::Reopen { match_id, .. }
            | MatchChange::ClearResult { match_id }
            | MatchChange::ClearMatch { match_id }
            | MatchChange::SetSlot { match_id, .. } => match_id,
        }
    }
}

/// Tournament row change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TournamentChange {
    /// Close the tournament with a champion. Only applies while the
    /// tournament is not already completed or cancelled.
    Complete {
        champion: Champion,
        completed_at: DateTime<Utc>,
    },
}

/// Bracket-relevant state of a match row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub participant1_id: Option<EntrantId>,
    pub participant2_id: Option<EntrantId>,
    pub winner_id: Option<EntrantId>,
    pub status: MatchStatus,
}

impl MatchSnapshot {
    pub fn of(row: &Match) -> Self {
        Self {
            match_id: row.id,
            participant1_id: row.participant1_id,
            participant2_id: row.participant2_id,
            winner_id: row.winner_id,
            status: row.status,
        }
    }
}

/// All changes of one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub tournament_id: TournamentId,
    pub matches: Vec<MatchChange>,
    pub tournament: Option<TournamentChange>,
    /// Every match of the tournament as the set was computed against.
    /// Empty means unchecked.
    pub basis: Vec<MatchSnapshot>,
}

impl ChangeSet {
    /// Empty change set for a tournament
    pub fn new(tournament_id: TournamentId) -> Self {
        Self {
            tournament_id,
            matches: Vec::new(),
            tournament: None,
            basis: Vec::new(),
        }
    }

    /// Empty change set that only applies while the tournament's matches
    /// are exactly `rows`
    pub fn based_on(tournament_id: TournamentId, rows: &[Match]) -> Self {
        Self {
            basis: rows.iter().map(MatchSnapshot::of).collect(),
            ..Self::new(tournament_id)
        }
    }

    /// Check the stored rows against the basis.
    ///
    /// # Errors
    ///
    /// * `BracketError::StaleBracket` - a match was added, removed or changed
    ///   since the set was computed
    pub fn verify_basis(&self, current: &[Match]) -> BracketResult<()> {
        if self.basis.is_empty() {
            return Ok(());
        }
        let unchanged = current.len() == self.basis.len()
            && self.basis.iter().all(|expected| {
                current
                    .iter()
                    .find(|row| row.id == expected.match_id)
                    .is_some_and(|row| MatchSnapshot::of(row) == *expected)
            });
        if unchanged {
            Ok(())
        } else {
            Err(BracketError::StaleBracket(self.tournament_id))
        }
    }

    /// Whether there is nothing to persist
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.tournament.is_none()
    }
}
