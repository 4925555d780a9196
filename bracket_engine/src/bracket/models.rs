//! Match data models.

use super::changes::MatchChange;
use super::errors::{BracketError, BracketResult};
use crate::tournament::{EntrantId, TournamentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Match ID type
pub type MatchId = i64;

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting to be played (possibly still waiting for participants)
    Scheduled,
    /// Round-1 match with a single entrant, won without play
    Bye,
    /// Winner recorded
    Completed,
}

impl MatchStatus {
    /// Column value used in the `matches.status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Bye => "bye",
            MatchStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "bye" => Ok(MatchStatus::Bye),
            "completed" => Ok(MatchStatus::Completed),
            other => Err(format!("unknown match status '{other}'")),
        }
    }
}

/// One of the two participant positions of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// `participant1_id`
    One,
    /// `participant2_id`
    Two,
}

impl Slot {
    /// Slot a winner of `match_number` is destined for: odd feeds slot one,
    /// even feeds slot two.
    pub fn for_feeder(match_number: u32) -> Self {
        if match_number % 2 == 1 {
            Slot::One
        } else {
            Slot::Two
        }
    }

    /// The opposite slot
    pub fn other(self) -> Self {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }
}

/// A stored match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// Round number (1-indexed)
    pub round_number: u32,
    /// Match number within the round (1-indexed)
    pub match_number: u32,
    pub participant1_id: Option<EntrantId>,
    pub participant2_id: Option<EntrantId>,
    pub winner_id: Option<EntrantId>,
    pub status: MatchStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Occupant of a slot
    pub fn participant(&self, slot: Slot) -> Option<EntrantId> {
        match slot {
            Slot::One => self.participant1_id,
            Slot::Two => self.participant2_id,
        }
    }

    fn participant_mut(&mut self, slot: Slot) -> &mut Option<EntrantId> {
        match slot {
            Slot::One => &mut self.participant1_id,
            Slot::Two => &mut self.participant2_id,
        }
    }

    /// Slot holding `entrant_id`, if any
    pub fn slot_of(&self, entrant_id: EntrantId) -> Option<Slot> {
        if self.participant1_id == Some(entrant_id) {
            Some(Slot::One)
        } else if self.participant2_id == Some(entrant_id) {
            Some(Slot::Two)
        } else {
            None
        }
    }

    /// Whether both participant slots are filled
    pub fn is_ready(&self) -> bool {
        self.participant1_id.is_some() && self.participant2_id.is_some()
    }

    /// Apply a change to this match, enforcing the same guards the database
    /// adapter expresses in its `WHERE` clauses.
    pub fn apply(&mut self, change: &MatchChange) -> BracketResult<()> {
        match *change {
            MatchChange::Complete {
                winner_id,
                completed_at,
                ..
            } => {
                if self.status != MatchStatus::Scheduled || self.slot_of(winner_id).is_none() {
                    return Err(BracketError::NotScheduled(self.id));
                }
                self.winner_id = Some(winner_id);
                self.status = MatchStatus::Completed;
                self.completed_at = Some(completed_at);
            }
            MatchChange::Reopen {
                previous_winner, ..
            } => {
                if self.status != MatchStatus::Completed || self.winner_id != Some(previous_winner)
                {
                    return Err(BracketError::ConcurrentModification(self.id));
                }
                self.clear_result();
            }
            MatchChange::ClearResult { .. } => self.clear_result(),
            MatchChange::ClearMatch { .. } => {
                self.participant1_id = None;
                self.participant2_id = None;
                self.clear_result();
            }
            MatchChange::SetSlot {
                slot, entrant_id, ..
            } => {
                *self.participant_mut(slot) = entrant_id;
            }
        }
        Ok(())
    }

    fn clear_result(&mut self) {
        self.winner_id = None;
        self.status = MatchStatus::Scheduled;
        self.completed_at = None;
    }
}
