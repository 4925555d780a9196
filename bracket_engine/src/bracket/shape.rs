//! Bracket shape arithmetic.
//!
//! The shape is never stored. It is derived from the entrant count when the
//! bracket is built, and from the number of round-1 matches afterwards.

use super::models::Slot;
use crate::tournament::EntrantId;
use serde::{Deserialize, Serialize};

/// Largest supported bracket (2^16 positions)
pub const MAX_ROUNDS: u32 = 16;

/// Rounds and bracket size of a single-elimination bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketShape {
    rounds: u32,
}

impl BracketShape {
    /// Shape for `entrants` entrants: `rounds = ceil(log2(entrants))`.
    ///
    /// Returns `None` for fewer than two entrants or more than the supported
    /// maximum.
    pub fn for_entrants(entrants: usize) -> Option<Self> {
        if entrants < 2 {
            return None;
        }
        let rounds = entrants.checked_next_power_of_two()?.trailing_zeros();
        (rounds <= MAX_ROUNDS).then_some(Self { rounds })
    }

    /// Recover the shape from the number of stored round-1 matches.
    ///
    /// Round 1 of a bracket with `r` rounds holds `2^(r-1)` slots, so the
    /// count of created round-1 matches determines `r` even when some slots
    /// were never created.
    pub fn from_first_round_matches(count: usize) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let rounds = count.checked_next_power_of_two()?.trailing_zeros() + 1;
        (rounds <= MAX_ROUNDS).then_some(Self { rounds })
    }

    /// Number of rounds
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Number of bracket positions (`2^rounds`)
    pub fn bracket_size(&self) -> usize {
        1 << self.rounds
    }

    /// Match slots in round `round` (1-indexed); zero outside the bracket
    pub fn matches_in_round(&self, round: u32) -> usize {
        if round == 0 || round > self.rounds {
            0
        } else {
            self.bracket_size() >> round
        }
    }

    /// Total match slots across all rounds
    pub fn total_matches(&self) -> usize {
        self.bracket_size() - 1
    }

    /// Byes needed to fill the bracket for `entrants` entrants
    pub fn byes_for(&self, entrants: usize) -> usize {
        self.bracket_size().saturating_sub(entrants)
    }

    /// Whether `round` is the final
    pub fn is_final_round(&self, round: u32) -> bool {
        round == self.rounds
    }
}

/// Where the winner of a match goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub round_number: u32,
    pub match_number: u32,
    /// Preferred slot; the other slot is used if this one is taken
    pub slot: Slot,
}

impl Destination {
    /// Destination of the winner of `(round_number, match_number)`
    pub fn of(round_number: u32, match_number: u32) -> Self {
        Self {
            round_number: round_number + 1,
            match_number: match_number.div_ceil(2),
            slot: Slot::for_feeder(match_number),
        }
    }
}

/// Outcome of choosing a destination slot for a winner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChoice {
    /// Write the winner into this slot
    Write(Slot),
    /// Winner already sits in this slot; nothing to write
    AlreadyPlaced(Slot),
    /// Both slots hold other entrants
    Full,
}

/// Choose the slot a winner is written into.
///
/// The preferred slot wins unless another entrant already occupies it, in
/// which case the other slot is used. An existing occupant is never
/// overwritten, and a winner already present is not written twice.
pub fn choose_slot(
    occupants: [Option<EntrantId>; 2],
    preferred: Slot,
    winner_id: EntrantId,
) -> SlotChoice {
    let occupant = |slot: Slot| match slot {
        Slot::One => occupants[0],
        Slot::Two => occupants[1],
    };

    for slot in [Slot::One, Slot::Two] {
        if occupant(slot) == Some(winner_id) {
            return SlotChoice::AlreadyPlaced(slot);
        }
    }

    if occupant(preferred).is_none() {
        SlotChoice::Write(preferred)
    } else if occupant(preferred.other()).is_none() {
        SlotChoice::Write(preferred.other())
    } else {
        SlotChoice::Full
    }
}
