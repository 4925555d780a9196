//! Advancement resolver.
//!
//! [`Bracket`] holds the stored matches of one tournament. Operations on it
//! validate against the current rows, apply their changes locally and return
//! the [`ChangeSet`] the repository must persist.

use super::changes::{ChangeSet, MatchChange};
use super::errors::{BracketError, BracketResult};
use super::models::{Match, MatchId, MatchStatus, Slot};
use super::shape::{BracketShape, Destination, SlotChoice, choose_slot};
use crate::tournament::{EntrantId, TournamentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a recorded winner ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Advancement {
    /// Winner written into a next-round slot
    Advanced { match_id: MatchId, slot: Slot },
    /// Winner already occupied a next-round slot
    AlreadyPlaced { match_id: MatchId, slot: Slot },
    /// Final match decided; the tournament can be finalized
    ReadyToFinalize,
}

/// All matches of one tournament, ordered by round then match number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bracket {
    tournament_id: TournamentId,
    shape: BracketShape,
    matches: Vec<Match>,
}

impl Bracket {
    /// Assemble a bracket from stored rows.
    ///
    /// # Errors
    ///
    /// * `BracketError::BracketNotBuilt` - no rows
    /// * `BracketError::Corrupt` - rows of another tournament, or rounds
    ///   that do not match the shape implied by round 1
    pub fn new(tournament_id: TournamentId, mut matches: Vec<Match>) -> BracketResult<Self> {
        if matches.is_empty() {
            return Err(BracketError::BracketNotBuilt(tournament_id));
        }
        if let Some(stray) = matches.iter().find(|m| m.tournament_id != tournament_id) {
            return Err(BracketError::Corrupt(format!(
                "match {} belongs to tournament {}",
                stray.id, stray.tournament_id
            )));
        }
        matches.sort_by_key(|m| (m.round_number, m.match_number));

        let first_round = matches.iter().filter(|m| m.round_number == 1).count();
        let shape = BracketShape::from_first_round_matches(first_round).ok_or_else(|| {
            BracketError::Corrupt(format!("{first_round} matches in round 1"))
        })?;
        let last_round = matches.last().map_or(0, |m| m.round_number);
        if last_round != shape.rounds() {
            return Err(BracketError::Corrupt(format!(
                "round 1 implies {} rounds, found {last_round}",
                shape.rounds()
            )));
        }

        Ok(Self {
            tournament_id,
            shape,
            matches,
        })
    }

    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }

    pub fn shape(&self) -> BracketShape {
        self.shape
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Matches of one round
    pub fn round(&self, round_number: u32) -> impl Iterator<Item = &Match> {
        self.matches
            .iter()
            .filter(move |m| m.round_number == round_number)
    }

    /// Look up a match by ID
    pub fn get(&self, match_id: MatchId) -> BracketResult<&Match> {
        self.index_of(match_id).map(|i| &self.matches[i])
    }

    /// Look up a match by position
    pub fn at(&self, round_number: u32, match_number: u32) -> Option<&Match> {
        self.index_at(round_number, match_number)
            .map(|i| &self.matches[i])
    }

    /// The final match
    pub fn final_match(&self) -> Option<&Match> {
        self.at(self.shape.rounds(), 1)
    }

    /// Whether the final has a winner
    pub fn is_decided(&self) -> bool {
        self.final_match().is_some_and(|m| m.winner_id.is_some())
    }

    pub(crate) fn index_of(&self, match_id: MatchId) -> BracketResult<usize> {
        self.matches
            .iter()
            .position(|m| m.id == match_id)
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    pub(crate) fn index_at(&self, round_number: u32, match_number: u32) -> Option<usize> {
        self.matches
            .binary_search_by_key(&(round_number, match_number), |m| {
                (m.round_number, m.match_number)
            })
            .ok()
    }

    /// Empty change set that only applies to the bracket as it is now
    pub(crate) fn change_set(&self) -> ChangeSet {
        ChangeSet::based_on(self.tournament_id, &self.matches)
    }

    /// Apply a change locally and record it for persistence
    pub(crate) fn commit(&mut self, set: &mut ChangeSet, change: MatchChange) -> BracketResult<()> {
        let index = self.index_of(change.match_id())?;
        self.matches[index].apply(&change)?;
        set.matches.push(change);
        Ok(())
    }

    /// Record the winner of a scheduled match and advance them.
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - unknown match
    /// * `BracketError::NotScheduled` - match already completed or a bye
    /// * `BracketError::MatchNotReady` - a participant slot is still empty
    /// * `BracketError::InvalidWinner` - winner is not a participant
    pub fn set_winner(
        &mut self,
        match_id: MatchId,
        winner_id: EntrantId,
        now: DateTime<Utc>,
    ) -> BracketResult<(ChangeSet, Advancement)> {
        let target = self.get(match_id)?;
        validate_winner(target, winner_id)?;
        let (round_number, match_number) = (target.round_number, target.match_number);

        let mut set = self.change_set();
        self.commit(
            &mut set,
            MatchChange::Complete {
                match_id,
                winner_id,
                completed_at: now,
            },
        )?;
        let advancement = self.advance(&mut set, round_number, match_number, winner_id)?;

        Ok((set, advancement))
    }

    /// Write a winner into its next-round slot.
    pub(crate) fn advance(
        &mut self,
        set: &mut ChangeSet,
        round_number: u32,
        match_number: u32,
        winner_id: EntrantId,
    ) -> BracketResult<Advancement> {
        if self.shape.is_final_round(round_number) {
            return Ok(Advancement::ReadyToFinalize);
        }

        let destination = Destination::of(round_number, match_number);
        let next = self
            .at(destination.round_number, destination.match_number)
            .ok_or_else(|| {
                BracketError::Corrupt(format!(
                    "missing round {} match {}",
                    destination.round_number, destination.match_number
                ))
            })?;
        let next_id = next.id;

        match choose_slot(
            [next.participant1_id, next.participant2_id],
            destination.slot,
            winner_id,
        ) {
            SlotChoice::Write(slot) => {
                self.commit(
                    set,
                    MatchChange::SetSlot {
                        match_id: next_id,
                        slot,
                        entrant_id: Some(winner_id),
                    },
                )?;
                Ok(Advancement::Advanced {
                    match_id: next_id,
                    slot,
                })
            }
            SlotChoice::AlreadyPlaced(slot) => Ok(Advancement::AlreadyPlaced {
                match_id: next_id,
                slot,
            }),
            SlotChoice::Full => Err(BracketError::Corrupt(format!(
                "match {next_id} has no free slot for entrant {winner_id}"
            ))),
        }
    }

    /// Push every round-1 bye winner into round 2
    pub(crate) fn advance_byes(&mut self, set: &mut ChangeSet) -> BracketResult<()> {
        let byes: Vec<(u32, EntrantId)> = self
            .round(1)
            .filter(|m| m.status == MatchStatus::Bye)
            .filter_map(|m| m.winner_id.map(|w| (m.match_number, w)))
            .collect();

        for (match_number, winner_id) in byes {
            self.advance(set, 1, match_number, winner_id)?;
        }
        Ok(())
    }
}

/// Check that `winner_id` may be recorded for `target`
pub(crate) fn validate_winner(target: &Match, winner_id: EntrantId) -> BracketResult<()> {
    if target.status != MatchStatus::Scheduled {
        return Err(BracketError::NotScheduled(target.id));
    }
    if !target.is_ready() {
        return Err(BracketError::MatchNotReady(target.id));
    }
    if target.slot_of(winner_id).is_none() {
        return Err(BracketError::InvalidWinner {
            match_id: target.id,
            winner_id,
        });
    }
    Ok(())
}
