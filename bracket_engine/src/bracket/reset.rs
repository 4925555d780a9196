//! Match reset.
//!
//! A single reset reopens one match and removes its winner from the next
//! round. It does not reopen downstream matches the winner has since played;
//! [`Bracket::reset_match_cascading`] does that when asked explicitly.

use super::changes::{ChangeSet, MatchChange};
use super::errors::{BracketError, BracketResult};
use super::models::{MatchId, MatchStatus};
use super::resolver::Bracket;
use super::shape::Destination;
use crate::tournament::EntrantId;

impl Bracket {
    /// Reopen a completed match and clear its winner from the next round.
    ///
    /// Resetting a scheduled match without a result changes nothing.
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - unknown match
    /// * `BracketError::ByeNotResettable` - match is a bye
    pub fn reset_match(&mut self, match_id: MatchId) -> BracketResult<ChangeSet> {
        let mut set = self.change_set();
        let Some(winner_id) = self.reopen(&mut set, match_id)? else {
            return Ok(set);
        };

        let target = self.get(match_id)?;
        let (round_number, match_number) = (target.round_number, target.match_number);
        if let Some(next_id) = self.retract(&mut set, round_number, match_number, winner_id)? {
            let next = self.get(next_id)?;
            if next.status == MatchStatus::Completed {
                log::warn!(
                    "Match {} reset while downstream match {} is already completed",
                    match_id,
                    next_id
                );
            }
        }

        Ok(set)
    }

    /// Reopen a match and every downstream match its winner reached.
    ///
    /// Each completed match along the winner's path is reopened and its own
    /// winner retracted in turn, until the path reaches a match that has not
    /// been played.
    pub fn reset_match_cascading(&mut self, match_id: MatchId) -> BracketResult<ChangeSet> {
        let mut set = self.change_set();
        let Some(mut winner_id) = self.reopen(&mut set, match_id)? else {
            return Ok(set);
        };
        let mut current = match_id;

        loop {
            let source = self.get(current)?;
            let (round_number, match_number) = (source.round_number, source.match_number);
            let Some(next_id) = self.retract(&mut set, round_number, match_number, winner_id)?
            else {
                break;
            };

            let next = self.get(next_id)?;
            match (next.status, next.winner_id) {
                (MatchStatus::Completed, Some(next_winner)) => {
                    self.commit(
                        &mut set,
                        MatchChange::Reopen {
                            match_id: next_id,
                            previous_winner: next_winner,
                        },
                    )?;
                    winner_id = next_winner;
                    current = next_id;
                }
                _ => break,
            }
        }

        Ok(set)
    }

    /// Clear every result in the bracket.
    ///
    /// Rounds above the first are emptied from the top down. Round-1 pairings
    /// keep their participants, byes are left alone, and bye winners are
    /// written back into round 2 so the bracket matches a fresh build.
    pub fn reset_all(&mut self) -> BracketResult<ChangeSet> {
        let mut set = self.change_set();

        for round_number in (2..=self.shape().rounds()).rev() {
            let dirty: Vec<MatchId> = self
                .round(round_number)
                .filter(|m| {
                    m.participant1_id.is_some()
                        || m.participant2_id.is_some()
                        || m.winner_id.is_some()
                        || m.status != MatchStatus::Scheduled
                })
                .map(|m| m.id)
                .collect();
            for match_id in dirty {
                self.commit(&mut set, MatchChange::ClearMatch { match_id })?;
            }
        }

        let played: Vec<MatchId> = self
            .round(1)
            .filter(|m| m.status == MatchStatus::Completed || m.winner_id.is_some())
            .filter(|m| m.status != MatchStatus::Bye)
            .map(|m| m.id)
            .collect();
        for match_id in played {
            self.commit(&mut set, MatchChange::ClearResult { match_id })?;
        }

        self.advance_byes(&mut set)?;

        Ok(set)
    }

    /// Reopen a match, returning the winner it had
    fn reopen(&mut self, set: &mut ChangeSet, match_id: MatchId) -> BracketResult<Option<EntrantId>> {
        let target = self.get(match_id)?;
        match target.status {
            MatchStatus::Bye => Err(BracketError::ByeNotResettable(match_id)),
            MatchStatus::Scheduled => Ok(None),
            MatchStatus::Completed => {
                let previous_winner = target.winner_id.ok_or_else(|| {
                    BracketError::Corrupt(format!("completed match {match_id} has no winner"))
                })?;
                self.commit(
                    set,
                    MatchChange::Reopen {
                        match_id,
                        previous_winner,
                    },
                )?;
                Ok(Some(previous_winner))
            }
        }
    }

    /// Remove `winner_id` from the destination of `(round, match_number)`.
    ///
    /// Returns the destination match when a slot was cleared.
    fn retract(
        &mut self,
        set: &mut ChangeSet,
        round_number: u32,
        match_number: u32,
        winner_id: EntrantId,
    ) -> BracketResult<Option<MatchId>> {
        if self.shape().is_final_round(round_number) {
            return Ok(None);
        }

        let destination = Destination::of(round_number, match_number);
        let Some(next) = self.at(destination.round_number, destination.match_number) else {
            return Ok(None);
        };
        let next_id = next.id;
        let held = [destination.slot, destination.slot.other()]
            .into_iter()
            .find(|slot| next.participant(*slot) == Some(winner_id));

        match held {
            Some(slot) => {
                self.commit(
                    set,
                    MatchChange::SetSlot {
                        match_id: next_id,
                        slot,
                        entrant_id: None,
                    },
                )?;
                Ok(Some(next_id))
            }
            None => Ok(None),
        }
    }
}
