//! Tournament finalizer.

use super::changes::{ChangeSet, MatchChange, TournamentChange};
use super::errors::{BracketError, BracketResult};
use super::models::{MatchId, MatchStatus};
use super::resolver::{Bracket, validate_winner};
use crate::tournament::{Champion, Entrant, EntrantId, Tournament, TournamentStatus};
use chrono::{DateTime, Utc};

impl Bracket {
    /// Record the final's winner and close the tournament with a champion.
    ///
    /// A final already completed with the same winner is accepted as is, so
    /// an organizer may set the final's winner first and finalize afterwards.
    ///
    /// # Errors
    ///
    /// * `BracketError::AlreadyCompleted` - tournament already finalized
    /// * `BracketError::InvalidTournamentState` - tournament cancelled
    /// * `BracketError::NotFinalMatch` - match is not in the last round
    /// * `BracketError::NotScheduled` - final completed with another winner
    /// * `BracketError::InvalidWinner` - winner is not a finalist
    /// * `BracketError::EntrantNotFound` - winner is not a confirmed entrant
    pub fn finalize(
        &mut self,
        tournament: &Tournament,
        entrants: &[Entrant],
        final_match_id: MatchId,
        winner_id: EntrantId,
        now: DateTime<Utc>,
    ) -> BracketResult<(ChangeSet, Champion)> {
        match tournament.status {
            TournamentStatus::Completed => {
                return Err(BracketError::AlreadyCompleted(tournament.id));
            }
            TournamentStatus::Cancelled => {
                return Err(BracketError::InvalidTournamentState {
                    tournament_id: tournament.id,
                    status: tournament.status,
                });
            }
            _ => {}
        }
        if tournament.id != self.tournament_id() {
            return Err(BracketError::MatchTournamentMismatch {
                match_id: final_match_id,
                tournament_id: tournament.id,
            });
        }

        let final_match = self.get(final_match_id)?;
        if !self.shape().is_final_round(final_match.round_number) {
            return Err(BracketError::NotFinalMatch(final_match_id));
        }

        let already_decided = final_match.status == MatchStatus::Completed
            && final_match.winner_id == Some(winner_id)
            && final_match.slot_of(winner_id).is_some();
        if !already_decided {
            validate_winner(final_match, winner_id)?;
        }
        let entrant = entrants
            .iter()
            .find(|e| e.id == winner_id)
            .ok_or(BracketError::EntrantNotFound(winner_id))?;

        let mut set = self.change_set();
        if !already_decided {
            self.commit(
                &mut set,
                MatchChange::Complete {
                    match_id: final_match_id,
                    winner_id,
                    completed_at: now,
                },
            )?;
        }

        let champion = Champion::for_tournament(tournament, entrant);
        set.tournament = Some(TournamentChange::Complete {
            champion: champion.clone(),
            completed_at: now,
        });

        Ok((set, champion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::resolver::tests::built;

    fn tournament(is_team_based: bool) -> Tournament {
        Tournament {
            id: 1,
            name: "Autumn Open".to_string(),
            organizer_id: 50,
            is_team_based,
            status: TournamentStatus::Ongoing,
            champion: None,
            completed_at: None,
        }
    }

    fn entrants() -> Vec<Entrant> {
        vec![
            Entrant::new(1, "alpha", Utc::now()),
            Entrant::new(2, "bravo", Utc::now()),
        ]
    }

    #[test]
    fn test_finalize_individual_tournament() {
        let mut bracket = built(2);
        let final_id = bracket.final_match().unwrap().id;

        let (set, champion) = bracket
            .finalize(&tournament(false), &entrants(), final_id, 2, Utc::now())
            .unwrap();

        assert_eq!(champion.winner_user_id(), Some(2));
        assert_eq!(champion.winner_team_id(), None);
        assert_eq!(champion.name(), "bravo");
        assert_eq!(set.matches.len(), 1);
        assert!(set.tournament.is_some());
    }

    #[test]
    fn test_finalize_team_tournament() {
        let mut bracket = built(2);
        let final_id = bracket.final_match().unwrap().id;

        let (_, champion) = bracket
            .finalize(&tournament(true), &entrants(), final_id, 1, Utc::now())
            .unwrap();

        assert_eq!(champion.winner_team_id(), Some(1));
        assert_eq!(champion.winner_user_id(), None);
    }

    #[test]
    fn test_finalize_accepts_already_decided_final() {
        let mut bracket = built(2);
        let final_id = bracket.final_match().unwrap().id;
        bracket.set_winner(final_id, 1, Utc::now()).unwrap();

        let (set, _) = bracket
            .finalize(&tournament(false), &entrants(), final_id, 1, Utc::now())
            .unwrap();
        assert!(set.matches.is_empty());

        let err = bracket
            .finalize(&tournament(false), &entrants(), final_id, 2, Utc::now())
            .unwrap_err();
        assert!(matches!(err, BracketError::NotScheduled(_)));
    }

    #[test]
    fn test_finalize_rejects_early_round_match() {
        let mut bracket = built(4);
        let semi = bracket.at(1, 1).unwrap().id;
        let err = bracket
            .finalize(&tournament(false), &entrants(), semi, 1, Utc::now())
            .unwrap_err();
        assert!(matches!(err, BracketError::NotFinalMatch(id) if id == semi));
    }

    #[test]
    fn test_finalize_completed_tournament_fails() {
        let mut bracket = built(2);
        let final_id = bracket.final_match().unwrap().id;
        let mut done = tournament(false);
        done.status = TournamentStatus::Completed;
        let err = bracket
            .finalize(&done, &entrants(), final_id, 1, Utc::now())
            .unwrap_err();
        assert!(matches!(err, BracketError::AlreadyCompleted(1)));
    }
}
