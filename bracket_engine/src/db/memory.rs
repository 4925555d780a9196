//! In-memory `BracketRepository`.
//!
//! Holds tournaments, registrations and matches behind one async mutex, so a
//! change set is staged and written while no other operation can observe a
//! half-applied state. Used by tests and by services that run without a
//! database.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use super::repository::{BracketRepository, ensure_open, stage_changes};
use crate::bracket::builder::BracketPlan;
use crate::bracket::changes::{ChangeSet, TournamentChange};
use crate::bracket::errors::{BracketError, BracketResult};
use crate::bracket::models::{Match, MatchId};
use crate::tournament::{Entrant, Tournament, TournamentId, TournamentStatus};

#[derive(Debug, Clone)]
struct Registration {
    entrant: Entrant,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    tournaments: HashMap<TournamentId, Tournament>,
    registrations: HashMap<TournamentId, Vec<Registration>>,
    matches: BTreeMap<MatchId, Match>,
    next_match_id: MatchId,
}

impl MemoryState {
    fn tournament_matches(&self, tournament_id: TournamentId) -> Vec<Match> {
        let mut matches: Vec<Match> = self
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round_number, m.match_number));
        matches
    }
}

/// Bracket repository kept entirely in process memory
#[derive(Debug, Default)]
pub struct InMemoryBracketRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryBracketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tournament
    pub async fn insert_tournament(&self, tournament: Tournament) {
        let mut state = self.state.lock().await;
        state.tournaments.insert(tournament.id, tournament);
    }

    /// Register an entrant. Only confirmed entrants are seeded.
    pub async fn register(&self, tournament_id: TournamentId, entrant: Entrant, confirmed: bool) {
        let mut state = self.state.lock().await;
        state
            .registrations
            .entry(tournament_id)
            .or_default()
            .push(Registration { entrant, confirmed });
    }

    /// Overwrite a tournament's status
    pub async fn set_status(
        &self,
        tournament_id: TournamentId,
        status: TournamentStatus,
    ) -> BracketResult<()> {
        let mut state = self.state.lock().await;
        let tournament = state
            .tournaments
            .get_mut(&tournament_id)
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        tournament.status = status;
        Ok(())
    }
}

#[async_trait]
impl BracketRepository for InMemoryBracketRepository {
    async fn find_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<Tournament>> {
        let state = self.state.lock().await;
        Ok(state.tournaments.get(&tournament_id).cloned())
    }

    async fn confirmed_entrants(&self, tournament: &Tournament) -> BracketResult<Vec<Entrant>> {
        let state = self.state.lock().await;
        let mut entrants: Vec<Entrant> = state
            .registrations
            .get(&tournament.id)
            .into_iter()
            .flatten()
            .filter(|r| r.confirmed)
            .map(|r| r.entrant.clone())
            .collect();
        entrants.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then(a.id.cmp(&b.id)));
        Ok(entrants)
    }

    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let state = self.state.lock().await;
        Ok(state.matches.get(&match_id).cloned())
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        let state = self.state.lock().await;
        Ok(state.tournament_matches(tournament_id))
    }

    async fn insert_bracket(
        &self,
        tournament_id: TournamentId,
        plan: &BracketPlan,
    ) -> BracketResult<Vec<Match>> {
        let mut state = self.state.lock().await;

        let tournament = state
            .tournaments
            .get(&tournament_id)
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        ensure_open(tournament)?;
        if state
            .matches
            .values()
            .any(|m| m.tournament_id == tournament_id)
        {
            return Err(BracketError::AlreadyExists(tournament_id));
        }

        let mut created = Vec::with_capacity(plan.matches.len());
        for planned in &plan.matches {
            state.next_match_id += 1;
            let row = Match {
                id: state.next_match_id,
                tournament_id,
                round_number: planned.round_number,
                match_number: planned.match_number,
                participant1_id: planned.participant1_id,
                participant2_id: planned.participant2_id,
                winner_id: planned.winner_id,
                status: planned.status,
                completed_at: None,
            };
            state.matches.insert(row.id, row.clone());
            created.push(row);
        }

        if let Some(tournament) = state.tournaments.get_mut(&tournament_id) {
            tournament.status = TournamentStatus::Ongoing;
        }
        Ok(created)
    }

    async fn apply_changes(&self, changes: &ChangeSet) -> BracketResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;

        let tournament = state
            .tournaments
            .get(&changes.tournament_id)
            .ok_or(BracketError::TournamentNotFound(changes.tournament_id))?;
        let current = state.tournament_matches(changes.tournament_id);

        // Everything is validated before the first write
        let staged = stage_changes(tournament, &current, changes)?;

        for row in staged {
            state.matches.insert(row.id, row);
        }
        if let Some(TournamentChange::Complete {
            champion,
            completed_at,
        }) = &changes.tournament
            && let Some(tournament) = state.tournaments.get_mut(&changes.tournament_id)
        {
            tournament.status = TournamentStatus::Completed;
            tournament.champion = Some(champion.clone());
            tournament.completed_at = Some(*completed_at);
        }
        Ok(())
    }

    async fn ping(&self) -> BracketResult<()> {
        Ok(())
    }
}
