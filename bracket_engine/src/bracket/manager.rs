//! Bracket manager: runs bracket operations against a repository.
//!
//! Every operation loads the current rows, computes its change set on an
//! in-memory [`Bracket`], and hands the set to the repository to apply in
//! one transaction. A set computed from rows that have since changed is
//! rejected by the repository as a conflict.

use super::builder::plan_bracket;
use super::commands::{BracketCommand, BuildSummary, CommandOutcome, ResetSummary};
use super::changes::ChangeSet;
use super::errors::{BracketError, BracketResult};
use super::models::{Match, MatchId};
use super::resolver::{Advancement, Bracket};
use super::view::BracketView;
use crate::auth::OrganizerCapability;
use crate::db::repository::{BracketRepository, ensure_open};
use crate::tournament::{Champion, EntrantId, Tournament, TournamentId};
use chrono::Utc;
use std::sync::Arc;

/// Bracket manager
#[derive(Clone)]
pub struct BracketManager {
    repository: Arc<dyn BracketRepository>,
}

impl BracketManager {
    /// Create a new bracket manager
    pub fn new(repository: Arc<dyn BracketRepository>) -> Self {
        Self { repository }
    }

    /// Check that storage is reachable
    pub async fn health_check(&self) -> BracketResult<()> {
        self.repository.ping().await
    }

    /// Build the bracket of a tournament from its confirmed entrants
    ///
    /// # Errors
    ///
    /// * `BracketError::Forbidden` - capability issued for another tournament
    /// * `BracketError::TournamentNotFound` - unknown tournament
    /// * `BracketError::AlreadyExists` - bracket already built
    /// * `BracketError::InsufficientEntrants` - fewer than two confirmed entrants
    pub async fn build_bracket(
        &self,
        capability: &OrganizerCapability,
        tournament_id: TournamentId,
    ) -> BracketResult<BuildSummary> {
        capability.ensure_covers(tournament_id)?;
        let tournament = self.tournament(tournament_id).await?;

        if !self.repository.list_matches(tournament_id).await?.is_empty() {
            return Err(BracketError::AlreadyExists(tournament_id));
        }
        ensure_open(&tournament)?;

        let entrants = self.repository.confirmed_entrants(&tournament).await?;
        let plan = plan_bracket(&entrants)?;
        let created = self.repository.insert_bracket(tournament_id, &plan).await?;

        let summary = BuildSummary {
            tournament_id,
            entrants: entrants.len(),
            rounds: plan.shape.rounds(),
            bracket_size: plan.shape.bracket_size(),
            matches_created: created.len(),
            byes: plan.bye_count(),
        };
        log::info!(
            "Built bracket for tournament {}: {} entrants, {} rounds, {} matches, {} byes",
            tournament_id,
            entrants.len(),
            summary.rounds,
            summary.matches_created,
            summary.byes
        );

        Ok(summary)
    }

    /// Record the winner of a scheduled match and advance them
    pub async fn set_match_winner(
        &self,
        capability: &OrganizerCapability,
        match_id: MatchId,
        winner_id: EntrantId,
    ) -> BracketResult<Advancement> {
        let tournament_id = self.open_tournament_of_match(capability, match_id).await?;
        let (_, advancement) = self
            .apply_to_current_bracket(tournament_id, "set_match_winner", |bracket| {
                bracket.set_winner(match_id, winner_id, Utc::now())
            })
            .await?;

        log::info!(
            "Match {} won by entrant {} in tournament {}: {:?}",
            match_id,
            winner_id,
            tournament_id,
            advancement
        );
        Ok(advancement)
    }

    /// Reopen a completed match and clear its winner from the next round.
    ///
    /// Downstream matches the winner has since played keep their results.
    pub async fn reset_match(
        &self,
        capability: &OrganizerCapability,
        match_id: MatchId,
    ) -> BracketResult<ResetSummary> {
        let tournament_id = self.open_tournament_of_match(capability, match_id).await?;
        let (changes, ()) = self
            .apply_to_current_bracket(tournament_id, "reset_match", |bracket| {
                bracket.reset_match(match_id).map(|set| (set, ()))
            })
            .await?;
        Ok(log_reset(&changes, "reset_match", match_id))
    }

    /// Reopen a match and every downstream match its winner reached
    pub async fn reset_match_cascading(
        &self,
        capability: &OrganizerCapability,
        match_id: MatchId,
    ) -> BracketResult<ResetSummary> {
        let tournament_id = self.open_tournament_of_match(capability, match_id).await?;
        let (changes, ()) = self
            .apply_to_current_bracket(tournament_id, "reset_match_cascading", |bracket| {
                bracket.reset_match_cascading(match_id).map(|set| (set, ()))
            })
            .await?;
        Ok(log_reset(&changes, "reset_match_cascading", match_id))
    }

    /// Clear every result of a tournament's bracket
    pub async fn reset_all_matches(
        &self,
        capability: &OrganizerCapability,
        tournament_id: TournamentId,
    ) -> BracketResult<ResetSummary> {
        capability.ensure_covers(tournament_id)?;
        let tournament = self.tournament(tournament_id).await?;
        ensure_open(&tournament)?;

        let (changes, ()) = self
            .apply_to_current_bracket(tournament_id, "reset_all_matches", |bracket| {
                bracket.reset_all().map(|set| (set, ()))
            })
            .await?;
        let summary = ResetSummary {
            tournament_id,
            changes: changes.matches.len(),
        };

        log::info!(
            "Reset all matches of tournament {} ({} changes)",
            tournament_id,
            summary.changes
        );
        Ok(summary)
    }

    /// Record the final's winner and close the tournament with a champion
    ///
    /// # Errors
    ///
    /// * `BracketError::TournamentNotFound` - unknown tournament
    /// * `BracketError::MatchTournamentMismatch` - final match of another tournament
    /// * `BracketError::NotFinalMatch` - match is not in the last round
    /// * `BracketError::AlreadyCompleted` - tournament already finalized
    pub async fn finalize_tournament(
        &self,
        capability: &OrganizerCapability,
        tournament_id: TournamentId,
        final_match_id: MatchId,
        winner_id: EntrantId,
    ) -> BracketResult<Champion> {
        capability.ensure_covers(tournament_id)?;
        let tournament = self.tournament(tournament_id).await?;

        let final_match = self.find_match(final_match_id).await?;
        if final_match.tournament_id != tournament_id {
            return Err(BracketError::MatchTournamentMismatch {
                match_id: final_match_id,
                tournament_id,
            });
        }

        let entrants = self.repository.confirmed_entrants(&tournament).await?;
        let (_, champion) = self
            .apply_to_current_bracket(tournament_id, "finalize_tournament", |bracket| {
                bracket.finalize(&tournament, &entrants, final_match_id, winner_id, Utc::now())
            })
            .await?;

        log::info!(
            "Tournament {} finalized, champion: {}",
            tournament_id,
            champion.name()
        );
        Ok(champion)
    }

    /// Current bracket of a tournament, grouped by round
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> BracketResult<BracketView> {
        let tournament = self.tournament(tournament_id).await?;
        let bracket = self.bracket(tournament_id).await?;
        Ok(BracketView::new(tournament, &bracket))
    }

    /// Tournament a command acts on, looking up the match for match-level
    /// commands.
    ///
    /// Callers use this to load the tournament they must authorize against.
    pub async fn owning_tournament(&self, command: &BracketCommand) -> BracketResult<Tournament> {
        let tournament_id = match (command.tournament_id(), command.match_id()) {
            (Some(tournament_id), _) => tournament_id,
            (None, Some(match_id)) => self.find_match(match_id).await?.tournament_id,
            (None, None) => {
                return Err(BracketError::Corrupt(format!(
                    "{} names neither a tournament nor a match",
                    command.name()
                )));
            }
        };
        self.tournament(tournament_id).await
    }

    /// Execute a command
    pub async fn execute(
        &self,
        capability: &OrganizerCapability,
        command: BracketCommand,
    ) -> BracketResult<CommandOutcome> {
        log::debug!("Executing {:?}", command);

        match command {
            BracketCommand::BuildBracket { tournament_id } => self
                .build_bracket(capability, tournament_id)
                .await
                .map(CommandOutcome::Built),
            BracketCommand::SetMatchWinner {
                match_id,
                winner_id,
            } => self
                .set_match_winner(capability, match_id, winner_id)
                .await
                .map(CommandOutcome::WinnerSet),
            BracketCommand::ResetMatch { match_id } => self
                .reset_match(capability, match_id)
                .await
                .map(CommandOutcome::Reset),
            BracketCommand::ResetMatchCascading { match_id } => self
                .reset_match_cascading(capability, match_id)
                .await
                .map(CommandOutcome::Reset),
            BracketCommand::ResetAllMatches { tournament_id } => self
                .reset_all_matches(capability, tournament_id)
                .await
                .map(CommandOutcome::Reset),
            BracketCommand::FinalizeTournament {
                tournament_id,
                final_match_id,
                winner_id,
            } => self
                .finalize_tournament(capability, tournament_id, final_match_id, winner_id)
                .await
                .map(CommandOutcome::Finalized),
        }
    }

    async fn tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        self.repository
            .find_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    async fn find_match(&self, match_id: MatchId) -> BracketResult<Match> {
        self.repository
            .find_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    async fn bracket(&self, tournament_id: TournamentId) -> BracketResult<Bracket> {
        let matches = self.repository.list_matches(tournament_id).await?;
        Bracket::new(tournament_id, matches)
    }

    /// Tournament a match belongs to, checking the capability and that the
    /// tournament is still open
    async fn open_tournament_of_match(
        &self,
        capability: &OrganizerCapability,
        match_id: MatchId,
    ) -> BracketResult<TournamentId> {
        let target = self.find_match(match_id).await?;
        capability.ensure_covers(target.tournament_id)?;

        let tournament = self.tournament(target.tournament_id).await?;
        ensure_open(&tournament)?;
        Ok(tournament.id)
    }

    /// Read the bracket, compute a change set on it and apply the set.
    ///
    /// The set only applies while the stored rows still equal the ones it
    /// was computed from. If another operation changed them in between, the
    /// call fails with `BracketError::StaleBracket` and nothing is written.
    async fn apply_to_current_bracket<T>(
        &self,
        tournament_id: TournamentId,
        operation: &'static str,
        compute: impl FnOnce(&mut Bracket) -> BracketResult<(ChangeSet, T)>,
    ) -> BracketResult<(ChangeSet, T)> {
        let mut bracket = self.bracket(tournament_id).await?;
        let (changes, value) = compute(&mut bracket)?;

        self.repository
            .apply_changes(&changes)
            .await
            .inspect_err(|e| {
                if matches!(e, BracketError::StaleBracket(_)) {
                    log::warn!(
                        "{} on tournament {} lost a race with another update",
                        operation,
                        tournament_id
                    );
                }
            })?;
        Ok((changes, value))
    }
}

/// Summarize and log a reset that has been applied
fn log_reset(changes: &ChangeSet, operation: &str, match_id: MatchId) -> ResetSummary {
    let summary = ResetSummary {
        tournament_id: changes.tournament_id,
        changes: changes.matches.len(),
    };
    if changes.is_empty() {
        log::debug!("{} on match {} changed nothing", operation, match_id);
    } else {
        log::info!(
            "{} on match {} in tournament {} ({} changes)",
            operation,
            match_id,
            summary.tournament_id,
            summary.changes
        );
    }
    summary
}
