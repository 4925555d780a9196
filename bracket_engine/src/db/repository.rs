//! Repository trait for bracket persistence, and its PostgreSQL adapter.
//!
//! The engine reads tournaments, entrants and matches through
//! [`BracketRepository`] and writes only whole [`ChangeSet`]s, so every
//! operation lands in the database as one transaction or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use std::time::Duration;

use super::timeouts::{DEFAULT_OPERATION_TIMEOUT, HEALTH_CHECK_TIMEOUT, with_timeout};
use crate::bracket::builder::BracketPlan;
use crate::bracket::changes::{ChangeSet, TournamentChange};
use crate::bracket::errors::{BracketError, BracketResult};
use crate::bracket::models::{Match, MatchId};
use crate::tournament::{Champion, Entrant, Tournament, TournamentId, TournamentStatus};

/// Trait for bracket storage operations
#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Find tournament by ID
    async fn find_tournament(&self, tournament_id: TournamentId)
    -> BracketResult<Option<Tournament>>;

    /// Confirmed participants (or teams, for team tournaments) in
    /// registration order
    async fn confirmed_entrants(&self, tournament: &Tournament) -> BracketResult<Vec<Entrant>>;

    /// Find match by ID
    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>>;

    /// All matches of a tournament, ordered by round then match number
    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>>;

    /// Insert every row of a freshly planned bracket and move the
    /// tournament to `ongoing`.
    ///
    /// Fails with `BracketError::AlreadyExists` if the tournament already
    /// has matches.
    async fn insert_bracket(
        &self,
        tournament_id: TournamentId,
        plan: &BracketPlan,
    ) -> BracketResult<Vec<Match>>;

    /// Apply a change set atomically.
    ///
    /// The set's basis and the guards of its changes are checked against the
    /// rows as they are at apply time, with no other write in between. If
    /// any check fails, nothing is written.
    ///
    /// # Errors
    ///
    /// * `BracketError::StaleBracket` - rows changed since the set was
    ///   computed
    async fn apply_changes(&self, changes: &ChangeSet) -> BracketResult<()>;

    /// Check storage connectivity
    async fn ping(&self) -> BracketResult<()>;
}

/// Fail unless the tournament may still be mutated
pub(crate) fn ensure_open(tournament: &Tournament) -> BracketResult<()> {
    match tournament.status {
        TournamentStatus::Completed => Err(BracketError::AlreadyCompleted(tournament.id)),
        TournamentStatus::Cancelled => Err(BracketError::InvalidTournamentState {
            tournament_id: tournament.id,
            status: tournament.status,
        }),
        _ => Ok(()),
    }
}

/// Apply `changes` to copies of the current rows.
///
/// `current` must be every match of the tournament. Returns the rows that
/// changed, in the order they were first touched. Nothing is returned on
/// error, so callers can discard the staged copies.
pub(crate) fn stage_changes(
    tournament: &Tournament,
    current: &[Match],
    changes: &ChangeSet,
) -> BracketResult<Vec<Match>> {
    ensure_open(tournament)?;
    changes.verify_basis(current)?;

    let mut order: Vec<MatchId> = Vec::new();
    let mut staged: HashMap<MatchId, Match> = HashMap::new();

    for change in &changes.matches {
        let match_id = change.match_id();
        if !staged.contains_key(&match_id) {
            let row = current
                .iter()
                .find(|m| m.id == match_id)
                .ok_or(BracketError::MatchNotFound(match_id))?;
            if row.tournament_id != changes.tournament_id {
                return Err(BracketError::MatchTournamentMismatch {
                    match_id,
                    tournament_id: changes.tournament_id,
                });
            }
            staged.insert(match_id, row.clone());
            order.push(match_id);
        }
        if let Some(row) = staged.get_mut(&match_id) {
            row.apply(change)?;
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|id| staged.remove(&id))
        .collect())
}

/// Default PostgreSQL implementation of `BracketRepository`
pub struct PgBracketRepository {
    pool: PgPool,
    operation_timeout: Duration,
}

const TOURNAMENT_COLUMNS: &str = "id, name, organizer_id, is_team_based, status, winner_user_id, \
     winner_name, winner_team_id, winner_team_name, completed_at";

const MATCH_COLUMNS: &str = "id, tournament_id, round_number, match_number, participant1_id, \
     participant2_id, winner_id, status, completed_at";

impl PgBracketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Override the per-operation timeout
    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    /// Lock the tournament row for the rest of the transaction
    async fn lock_tournament(
        tx: &mut Transaction<'_, Postgres>,
        tournament_id: TournamentId,
    ) -> BracketResult<Tournament> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE"
        ))
        .bind(tournament_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))?;

        tournament_from_row(&row)
    }

    async fn insert_bracket_in_tx(
        &self,
        tournament_id: TournamentId,
        plan: &BracketPlan,
    ) -> BracketResult<Vec<Match>> {
        let mut tx = self.pool.begin().await?;

        let tournament = Self::lock_tournament(&mut tx, tournament_id).await?;
        ensure_open(&tournament)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM matches WHERE tournament_id = $1)")
                .bind(tournament_id)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            return Err(BracketError::AlreadyExists(tournament_id));
        }

        let mut created = Vec::with_capacity(plan.matches.len());
        for planned in &plan.matches {
            let id: MatchId = sqlx::query_scalar(
                "INSERT INTO matches (tournament_id, round_number, match_number, participant1_id,
                                      participant2_id, winner_id, status)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING id",
            )
            .bind(tournament_id)
            .bind(to_column(planned.round_number)?)
            .bind(to_column(planned.match_number)?)
            .bind(planned.participant1_id)
            .bind(planned.participant2_id)
            .bind(planned.winner_id)
            .bind(planned.status.as_str())
            .fetch_one(&mut *tx)
            .await?;

            created.push(Match {
                id,
                tournament_id,
                round_number: planned.round_number,
                match_number: planned.match_number,
                participant1_id: planned.participant1_id,
                participant2_id: planned.participant2_id,
                winner_id: planned.winner_id,
                status: planned.status,
                completed_at: None,
            });
        }

        sqlx::query("UPDATE tournaments SET status = $1 WHERE id = $2")
            .bind(TournamentStatus::Ongoing.as_str())
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn apply_changes_in_tx(&self, changes: &ChangeSet) -> BracketResult<()> {
        let mut tx = self.pool.begin().await?;

        let tournament = Self::lock_tournament(&mut tx, changes.tournament_id).await?;
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1
             ORDER BY round_number, match_number FOR UPDATE"
        ))
        .bind(changes.tournament_id)
        .fetch_all(&mut *tx)
        .await?;
        let current = rows
            .iter()
            .map(match_from_row)
            .collect::<BracketResult<Vec<_>>>()?;

        // Dropping `tx` on any error below rolls the whole set back. The
        // tournament and its matches stay locked until commit, so the rows
        // staged here are the rows the updates overwrite.
        for staged in stage_changes(&tournament, &current, changes)? {
            let result = sqlx::query(
                "UPDATE matches
                 SET participant1_id = $1, participant2_id = $2, winner_id = $3,
                     status = $4, completed_at = $5
                 WHERE id = $6 AND tournament_id = $7",
            )
            .bind(staged.participant1_id)
            .bind(staged.participant2_id)
            .bind(staged.winner_id)
            .bind(staged.status.as_str())
            .bind(staged.completed_at)
            .bind(staged.id)
            .bind(staged.tournament_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(BracketError::MatchNotFound(staged.id));
            }
        }

        if let Some(TournamentChange::Complete {
            champion,
            completed_at,
        }) = &changes.tournament
        {
            let is_user = champion.winner_user_id().is_some();
            let result = sqlx::query(
                "UPDATE tournaments
                 SET status = 'completed', winner_user_id = $1, winner_name = $2,
                     winner_team_id = $3, winner_team_name = $4, completed_at = $5
                 WHERE id = $6 AND status NOT IN ('completed', 'cancelled')",
            )
            .bind(champion.winner_user_id())
            .bind(is_user.then(|| champion.name()))
            .bind(champion.winner_team_id())
            .bind((!is_user).then(|| champion.name()))
            .bind(*completed_at)
            .bind(changes.tournament_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(BracketError::AlreadyCompleted(changes.tournament_id));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn find_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<Tournament>> {
        with_timeout(self.operation_timeout, async {
            let row = sqlx::query(&format!(
                "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
            ))
            .bind(tournament_id)
            .fetch_optional(&self.pool)
            .await?;

            row.as_ref().map(tournament_from_row).transpose()
        })
        .await
    }

    async fn confirmed_entrants(&self, tournament: &Tournament) -> BracketResult<Vec<Entrant>> {
        let query = if tournament.is_team_based {
            "SELECT team_id AS id, team_name AS name, registered_at
             FROM tournament_teams
             WHERE tournament_id = $1 AND status = 'confirmed'
             ORDER BY registered_at, team_id"
        } else {
            "SELECT user_id AS id, display_name AS name, registered_at
             FROM tournament_participants
             WHERE tournament_id = $1 AND status = 'confirmed'
             ORDER BY registered_at, user_id"
        };

        with_timeout(self.operation_timeout, async {
            let rows = sqlx::query(query)
                .bind(tournament.id)
                .fetch_all(&self.pool)
                .await?;

            rows.iter()
                .map(|r| -> BracketResult<Entrant> {
                    Ok(Entrant {
                        id: r.try_get("id")?,
                        name: r.try_get("name")?,
                        registered_at: r.try_get("registered_at")?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        with_timeout(self.operation_timeout, async {
            let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
                .bind(match_id)
                .fetch_optional(&self.pool)
                .await?;

            row.as_ref().map(match_from_row).transpose()
        })
        .await
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        with_timeout(self.operation_timeout, async {
            let rows = sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1
                 ORDER BY round_number, match_number"
            ))
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(match_from_row).collect()
        })
        .await
    }

    async fn insert_bracket(
        &self,
        tournament_id: TournamentId,
        plan: &BracketPlan,
    ) -> BracketResult<Vec<Match>> {
        with_timeout(
            self.operation_timeout,
            self.insert_bracket_in_tx(tournament_id, plan),
        )
        .await
    }

    async fn apply_changes(&self, changes: &ChangeSet) -> BracketResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        with_timeout(self.operation_timeout, self.apply_changes_in_tx(changes)).await
    }

    async fn ping(&self) -> BracketResult<()> {
        with_timeout(HEALTH_CHECK_TIMEOUT, async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(BracketError::from)
        })
        .await
    }
}

fn to_column(value: u32) -> BracketResult<i32> {
    i32::try_from(value).map_err(|_| BracketError::Corrupt(format!("{value} out of range")))
}

fn from_column(row: &PgRow, column: &str) -> BracketResult<u32> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| BracketError::Corrupt(format!("negative {column} {value}")))
}

fn match_from_row(row: &PgRow) -> BracketResult<Match> {
    let status: String = row.try_get("status")?;
    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        round_number: from_column(row, "round_number")?,
        match_number: from_column(row, "match_number")?,
        participant1_id: row.try_get("participant1_id")?,
        participant2_id: row.try_get("participant2_id")?,
        winner_id: row.try_get("winner_id")?,
        status: status.parse().map_err(BracketError::Corrupt)?,
        completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
    })
}

fn tournament_from_row(row: &PgRow) -> BracketResult<Tournament> {
    let status: String = row.try_get("status")?;
    let winner_user_id: Option<i64> = row.try_get("winner_user_id")?;
    let winner_team_id: Option<i64> = row.try_get("winner_team_id")?;

    let champion = match (winner_user_id, winner_team_id) {
        (_, Some(id)) => Some(Champion::Team {
            id,
            name: row
                .try_get::<Option<String>, _>("winner_team_name")?
                .unwrap_or_default(),
        }),
        (Some(id), None) => Some(Champion::User {
            id,
            name: row
                .try_get::<Option<String>, _>("winner_name")?
                .unwrap_or_default(),
        }),
        (None, None) => None,
    };

    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        organizer_id: row.try_get("organizer_id")?,
        is_team_based: row.try_get("is_team_based")?,
        status: status.parse().map_err(BracketError::Corrupt)?,
        champion,
        completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
    })
}
