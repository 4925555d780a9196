//! Tournament-level bracket API handlers.
//!
//! # Examples
//!
//! View a bracket:
//! ```bash
//! curl http://localhost:3000/api/v1/tournaments/1/bracket
//! ```
//!
//! Finalize a tournament:
//! ```bash
//! curl -X POST http://localhost:3000/api/v1/tournaments/1/finalize \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"final_match_id": 7, "winner_id": 101}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use bracket_engine::auth::Caller;
use bracket_engine::tournament::{EntrantId, TournamentId};
use bracket_engine::{BracketCommand, BracketView, CommandOutcome, MatchId};
use serde::Deserialize;

use super::errors::ApiError;
use super::request_id::RequestId;
use super::{AppState, run_command};

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub final_match_id: MatchId,
    pub winner_id: EntrantId,
}

/// Current bracket of a tournament, grouped by round.
///
/// # Errors
///
/// - `404 Not Found`: Unknown tournament or bracket not built yet
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<BracketView>, ApiError> {
    let view = state.bracket_manager.get_bracket(tournament_id).await?;
    Ok(Json(view))
}

/// Build the bracket from the tournament's confirmed entrants.
///
/// # Errors
///
/// - `400 Bad Request`: Fewer than two confirmed entrants, bracket already built, tournament closed
/// - `403 Forbidden`: Caller is not the organizer
/// - `404 Not Found`: Unknown tournament
pub async fn build_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Extension(caller): Extension<Caller>,
    request_id: RequestId,
) -> Result<(StatusCode, Json<CommandOutcome>), ApiError> {
    let outcome = run_command(
        &state,
        &request_id,
        caller,
        BracketCommand::BuildBracket { tournament_id },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Reset every match, restoring the freshly built bracket.
pub async fn reset_all_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Extension(caller): Extension<Caller>,
    request_id: RequestId,
) -> Result<Json<CommandOutcome>, ApiError> {
    let outcome = run_command(
        &state,
        &request_id,
        caller,
        BracketCommand::ResetAllMatches { tournament_id },
    )
    .await?;
    Ok(Json(outcome))
}

/// Close the tournament with the winner of its final match.
///
/// # Errors
///
/// - `400 Bad Request`: Not the final match, or winner not a participant
/// - `409 Conflict`: Tournament already completed
pub async fn finalize_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Extension(caller): Extension<Caller>,
    request_id: RequestId,
    Json(request): Json<FinalizeRequest>,
) -> Result<Json<CommandOutcome>, ApiError> {
    let outcome = run_command(
        &state,
        &request_id,
        caller,
        BracketCommand::FinalizeTournament {
            tournament_id,
            final_match_id: request.final_match_id,
            winner_id: request.winner_id,
        },
    )
    .await?;
    Ok(Json(outcome))
}
