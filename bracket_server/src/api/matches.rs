//! Match-level API handlers.
//!
//! Record a winner:
//! ```bash
//! curl -X POST http://localhost:3000/api/v1/matches/3/winner \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"winner_id": 101}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
};
use bracket_engine::auth::Caller;
use bracket_engine::tournament::EntrantId;
use bracket_engine::{BracketCommand, CommandOutcome, MatchId};
use serde::Deserialize;

use super::errors::ApiError;
use super::request_id::RequestId;
use super::{AppState, run_command};

#[derive(Debug, Deserialize)]
pub struct SetWinnerRequest {
    pub winner_id: EntrantId,
}

/// Record the winner of a scheduled match and advance them.
///
/// # Errors
///
/// - `400 Bad Request`: Winner is not a participant, or match not ready
/// - `409 Conflict`: Match already decided or changed concurrently
pub async fn set_match_winner(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Extension(caller): Extension<Caller>,
    request_id: RequestId,
    Json(request): Json<SetWinnerRequest>,
) -> Result<Json<CommandOutcome>, ApiError> {
    let outcome = run_command(
        &state,
        &request_id,
        caller,
        BracketCommand::SetMatchWinner {
            match_id,
            winner_id: request.winner_id,
        },
    )
    .await?;
    Ok(Json(outcome))
}

/// Undo a match result and withdraw the winner from the next round.
pub async fn reset_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Extension(caller): Extension<Caller>,
    request_id: RequestId,
) -> Result<Json<CommandOutcome>, ApiError> {
    let outcome = run_command(
        &state,
        &request_id,
        caller,
        BracketCommand::ResetMatch { match_id },
    )
    .await?;
    Ok(Json(outcome))
}

/// Undo a match result along with every later result that depended on it.
pub async fn reset_match_cascading(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Extension(caller): Extension<Caller>,
    request_id: RequestId,
) -> Result<Json<CommandOutcome>, ApiError> {
    let outcome = run_command(
        &state,
        &request_id,
        caller,
        BracketCommand::ResetMatchCascading { match_id },
    )
    .await?;
    Ok(Json(outcome))
}
