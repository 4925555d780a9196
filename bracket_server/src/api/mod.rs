//! HTTP API for the bracket service.
//!
//! # Modules
//!
//! - [`brackets`]: Tournament-level endpoints (view, build, reset all, finalize)
//! - [`matches`]: Match-level endpoints (record winner, reset)
//! - [`middleware`]: Access token middleware for organizer endpoints
//! - [`errors`]: Mapping of engine errors to HTTP responses
//! - [`request_id`]: Request correlation and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET /health` - Service health status
//! - `GET /api/v1/tournaments/{id}/bracket` - Bracket grouped by round
//!
//! ## Organizer (Bearer token required)
//! - `POST /api/v1/tournaments/{id}/bracket` - Build the bracket
//! - `POST /api/v1/tournaments/{id}/matches/reset` - Reset every match
//! - `POST /api/v1/tournaments/{id}/finalize` - Close with a champion
//! - `POST /api/v1/matches/{id}/winner` - Record a match winner
//! - `POST /api/v1/matches/{id}/reset` - Reset one match
//! - `POST /api/v1/matches/{id}/reset-cascading` - Reset a match and its dependents
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bracket_engine::auth::TokenVerifier;
//! use bracket_engine::db::InMemoryBracketRepository;
//! use bracket_engine::BracketManager;
//! use bracket_server::api::{create_router, AppState};
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let state = AppState {
//!     bracket_manager: Arc::new(BracketManager::new(Arc::new(
//!         InMemoryBracketRepository::new(),
//!     ))),
//!     token_verifier: Arc::new(TokenVerifier::new("jwt_secret_shared_with_auth_service")),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod brackets;
pub mod errors;
pub mod matches;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use bracket_engine::auth::{Caller, TokenVerifier};
use bracket_engine::{BracketCommand, BracketManager, CommandOutcome};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

use crate::{logging, metrics};
use errors::ApiError;
use request_id::RequestId;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub bracket_manager: Arc<BracketManager>,
    pub token_verifier: Arc<TokenVerifier>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET  /health                                   - Health check (public)
/// GET  /api/v1/tournaments/{id}/bracket          - View bracket (public)
/// POST /api/v1/tournaments/{id}/bracket          - Build bracket (organizer)
/// POST /api/v1/tournaments/{id}/matches/reset    - Reset all matches (organizer)
/// POST /api/v1/tournaments/{id}/finalize         - Finalize tournament (organizer)
/// POST /api/v1/matches/{id}/winner               - Set match winner (organizer)
/// POST /api/v1/matches/{id}/reset                - Reset match (organizer)
/// POST /api/v1/matches/{id}/reset-cascading      - Reset match and dependents (organizer)
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new().route(
        "/tournaments/{tournament_id}/bracket",
        get(brackets::get_bracket),
    );

    let protected_routes = Router::new()
        .route(
            "/tournaments/{tournament_id}/bracket",
            post(brackets::build_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/matches/reset",
            post(brackets::reset_all_matches),
        )
        .route(
            "/tournaments/{tournament_id}/finalize",
            post(brackets::finalize_tournament),
        )
        .route("/matches/{match_id}/winner", post(matches::set_match_winner))
        .route("/matches/{match_id}/reset", post(matches::reset_match))
        .route(
            "/matches/{match_id}/reset-cascading",
            post(matches::reset_match_cascading),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Authorize `caller` for the tournament `command` acts on, then execute it.
///
/// Shared by every organizer endpoint so authorization, logging and metrics
/// are applied the same way.
pub(crate) async fn run_command(
    state: &AppState,
    request_id: &RequestId,
    caller: Caller,
    command: BracketCommand,
) -> Result<CommandOutcome, ApiError> {
    let started = Instant::now();
    let operation = command.name();

    let tournament = state
        .bracket_manager
        .owning_tournament(&command)
        .await
        .inspect_err(|err| metrics::record_failure(operation, err))?;

    let capability = caller.authorize(&tournament).map_err(|err| {
        logging::log_security_event(
            "not_organizer",
            Some(caller.user_id),
            Some(tournament.id),
            &err.to_string(),
        );
        metrics::authorization_denied_total("not_organizer");
        ApiError::from(err)
    })?;

    let result = state.bracket_manager.execute(&capability, command).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(outcome) => {
            metrics::record_outcome(outcome);
            logging::log_bracket_operation(
                request_id.as_str(),
                operation,
                tournament.id,
                caller.user_id,
                duration_ms,
                None,
            );
        }
        Err(err) => {
            metrics::record_failure(operation, err);
            logging::log_bracket_operation(
                request_id.as_str(),
                operation,
                tournament.id,
                caller.user_id,
                duration_ms,
                Some(&err.to_string()),
            );
        }
    }

    Ok(result?)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if storage is reachable, or `503 Service Unavailable`
/// otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","database":true,"version":"1.0.0","timestamp":"2026-03-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.bracket_manager.health_check().await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!("Health check failed: {}", err);
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
