//! # Bracket Engine
//!
//! Single-elimination bracket engine for tournaments with individual or team
//! entrants.
//!
//! Given the confirmed entrants of a tournament, the engine builds the full
//! bracket (byes included), advances winners round by round, resets results,
//! and closes the tournament with its champion. All bracket math runs on an
//! in-memory [`Bracket`]; each operation yields a [`ChangeSet`] that a
//! [`BracketRepository`](db::BracketRepository) applies in one transaction.
//!
//! ## Core Modules
//!
//! - [`bracket`]: shape, builder, resolver, reset, finalizer and the manager
//! - [`tournament`]: tournament, entrant and champion models
//! - [`auth`]: access token verification and the organizer capability
//! - [`db`]: PostgreSQL pool, migrations and repositories
//!
//! ## Example
//!
//! ```
//! use bracket_engine::bracket::plan_bracket;
//! use bracket_engine::tournament::Entrant;
//! use chrono::Utc;
//!
//! let entrants: Vec<Entrant> = (1..=5)
//!     .map(|id| Entrant::new(id, format!("player{id}"), Utc::now()))
//!     .collect();
//! let plan = plan_bracket(&entrants).unwrap();
//! assert_eq!(plan.shape.rounds(), 3);
//! assert_eq!(plan.bye_count(), 3);
//! ```

/// Access token verification and authorization.
pub mod auth;

/// Bracket math, operations and the manager that runs them.
pub mod bracket;
pub use bracket::{
    Advancement, Bracket, BracketCommand, BracketError, BracketManager, BracketResult,
    BracketView, ChangeSet, CommandOutcome, ErrorKind, Match, MatchId, MatchStatus,
};

/// Database connection, migrations and repositories.
pub mod db;

/// Tournament and entrant models.
pub mod tournament;
pub use tournament::{Champion, Entrant, EntrantId, Tournament, TournamentId, TournamentStatus};
