//! Tournament, entrant and champion models consumed by the bracket engine.
//!
//! Tournaments are created and registered for by external collaborators.
//! The bracket engine reads them, moves an open tournament to `ongoing` when
//! its bracket is built, and closes it with a champion when finalized.

pub mod models;

pub use models::{
    Champion, Entrant, EntrantId, Tournament, TournamentId, TournamentStatus, UserId,
};
