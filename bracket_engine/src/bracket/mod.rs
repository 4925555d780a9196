//! Single-elimination bracket engine.
//!
//! - [`builder`]: turns confirmed entrants into the full set of match rows
//! - [`resolver`]: records winners and advances them to the next round
//! - [`reset`]: reopens matches and clears results
//! - [`finalizer`]: closes a tournament with its champion
//! - [`manager`]: runs these against a [`BracketRepository`](crate::db::BracketRepository)

pub mod builder;
pub mod changes;
pub mod commands;
pub mod errors;
pub mod finalizer;
pub mod manager;
pub mod models;
pub mod reset;
pub mod resolver;
pub mod shape;
pub mod view;

pub use builder::{BracketPlan, PlannedMatch, plan_bracket};
pub use changes::{ChangeSet, MatchChange, TournamentChange};
pub use commands::{BracketCommand, BuildSummary, CommandOutcome, ResetSummary};
pub use errors::{BracketError, BracketResult, ErrorKind};
pub use manager::BracketManager;
pub use models::{Match, MatchId, MatchStatus, Slot};
pub use resolver::{Advancement, Bracket};
pub use shape::{BracketShape, Destination};
pub use view::{BracketView, RoundView};
