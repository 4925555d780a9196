//! Authorization for bracket operations.
//!
//! Authentication itself (registration, login, token issuing) lives in an
//! external service. This module verifies the access tokens it issues and
//! turns an authenticated [`Caller`] into an [`OrganizerCapability`], which
//! every mutating bracket operation requires.
//!
//! ## Example
//!
//! ```no_run
//! use bracket_engine::auth::{Caller, TokenVerifier};
//! # use bracket_engine::tournament::Tournament;
//! # fn example(token: &str, tournament: &Tournament) -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = TokenVerifier::new("jwt_secret_shared_with_auth_service");
//! let caller: Caller = verifier.caller(token)?;
//! let capability = caller.authorize(tournament)?;
//! println!("May manage tournament {}", capability.tournament_id());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod models;
pub mod verifier;

pub use errors::{AuthError, AuthResult};
pub use models::{AccessTokenClaims, Caller, OrganizerCapability};
pub use verifier::TokenVerifier;
