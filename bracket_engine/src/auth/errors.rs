//! Authorization error types.

use crate::tournament::{TournamentId, UserId};
use thiserror::Error;

/// Authorization errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token presented
    #[error("Missing access token")]
    MissingToken,

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Caller is neither the organizer nor an admin
    #[error("User {user_id} may not manage tournament {tournament_id}")]
    NotOrganizer {
        user_id: UserId,
        tournament_id: TournamentId,
    },
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// JWT errors are sanitized to prevent disclosure of token structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            AuthError::NotOrganizer { .. } => {
                "Only the organizer or an admin may manage this tournament".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for authorization operations
pub type AuthResult<T> = Result<T, AuthError>;
