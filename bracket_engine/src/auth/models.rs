//! Caller identity and the organizer capability.

use super::errors::{AuthError, AuthResult};
use crate::bracket::errors::{BracketError, BracketResult};
use crate::tournament::{Tournament, TournamentId, UserId};
use serde::{Deserialize, Serialize};

/// JWT claims for access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,           // User ID
    pub username: String,
    pub is_admin: bool,
    pub exp: i64,              // Expiration timestamp
    pub iat: i64,              // Issued at timestamp
}

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Caller {
    /// Grant the organizer capability for `tournament` if the caller
    /// organizes it or is an admin.
    pub fn authorize(&self, tournament: &Tournament) -> AuthResult<OrganizerCapability> {
        if self.is_admin || tournament.organizer_id == self.user_id {
            Ok(OrganizerCapability {
                tournament_id: tournament.id,
                caller: *self,
            })
        } else {
            Err(AuthError::NotOrganizer {
                user_id: self.user_id,
                tournament_id: tournament.id,
            })
        }
    }
}

impl From<&AccessTokenClaims> for Caller {
    fn from(claims: &AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            is_admin: claims.is_admin,
        }
    }
}

/// Permission to mutate the bracket of one tournament.
///
/// Only [`Caller::authorize`] creates one, so holding it proves the check ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizerCapability {
    tournament_id: TournamentId,
    caller: Caller,
}

impl OrganizerCapability {
    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }

    pub fn caller(&self) -> Caller {
        self.caller
    }

    /// Fail unless the capability was granted for `tournament_id`
    pub fn ensure_covers(&self, tournament_id: TournamentId) -> BracketResult<()> {
        if self.tournament_id == tournament_id {
            Ok(())
        } else {
            Err(BracketError::Forbidden(tournament_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::TournamentStatus;

    fn tournament() -> Tournament {
        Tournament {
            id: 3,
            name: "Club Night".to_string(),
            organizer_id: 20,
            is_team_based: false,
            status: TournamentStatus::Open,
            champion: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_organizer_is_authorized() {
        let caller = Caller {
            user_id: 20,
            is_admin: false,
        };
        let capability = caller.authorize(&tournament()).unwrap();
        assert_eq!(capability.tournament_id(), 3);
        assert!(capability.ensure_covers(3).is_ok());
        assert!(matches!(
            capability.ensure_covers(4),
            Err(BracketError::Forbidden(4))
        ));
    }

    #[test]
    fn test_admin_is_authorized() {
        let caller = Caller {
            user_id: 99,
            is_admin: true,
        };
        assert!(caller.authorize(&tournament()).is_ok());
    }

    #[test]
    fn test_other_user_is_rejected() {
        let caller = Caller {
            user_id: 21,
            is_admin: false,
        };
        let err = caller.authorize(&tournament()).unwrap_err();
        assert!(matches!(
            err,
            AuthError::NotOrganizer {
                user_id: 21,
                tournament_id: 3
            }
        ));
    }
}
