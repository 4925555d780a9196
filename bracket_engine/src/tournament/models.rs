//! Tournament and entrant data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tournament ID type
pub type TournamentId = i64;

/// User ID type (organizers, admins and individual entrants)
pub type UserId = i64;

/// Entrant ID type: a user id for individual tournaments, a team id for team tournaments
pub type EntrantId = i64;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Being set up by the organizer
    Draft,
    /// Accepting registrations
    Open,
    /// Registration closed, bracket not yet played
    RegistrationClosed,
    /// Bracket built and being played
    Ongoing,
    /// Champion decided
    Completed,
    /// Tournament cancelled
    Cancelled,
}

impl TournamentStatus {
    /// Column value used in the `tournaments.status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::Open => "open",
            TournamentStatus::RegistrationClosed => "registration_closed",
            TournamentStatus::Ongoing => "ongoing",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the bracket can still be mutated
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            TournamentStatus::Completed | TournamentStatus::Cancelled
        )
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TournamentStatus::Draft),
            "open" => Ok(TournamentStatus::Open),
            "registration_closed" => Ok(TournamentStatus::RegistrationClosed),
            "ongoing" => Ok(TournamentStatus::Ongoing),
            "completed" => Ok(TournamentStatus::Completed),
            "cancelled" => Ok(TournamentStatus::Cancelled),
            other => Err(format!("unknown tournament status '{other}'")),
        }
    }
}

/// Tournament champion.
///
/// Individual and team tournaments record their winner in different columns,
/// so the variant is chosen from `Tournament::is_team_based`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Champion {
    /// Winner of an individual tournament
    User { id: UserId, name: String },
    /// Winner of a team tournament
    Team { id: EntrantId, name: String },
}

impl Champion {
    /// Pick the champion variant for a tournament
    pub fn for_tournament(tournament: &Tournament, entrant: &Entrant) -> Self {
        if tournament.is_team_based {
            Champion::Team {
                id: entrant.id,
                name: entrant.name.clone(),
            }
        } else {
            Champion::User {
                id: entrant.id,
                name: entrant.name.clone(),
            }
        }
    }

    /// Display name of the champion
    pub fn name(&self) -> &str {
        match self {
            Champion::User { name, .. } | Champion::Team { name, .. } => name,
        }
    }

    /// Value for the `winner_user_id` column
    pub fn winner_user_id(&self) -> Option<UserId> {
        match self {
            Champion::User { id, .. } => Some(*id),
            Champion::Team { .. } => None,
        }
    }

    /// Value for the `winner_team_id` column
    pub fn winner_team_id(&self) -> Option<EntrantId> {
        match self {
            Champion::Team { id, .. } => Some(*id),
            Champion::User { .. } => None,
        }
    }
}

/// Tournament as seen by the bracket engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: TournamentId,
    /// Tournament name
    pub name: String,
    /// User that organizes the tournament
    pub organizer_id: UserId,
    /// Whether entrants are teams rather than individual users
    pub is_team_based: bool,
    /// Current status
    pub status: TournamentStatus,
    /// Champion, once finalized
    pub champion: Option<Champion>,
    /// Completion timestamp
    pub completed_at: Option<DateTime<Utc>>,
}

/// A confirmed participant or team.
///
/// The engine only orders entrants by registration time and counts them;
/// the name is read when a champion is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    /// User ID or team ID
    pub id: EntrantId,
    /// Display name (username or team name)
    pub name: String,
    /// Registration timestamp, the seeding order
    pub registered_at: DateTime<Utc>,
}

impl Entrant {
    /// Create a new entrant
    pub fn new(id: EntrantId, name: impl Into<String>, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            registered_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tournament(is_team_based: bool) -> Tournament {
        Tournament {
            id: 1,
            name: "Spring Cup".to_string(),
            organizer_id: 10,
            is_team_based,
            status: TournamentStatus::Ongoing,
            champion: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_status_round_trips_through_column_value() {
        for status in [
            TournamentStatus::Draft,
            TournamentStatus::Open,
            TournamentStatus::RegistrationClosed,
            TournamentStatus::Ongoing,
            TournamentStatus::Completed,
            TournamentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TournamentStatus>(), Ok(status));
        }
        assert!("finished".parse::<TournamentStatus>().is_err());
    }

    #[test]
    fn test_closed_statuses() {
        assert!(TournamentStatus::Completed.is_closed());
        assert!(TournamentStatus::Cancelled.is_closed());
        assert!(!TournamentStatus::Ongoing.is_closed());
        assert!(!TournamentStatus::RegistrationClosed.is_closed());
    }

    #[test]
    fn test_champion_for_team_tournament() {
        let entrant = Entrant::new(7, "Red Foxes", Utc::now());
        let champion = Champion::for_tournament(&tournament(true), &entrant);
        assert_eq!(champion.winner_team_id(), Some(7));
        assert_eq!(champion.winner_user_id(), None);
        assert_eq!(champion.name(), "Red Foxes");
    }

    #[test]
    fn test_champion_for_individual_tournament() {
        let entrant = Entrant::new(42, "alice", Utc::now());
        let champion = Champion::for_tournament(&tournament(false), &entrant);
        assert_eq!(champion.winner_user_id(), Some(42));
        assert_eq!(champion.winner_team_id(), None);
    }
}
