//! Integration tests for the bracket manager.
//!
//! These tests drive full tournaments through `BracketManager` backed by the
//! in-memory repository: build, advancement, resets and finalization.

use bracket_engine::auth::{Caller, OrganizerCapability};
use bracket_engine::bracket::{
    Advancement, Bracket, BracketCommand, BracketError, BracketManager, BracketPlan,
    BracketResult, ChangeSet, CommandOutcome, ErrorKind, Match, MatchChange, MatchId,
    MatchStatus, Slot,
};
use bracket_engine::db::{BracketRepository, InMemoryBracketRepository};
use bracket_engine::tournament::{
    Champion, Entrant, Tournament, TournamentId, TournamentStatus,
};
use chrono::{Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

const ORGANIZER: i64 = 42;

fn tournament(id: i64, is_team_based: bool) -> Tournament {
    Tournament {
        id,
        name: format!("Tournament {id}"),
        organizer_id: ORGANIZER,
        is_team_based,
        status: TournamentStatus::RegistrationClosed,
        champion: None,
        completed_at: None,
    }
}

/// Tournament `id` with `count` confirmed entrants, ids 101.., registered a
/// minute apart in id order
async fn seed(repo: &InMemoryBracketRepository, id: i64, count: i64, is_team_based: bool) {
    repo.insert_tournament(tournament(id, is_team_based)).await;
    let start = Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap();
    for n in 1..=count {
        let entrant = Entrant::new(100 + n, format!("player{n}"), start + Duration::minutes(n));
        repo.register(id, entrant, true).await;
    }
}

async fn setup(
    count: i64,
    is_team_based: bool,
) -> (
    BracketManager,
    Arc<InMemoryBracketRepository>,
    OrganizerCapability,
) {
    let repo = Arc::new(InMemoryBracketRepository::new());
    seed(&repo, 1, count, is_team_based).await;
    let manager = BracketManager::new(repo.clone());
    let capability = organizer()
        .authorize(&tournament(1, is_team_based))
        .expect("organizer is authorized");
    (manager, repo, capability)
}

fn organizer() -> Caller {
    Caller {
        user_id: ORGANIZER,
        is_admin: false,
    }
}

/// Match ID at a bracket position
async fn match_at(manager: &BracketManager, round: u32, match_number: u32) -> i64 {
    let view = manager.get_bracket(1).await.expect("bracket exists");
    view.round(round)
        .and_then(|r| r.matches.iter().find(|m| m.match_number == match_number))
        .map(|m| m.id)
        .expect("position exists")
}

#[tokio::test]
async fn test_five_entrant_bracket_full_trace() {
    let (manager, repo, capability) = setup(5, false).await;

    let summary = manager.build_bracket(&capability, 1).await.unwrap();
    assert_eq!(summary.rounds, 3);
    assert_eq!(summary.bracket_size, 8);
    assert_eq!(summary.entrants, 5);
    assert_eq!(summary.byes, 3);
    assert_eq!(summary.matches_created, 7);

    let view = manager.get_bracket(1).await.unwrap();
    assert_eq!(view.tournament.status, TournamentStatus::Ongoing);
    let round1 = &view.round(1).unwrap().matches;
    assert_eq!(round1.len(), 4);

    // Entrant 5 (id 105) is paired with an empty slot in match 4
    let m4 = &round1[3];
    assert_eq!(m4.match_number, 4);
    assert_eq!(m4.participant1_id, Some(105));
    assert_eq!(m4.participant2_id, None);
    assert_eq!(m4.status, MatchStatus::Bye);
    assert_eq!(m4.winner_id, Some(105));

    // ceil(4 / 2) = 2, even feeder -> slot two of round-2 match 2
    let r2m2 = view
        .round(2)
        .unwrap()
        .matches
        .iter()
        .find(|m| m.match_number == 2)
        .unwrap();
    assert_eq!(r2m2.participant2_id, Some(105));
    assert_eq!(r2m2.participant1_id, Some(104));
    let r2m1 = &view.round(2).unwrap().matches[0];
    assert_eq!(r2m1.participant1_id, None);
    assert_eq!(r2m1.participant2_id, Some(103));

    // Play it out
    let m1 = match_at(&manager, 1, 1).await;
    let r2m1_id = match_at(&manager, 2, 1).await;
    let r2m2_id = match_at(&manager, 2, 2).await;
    let final_id = match_at(&manager, 3, 1).await;

    let advancement = manager.set_match_winner(&capability, m1, 101).await.unwrap();
    assert_eq!(
        advancement,
        Advancement::Advanced {
            match_id: r2m1_id,
            slot: Slot::One
        }
    );
    manager.set_match_winner(&capability, r2m1_id, 103).await.unwrap();
    manager.set_match_winner(&capability, r2m2_id, 105).await.unwrap();

    let final_match = repo.find_match(final_id).await.unwrap().unwrap();
    assert_eq!(final_match.participant1_id, Some(103));
    assert_eq!(final_match.participant2_id, Some(105));

    let champion = manager
        .finalize_tournament(&capability, 1, final_id, 105)
        .await
        .unwrap();
    assert_eq!(
        champion,
        Champion::User {
            id: 105,
            name: "player5".to_string()
        }
    );

    let stored = repo.find_tournament(1).await.unwrap().unwrap();
    assert_eq!(stored.status, TournamentStatus::Completed);
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.champion.as_ref().and_then(Champion::winner_user_id), Some(105));
    assert_eq!(stored.champion.as_ref().and_then(Champion::winner_team_id), None);
}

#[tokio::test]
async fn test_team_tournament_records_team_champion() {
    let (manager, repo, capability) = setup(2, true).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let final_id = match_at(&manager, 1, 1).await;

    let champion = manager
        .finalize_tournament(&capability, 1, final_id, 102)
        .await
        .unwrap();
    assert_eq!(champion.winner_team_id(), Some(102));
    assert_eq!(champion.winner_user_id(), None);

    let stored = repo.find_tournament(1).await.unwrap().unwrap();
    let champion = stored.champion.expect("champion recorded");
    assert!(matches!(champion, Champion::Team { id: 102, .. }));
    assert_eq!(champion.name(), "player2");
}

#[tokio::test]
async fn test_build_preconditions() {
    let (manager, repo, capability) = setup(1, false).await;
    repo.register(
        1,
        Entrant::new(500, "pending", Utc::now()),
        false,
    )
    .await;

    let err = manager.build_bracket(&capability, 1).await.unwrap_err();
    assert!(matches!(err, BracketError::InsufficientEntrants(1)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    repo.register(1, Entrant::new(501, "late", Utc::now()), true)
        .await;
    manager.build_bracket(&capability, 1).await.unwrap();

    let err = manager.build_bracket(&capability, 1).await.unwrap_err();
    assert!(matches!(err, BracketError::AlreadyExists(1)));

    let admin = Caller {
        user_id: 1,
        is_admin: true,
    };
    let missing = tournament(99, false);
    let capability = admin.authorize(&missing).unwrap();
    let err = manager.build_bracket(&capability, 99).await.unwrap_err();
    assert!(matches!(err, BracketError::TournamentNotFound(99)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_build_rejects_cancelled_tournament() {
    let (manager, repo, capability) = setup(4, false).await;
    repo.set_status(1, TournamentStatus::Cancelled).await.unwrap();

    let err = manager.build_bracket(&capability, 1).await.unwrap_err();
    assert!(matches!(
        err,
        BracketError::InvalidTournamentState {
            tournament_id: 1,
            status: TournamentStatus::Cancelled
        }
    ));
    assert!(repo.list_matches(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_second_winner_is_a_conflict() {
    let (manager, _repo, capability) = setup(4, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let m1 = match_at(&manager, 1, 1).await;

    manager.set_match_winner(&capability, m1, 101).await.unwrap();
    let err = manager
        .set_match_winner(&capability, m1, 102)
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::NotScheduled(id) if id == m1));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

/// Bracket as currently stored, for computing change sets by hand
async fn snapshot(repo: &InMemoryBracketRepository) -> Bracket {
    Bracket::new(1, repo.list_matches(1).await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_winners_computed_from_one_read_conflict() {
    let (manager, repo, capability) = setup(4, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let m1 = match_at(&manager, 1, 1).await;

    // Two organizers load the same bracket and pick different winners
    let mut first = snapshot(&repo).await;
    let mut second = first.clone();
    let (first_changes, _) = first.set_winner(m1, 101, Utc::now()).unwrap();
    let (second_changes, _) = second.set_winner(m1, 102, Utc::now()).unwrap();

    repo.apply_changes(&first_changes).await.unwrap();
    let after_first = repo.list_matches(1).await.unwrap();

    let err = repo.apply_changes(&second_changes).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(repo.list_matches(1).await.unwrap(), after_first);
}

#[tokio::test]
async fn test_reset_all_from_stale_read_is_rejected() {
    let (manager, repo, capability) = setup(4, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let m1 = match_at(&manager, 1, 1).await;
    let m2 = match_at(&manager, 1, 2).await;
    let final_id = match_at(&manager, 2, 1).await;
    manager.set_match_winner(&capability, m1, 101).await.unwrap();

    let stale = snapshot(&repo).await.reset_all().unwrap();
    manager.set_match_winner(&capability, m2, 103).await.unwrap();

    let err = repo.apply_changes(&stale).await.unwrap_err();
    assert!(matches!(err, BracketError::StaleBracket(1)));

    // Both winners still stand and both reached the final
    let played = repo.find_match(m2).await.unwrap().unwrap();
    assert_eq!(played.status, MatchStatus::Completed);
    assert_eq!(played.winner_id, Some(103));
    let final_match = repo.find_match(final_id).await.unwrap().unwrap();
    assert_eq!(final_match.participant1_id, Some(101));
    assert_eq!(final_match.participant2_id, Some(103));
}

#[tokio::test]
async fn test_finalize_from_stale_read_is_rejected() {
    let (manager, repo, capability) = setup(2, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let final_id = match_at(&manager, 1, 1).await;
    manager
        .set_match_winner(&capability, final_id, 101)
        .await
        .unwrap();

    let tournament = repo.find_tournament(1).await.unwrap().unwrap();
    let entrants = repo.confirmed_entrants(&tournament).await.unwrap();
    let (stale, _) = snapshot(&repo)
        .await
        .finalize(&tournament, &entrants, final_id, 101, Utc::now())
        .unwrap();
    assert!(stale.matches.is_empty());

    manager.reset_match(&capability, final_id).await.unwrap();

    let err = repo.apply_changes(&stale).await.unwrap_err();
    assert!(matches!(err, BracketError::StaleBracket(1)));
    let stored = repo.find_tournament(1).await.unwrap().unwrap();
    assert_eq!(stored.status, TournamentStatus::Ongoing);
    assert!(stored.champion.is_none());
}

/// Repository that lets another change set commit just before the next
/// apply, as a concurrent request would
struct RacingRepository {
    inner: Arc<InMemoryBracketRepository>,
    pending: Mutex<Option<ChangeSet>>,
}

impl RacingRepository {
    fn race_with(&self, changes: ChangeSet) {
        *self.pending.lock().unwrap() = Some(changes);
    }
}

#[async_trait::async_trait]
impl BracketRepository for RacingRepository {
    async fn find_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<Tournament>> {
        self.inner.find_tournament(tournament_id).await
    }

    async fn confirmed_entrants(&self, tournament: &Tournament) -> BracketResult<Vec<Entrant>> {
        self.inner.confirmed_entrants(tournament).await
    }

    async fn find_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        self.inner.find_match(match_id).await
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        self.inner.list_matches(tournament_id).await
    }

    async fn insert_bracket(
        &self,
        tournament_id: TournamentId,
        plan: &BracketPlan,
    ) -> BracketResult<Vec<Match>> {
        self.inner.insert_bracket(tournament_id, plan).await
    }

    async fn apply_changes(&self, changes: &ChangeSet) -> BracketResult<()> {
        let pending = self.pending.lock().unwrap().take();
        if let Some(other) = pending {
            self.inner.apply_changes(&other).await?;
        }
        self.inner.apply_changes(changes).await
    }

    async fn ping(&self) -> BracketResult<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn test_reset_all_racing_a_winner_is_a_conflict() {
    let (manager, repo, capability) = setup(4, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let m1 = match_at(&manager, 1, 1).await;
    let m2 = match_at(&manager, 1, 2).await;
    let final_id = match_at(&manager, 2, 1).await;
    manager.set_match_winner(&capability, m1, 101).await.unwrap();

    let racing = Arc::new(RacingRepository {
        inner: repo.clone(),
        pending: Mutex::new(None),
    });
    let (concurrent, _) = snapshot(&repo)
        .await
        .set_winner(m2, 103, Utc::now())
        .unwrap();
    racing.race_with(concurrent);

    let err = BracketManager::new(racing)
        .reset_all_matches(&capability, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::StaleBracket(1)));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // The winner that got in first is kept whole
    let final_match = repo.find_match(final_id).await.unwrap().unwrap();
    assert_eq!(final_match.participant1_id, Some(101));
    assert_eq!(final_match.participant2_id, Some(103));

    // Retrying on the new rows clears both results
    let summary = manager.reset_all_matches(&capability, 1).await.unwrap();
    assert_eq!(summary.changes, 3);
    for match_id in [m1, m2] {
        let reopened = repo.find_match(match_id).await.unwrap().unwrap();
        assert_eq!(reopened.status, MatchStatus::Scheduled);
        assert_eq!(reopened.winner_id, None);
    }
    let final_match = repo.find_match(final_id).await.unwrap().unwrap();
    assert_eq!(final_match.participant1_id, None);
    assert_eq!(final_match.participant2_id, None);
}

#[tokio::test]
async fn test_invalid_winner_never_mutates() {
    let (manager, _repo, capability) = setup(4, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let before = manager.get_bracket(1).await.unwrap();
    let m1 = match_at(&manager, 1, 1).await;

    let err = manager
        .set_match_winner(&capability, m1, 103)
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::InvalidWinner { winner_id: 103, .. }));
    assert_eq!(manager.get_bracket(1).await.unwrap(), before);
}

#[tokio::test]
async fn test_failed_change_set_is_rolled_back() {
    let (manager, repo, capability) = setup(4, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let m1 = match_at(&manager, 1, 1).await;
    let m2 = match_at(&manager, 1, 2).await;
    let before = repo.list_matches(1).await.unwrap();

    // First change is valid, second names a non-participant
    let mut changes = ChangeSet::new(1);
    changes.matches.push(MatchChange::Complete {
        match_id: m1,
        winner_id: 101,
        completed_at: Utc::now(),
    });
    changes.matches.push(MatchChange::Complete {
        match_id: m2,
        winner_id: 101,
        completed_at: Utc::now(),
    });

    assert!(repo.apply_changes(&changes).await.is_err());
    assert_eq!(repo.list_matches(1).await.unwrap(), before);
}

#[tokio::test]
async fn test_reset_then_replay_reproduces_downstream_state() {
    let (manager, repo, capability) = setup(8, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let m3 = match_at(&manager, 1, 3).await;
    let r2m2 = match_at(&manager, 2, 2).await;

    manager.set_match_winner(&capability, m3, 106).await.unwrap();
    let played = repo.find_match(r2m2).await.unwrap().unwrap();
    assert_eq!(played.participant1_id, Some(106));

    let summary = manager.reset_match(&capability, m3).await.unwrap();
    assert_eq!(summary.changes, 2);
    let cleared = repo.find_match(r2m2).await.unwrap().unwrap();
    assert_eq!(cleared.participant1_id, None);
    let reopened = repo.find_match(m3).await.unwrap().unwrap();
    assert_eq!(reopened.status, MatchStatus::Scheduled);
    assert_eq!(reopened.winner_id, None);
    assert_eq!(reopened.completed_at, None);

    manager.set_match_winner(&capability, m3, 106).await.unwrap();
    assert_eq!(repo.find_match(r2m2).await.unwrap().unwrap(), played);
}

#[tokio::test]
async fn test_reset_bye_and_unplayed_match() {
    let (manager, _repo, capability) = setup(3, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let m1 = match_at(&manager, 1, 1).await;
    let bye = match_at(&manager, 1, 2).await;

    let err = manager.reset_match(&capability, bye).await.unwrap_err();
    assert!(matches!(err, BracketError::ByeNotResettable(id) if id == bye));

    let summary = manager.reset_match(&capability, m1).await.unwrap();
    assert_eq!(summary.changes, 0);
}

#[tokio::test]
async fn test_cascading_reset_reopens_downstream_matches() {
    let (manager, repo, capability) = setup(4, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let m1 = match_at(&manager, 1, 1).await;
    let m2 = match_at(&manager, 1, 2).await;
    let final_id = match_at(&manager, 2, 1).await;

    manager.set_match_winner(&capability, m1, 101).await.unwrap();
    manager.set_match_winner(&capability, m2, 104).await.unwrap();
    manager.set_match_winner(&capability, final_id, 101).await.unwrap();

    manager.reset_match_cascading(&capability, m1).await.unwrap();

    let final_match = repo.find_match(final_id).await.unwrap().unwrap();
    assert_eq!(final_match.status, MatchStatus::Scheduled);
    assert_eq!(final_match.winner_id, None);
    assert_eq!(final_match.participant1_id, None);
    assert_eq!(final_match.participant2_id, Some(104));
}

#[tokio::test]
async fn test_reset_all_restores_fresh_bracket() {
    let (manager, _repo, capability) = setup(6, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let fresh = manager.get_bracket(1).await.unwrap();

    let playable: Vec<(i64, i64)> = fresh
        .round(1)
        .unwrap()
        .matches
        .iter()
        .filter(|m| m.status == MatchStatus::Scheduled)
        .filter_map(|m| m.participant1_id.map(|p1| (m.id, p1)))
        .collect();
    assert_eq!(playable.len(), 2);
    for (match_id, winner_id) in playable {
        manager
            .set_match_winner(&capability, match_id, winner_id)
            .await
            .unwrap();
    }
    assert_ne!(manager.get_bracket(1).await.unwrap(), fresh);

    manager.reset_all_matches(&capability, 1).await.unwrap();
    assert_eq!(manager.get_bracket(1).await.unwrap(), fresh);
}

#[tokio::test]
async fn test_finalize_rejects_wrong_match() {
    let (manager, repo, capability) = setup(4, false).await;
    seed(&repo, 2, 2, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let other_capability = organizer().authorize(&tournament(2, false)).unwrap();
    manager.build_bracket(&other_capability, 2).await.unwrap();

    let semi = match_at(&manager, 1, 1).await;
    let err = manager
        .finalize_tournament(&capability, 1, semi, 101)
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::NotFinalMatch(id) if id == semi));

    let foreign_final = manager.get_bracket(2).await.unwrap().rounds[0].matches[0].id;
    let err = manager
        .finalize_tournament(&capability, 1, foreign_final, 101)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BracketError::MatchTournamentMismatch { tournament_id: 1, .. }
    ));
}

#[tokio::test]
async fn test_completed_tournament_is_closed_to_mutation() {
    let (manager, _repo, capability) = setup(2, false).await;
    manager.build_bracket(&capability, 1).await.unwrap();
    let final_id = match_at(&manager, 1, 1).await;
    manager
        .finalize_tournament(&capability, 1, final_id, 101)
        .await
        .unwrap();

    let err = manager.reset_match(&capability, final_id).await.unwrap_err();
    assert!(matches!(err, BracketError::AlreadyCompleted(1)));
    let err = manager.reset_all_matches(&capability, 1).await.unwrap_err();
    assert!(matches!(err, BracketError::AlreadyCompleted(1)));
    let err = manager
        .finalize_tournament(&capability, 1, final_id, 101)
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::AlreadyCompleted(1)));

    assert!(manager.get_bracket(1).await.unwrap().ready_to_finalize);
}

#[tokio::test]
async fn test_capability_is_bound_to_one_tournament() {
    let (manager, repo, capability) = setup(2, false).await;
    seed(&repo, 2, 2, false).await;
    let other_capability = organizer().authorize(&tournament(2, false)).unwrap();
    manager.build_bracket(&other_capability, 2).await.unwrap();
    let foreign_match = manager.get_bracket(2).await.unwrap().rounds[0].matches[0].id;

    let err = manager.build_bracket(&capability, 2).await.unwrap_err();
    assert!(matches!(err, BracketError::Forbidden(2)));
    let err = manager
        .set_match_winner(&capability, foreign_match, 101)
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::Forbidden(2)));
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let stranger = Caller {
        user_id: 7,
        is_admin: false,
    };
    assert!(stranger.authorize(&tournament(1, false)).is_err());
}

#[tokio::test]
async fn test_execute_command_through_owning_tournament() {
    let (manager, _repo, _) = setup(4, false).await;
    let build = BracketCommand::BuildBracket { tournament_id: 1 };

    let owner = manager.owning_tournament(&build).await.unwrap();
    let capability = organizer().authorize(&owner).unwrap();
    let outcome = manager.execute(&capability, build).await.unwrap();
    assert!(matches!(outcome, CommandOutcome::Built(summary) if summary.rounds == 2));

    let m2 = match_at(&manager, 1, 2).await;
    let command = BracketCommand::SetMatchWinner {
        match_id: m2,
        winner_id: 103,
    };
    let owner = manager.owning_tournament(&command).await.unwrap();
    assert_eq!(owner.id, 1);
    let outcome = manager.execute(&capability, command).await.unwrap();
    assert!(matches!(
        outcome,
        CommandOutcome::WinnerSet(Advancement::Advanced {
            slot: Slot::Two,
            ..
        })
    ));

    let missing = BracketCommand::ResetMatch { match_id: 9999 };
    let err = manager.owning_tournament(&missing).await.unwrap_err();
    assert!(matches!(err, BracketError::MatchNotFound(9999)));
}
