//! Bracket builder: turns a list of confirmed entrants into the full set of
//! match rows for a single-elimination bracket.
//!
//! Seeding is registration order. Round-1 pairs are taken from a list of
//! `bracket_size` positions in which the earliest registrants are paired
//! against each other and every remaining entrant is followed by an empty
//! position, so each round-1 match holds at least one entrant and there are
//! exactly `bracket_size - n` byes. Later rounds are pre-created as empty
//! placeholders, then bye winners are pushed into round 2.

use super::changes::ChangeSet;
use super::errors::{BracketError, BracketResult};
use super::models::{Match, MatchId, MatchStatus};
use super::resolver::Bracket;
use super::shape::BracketShape;
use crate::tournament::{Entrant, EntrantId, TournamentId};
use serde::{Deserialize, Serialize};

/// A match row to be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMatch {
    pub round_number: u32,
    pub match_number: u32,
    pub participant1_id: Option<EntrantId>,
    pub participant2_id: Option<EntrantId>,
    pub winner_id: Option<EntrantId>,
    pub status: MatchStatus,
}

impl PlannedMatch {
    fn placeholder(round_number: u32, match_number: u32) -> Self {
        Self {
            round_number,
            match_number,
            participant1_id: None,
            participant2_id: None,
            winner_id: None,
            status: MatchStatus::Scheduled,
        }
    }

    /// Unsaved row standing in for this match while the plan is resolved
    fn provisional_row(&self, id: MatchId) -> Match {
        Match {
            id,
            tournament_id: PLANNING_TOURNAMENT,
            round_number: self.round_number,
            match_number: self.match_number,
            participant1_id: self.participant1_id,
            participant2_id: self.participant2_id,
            winner_id: self.winner_id,
            status: self.status,
            completed_at: None,
        }
    }
}

impl From<&Match> for PlannedMatch {
    fn from(row: &Match) -> Self {
        Self {
            round_number: row.round_number,
            match_number: row.match_number,
            participant1_id: row.participant1_id,
            participant2_id: row.participant2_id,
            winner_id: row.winner_id,
            status: row.status,
        }
    }
}

/// Tournament ID given to provisional rows; never stored
const PLANNING_TOURNAMENT: TournamentId = 0;

/// Every match row of a freshly built bracket, ordered by round then match
/// number, with byes already advanced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPlan {
    pub shape: BracketShape,
    pub matches: Vec<PlannedMatch>,
}

impl BracketPlan {
    /// Matches of one round
    pub fn round(&self, round_number: u32) -> impl Iterator<Item = &PlannedMatch> {
        self.matches
            .iter()
            .filter(move |m| m.round_number == round_number)
    }

    /// Number of byes
    pub fn bye_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| m.status == MatchStatus::Bye)
            .count()
    }
}

/// Lay out `count` registration-ordered entrants over `shape.bracket_size()`
/// positions.
///
/// The first `count - bracket_size / 2` pairs are full; every later pair is
/// one entrant followed by an empty position. Returns entrant indices.
pub fn seed_positions(count: usize, shape: BracketShape) -> Vec<Option<usize>> {
    let pairs = shape.bracket_size() / 2;
    let full_pairs = count.saturating_sub(pairs);
    let mut positions = Vec::with_capacity(shape.bracket_size());
    let mut next = 0..count;

    for pair in 0..pairs {
        positions.push(next.next());
        positions.push(if pair < full_pairs { next.next() } else { None });
    }

    positions
}

/// Plan the full bracket for a set of confirmed entrants.
///
/// # Errors
///
/// * `BracketError::InsufficientEntrants` - fewer than two entrants
/// * `BracketError::TooManyEntrants` - more entrants than the largest bracket
pub fn plan_bracket(entrants: &[Entrant]) -> BracketResult<BracketPlan> {
    let count = entrants.len();
    if count < 2 {
        return Err(BracketError::InsufficientEntrants(count));
    }
    let shape = BracketShape::for_entrants(count).ok_or(BracketError::TooManyEntrants(count))?;

    let mut seeded: Vec<&Entrant> = entrants.iter().collect();
    seeded.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then(a.id.cmp(&b.id)));

    let positions: Vec<Option<EntrantId>> = seed_positions(count, shape)
        .into_iter()
        .map(|index| index.map(|i| seeded[i].id))
        .collect();

    let mut matches = Vec::with_capacity(shape.total_matches());

    // Round 1
    let mut match_number = 0;
    for pair in positions.chunks(2) {
        let (p1, p2) = (pair[0], pair[1]);
        if p1.is_none() && p2.is_none() {
            continue;
        }
        match_number += 1;

        let bye_winner = match (p1, p2) {
            (Some(only), None) | (None, Some(only)) => Some(only),
            _ => None,
        };
        matches.push(PlannedMatch {
            round_number: 1,
            match_number,
            participant1_id: p1,
            participant2_id: p2,
            winner_id: bye_winner,
            status: if bye_winner.is_some() {
                MatchStatus::Bye
            } else {
                MatchStatus::Scheduled
            },
        });
    }

    // Placeholders for later rounds
    let mut previous = match_number;
    for round_number in 2..=shape.rounds() {
        let in_round = previous.div_ceil(2);
        matches.extend((1..=in_round).map(|n| PlannedMatch::placeholder(round_number, n)));
        previous = in_round;
    }

    let matches = advance_byes(matches)?;

    Ok(BracketPlan { shape, matches })
}

/// Push every round-1 bye winner into its round-2 slot, the same way a
/// reset bracket gets them back.
fn advance_byes(matches: Vec<PlannedMatch>) -> BracketResult<Vec<PlannedMatch>> {
    let rows = matches
        .iter()
        .zip(1..)
        .map(|(planned, id)| planned.provisional_row(id))
        .collect();
    let mut bracket = Bracket::new(PLANNING_TOURNAMENT, rows)?;

    let mut scratch = ChangeSet::new(PLANNING_TOURNAMENT);
    bracket.advance_byes(&mut scratch)?;

    Ok(bracket.matches().iter().map(PlannedMatch::from).collect())
}
