//! Bracket and match data models.

use serde::{Deserialize, Serialize};

use crate::admission::ParticipantId;
use crate::tournament::TournamentId;

/// Match ID type
pub type MatchId = i64;

/// Seat within a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    One,
    Two,
}

/// A generated, not-yet-persisted match
///
/// Rounds are numbered from 1 and match numbers are 1-based and unique
/// within a round. A bye slot carries `is_bye = true`, an empty second
/// seat and a pre-filled winner, so downstream result reporting never
/// waits on a match that can never be played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSlot {
    pub round: u32,
    pub match_number: u32,
    pub participant_one: Option<ParticipantId>,
    pub participant_two: Option<ParticipantId>,
    pub winner_id: Option<ParticipantId>,
    pub is_bye: bool,
}

/// A persisted match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: u32,
    pub match_number: u32,
    pub participant_one: Option<ParticipantId>,
    pub participant_two: Option<ParticipantId>,
    pub winner_id: Option<ParticipantId>,
    pub is_bye: bool,
}

impl Match {
    /// Map a `matches` row
    pub(crate) fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        Ok(Self {
            id: row.get("id"),
            tournament_id: row.get("tournament_id"),
            round: row.get::<i32, _>("round") as u32,
            match_number: row.get::<i32, _>("match_number") as u32,
            participant_one: row.get("participant_one"),
            participant_two: row.get("participant_two"),
            winner_id: row.get("winner_id"),
            is_bye: row.get("is_bye"),
        })
    }
}

/// Where the winner of a match advances to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextSlot {
    pub round: u32,
    pub match_number: u32,
    pub seat: Seat,
}
