//! Participant data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::TeamId;
use crate::errors::{EngineError, EngineResult};
use crate::tournament::{TournamentFormat, TournamentId, UserId};

/// Participant ID type
pub type ParticipantId = i64;

/// What kind of entrant occupies a tournament slot
///
/// Tagged variant rather than one record with nullable team fields, so the
/// roster validator's applicability is explicit and type-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntrantKind {
    /// A single player, optionally linked to a signed-in user
    Individual { user_id: Option<UserId> },
    /// A team entry with its fielded roster
    Team { team_id: TeamId, roster: Vec<UserId> },
}

impl EntrantKind {
    /// Database column representation of the variant tag
    pub fn kind_str(&self) -> &'static str {
        match self {
            EntrantKind::Individual { .. } => "individual",
            EntrantKind::Team { .. } => "team",
        }
    }

    /// The roster, when this entrant is a team
    pub fn roster(&self) -> Option<&[UserId]> {
        match self {
            EntrantKind::Individual { .. } => None,
            EntrantKind::Team { roster, .. } => Some(roster),
        }
    }
}

/// An admitted participant occupying a tournament slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    pub display_name: String,
    pub entrant: EntrantKind,
    pub registered_at: DateTime<Utc>,
}

impl Participant {
    /// Map a `participants` row
    pub(crate) fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let kind: String = row.get("kind");
        let entrant = match kind.as_str() {
            "individual" => EntrantKind::Individual {
                user_id: row.get("user_id"),
            },
            "team" => {
                let team_id = row.get::<Option<TeamId>, _>("team_id").ok_or_else(|| {
                    sqlx::Error::Decode("team participant row is missing team_id".into())
                })?;
                let roster: Option<Vec<UserId>> = row.get("roster");
                EntrantKind::Team {
                    team_id,
                    roster: roster.unwrap_or_default(),
                }
            }
            other => {
                return Err(sqlx::Error::Decode(
                    format!("unknown participant kind '{other}'").into(),
                ));
            }
        };
        Ok(Self {
            id: row.get("id"),
            tournament_id: row.get("tournament_id"),
            display_name: row.get("display_name"),
            entrant,
            registered_at: row
                .get::<chrono::NaiveDateTime, _>("registered_at")
                .and_utc(),
        })
    }
}

/// Admission request for a candidate participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParticipant {
    pub display_name: String,
    pub entrant: EntrantKind,
}

impl NewParticipant {
    /// Create an individual admission request
    pub fn individual(display_name: impl Into<String>, user_id: Option<UserId>) -> Self {
        Self {
            display_name: display_name.into(),
            entrant: EntrantKind::Individual { user_id },
        }
    }

    /// Create a team admission request
    pub fn team(display_name: impl Into<String>, team_id: TeamId, roster: Vec<UserId>) -> Self {
        Self {
            display_name: display_name.into(),
            entrant: EntrantKind::Team { team_id, roster },
        }
    }

    /// Validate the request shape against a tournament format
    pub fn validate(&self, format: &TournamentFormat) -> EngineResult<()> {
        if self.display_name.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "participant name is required".to_string(),
            ));
        }
        match &self.entrant {
            EntrantKind::Individual { .. } => {
                if format.is_team_format() {
                    return Err(EngineError::InvalidInput(
                        "this tournament requires team entrants".to_string(),
                    ));
                }
            }
            EntrantKind::Team { roster, .. } => {
                if !format.is_team_format() {
                    return Err(EngineError::InvalidInput(
                        "this tournament only accepts individual entrants".to_string(),
                    ));
                }
                if roster.is_empty() {
                    return Err(EngineError::InvalidInput(
                        "a team entry requires a non-empty roster".to_string(),
                    ));
                }
                if let Some(team_size) = format.team_size
                    && roster.len() != team_size as usize
                {
                    return Err(EngineError::InvalidInput(format!(
                        "roster must field exactly {team_size} members, got {}",
                        roster.len()
                    )));
                }
                let mut seen = std::collections::HashSet::new();
                for member in roster {
                    if !seen.insert(*member) {
                        return Err(EngineError::InvalidInput(format!(
                            "roster lists user {member} more than once"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
