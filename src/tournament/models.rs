//! Tournament data models and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::admission::ParticipantId;
use crate::bracket::MatchId;
use crate::errors::{EngineError, EngineResult};

/// Tournament ID type
pub type TournamentId = i64;

/// User ID type, supplied by the external identity subsystem
pub type UserId = i64;

/// Minimum number of admitted participants required to start a tournament
pub const MIN_PARTICIPANTS: u32 = 2;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Being set up, not yet accepting registrations
    Draft,
    /// Accepting registrations
    Open,
    /// Bracket generated, matches underway
    InProgress,
    /// Finished with a declared winner recorded
    Completed,
    /// Abandoned before completion
    Cancelled,
}

impl TournamentStatus {
    /// Database column representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::Open => "open",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the database column representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TournamentStatus::Draft),
            "open" => Some(TournamentStatus::Open),
            "in_progress" => Some(TournamentStatus::InProgress),
            "completed" => Some(TournamentStatus::Completed),
            "cancelled" => Some(TournamentStatus::Cancelled),
            _ => None,
        }
    }

    /// Parse the status column, failing decode on an unknown value
    pub(crate) fn from_column(s: &str) -> Result<Self, sqlx::Error> {
        Self::parse(s)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown tournament status '{s}'").into()))
    }

    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
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

/// Competitive bracket kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketKind {
    /// One loss eliminates; byes balance odd fields
    SingleElimination,
}

/// How the first round is seeded from the admitted roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedingPolicy {
    /// Registration order is the seeding order
    RegistrationOrder,
    /// Shuffled with a seed recorded on the tournament for reproducibility
    Randomized,
}

/// Tournament format: bracket kind, capacity and team shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentFormat {
    /// Bracket kind
    pub bracket_kind: BracketKind,
    /// Seeding policy
    pub seeding: SeedingPolicy,
    /// Maximum participants allowed
    pub max_participants: u32,
    /// Required roster size for team entrants; `None` for individual play
    pub team_size: Option<u32>,
}

impl TournamentFormat {
    /// Create a single-elimination format for individual entrants
    pub fn single_elimination(max_participants: u32) -> Self {
        Self {
            bracket_kind: BracketKind::SingleElimination,
            seeding: SeedingPolicy::RegistrationOrder,
            max_participants,
            team_size: None,
        }
    }

    /// Create a single-elimination format for team entrants
    pub fn team_single_elimination(max_participants: u32, team_size: u32) -> Self {
        Self {
            team_size: Some(team_size),
            ..Self::single_elimination(max_participants)
        }
    }

    /// Switch to randomized seeding
    pub fn with_randomized_seeding(mut self) -> Self {
        self.seeding = SeedingPolicy::Randomized;
        self
    }

    /// Whether entrants must be teams
    pub fn is_team_format(&self) -> bool {
        self.team_size.is_some()
    }

    /// Validate the format's numeric bounds
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_participants < MIN_PARTICIPANTS {
            return Err(EngineError::InvalidInput(format!(
                "max_participants must be at least {MIN_PARTICIPANTS}, got {}",
                self.max_participants
            )));
        }
        if let Some(team_size) = self.team_size
            && team_size == 0
        {
            return Err(EngineError::InvalidInput(
                "team_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tournament record
///
/// Owned by its creator and mutated only through [`TournamentManager`].
///
/// [`TournamentManager`]: crate::tournament::TournamentManager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub creator_id: UserId,
    pub name: String,
    pub format: TournamentFormat,
    pub status: TournamentStatus,
    /// Admitted participant count, maintained by the capacity guard column
    pub participant_count: u32,
    /// Recorded shuffle seed when seeding was randomized
    pub seed: Option<i64>,
    /// Advisory winner recorded at stop time; never reconciled with matches
    pub declared_winner_id: Option<ParticipantId>,
    pub has_join_password: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Tournament creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTournament {
    pub creator_id: UserId,
    pub name: String,
    pub format: TournamentFormat,
    /// Plaintext join password; hashed before storage, never persisted as-is
    pub join_password: Option<String>,
    /// Creation-time choice: `Draft` for later setup, `Open` to accept
    /// registrations immediately
    pub initial_status: TournamentStatus,
}

impl NewTournament {
    /// Create a request that opens for registration immediately
    pub fn open(creator_id: UserId, name: impl Into<String>, format: TournamentFormat) -> Self {
        Self {
            creator_id,
            name: name.into(),
            format,
            join_password: None,
            initial_status: TournamentStatus::Open,
        }
    }

    /// Require a join password
    pub fn with_join_password(mut self, password: impl Into<String>) -> Self {
        self.join_password = Some(password.into());
        self
    }

    /// Validate the request
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "tournament name is required".to_string(),
            ));
        }
        if !matches!(
            self.initial_status,
            TournamentStatus::Draft | TournamentStatus::Open
        ) {
            return Err(EngineError::InvalidInput(format!(
                "a tournament may only be created as draft or open, not {}",
                self.initial_status
            )));
        }
        self.format.validate()
    }
}

/// Who is reporting a match result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultAuthority {
    /// The tournament creator, identified by the external auth subsystem
    Creator(UserId),
    /// A participant holding a scoped access link, resolved through
    /// [`AccessLinkIssuer::authorize`]
    ///
    /// [`AccessLinkIssuer::authorize`]: crate::access::AccessLinkIssuer::authorize
    Privilege {
        match_id: MatchId,
        participant_id: ParticipantId,
    },
}
