//! Match access privilege models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::admission::ParticipantId;
use crate::bracket::MatchId;
use crate::tournament::ResultAuthority;

/// Privilege ID type
pub type PrivilegeId = i64;

/// Default lifetime of an issued access link
pub const DEFAULT_LINK_TTL_HOURS: i64 = 24;

/// A time-bounded credential scoping one participant's control to one match
///
/// At most one active, unexpired privilege exists per (match, participant)
/// pair; re-issuing supersedes the previous one. Expiry is never extended:
/// a fresh privilege replaces the old row instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchAccessPrivilege {
    pub id: PrivilegeId,
    pub match_id: MatchId,
    pub participant_id: ParticipantId,
    /// Opaque link token handed to the participant
    pub token: String,
    pub active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// The (match, participant) scope a verified token resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivilegeScope {
    pub match_id: MatchId,
    pub participant_id: ParticipantId,
}

impl From<PrivilegeScope> for ResultAuthority {
    fn from(scope: PrivilegeScope) -> Self {
        ResultAuthority::Privilege {
            match_id: scope.match_id,
            participant_id: scope.participant_id,
        }
    }
}
