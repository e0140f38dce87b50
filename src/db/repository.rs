//! Read-only seam into the external team subsystem.
//!
//! Teams and their memberships are owned elsewhere; the engine only ever
//! asks "who captains this team and who is on it". The trait keeps that
//! contract narrow and lets tests substitute an in-memory directory.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::errors::EngineResult;
use crate::tournament::UserId;

/// Team ID type
pub type TeamId = i64;

/// A team as seen by the roster validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    pub captain_id: UserId,
    pub members: Vec<UserId>,
}

/// Trait for team lookups
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    /// Fetch a team with its captain and member set
    async fn get_team(&self, team_id: TeamId) -> EngineResult<Option<Team>>;
}

/// Default PostgreSQL implementation of `TeamDirectory`
pub struct PgTeamDirectory {
    pool: PgPool,
}

impl PgTeamDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamDirectory for PgTeamDirectory {
    async fn get_team(&self, team_id: TeamId) -> EngineResult<Option<Team>> {
        let row = sqlx::query("SELECT id, captain_id FROM teams WHERE id = $1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let members = sqlx::query("SELECT user_id FROM team_members WHERE team_id = $1 ORDER BY user_id")
            .bind(team_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|r| r.get("user_id"))
            .collect();

        Ok(Some(Team {
            id: row.get("id"),
            captain_id: row.get("captain_id"),
            members,
        }))
    }
}
