//! Participant admission gate.

use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::models::{EntrantKind, NewParticipant, Participant};
use super::password::verify_join_password;
use crate::db::{Team, TeamDirectory};
use crate::errors::{EngineError, EngineResult};
use crate::tournament::{TournamentFormat, TournamentId, TournamentStatus, UserId};

/// Admission gate
///
/// Validates a candidate entrant and atomically reserves a slot against the
/// tournament's capacity. The capacity check and the insert share one
/// transaction built around a guarded counter update, so concurrent
/// admissions for the last slot cannot both succeed.
#[derive(Clone)]
pub struct AdmissionGate {
    pool: Arc<PgPool>,
    teams: Arc<dyn TeamDirectory>,
}

impl AdmissionGate {
    /// Create a new admission gate
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `teams` - Read-only handle into the external team subsystem
    pub fn new(pool: Arc<PgPool>, teams: Arc<dyn TeamDirectory>) -> Self {
        Self { pool, teams }
    }

    /// Admit a candidate participant into a tournament
    ///
    /// # Errors
    ///
    /// * `EngineError::NotFound` - Tournament (or referenced team) absent
    /// * `EngineError::InvalidState` - Registration is not open
    /// * `EngineError::InvalidInput` - Malformed candidate descriptor
    /// * `EngineError::Unauthorized` - Join password missing/mismatched, or
    ///   a team entry without a signed-in requester
    /// * `EngineError::Forbidden` - Requester is not the team captain, or a
    ///   roster member is outside the team
    /// * `EngineError::CapacityExceeded` - Tournament is full
    pub async fn admit(
        &self,
        tournament_id: TournamentId,
        candidate: NewParticipant,
        password: Option<&str>,
        requester: Option<UserId>,
    ) -> EngineResult<Participant> {
        let row = sqlx::query("SELECT status, config, join_password_hash FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(EngineError::NotFound("tournament"))?;

        let status = TournamentStatus::from_column(row.get::<String, _>("status").as_str())?;
        if status != TournamentStatus::Open {
            return Err(EngineError::InvalidState {
                expected: "open",
                actual: status,
            });
        }

        let format: TournamentFormat = serde_json::from_value(row.get("config"))?;
        candidate.validate(&format)?;

        if let Some(hash) = row.get::<Option<String>, _>("join_password_hash") {
            match password {
                Some(supplied) if verify_join_password(supplied, &hash) => {}
                _ => return Err(EngineError::Unauthorized("invalid join password")),
            }
        }

        if let EntrantKind::Team { team_id, roster } = &candidate.entrant {
            let team = self
                .teams
                .get_team(*team_id)
                .await?
                .ok_or(EngineError::NotFound("team"))?;
            let captain = requester.ok_or(EngineError::Unauthorized(
                "team registration requires a signed-in captain",
            ))?;
            validate_roster(&team, captain, roster)?;
        }

        // Reserve the slot and insert the row in one transaction. The
        // guarded counter update is what serializes concurrent admissions;
        // first committed wins.
        let mut tx = self.pool.begin().await?;

        let reserved = sqlx::query(
            "UPDATE tournaments
             SET participant_count = participant_count + 1
             WHERE id = $1 AND status = 'open' AND participant_count < $2",
        )
        .bind(tournament_id)
        .bind(format.max_participants as i32)
        .execute(&mut *tx)
        .await?;

        if reserved.rows_affected() == 0 {
            tx.rollback().await?;
            // Guard failed: report whether it was state or capacity
            let check = sqlx::query("SELECT status FROM tournaments WHERE id = $1")
                .bind(tournament_id)
                .fetch_optional(self.pool.as_ref())
                .await?
                .ok_or(EngineError::NotFound("tournament"))?;
            let now = TournamentStatus::from_column(check.get::<String, _>("status").as_str())?;
            if now != TournamentStatus::Open {
                return Err(EngineError::InvalidState {
                    expected: "open",
                    actual: now,
                });
            }
            return Err(EngineError::CapacityExceeded {
                max: format.max_participants,
            });
        }

        let (team_id, roster, user_id) = match &candidate.entrant {
            EntrantKind::Individual { user_id } => (None, None, *user_id),
            EntrantKind::Team { team_id, roster } => {
                (Some(*team_id), Some(roster.clone()), requester)
            }
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO participants (tournament_id, display_name, kind, team_id, roster, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, registered_at
            "#,
        )
        .bind(tournament_id)
        .bind(&candidate.display_name)
        .bind(candidate.entrant.kind_str())
        .bind(team_id)
        .bind(roster)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let participant = Participant {
            id: inserted.get("id"),
            tournament_id,
            display_name: candidate.display_name,
            entrant: candidate.entrant,
            registered_at: inserted
                .get::<chrono::NaiveDateTime, _>("registered_at")
                .and_utc(),
        };
        log::info!(
            "Admitted participant {} '{}' to tournament {}",
            participant.id,
            participant.display_name,
            tournament_id
        );
        Ok(participant)
    }
}

/// Confirm captaincy and roster membership for a team entry
pub fn validate_roster(team: &Team, requester: UserId, roster: &[UserId]) -> EngineResult<()> {
    if requester != team.captain_id {
        return Err(EngineError::Forbidden(format!(
            "user {requester} is not the captain of team {}",
            team.id
        )));
    }
    for member in roster {
        if !team.members.contains(member) {
            return Err(EngineError::Forbidden(format!(
                "user {member} is not a member of team {}",
                team.id
            )));
        }
    }
    Ok(())
}
