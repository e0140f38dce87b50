//! Access link issuance and verification.

use chrono::{Duration, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

use super::models::{DEFAULT_LINK_TTL_HOURS, MatchAccessPrivilege, PrivilegeScope};
use crate::admission::ParticipantId;
use crate::bracket::MatchId;
use crate::errors::{EngineError, EngineResult};
use crate::tournament::{TournamentId, TournamentStatus, UserId};

/// Access link issuer
///
/// Mints opaque UUID tokens scoping a participant's control to a single
/// match. Tokens are checked against the store at read time with an
/// `active AND expires_at > now()` filter, so an expired or revoked link is
/// indistinguishable from one that never existed.
#[derive(Clone, Debug)]
pub struct AccessLinkIssuer {
    pool: Arc<PgPool>,
    ttl: Duration,
}

impl AccessLinkIssuer {
    /// Create an issuer with the default link lifetime
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            ttl: Duration::hours(DEFAULT_LINK_TTL_HOURS),
        }
    }

    /// Create an issuer with an explicit link lifetime
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidInput` - Non-positive lifetime; a privilege's
    ///   expiry must be in the future at creation time
    pub fn with_ttl(pool: Arc<PgPool>, ttl: Duration) -> EngineResult<Self> {
        if ttl <= Duration::zero() {
            return Err(EngineError::InvalidInput(
                "access link lifetime must be positive".to_string(),
            ));
        }
        Ok(Self { pool, ttl })
    }

    /// Issue access links for every playable seat of an in-progress tournament
    ///
    /// Creator-initiated and idempotent: a (match, participant) pair that
    /// already holds a live privilege has it superseded — the old row is
    /// deactivated and a fresh token inserted in the same transaction, so
    /// two privileges are never simultaneously active. Bye matches are
    /// skipped; they can never be played.
    ///
    /// # Errors
    ///
    /// * `EngineError::Unauthorized` - Requester is not the creator
    /// * `EngineError::InvalidState` - Tournament is not in progress
    /// * `EngineError::Conflict` - A concurrent issuance won the race for
    ///   the same pair (safe to retry)
    pub async fn issue_links(
        &self,
        tournament_id: TournamentId,
        requester: UserId,
    ) -> EngineResult<Vec<MatchAccessPrivilege>> {
        self.require_creator_in_progress(tournament_id, requester)
            .await?;

        let seats = sqlx::query(
            r#"
            SELECT id, participant_one, participant_two
            FROM matches
            WHERE tournament_id = $1 AND is_bye = FALSE
            ORDER BY round, match_number
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let expires_at = Utc::now() + self.ttl;
        let mut tx = self.pool.begin().await?;
        let mut privileges = Vec::new();

        for row in &seats {
            let match_id: MatchId = row.get("id");
            for column in ["participant_one", "participant_two"] {
                let Some(participant_id) = row.get::<Option<ParticipantId>, _>(column) else {
                    continue;
                };

                sqlx::query(
                    "UPDATE match_access_privileges SET active = FALSE
                     WHERE match_id = $1 AND participant_id = $2 AND active = TRUE",
                )
                .bind(match_id)
                .bind(participant_id)
                .execute(&mut *tx)
                .await?;

                let token = Uuid::new_v4().to_string();
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO match_access_privileges (match_id, participant_id, token, active, expires_at)
                    VALUES ($1, $2, $3, TRUE, $4)
                    RETURNING id, created_at
                    "#,
                )
                .bind(match_id)
                .bind(participant_id)
                .bind(&token)
                .bind(expires_at.naive_utc())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| duplicate_live_privilege(e, match_id, participant_id))?;

                privileges.push(MatchAccessPrivilege {
                    id: inserted.get("id"),
                    match_id,
                    participant_id,
                    token,
                    active: true,
                    expires_at,
                    created_at: inserted
                        .get::<chrono::NaiveDateTime, _>("created_at")
                        .and_utc(),
                });
            }
        }

        tx.commit().await?;
        log::info!(
            "Issued {} access links for tournament {}",
            privileges.len(),
            tournament_id
        );
        Ok(privileges)
    }

    /// Retrieve a previously issued link for a (match, participant) pair
    ///
    /// Creator-only. Expired and revoked privileges are filtered at read
    /// time and surface as `NotFound`, never as a distinguishable
    /// "expired" state.
    pub async fn get_link(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        requester: UserId,
    ) -> EngineResult<MatchAccessPrivilege> {
        let owner = sqlx::query(
            "SELECT t.creator_id
             FROM matches m JOIN tournaments t ON t.id = m.tournament_id
             WHERE m.id = $1",
        )
        .bind(match_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(EngineError::NotFound("match"))?;

        if owner.get::<UserId, _>("creator_id") != requester {
            return Err(EngineError::Unauthorized(
                "only the tournament creator may retrieve access links",
            ));
        }

        let row = sqlx::query(
            r#"
            SELECT id, match_id, participant_id, token, active, expires_at, created_at
            FROM match_access_privileges
            WHERE match_id = $1 AND participant_id = $2
              AND active = TRUE AND expires_at > $3
            "#,
        )
        .bind(match_id)
        .bind(participant_id)
        .bind(Utc::now().naive_utc())
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(EngineError::NotFound("access link"))?;

        Ok(privilege_from_row(&row))
    }

    /// Resolve a bearer token into its privilege scope
    ///
    /// The unauthenticated entry point used by match result reporting.
    /// Absent, revoked and expired tokens are indistinguishable.
    pub async fn authorize(&self, token: &str) -> EngineResult<PrivilegeScope> {
        let row = sqlx::query(
            "SELECT match_id, participant_id
             FROM match_access_privileges
             WHERE token = $1 AND active = TRUE AND expires_at > $2",
        )
        .bind(token)
        .bind(Utc::now().naive_utc())
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(EngineError::NotFound("access link"))?;

        Ok(PrivilegeScope {
            match_id: row.get("match_id"),
            participant_id: row.get("participant_id"),
        })
    }

    /// Revoke every live access link of a tournament
    ///
    /// Creator-only. Returns the number of privileges deactivated.
    pub async fn revoke_links(
        &self,
        tournament_id: TournamentId,
        requester: UserId,
    ) -> EngineResult<u64> {
        let tournament = sqlx::query("SELECT creator_id FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(EngineError::NotFound("tournament"))?;

        if tournament.get::<UserId, _>("creator_id") != requester {
            return Err(EngineError::Unauthorized(
                "only the tournament creator may revoke access links",
            ));
        }

        let revoked = sqlx::query(
            "UPDATE match_access_privileges SET active = FALSE
             WHERE active = TRUE
               AND match_id IN (SELECT id FROM matches WHERE tournament_id = $1)",
        )
        .bind(tournament_id)
        .execute(self.pool.as_ref())
        .await?;

        log::info!(
            "Revoked {} access links for tournament {}",
            revoked.rows_affected(),
            tournament_id
        );
        Ok(revoked.rows_affected())
    }

    async fn require_creator_in_progress(
        &self,
        tournament_id: TournamentId,
        requester: UserId,
    ) -> EngineResult<()> {
        let row = sqlx::query("SELECT creator_id, status FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(EngineError::NotFound("tournament"))?;

        if row.get::<UserId, _>("creator_id") != requester {
            return Err(EngineError::Unauthorized(
                "only the tournament creator may issue access links",
            ));
        }
        let status = TournamentStatus::from_column(row.get::<String, _>("status").as_str())?;
        if status != TournamentStatus::InProgress {
            return Err(EngineError::InvalidState {
                expected: "in_progress",
                actual: status,
            });
        }
        Ok(())
    }
}

/// Map a unique-index violation on the live-privilege index to `Conflict`
fn duplicate_live_privilege(
    err: sqlx::Error,
    match_id: MatchId,
    participant_id: ParticipantId,
) -> EngineError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => EngineError::Conflict(format!(
            "another live access link exists for match {match_id}, participant {participant_id}"
        )),
        _ => EngineError::Database(err),
    }
}

fn privilege_from_row(row: &sqlx::postgres::PgRow) -> MatchAccessPrivilege {
    MatchAccessPrivilege {
        id: row.get("id"),
        match_id: row.get("match_id"),
        participant_id: row.get("participant_id"),
        token: row.get("token"),
        active: row.get("active"),
        expires_at: row.get::<chrono::NaiveDateTime, _>("expires_at").and_utc(),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}
