//! Tournament state machine.
//!
//! Owns the lifecycle status column and every transition on it. Transitions
//! are conditional updates (`UPDATE ... WHERE status = <expected>`), never a
//! read followed by a separate write, so concurrent callers race on the
//! database row and exactly one wins.

use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::models::{
    MIN_PARTICIPANTS, NewTournament, ResultAuthority, Tournament, TournamentFormat, TournamentId,
    TournamentStatus, UserId,
};
use crate::admission::{Participant, ParticipantId, hash_join_password};
use crate::bracket::{self, Match, MatchId, Seat};
use crate::errors::{EngineError, EngineResult};

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    pool: Arc<PgPool>,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a new tournament
    ///
    /// The initial status is the creation-time choice between `Draft` and
    /// `Open`. A join password, when present, is stored as an Argon2id
    /// hash.
    pub async fn create_tournament(&self, new: NewTournament) -> EngineResult<Tournament> {
        new.validate()?;

        let config = serde_json::to_value(&new.format)?;
        let password_hash = new
            .join_password
            .as_deref()
            .map(hash_join_password)
            .transpose()?;

        let row = sqlx::query(
            r#"
            INSERT INTO tournaments (creator_id, name, config, status, join_password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            "#,
        )
        .bind(new.creator_id)
        .bind(&new.name)
        .bind(config)
        .bind(new.initial_status.as_str())
        .bind(&password_hash)
        .fetch_one(self.pool.as_ref())
        .await?;

        let tournament = Tournament {
            id: row.get("id"),
            creator_id: new.creator_id,
            name: new.name,
            format: new.format,
            status: new.initial_status,
            participant_count: 0,
            seed: None,
            declared_winner_id: None,
            has_join_password: password_hash.is_some(),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            started_at: None,
            finished_at: None,
        };
        log::info!(
            "Created tournament {} '{}' ({})",
            tournament.id,
            tournament.name,
            tournament.status
        );
        Ok(tournament)
    }

    /// Get a tournament by ID
    pub async fn get(&self, tournament_id: TournamentId) -> EngineResult<Tournament> {
        let row = sqlx::query(
            r#"
            SELECT id, creator_id, name, config, status, join_password_hash,
                   participant_count, seed, declared_winner_id,
                   created_at, started_at, finished_at
            FROM tournaments
            WHERE id = $1
            "#,
        )
        .bind(tournament_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(EngineError::NotFound("tournament"))?;

        tournament_from_row(&row)
    }

    /// List tournaments, newest first, optionally filtered by status
    pub async fn list(&self, status: Option<TournamentStatus>) -> EngineResult<Vec<Tournament>> {
        let query = if let Some(status) = status {
            sqlx::query(
                r#"
                SELECT id, creator_id, name, config, status, join_password_hash,
                       participant_count, seed, declared_winner_id,
                       created_at, started_at, finished_at
                FROM tournaments
                WHERE status = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(status.as_str())
        } else {
            sqlx::query(
                r#"
                SELECT id, creator_id, name, config, status, join_password_hash,
                       participant_count, seed, declared_winner_id,
                       created_at, started_at, finished_at
                FROM tournaments
                ORDER BY created_at DESC
                "#,
            )
        };

        let rows = query.fetch_all(self.pool.as_ref()).await?;
        rows.iter().map(tournament_from_row).collect()
    }

    /// List a tournament's admitted participants in registration order
    pub async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<Participant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, display_name, kind, team_id, roster, user_id, registered_at
            FROM participants
            WHERE tournament_id = $1
            ORDER BY registered_at, id
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|row| Participant::from_row(row).map_err(EngineError::from))
            .collect()
    }

    /// Get a tournament's full match set, ordered by round and match number
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> EngineResult<Vec<Match>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, round, match_number,
                   participant_one, participant_two, winner_id, is_bye
            FROM matches
            WHERE tournament_id = $1
            ORDER BY round, match_number
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|row| Match::from_row(row).map_err(EngineError::from))
            .collect()
    }

    /// Open a draft tournament for registration
    pub async fn open_registration(
        &self,
        tournament_id: TournamentId,
        requester: UserId,
    ) -> EngineResult<()> {
        let tournament = self.get(tournament_id).await?;
        if tournament.creator_id != requester {
            return Err(EngineError::Unauthorized(
                "only the tournament creator may open registration",
            ));
        }

        let updated = sqlx::query("UPDATE tournaments SET status = 'open' WHERE id = $1 AND status = 'draft'")
            .bind(tournament_id)
            .execute(self.pool.as_ref())
            .await?;

        if updated.rows_affected() == 0 {
            let current = self.get(tournament_id).await?;
            return Err(EngineError::InvalidState {
                expected: "draft",
                actual: current.status,
            });
        }
        log::info!("Tournament {tournament_id} open for registration");
        Ok(())
    }

    /// Start a tournament: generate and persist the bracket
    ///
    /// The status transition is a conditional update committed in the same
    /// transaction as the bulk match insert, so concurrent starts produce
    /// exactly one bracket; the losers observe `InvalidState`. A failed
    /// start leaves the tournament in its pre-start status with zero
    /// matches persisted.
    ///
    /// # Errors
    ///
    /// * `EngineError::Unauthorized` - Requester is not the creator
    /// * `EngineError::InvalidState` - Already started or terminal
    /// * `EngineError::InvalidInput` - Fewer than two participants
    pub async fn start(
        &self,
        tournament_id: TournamentId,
        requester: UserId,
    ) -> EngineResult<Vec<Match>> {
        let tournament = self.get(tournament_id).await?;
        if tournament.creator_id != requester {
            return Err(EngineError::Unauthorized(
                "only the tournament creator may start it",
            ));
        }
        // Cheap pre-check; the conditional update below is authoritative.
        if !matches!(
            tournament.status,
            TournamentStatus::Draft | TournamentStatus::Open
        ) {
            return Err(EngineError::InvalidState {
                expected: "draft or open",
                actual: tournament.status,
            });
        }

        let seed = match tournament.format.seeding {
            super::models::SeedingPolicy::Randomized => {
                use rand::Rng;
                Some(rand::rng().random::<u64>())
            }
            super::models::SeedingPolicy::RegistrationOrder => None,
        };

        let mut tx = self.pool.begin().await?;

        // Claim the transition first: admissions contend on the same row,
        // so any registration committed after this point observes
        // `in_progress` and fails, and the roster read below is complete.
        let updated = sqlx::query(
            "UPDATE tournaments
             SET status = 'in_progress', started_at = NOW(), seed = $2
             WHERE id = $1 AND status IN ('draft', 'open')",
        )
        .bind(tournament_id)
        .bind(seed.map(|s| s as i64))
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            let current = self.get(tournament_id).await?;
            return Err(EngineError::InvalidState {
                expected: "draft or open",
                actual: current.status,
            });
        }

        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, display_name, kind, team_id, roster, user_id, registered_at
            FROM participants
            WHERE tournament_id = $1
            ORDER BY registered_at, id
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&mut *tx)
        .await?;
        let participants = rows
            .iter()
            .map(Participant::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        if (participants.len() as u32) < MIN_PARTICIPANTS {
            tx.rollback().await?;
            return Err(EngineError::InvalidInput(format!(
                "at least {MIN_PARTICIPANTS} participants are required to start, have {}",
                participants.len()
            )));
        }

        // A generation failure drops the transaction and rolls the
        // transition back; nothing is left half-started.
        let slots = bracket::generate(&participants, &tournament.format, seed)?;

        let mut matches = Vec::with_capacity(slots.len());
        for slot in &slots {
            let row = sqlx::query(
                r#"
                INSERT INTO matches (tournament_id, round, match_number,
                                     participant_one, participant_two, winner_id, is_bye)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(tournament_id)
            .bind(slot.round as i32)
            .bind(slot.match_number as i32)
            .bind(slot.participant_one)
            .bind(slot.participant_two)
            .bind(slot.winner_id)
            .bind(slot.is_bye)
            .fetch_one(&mut *tx)
            .await?;

            matches.push(Match {
                id: row.get("id"),
                tournament_id,
                round: slot.round,
                match_number: slot.match_number,
                participant_one: slot.participant_one,
                participant_two: slot.participant_two,
                winner_id: slot.winner_id,
                is_bye: slot.is_bye,
            });
        }

        tx.commit().await?;

        log::info!(
            "Tournament {} started: {} participants, {} matches across {} rounds",
            tournament_id,
            participants.len(),
            matches.len(),
            matches.last().map(|m| m.round).unwrap_or(0)
        );
        Ok(matches)
    }

    /// Stop an in-progress tournament and record the declared winner
    ///
    /// The declared winner is advisory: it must reference a participant of
    /// this tournament but is never reconciled against the bracket's own
    /// result rows, so forfeits and manual corrections stay expressible.
    pub async fn stop(
        &self,
        tournament_id: TournamentId,
        requester: UserId,
        declared_winner: Option<ParticipantId>,
    ) -> EngineResult<Option<ParticipantId>> {
        let tournament = self.get(tournament_id).await?;
        if tournament.creator_id != requester {
            return Err(EngineError::Unauthorized(
                "only the tournament creator may stop it",
            ));
        }

        if let Some(winner) = declared_winner {
            let known = sqlx::query("SELECT id FROM participants WHERE id = $1 AND tournament_id = $2")
                .bind(winner)
                .bind(tournament_id)
                .fetch_optional(self.pool.as_ref())
                .await?;
            if known.is_none() {
                return Err(EngineError::InvalidInput(format!(
                    "declared winner {winner} is not a participant of tournament {tournament_id}"
                )));
            }
        }

        let updated = sqlx::query(
            "UPDATE tournaments
             SET status = 'completed', finished_at = NOW(), declared_winner_id = $2
             WHERE id = $1 AND status = 'in_progress'",
        )
        .bind(tournament_id)
        .bind(declared_winner)
        .execute(self.pool.as_ref())
        .await?;

        if updated.rows_affected() == 0 {
            let current = self.get(tournament_id).await?;
            return Err(EngineError::InvalidState {
                expected: "in_progress",
                actual: current.status,
            });
        }

        log::info!(
            "Tournament {} completed, declared winner: {:?}",
            tournament_id,
            declared_winner
        );
        Ok(declared_winner)
    }

    /// Cancel a tournament from any non-terminal status
    pub async fn cancel(&self, tournament_id: TournamentId, requester: UserId) -> EngineResult<()> {
        let tournament = self.get(tournament_id).await?;
        if tournament.creator_id != requester {
            return Err(EngineError::Unauthorized(
                "only the tournament creator may cancel it",
            ));
        }

        let updated = sqlx::query(
            "UPDATE tournaments
             SET status = 'cancelled', finished_at = NOW()
             WHERE id = $1 AND status IN ('draft', 'open', 'in_progress')",
        )
        .bind(tournament_id)
        .execute(self.pool.as_ref())
        .await?;

        if updated.rows_affected() == 0 {
            let current = self.get(tournament_id).await?;
            return Err(EngineError::InvalidState {
                expected: "a non-terminal status",
                actual: current.status,
            });
        }
        log::info!("Tournament {tournament_id} cancelled");
        Ok(())
    }

    /// Withdraw a participant before the tournament starts
    ///
    /// Allowed to the creator or the participant's own linked user. Once a
    /// bracket exists the roster is frozen and withdrawal is rejected.
    pub async fn withdraw_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        requester: Option<UserId>,
    ) -> EngineResult<()> {
        let tournament = self.get(tournament_id).await?;

        let row = sqlx::query("SELECT user_id FROM participants WHERE id = $1 AND tournament_id = $2")
            .bind(participant_id)
            .bind(tournament_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(EngineError::NotFound("participant"))?;
        let linked_user: Option<UserId> = row.get("user_id");

        let Some(user) = requester else {
            return Err(EngineError::Unauthorized(
                "withdrawal requires a signed-in user",
            ));
        };
        if user != tournament.creator_id && linked_user != Some(user) {
            return Err(EngineError::Forbidden(format!(
                "user {user} may not withdraw participant {participant_id}"
            )));
        }

        let mut tx = self.pool.begin().await?;

        let released = sqlx::query(
            "UPDATE tournaments
             SET participant_count = participant_count - 1
             WHERE id = $1 AND status IN ('draft', 'open')",
        )
        .bind(tournament_id)
        .execute(&mut *tx)
        .await?;

        if released.rows_affected() == 0 {
            tx.rollback().await?;
            let current = self.get(tournament_id).await?;
            return Err(EngineError::InvalidState {
                expected: "draft or open",
                actual: current.status,
            });
        }

        let deleted = sqlx::query("DELETE FROM participants WHERE id = $1 AND tournament_id = $2")
            .bind(participant_id)
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            // Withdrawn concurrently; keep the counter honest.
            tx.rollback().await?;
            return Err(EngineError::NotFound("participant"));
        }

        tx.commit().await?;
        log::info!("Participant {participant_id} withdrew from tournament {tournament_id}");
        Ok(())
    }

    /// Record a match result and advance the winner into the next round
    ///
    /// The reporter is either the tournament creator or a participant whose
    /// access link was resolved by the issuer into a privilege scope. Byes
    /// are pre-won at generation time, so any attempt to report one lands
    /// in the already-recorded `Conflict` path.
    pub async fn record_match_result(
        &self,
        match_id: MatchId,
        winner: ParticipantId,
        authority: ResultAuthority,
    ) -> EngineResult<Match> {
        let row = sqlx::query(
            r#"
            SELECT m.id, m.tournament_id, m.round, m.match_number,
                   m.participant_one, m.participant_two, m.winner_id, m.is_bye,
                   t.creator_id, t.status
            FROM matches m
            JOIN tournaments t ON t.id = m.tournament_id
            WHERE m.id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(EngineError::NotFound("match"))?;

        let status = TournamentStatus::from_column(row.get::<String, _>("status").as_str())?;
        if status != TournamentStatus::InProgress {
            return Err(EngineError::InvalidState {
                expected: "in_progress",
                actual: status,
            });
        }

        let mut game = Match::from_row(&row)?;
        let creator_id: UserId = row.get("creator_id");

        match authority {
            ResultAuthority::Creator(user) => {
                if user != creator_id {
                    return Err(EngineError::Unauthorized(
                        "only the tournament creator may report results for this match",
                    ));
                }
            }
            ResultAuthority::Privilege {
                match_id: scoped_match,
                participant_id,
            } => {
                if scoped_match != match_id {
                    return Err(EngineError::Forbidden(format!(
                        "access link is scoped to match {scoped_match}, not {match_id}"
                    )));
                }
                if game.participant_one != Some(participant_id)
                    && game.participant_two != Some(participant_id)
                {
                    return Err(EngineError::Forbidden(format!(
                        "participant {participant_id} is not seated in match {match_id}"
                    )));
                }
            }
        }

        if game.winner_id.is_some() {
            return Err(EngineError::Conflict(format!(
                "match {match_id} already has a recorded result"
            )));
        }
        let (Some(one), Some(two)) = (game.participant_one, game.participant_two) else {
            return Err(EngineError::InvalidInput(format!(
                "match {match_id} is not fully seeded yet"
            )));
        };
        if winner != one && winner != two {
            return Err(EngineError::InvalidInput(format!(
                "winner {winner} is not seated in match {match_id}"
            )));
        }

        let mut tx = self.pool.begin().await?;

        let recorded = sqlx::query("UPDATE matches SET winner_id = $1 WHERE id = $2 AND winner_id IS NULL")
            .bind(winner)
            .bind(match_id)
            .execute(&mut *tx)
            .await?;

        if recorded.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(EngineError::Conflict(format!(
                "match {match_id} already has a recorded result"
            )));
        }

        // Propagate the winner; the final has no successor row and the
        // update simply matches nothing.
        let next = bracket::advance_slot(game.round, game.match_number);
        let seat_column = match next.seat {
            Seat::One => "participant_one",
            Seat::Two => "participant_two",
        };
        sqlx::query(&format!(
            "UPDATE matches SET {seat_column} = $1
             WHERE tournament_id = $2 AND round = $3 AND match_number = $4"
        ))
        .bind(winner)
        .bind(game.tournament_id)
        .bind(next.round as i32)
        .bind(next.match_number as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        game.winner_id = Some(winner);
        log::info!(
            "Match {} (tournament {}, round {}) won by participant {}",
            match_id,
            game.tournament_id,
            game.round,
            winner
        );
        Ok(game)
    }
}

/// Map a full `tournaments` row
fn tournament_from_row(row: &sqlx::postgres::PgRow) -> EngineResult<Tournament> {
    let status = TournamentStatus::from_column(row.get::<String, _>("status").as_str())?;
    let format: TournamentFormat = serde_json::from_value(row.get("config"))?;

    Ok(Tournament {
        id: row.get("id"),
        creator_id: row.get("creator_id"),
        name: row.get("name"),
        format,
        status,
        participant_count: row.get::<i32, _>("participant_count") as u32,
        seed: row.get("seed"),
        declared_winner_id: row.get("declared_winner_id"),
        has_join_password: row.get::<Option<String>, _>("join_password_hash").is_some(),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        started_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("started_at")
            .map(|dt| dt.and_utc()),
        finished_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("finished_at")
            .map(|dt| dt.and_utc()),
    })
}
