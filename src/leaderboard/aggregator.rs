//! Achievement leaderboard aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;

use crate::errors::{EngineError, EngineResult};
use crate::tournament::UserId;

/// Default result-set size for leaderboard queries
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 50;

/// One ranked leaderboard standing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user_id: UserId,
    /// Accumulated achievement score
    pub score: i64,
    /// Earliest achievement date, the tie-break key
    pub first_awarded: DateTime<Utc>,
}

/// Leaderboard aggregator
///
/// A read-only side path over accumulated achievement scores, decoupled
/// from the tournament lifecycle. Tolerates staleness relative to
/// concurrent score writes.
#[derive(Clone)]
pub struct LeaderboardAggregator {
    pool: Arc<PgPool>,
}

impl LeaderboardAggregator {
    /// Create a new aggregator
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Top users by accumulated score
    ///
    /// Ordering is `score DESC`, ties broken by earliest achievement date
    /// and then user ID, so repeated queries over unchanged data return
    /// the same ranking.
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidInput` - Non-positive limit
    pub async fn top(&self, limit: i64) -> EngineResult<Vec<LeaderboardRow>> {
        if limit < 1 {
            return Err(EngineError::InvalidInput(format!(
                "leaderboard limit must be positive, got {limit}"
            )));
        }

        let rows = sqlx::query(
            r#"
            SELECT user_id,
                   COALESCE(SUM(points), 0)::BIGINT AS score,
                   MIN(awarded_at) AS first_awarded
            FROM achievement_entries
            GROUP BY user_id
            ORDER BY score DESC, first_awarded ASC, user_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .iter()
            .map(|row| LeaderboardRow {
                user_id: row.get("user_id"),
                score: row.get("score"),
                first_awarded: row
                    .get::<chrono::NaiveDateTime, _>("first_awarded")
                    .and_utc(),
            })
            .collect())
    }

    /// Top users with the boundary default limit
    pub async fn top_default(&self) -> EngineResult<Vec<LeaderboardRow>> {
        self.top(DEFAULT_LEADERBOARD_LIMIT).await
    }
}
