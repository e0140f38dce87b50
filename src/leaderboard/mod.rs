//! Achievement leaderboard: ranked standings over accumulated scores.

pub mod aggregator;

pub use aggregator::{DEFAULT_LEADERBOARD_LIMIT, LeaderboardAggregator, LeaderboardRow};
