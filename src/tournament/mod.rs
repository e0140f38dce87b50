//! Tournament lifecycle state machine.
//!
//! This module owns the tournament's status and every transition on it:
//! - Creation as `draft` or `open`
//! - The `start` transition, which generates and persists the bracket
//!   atomically with the status change
//! - `stop` with an advisory declared winner, and `cancel`
//! - Match result recording with winner propagation into the next round
//! - Pre-start participant withdrawal
//!
//! ## Example
//!
//! ```no_run
//! use tournament_engine::db::Database;
//! use tournament_engine::tournament::{NewTournament, TournamentFormat, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let manager = TournamentManager::new(Arc::new(db.pool().clone()));
//!
//!     let format = TournamentFormat::single_elimination(16);
//!     let tournament = manager
//!         .create_tournament(NewTournament::open(42, "Spring Cup", format))
//!         .await?;
//!
//!     // ... participants join through the admission gate ...
//!
//!     let bracket = manager.start(tournament.id, 42).await?;
//!     println!("started with {} matches", bracket.len());
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;

pub use manager::TournamentManager;
pub use models::{
    BracketKind, MIN_PARTICIPANTS, NewTournament, ResultAuthority, SeedingPolicy, Tournament,
    TournamentFormat, TournamentId, TournamentStatus, UserId,
};
