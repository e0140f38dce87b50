//! # Tournament Engine
//!
//! A tournament lifecycle and bracket engine: the component behind a
//! bracket site that owns a tournament's state machine, admits individual
//! and team participants under concurrent registration, generates a
//! single-elimination bracket from the admitted roster, mediates match
//! progression, and issues short-lived per-participant access links.
//!
//! The engine is a library-level contract consumed by a transport layer;
//! it owns no wire protocol. All mutual exclusion comes from the shared
//! PostgreSQL store: capacity is a guarded counter update, lifecycle
//! transitions are conditional updates, and the at-most-one-live-privilege
//! rule is a partial unique index. No in-process lock is ever held across
//! an await, so any number of process instances can serve requests
//! concurrently.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Lifecycle state machine and match result recording
//! - [`admission`]: Participant admission gate and roster validation
//! - [`bracket`]: Pure bracket generation and progression arithmetic
//! - [`access`]: Scoped, time-bounded match access links
//! - [`leaderboard`]: Ranked standings over achievement scores
//! - [`db`]: Connection pooling, configuration, and the team subsystem seam
//!
//! ## Example
//!
//! Bracket generation is pure and needs no database:
//!
//! ```
//! use tournament_engine::admission::{EntrantKind, Participant};
//! use tournament_engine::bracket;
//! use tournament_engine::tournament::TournamentFormat;
//!
//! let participants: Vec<Participant> = (1..=5)
//!     .map(|id| Participant {
//!         id,
//!         tournament_id: 1,
//!         display_name: format!("player {id}"),
//!         entrant: EntrantKind::Individual { user_id: None },
//!         registered_at: chrono::Utc::now(),
//!     })
//!     .collect();
//!
//! let format = TournamentFormat::single_elimination(8);
//! let slots = bracket::generate(&participants, &format, None).unwrap();
//!
//! // 5 entrants fill an 8-slot bracket: 7 rows, 3 of them byes.
//! assert_eq!(slots.len(), 7);
//! assert_eq!(slots.iter().filter(|m| m.is_bye).count(), 3);
//! ```

pub mod access;
pub mod admission;
pub mod bracket;
pub mod db;
pub mod errors;
pub mod leaderboard;
pub mod tournament;

pub use errors::{EngineError, EngineResult};

pub use access::AccessLinkIssuer;
pub use admission::AdmissionGate;
pub use db::{Database, DatabaseConfig};
pub use leaderboard::LeaderboardAggregator;
pub use tournament::TournamentManager;
