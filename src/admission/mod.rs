//! Participant admission: slot reservation, roster validation, join passwords.
//!
//! This module owns the path from a candidate entrant to a persisted
//! participant:
//! - Entrant shape validation (individual vs. team, roster size)
//! - Join password verification (Argon2id hashes, never plaintext)
//! - Team captaincy and roster membership checks against the external
//!   team subsystem
//! - Atomic slot reservation against the tournament's capacity
//!
//! ## Example
//!
//! ```no_run
//! use tournament_engine::admission::{AdmissionGate, NewParticipant};
//! use tournament_engine::db::{Database, PgTeamDirectory};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let pool = Arc::new(db.pool().clone());
//!     let teams = Arc::new(PgTeamDirectory::new(pool.as_ref().clone()));
//!     let gate = AdmissionGate::new(pool, teams);
//!
//!     let entry = NewParticipant::individual("ana", Some(42));
//!     let participant = gate.admit(1, entry, None, Some(42)).await?;
//!     println!("admitted as participant {}", participant.id);
//!     Ok(())
//! }
//! ```

pub mod gate;
pub mod models;
pub mod password;

pub use gate::{AdmissionGate, validate_roster};
pub use models::{EntrantKind, NewParticipant, Participant, ParticipantId};
pub use password::{hash_join_password, verify_join_password};
