//! Scoped, time-bounded match access links.
//!
//! A link grants one participant limited control over one match (reporting
//! its result) without any visibility into the rest of the tournament.
//! Links are minted in bulk by the creator once a tournament is in
//! progress, expire on a fixed lifetime, and are filtered at read time so
//! that expired, revoked and never-issued tokens are indistinguishable to
//! the caller.
//!
//! ## Example
//!
//! ```no_run
//! use tournament_engine::access::AccessLinkIssuer;
//! use tournament_engine::db::Database;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let issuer = AccessLinkIssuer::new(Arc::new(db.pool().clone()));
//!
//!     // Creator 42 mints links for every seat of tournament 1
//!     let links = issuer.issue_links(1, 42).await?;
//!     for link in &links {
//!         println!("match {} participant {}: {}", link.match_id, link.participant_id, link.token);
//!     }
//!     Ok(())
//! }
//! ```

pub mod issuer;
pub mod models;

pub use issuer::AccessLinkIssuer;
pub use models::{DEFAULT_LINK_TTL_HOURS, MatchAccessPrivilege, PrivilegeId, PrivilegeScope};
