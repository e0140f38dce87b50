//! Bracket generation and match progression arithmetic.
//!
//! The generator is a pure function over the admitted participant set: no
//! I/O, no hidden randomness. The state machine persists its output in the
//! same transaction as the start transition, so a bracket either exists in
//! full or not at all.

pub mod generator;
pub mod models;

pub use generator::{advance_slot, bracket_size, generate, round_count};
pub use models::{Match, MatchId, MatchSlot, NextSlot, Seat};
