//! Single-elimination bracket generation.
//!
//! Generation is pure: the same ordered participant list and format always
//! produce the same pairing and round structure. Randomized seeding shuffles
//! with a caller-supplied seed that the state machine records on the
//! tournament row, so even a shuffled bracket is reproducible.

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::collections::HashSet;

use super::models::{MatchSlot, NextSlot, Seat};
use crate::admission::{EntrantKind, Participant, ParticipantId};
use crate::errors::{EngineError, EngineResult};
use crate::tournament::{MIN_PARTICIPANTS, SeedingPolicy, TournamentFormat};

/// Smallest power of two that fits `n` participants
pub fn bracket_size(n: usize) -> usize {
    n.next_power_of_two()
}

/// Number of rounds needed for `n` participants
pub fn round_count(n: usize) -> u32 {
    bracket_size(n).trailing_zeros()
}

/// Where the winner of a match advances to
///
/// Winners of matches `2k-1` and `2k` of one round meet in match `k` of the
/// next; the odd match feeds seat one. The final simply has no successor
/// row to update.
pub fn advance_slot(round: u32, match_number: u32) -> NextSlot {
    NextSlot {
        round: round + 1,
        match_number: match_number.div_ceil(2),
        seat: if match_number % 2 == 1 {
            Seat::One
        } else {
            Seat::Two
        },
    }
}

/// Generate the complete match set for a tournament
///
/// # Arguments
///
/// * `participants` - Admitted participants in seeding order
/// * `format` - Tournament format; team formats require every participant
///   to carry a roster
/// * `seed` - Recorded shuffle seed, required for randomized seeding
///
/// # Errors
///
/// * `EngineError::InvalidInput` - Fewer than two participants, a
///   duplicated participant, a roster-less entrant in a team format, or a
///   missing seed under randomized seeding
pub fn generate(
    participants: &[Participant],
    format: &TournamentFormat,
    seed: Option<u64>,
) -> EngineResult<Vec<MatchSlot>> {
    let n = participants.len();
    if n < MIN_PARTICIPANTS as usize {
        return Err(EngineError::InvalidInput(format!(
            "at least {MIN_PARTICIPANTS} participants are required, have {n}"
        )));
    }

    let mut seen = HashSet::new();
    for participant in participants {
        if !seen.insert(participant.id) {
            return Err(EngineError::InvalidInput(format!(
                "participant {} appears more than once",
                participant.id
            )));
        }
        if format.is_team_format()
            && !matches!(&participant.entrant, EntrantKind::Team { roster, .. } if !roster.is_empty())
        {
            return Err(EngineError::InvalidInput(format!(
                "participant {} has no roster in a team-format tournament",
                participant.id
            )));
        }
    }

    let mut order: Vec<ParticipantId> = participants.iter().map(|p| p.id).collect();
    if format.seeding == SeedingPolicy::Randomized {
        let seed = seed.ok_or_else(|| {
            EngineError::InvalidInput("randomized seeding requires a recorded seed".to_string())
        })?;
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);
    }

    let size = bracket_size(n);
    let rounds = round_count(n);
    let slots = seeding_order(size);

    let mut matches = Vec::with_capacity(size - 1);
    let mut bye_winners: Vec<(u32, ParticipantId)> = Vec::new();

    // Round 1: fold the seeding order into pairs. Phantom seeds past the
    // field become byes; the pairing construction keeps the phantom in the
    // second seat.
    for number in 1..=(size / 2) as u32 {
        let seed_a = slots[(2 * number - 2) as usize];
        let seed_b = slots[(2 * number - 1) as usize];
        let one = order.get(seed_a - 1).copied();
        let two = order.get(seed_b - 1).copied();
        match (one, two) {
            (Some(one), None) => {
                bye_winners.push((number, one));
                matches.push(MatchSlot {
                    round: 1,
                    match_number: number,
                    participant_one: Some(one),
                    participant_two: None,
                    winner_id: Some(one),
                    is_bye: true,
                });
            }
            _ => matches.push(MatchSlot {
                round: 1,
                match_number: number,
                participant_one: one,
                participant_two: two,
                winner_id: None,
                is_bye: false,
            }),
        }
    }

    // Later rounds start empty and fill as results come in.
    for round in 2..=rounds {
        for number in 1..=(size >> round) as u32 {
            matches.push(MatchSlot {
                round,
                match_number: number,
                participant_one: None,
                participant_two: None,
                winner_id: None,
                is_bye: false,
            });
        }
    }

    // Encode bye advancement explicitly: pre-seed the next round.
    for (number, winner) in bye_winners {
        let next = advance_slot(1, number);
        let slot = matches
            .iter_mut()
            .find(|m| m.round == next.round && m.match_number == next.match_number)
            .expect("bye advancement always targets an existing round-2 match");
        match next.seat {
            Seat::One => slot.participant_one = Some(winner),
            Seat::Two => slot.participant_two = Some(winner),
        }
    }

    Ok(matches)
}

/// Standard bracket seeding order for a power-of-two field
///
/// Consecutive pairs form the first round, placed so the top seeds can
/// only meet in the latest possible round: size 8 yields
/// `[1, 8, 4, 5, 2, 7, 3, 6]`, i.e. 1v8, 4v5, 2v7, 3v6.
fn seeding_order(size: usize) -> Vec<usize> {
    let mut order = vec![1];
    let mut len = 1;
    while len < size {
        len *= 2;
        let mut next = Vec::with_capacity(len);
        for &seed in &order {
            next.push(seed);
            next.push(len + 1 - seed);
        }
        order = next;
    }
    order
}
