//! Tournament lifecycle integration tests.
//!
//! These tests exercise the full engine against PostgreSQL, including the
//! concurrency invariants: the capacity guard under racing admissions and
//! the exactly-once start transition. They skip themselves when
//! `DATABASE_URL` is unset so the pure test suite still runs anywhere.

use serial_test::serial;
use std::sync::Arc;
use tokio::task::JoinSet;

use tournament_engine::EngineError;
use tournament_engine::admission::{AdmissionGate, NewParticipant};
use tournament_engine::db::{Database, DatabaseConfig, PgTeamDirectory};
use tournament_engine::tournament::{
    NewTournament, ResultAuthority, TournamentFormat, TournamentManager, TournamentStatus,
};

const CREATOR: i64 = 42;

async fn test_db() -> Option<Database> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        database_url,
        ..DatabaseConfig::development()
    };
    let db = Database::new(&config)
        .await
        .expect("failed to connect to test database");
    db.run_migrations().await.expect("migrations failed");
    Some(db)
}

struct Engine {
    manager: TournamentManager,
    gate: AdmissionGate,
    pool: Arc<sqlx::PgPool>,
}

fn engine(db: &Database) -> Engine {
    let pool = Arc::new(db.pool().clone());
    let teams = Arc::new(PgTeamDirectory::new(pool.as_ref().clone()));
    Engine {
        manager: TournamentManager::new(pool.clone()),
        gate: AdmissionGate::new(pool.clone(), teams),
        pool,
    }
}

async fn open_tournament(engine: &Engine, format: TournamentFormat) -> i64 {
    engine
        .manager
        .create_tournament(NewTournament::open(CREATOR, "integration test", format))
        .await
        .expect("create failed")
        .id
}

#[tokio::test]
#[serial]
async fn test_full_lifecycle_with_four_players() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;

    let mut participants = Vec::new();
    for (name, user) in [("ana", 1), ("bo", 2), ("cy", 3), ("di", 4)] {
        let admitted = engine
            .gate
            .admit(id, NewParticipant::individual(name, Some(user)), None, Some(user))
            .await
            .expect("admission failed");
        participants.push(admitted.id);
    }

    let tournament = engine.manager.get(id).await.unwrap();
    assert_eq!(tournament.participant_count, 4);
    assert_eq!(tournament.status, TournamentStatus::Open);

    let bracket = engine.manager.start(id, CREATOR).await.expect("start failed");
    assert_eq!(bracket.len(), 3);
    assert!(bracket.iter().all(|m| !m.is_bye));

    let tournament = engine.manager.get(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::InProgress);
    assert!(tournament.started_at.is_some());

    // Report both semifinals as the creator; winners meet in the final.
    let semi_one = &bracket[0];
    let semi_two = &bracket[1];
    let winner_one = semi_one.participant_one.unwrap();
    let winner_two = semi_two.participant_two.unwrap();

    engine
        .manager
        .record_match_result(semi_one.id, winner_one, ResultAuthority::Creator(CREATOR))
        .await
        .expect("first result failed");
    engine
        .manager
        .record_match_result(semi_two.id, winner_two, ResultAuthority::Creator(CREATOR))
        .await
        .expect("second result failed");

    let final_match = engine
        .manager
        .get_bracket(id)
        .await
        .unwrap()
        .into_iter()
        .find(|m| m.round == 2)
        .unwrap();
    assert_eq!(final_match.participant_one, Some(winner_one));
    assert_eq!(final_match.participant_two, Some(winner_two));

    engine
        .manager
        .record_match_result(final_match.id, winner_one, ResultAuthority::Creator(CREATOR))
        .await
        .expect("final result failed");

    let declared = engine
        .manager
        .stop(id, CREATOR, Some(winner_one))
        .await
        .expect("stop failed");
    assert_eq!(declared, Some(winner_one));

    let tournament = engine.manager.get(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Completed);
    assert_eq!(tournament.declared_winner_id, Some(winner_one));
    assert!(tournament.finished_at.is_some());
}

#[tokio::test]
#[serial]
async fn test_capacity_race_admits_exactly_max() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(2)).await;

    let mut tasks = JoinSet::new();
    for i in 0..6 {
        let gate = engine.gate.clone();
        tasks.spawn(async move {
            gate.admit(
                id,
                NewParticipant::individual(format!("racer {i}"), None),
                None,
                None,
            )
            .await
        });
    }

    let mut admitted = 0;
    let mut rejected = 0;
    while let Some(result) = tasks.join_next().await {
        match result.expect("task panicked") {
            Ok(_) => admitted += 1,
            Err(EngineError::CapacityExceeded { max }) => {
                assert_eq!(max, 2);
                rejected += 1;
            }
            Err(other) => panic!("unexpected admission error: {other}"),
        }
    }
    assert_eq!(admitted, 2);
    assert_eq!(rejected, 4);

    let tournament = engine.manager.get(id).await.unwrap();
    assert_eq!(tournament.participant_count, 2);
    assert_eq!(engine.manager.list_participants(id).await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn test_concurrent_starts_generate_exactly_one_bracket() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;
    for i in 0..4 {
        engine
            .gate
            .admit(id, NewParticipant::individual(format!("p{i}"), None), None, None)
            .await
            .unwrap();
    }

    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let manager = engine.manager.clone();
        tasks.spawn(async move { manager.start(id, CREATOR).await });
    }

    let mut started = 0;
    let mut refused = 0;
    while let Some(result) = tasks.join_next().await {
        match result.expect("task panicked") {
            Ok(bracket) => {
                assert_eq!(bracket.len(), 3);
                started += 1;
            }
            Err(EngineError::InvalidState { .. }) => refused += 1,
            Err(other) => panic!("unexpected start error: {other}"),
        }
    }
    assert_eq!(started, 1);
    assert_eq!(refused, 3);

    // Exactly one bracket was persisted despite four attempts.
    assert_eq!(engine.manager.get_bracket(id).await.unwrap().len(), 3);
}

#[tokio::test]
#[serial]
async fn test_stop_requires_in_progress_and_leaves_winner_unset() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;
    let participant = engine
        .gate
        .admit(id, NewParticipant::individual("ana", None), None, None)
        .await
        .unwrap();

    let err = engine
        .manager
        .stop(id, CREATOR, Some(participant.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));

    let tournament = engine.manager.get(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Open);
    assert_eq!(tournament.declared_winner_id, None);
}

#[tokio::test]
#[serial]
async fn test_creator_only_transitions() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;
    for i in 0..2 {
        engine
            .gate
            .admit(id, NewParticipant::individual(format!("p{i}"), None), None, None)
            .await
            .unwrap();
    }

    let intruder = CREATOR + 1;
    assert!(matches!(
        engine.manager.start(id, intruder).await.unwrap_err(),
        EngineError::Unauthorized(_)
    ));
    assert!(matches!(
        engine.manager.stop(id, intruder, None).await.unwrap_err(),
        EngineError::Unauthorized(_)
    ));
    assert!(matches!(
        engine.manager.cancel(id, intruder).await.unwrap_err(),
        EngineError::Unauthorized(_)
    ));

    // Still startable by the actual creator afterwards.
    assert!(engine.manager.start(id, CREATOR).await.is_ok());
}

#[tokio::test]
#[serial]
async fn test_start_needs_two_participants() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;
    engine
        .gate
        .admit(id, NewParticipant::individual("ana", None), None, None)
        .await
        .unwrap();

    let err = engine.manager.start(id, CREATOR).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    // Nothing was persisted and the status did not move.
    let tournament = engine.manager.get(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Open);
    assert!(engine.manager.get_bracket(id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_admission_closes_once_started() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;
    for i in 0..2 {
        engine
            .gate
            .admit(id, NewParticipant::individual(format!("p{i}"), None), None, None)
            .await
            .unwrap();
    }
    engine.manager.start(id, CREATOR).await.unwrap();

    let err = engine
        .gate
        .admit(id, NewParticipant::individual("late", None), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

#[tokio::test]
#[serial]
async fn test_withdrawal_only_before_start() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;
    let ana = engine
        .gate
        .admit(id, NewParticipant::individual("ana", Some(7)), None, Some(7))
        .await
        .unwrap();
    for i in 0..2 {
        engine
            .gate
            .admit(id, NewParticipant::individual(format!("p{i}"), None), None, None)
            .await
            .unwrap();
    }

    // A stranger may not withdraw ana's entry.
    assert!(matches!(
        engine
            .manager
            .withdraw_participant(id, ana.id, Some(999))
            .await
            .unwrap_err(),
        EngineError::Forbidden(_)
    ));

    // Ana withdraws herself; the slot is released.
    engine
        .manager
        .withdraw_participant(id, ana.id, Some(7))
        .await
        .unwrap();
    assert_eq!(engine.manager.get(id).await.unwrap().participant_count, 2);

    engine.manager.start(id, CREATOR).await.unwrap();

    let remaining = engine.manager.list_participants(id).await.unwrap();
    let err = engine
        .manager
        .withdraw_participant(id, remaining[0].id, Some(CREATOR))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

#[tokio::test]
#[serial]
async fn test_join_password_gate() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let request = NewTournament::open(CREATOR, "locked", TournamentFormat::single_elimination(8))
        .with_join_password("sesame");
    let tournament = engine.manager.create_tournament(request).await.unwrap();
    assert!(tournament.has_join_password);

    let entry = || NewParticipant::individual("ana", None);
    assert!(matches!(
        engine.gate.admit(tournament.id, entry(), None, None).await.unwrap_err(),
        EngineError::Unauthorized(_)
    ));
    assert!(matches!(
        engine
            .gate
            .admit(tournament.id, entry(), Some("guess"), None)
            .await
            .unwrap_err(),
        EngineError::Unauthorized(_)
    ));
    assert!(
        engine
            .gate
            .admit(tournament.id, entry(), Some("sesame"), None)
            .await
            .is_ok()
    );
}

#[tokio::test]
#[serial]
async fn test_team_admission_against_team_directory() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    // Seed the externally-owned team tables.
    let team_id: i64 = sqlx::query_scalar(
        "INSERT INTO teams (name, captain_id) VALUES ('crushers', 100) RETURNING id",
    )
    .fetch_one(engine.pool.as_ref())
    .await
    .unwrap();
    for user in [100i64, 101, 102] {
        sqlx::query("INSERT INTO team_members (team_id, user_id) VALUES ($1, $2)")
            .bind(team_id)
            .bind(user)
            .execute(engine.pool.as_ref())
            .await
            .unwrap();
    }

    let id = open_tournament(&engine, TournamentFormat::team_single_elimination(8, 2)).await;

    // Unknown team.
    assert!(matches!(
        engine
            .gate
            .admit(id, NewParticipant::team("ghosts", team_id + 999, vec![1, 2]), None, Some(1))
            .await
            .unwrap_err(),
        EngineError::NotFound("team")
    ));

    // Guest captains are not a thing.
    assert!(matches!(
        engine
            .gate
            .admit(id, NewParticipant::team("crushers", team_id, vec![100, 101]), None, None)
            .await
            .unwrap_err(),
        EngineError::Unauthorized(_)
    ));

    // Not the captain.
    assert!(matches!(
        engine
            .gate
            .admit(id, NewParticipant::team("crushers", team_id, vec![100, 101]), None, Some(101))
            .await
            .unwrap_err(),
        EngineError::Forbidden(_)
    ));

    // Roster member outside the team.
    assert!(matches!(
        engine
            .gate
            .admit(id, NewParticipant::team("crushers", team_id, vec![100, 999]), None, Some(100))
            .await
            .unwrap_err(),
        EngineError::Forbidden(_)
    ));

    // Captain with a valid roster of the configured size.
    let admitted = engine
        .gate
        .admit(id, NewParticipant::team("crushers", team_id, vec![100, 101]), None, Some(100))
        .await
        .unwrap();
    assert_eq!(admitted.entrant.roster(), Some(&[100, 101][..]));
}

#[tokio::test]
#[serial]
async fn test_draft_tournaments_open_before_admitting() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let mut request = NewTournament::open(CREATOR, "drafted", TournamentFormat::single_elimination(8));
    request.initial_status = TournamentStatus::Draft;
    let tournament = engine.manager.create_tournament(request).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Draft);

    // Registration is closed while drafting.
    let err = engine
        .gate
        .admit(tournament.id, NewParticipant::individual("early", None), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));

    // Only the creator can open it, and only once.
    assert!(matches!(
        engine
            .manager
            .open_registration(tournament.id, CREATOR + 1)
            .await
            .unwrap_err(),
        EngineError::Unauthorized(_)
    ));
    engine
        .manager
        .open_registration(tournament.id, CREATOR)
        .await
        .unwrap();
    assert!(matches!(
        engine
            .manager
            .open_registration(tournament.id, CREATOR)
            .await
            .unwrap_err(),
        EngineError::InvalidState { .. }
    ));

    assert!(
        engine
            .gate
            .admit(tournament.id, NewParticipant::individual("ana", None), None, None)
            .await
            .is_ok()
    );
}

#[tokio::test]
#[serial]
async fn test_cancel_paths() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    // Open tournaments cancel without a bracket.
    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;
    engine.manager.cancel(id, CREATOR).await.unwrap();
    let tournament = engine.manager.get(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Cancelled);

    // Terminal tournaments stay terminal.
    let err = engine.manager.cancel(id, CREATOR).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

#[tokio::test]
#[serial]
async fn test_bye_rows_are_pre_won_and_unreportable() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;
    for i in 0..3 {
        engine
            .gate
            .admit(id, NewParticipant::individual(format!("p{i}"), None), None, None)
            .await
            .unwrap();
    }

    let bracket = engine.manager.start(id, CREATOR).await.unwrap();
    let bye = bracket.iter().find(|m| m.is_bye).expect("expected a bye");
    assert_eq!(bye.winner_id, bye.participant_one);

    // The bye winner is already seated in round 2.
    let advanced = bracket
        .iter()
        .find(|m| m.round == 2 && m.participant_one == bye.winner_id);
    assert!(advanced.is_some());

    // Byes are pre-won; reporting one is a conflict.
    let err = engine
        .manager
        .record_match_result(
            bye.id,
            bye.participant_one.unwrap(),
            ResultAuthority::Creator(CREATOR),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
#[serial]
async fn test_result_reporting_guards() {
    let Some(db) = test_db().await else { return };
    let engine = engine(&db);

    let id = open_tournament(&engine, TournamentFormat::single_elimination(8)).await;
    let mut seats = Vec::new();
    for i in 0..4 {
        let p = engine
            .gate
            .admit(id, NewParticipant::individual(format!("p{i}"), None), None, None)
            .await
            .unwrap();
        seats.push(p.id);
    }
    let bracket = engine.manager.start(id, CREATOR).await.unwrap();
    let first = &bracket[0];
    let outsider = seats
        .iter()
        .copied()
        .find(|p| first.participant_one != Some(*p) && first.participant_two != Some(*p))
        .unwrap();

    // Winner must be seated in the match.
    assert!(matches!(
        engine
            .manager
            .record_match_result(first.id, outsider, ResultAuthority::Creator(CREATOR))
            .await
            .unwrap_err(),
        EngineError::InvalidInput(_)
    ));

    // The final is not seeded yet.
    let last = bracket.iter().find(|m| m.round == 2).unwrap();
    assert!(matches!(
        engine
            .manager
            .record_match_result(last.id, seats[0], ResultAuthority::Creator(CREATOR))
            .await
            .unwrap_err(),
        EngineError::InvalidInput(_)
    ));

    // First report wins, the second is a conflict.
    let winner = first.participant_one.unwrap();
    engine
        .manager
        .record_match_result(first.id, winner, ResultAuthority::Creator(CREATOR))
        .await
        .unwrap();
    assert!(matches!(
        engine
            .manager
            .record_match_result(first.id, winner, ResultAuthority::Creator(CREATOR))
            .await
            .unwrap_err(),
        EngineError::Conflict(_)
    ));
}
