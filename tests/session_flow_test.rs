// tests/session_flow_test.rs — full lifecycle against a real SQLite store,
// driven by a manual clock.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use trackly::{
    stats, Clock, Database, SessionController, SessionError, SessionEvent, SessionPolicy,
    SessionStatus, WorkSession,
};

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn starting_at(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(start)))
    }

    fn advance_secs(&self, secs: i64) {
        let mut guard = self.0.lock().unwrap();
        *guard = *guard + Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn test_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("trackly.sqlite3")).unwrap();
    (db, dir)
}

fn test_controller() -> (SessionController, Arc<ManualClock>, TempDir) {
    let (db, dir) = test_db();
    let clock = ManualClock::starting_at(t0());
    let controller = SessionController::with_policy(db, SessionPolicy::default(), clock.clone());
    (controller, clock, dir)
}

fn tags(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_full_lifecycle_round_trip() {
    let (db, _dir) = test_db();
    let clock = ManualClock::starting_at(t0());
    let controller =
        SessionController::with_policy(db.clone(), SessionPolicy::default(), clock.clone());

    let project = db
        .create_project("Writing".to_string(), "#7c3aed".to_string())
        .await
        .unwrap();

    let snapshot = controller.start(Some(project.id)).await.unwrap();
    assert_eq!(snapshot.session.status(), SessionStatus::Running);
    assert_eq!(snapshot.elapsed_ms, 0);

    clock.advance_secs(100);
    controller.pause().await.unwrap();
    clock.advance_secs(30);
    controller.resume().await.unwrap();
    clock.advance_secs(100);
    controller.pause().await.unwrap();

    let finished = controller
        .finalize("wrote the quarterly report", &tags(&["writing", "deep-work"]))
        .await
        .unwrap();

    // 30s of pause were absorbed: 200s of active time remain.
    assert_eq!(finished.started_at, t0() + Duration::seconds(30));
    assert_eq!(finished.ended_at, t0() + Duration::seconds(230));
    assert_eq!(finished.project_id, Some(project.id));

    assert!(controller.snapshot().await.is_none());

    let history = db.get_finished_sessions().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], finished);
    assert_eq!(history[0].description, "wrote the quarterly report");
    assert_eq!(history[0].tags, tags(&["writing", "deep-work"]));

    let by_tag = stats::duration_by_tag(&history);
    assert_eq!(by_tag["writing"], Duration::seconds(200));
    assert_eq!(by_tag["deep-work"], Duration::seconds(200));
    let by_project = stats::duration_by_project(&history);
    assert_eq!(by_project[&Some(project.id)], Duration::seconds(200));
}

#[tokio::test]
async fn test_snapshot_excludes_paused_time() {
    let (controller, clock, _dir) = test_controller();

    controller.start(None).await.unwrap();
    clock.advance_secs(60);
    let running = controller.snapshot().await.unwrap();
    assert_eq!(running.elapsed_ms, 60_000);

    controller.pause().await.unwrap();
    clock.advance_secs(600);
    let paused = controller.snapshot().await.unwrap();
    assert_eq!(paused.session.status(), SessionStatus::Paused);
    assert_eq!(paused.elapsed_ms, 60_000);

    controller.resume().await.unwrap();
    clock.advance_secs(15);
    let resumed = controller.snapshot().await.unwrap();
    assert_eq!(resumed.elapsed_ms, 75_000);
}

#[tokio::test]
async fn test_start_rejected_while_active() {
    let (controller, _clock, _dir) = test_controller();

    controller.start(None).await.unwrap();
    let err = controller.start(None).await.unwrap_err();
    assert!(err.to_string().contains("already active"));

    controller.cancel().await.unwrap();
    controller.start(None).await.unwrap();
}

#[tokio::test]
async fn test_store_enforces_single_active_row() {
    let (db, _dir) = test_db();

    let first = trackly::RunningSession::start(None, t0());
    let second = trackly::RunningSession::start(None, t0());
    db.insert_session(&first).await.unwrap();
    let err = db.insert_session(&second).await.unwrap_err();
    assert!(err.to_string().contains("already active"));
}

#[tokio::test]
async fn test_finalize_requires_pause_by_default() {
    let (controller, clock, _dir) = test_controller();

    controller.start(None).await.unwrap();
    clock.advance_secs(10);
    let err = controller
        .finalize("wrote the report", &tags(&["writing"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::InvalidTransition { .. })
    ));

    // The session is untouched and can still be paused and finalized.
    controller.pause().await.unwrap();
    controller
        .finalize("wrote the report", &tags(&["writing"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_finalize_from_running_when_policy_allows() {
    let (db, _dir) = test_db();
    let clock = ManualClock::starting_at(t0());
    let policy = SessionPolicy {
        finalize_from_running: true,
    };
    let controller = SessionController::with_policy(db, policy, clock.clone());

    controller.start(None).await.unwrap();
    clock.advance_secs(45);
    let finished = controller
        .finalize("answered support tickets", &tags(&["support"]))
        .await
        .unwrap();

    // Implicitly paused at the finalize timestamp.
    assert_eq!(finished.ended_at, t0() + Duration::seconds(45));
}

#[tokio::test]
async fn test_finalize_validates_input() {
    let (controller, clock, _dir) = test_controller();

    controller.start(None).await.unwrap();
    clock.advance_secs(10);
    controller.pause().await.unwrap();

    let err = controller.finalize("", &tags(&["writing"])).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::InvalidInput { .. })
    ));

    let err = controller.finalize("wrote the report", &[]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::InvalidInput { .. })
    ));

    // Rejected input leaves the paused session in place.
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.session.status(), SessionStatus::Paused);

    controller
        .finalize("wrote the report", &tags(&["writing"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_discards_session() {
    let (db, _dir) = test_db();
    let clock = ManualClock::starting_at(t0());
    let controller =
        SessionController::with_policy(db.clone(), SessionPolicy::default(), clock.clone());

    controller.start(None).await.unwrap();
    clock.advance_secs(30);
    controller.cancel().await.unwrap();

    assert!(controller.snapshot().await.is_none());
    assert!(db.get_active_session().await.unwrap().is_none());
    assert!(db.get_finished_sessions().await.unwrap().is_empty());

    // Cancelling again is a sequencing error.
    let err = controller.cancel().await.unwrap_err();
    assert!(err.to_string().contains("no active session"));
}

#[tokio::test]
async fn test_restore_hydrates_active_session() {
    let (db, _dir) = test_db();
    let clock = ManualClock::starting_at(t0());
    let first =
        SessionController::with_policy(db.clone(), SessionPolicy::default(), clock.clone());

    let started = first.start(None).await.unwrap();
    clock.advance_secs(120);
    first.pause().await.unwrap();

    // A new controller over the same store picks the session back up.
    let second =
        SessionController::with_policy(db.clone(), SessionPolicy::default(), clock.clone());
    let restored = second.restore().await.unwrap().unwrap();
    assert_eq!(restored.session.id(), started.session.id());
    assert_eq!(restored.session.status(), SessionStatus::Paused);
    assert_eq!(restored.elapsed_ms, 120_000);

    clock.advance_secs(60);
    let resumed = second.resume().await.unwrap();
    assert!(matches!(resumed.session, WorkSession::Running(_)));
    assert_eq!(resumed.elapsed_ms, 120_000);
}

#[tokio::test]
async fn test_cancel_abandoned_sessions() {
    let (db, _dir) = test_db();
    let clock = ManualClock::starting_at(t0());
    let controller =
        SessionController::with_policy(db.clone(), SessionPolicy::default(), clock.clone());
    controller.start(None).await.unwrap();

    // Simulates the previous process dying with a session mid-flight.
    let recovered = db.cancel_abandoned_sessions().await.unwrap();
    assert_eq!(recovered, 1);
    assert!(db.get_active_session().await.unwrap().is_none());
    assert_eq!(db.cancel_abandoned_sessions().await.unwrap(), 0);
}

#[tokio::test]
async fn test_events_broadcast_transitions() {
    let (controller, clock, _dir) = test_controller();
    let mut events = controller.subscribe();

    controller.start(None).await.unwrap();
    clock.advance_secs(10);
    controller.pause().await.unwrap();
    controller.resume().await.unwrap();
    clock.advance_secs(5);
    controller.pause().await.unwrap();
    controller
        .finalize("wrote the report", &tags(&["writing"]))
        .await
        .unwrap();

    assert!(matches!(events.try_recv().unwrap(), SessionEvent::Started { .. }));
    assert!(matches!(events.try_recv().unwrap(), SessionEvent::Paused { .. }));
    assert!(matches!(events.try_recv().unwrap(), SessionEvent::Resumed { .. }));
    assert!(matches!(events.try_recv().unwrap(), SessionEvent::Paused { .. }));
    match events.try_recv().unwrap() {
        SessionEvent::Finished { session } => {
            assert_eq!(session.description, "wrote the report");
        }
        other => panic!("expected finished event, got {:?}", other),
    }
    assert!(events.try_recv().is_err());
}
