//! Close-and-reopen scenarios: every acknowledged change must be visible to
//! the next popup instance sharing the same store.

use standup_core::{
    Cmd, Error, ManualClock, MemoryStore, ParticipantKey, PersistentStore, PickRng,
    SessionConfig, SessionCoordinator, SharedStore, TimerState, UnavailableStore,
};
use std::sync::Arc;

const T0: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60_000;
const HOUR: i64 = 60 * MINUTE;

fn open(store: &SharedStore, clock: &Arc<ManualClock>) -> SessionCoordinator {
    SessionCoordinator::open(store.clone(), clock.clone(), SessionConfig::default())
        .with_rng(PickRng::new(31))
}

#[test]
fn test_roster_changes_survive_reopen() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));

    let mut popup = open(&store, &clock);
    popup.add_participant("Grace", "Hopper").unwrap();
    popup.remove_participant(&ParticipantKey::new("Bob", "Williams"));
    popup.toggle_participant(&ParticipantKey::new("Grace", "Hopper"));
    popup.shuffle_roster();
    let order: Vec<String> = popup.participants().iter().map(|p| p.full_name()).collect();
    drop(popup);

    let reopened = open(&store, &clock);
    let reloaded: Vec<String> = reopened
        .participants()
        .iter()
        .map(|p| p.full_name())
        .collect();
    assert_eq!(reloaded, order);
    assert_eq!(reopened.view().spoken_count, 1);
    assert!(!reloaded.contains(&"Bob Williams".to_string()));
}

#[test]
fn test_running_timer_resumes_with_tick() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));

    let mut popup = open(&store, &clock);
    popup.start_timer(5).unwrap();
    drop(popup);

    clock.advance(90_000);
    let mut reopened = open(&store, &clock);
    let update = reopened.recover();
    assert!(matches!(update.cmd, Cmd::ArmTimerTick { .. }));
    assert_eq!(update.view.timer.state, TimerState::Running);
    assert_eq!(update.view.timer.display, "03:30");
    assert!((update.view.timer.percentage - 70.0).abs() < 1e-9);
}

#[test]
fn test_timer_finished_half_an_hour_ago_shows_zero() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));

    open(&store, &clock).start_timer(5).unwrap();
    clock.advance(5 * MINUTE + 30 * MINUTE);

    let update = open(&store, &clock).recover();
    assert!(update.cmd.is_none());
    assert_eq!(update.view.timer.state, TimerState::Expired);
    assert_eq!(update.view.timer.remaining_ms, 0);
    assert_eq!(update.view.timer.display, "00:00");
}

#[test]
fn test_stale_timer_is_cleared() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));

    open(&store, &clock).start_timer(5).unwrap();
    clock.advance(5 * MINUTE + 2 * HOUR);

    let update = open(&store, &clock).recover();
    assert_eq!(update.view.timer.state, TimerState::Idle);
    assert!(store.get("scrumTimerEnd").unwrap().is_none());
    assert!(store.get("scrumTimerDuration").unwrap().is_none());

    // and it stays gone on the next open
    let update = open(&store, &clock).recover();
    assert_eq!(update.view.timer.state, TimerState::Idle);
}

#[test]
fn test_reads_values_written_by_the_extension() {
    let store: SharedStore = Arc::new(MemoryStore::with_entries([
        (
            "scrumUsers",
            r#"[{"firstName":"Ann","lastName":"Lee","spoken":false},{"firstName":"Bo","lastName":"Ng","spoken":true}]"#,
        ),
        ("scrumTimerEnd", "1700000120000"),
        ("scrumTimerDuration", "600000"),
    ]));
    let clock = Arc::new(ManualClock::new(T0));

    let mut popup = open(&store, &clock);
    let update = popup.recover();
    assert_eq!(update.view.spoken_counter(), "1/2");
    assert_eq!(update.view.timer.display, "02:00");
    assert_eq!(update.view.timer.state, TimerState::Running);
}

#[test]
fn test_everything_works_without_storage() {
    let store: SharedStore = Arc::new(UnavailableStore);
    let clock = Arc::new(ManualClock::new(T0));

    let mut popup = open(&store, &clock);
    let update = popup.recover();
    assert!(update.view.persistence_degraded);
    assert_eq!(update.view.participants.len(), 5);

    popup.add_participant("Grace", "Hopper").unwrap();
    popup.start_timer(3).unwrap();
    popup.add_backlog_item("CI flakiness").unwrap();
    let update = popup.run_picker().unwrap();
    assert!(update.view.persistence_degraded);
    assert_eq!(update.view.participants.len(), 6);
    assert_eq!(update.view.timer.display, "03:00");
    assert_eq!(update.view.backlog.len(), 1);
}

#[test]
fn test_failed_import_leaves_saved_roster_alone() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));

    let mut popup = open(&store, &clock);
    let saved = store.get("scrumUsers").unwrap();
    let err = popup
        .import_roster(r#"[{"firstName":"Ada","lastName":"Lovelace"},{"firstName":"Alan"}]"#)
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(store.get("scrumUsers").unwrap(), saved);
}

#[test]
fn test_export_then_import_round_trip_resets_spoken() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));

    let mut popup = open(&store, &clock);
    popup.toggle_participant(&ParticipantKey::new("Jane", "Doe"));
    let exported = popup.export_roster().unwrap();
    assert!(exported.contains("\"spoken\": true"));

    let fresh: SharedStore = Arc::new(MemoryStore::new());
    let mut other = open(&fresh, &clock);
    let update = other.import_roster(&exported).unwrap();
    assert_eq!(update.view.participants.len(), 5);
    assert_eq!(update.view.spoken_count, 0);
}
