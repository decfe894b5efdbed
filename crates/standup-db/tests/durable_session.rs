//! Sessions running over an on-disk store.

use standup_core::{
    ManualClock, ParticipantKey, PersistentStore, PickRng, SessionConfig, SessionCoordinator,
    SharedStore, TimerState,
};
use standup_db::KvStore;
use std::sync::Arc;

const T0: i64 = 1_700_000_000_000;

fn open(store: &SharedStore, clock: &Arc<ManualClock>) -> SessionCoordinator {
    SessionCoordinator::open(store.clone(), clock.clone(), SessionConfig::default())
        .with_rng(PickRng::new(5))
}

#[test]
fn test_values_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("standup.db");

    {
        let store = KvStore::open(&path).unwrap();
        store.set("scrumTimerEnd", "1700000300000").unwrap();
    }

    let store = KvStore::open(&path).unwrap();
    assert_eq!(
        store.get("scrumTimerEnd").unwrap().as_deref(),
        Some("1700000300000")
    );
}

#[test]
fn test_session_state_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("standup.db");
    let clock = Arc::new(ManualClock::new(T0));

    {
        let store: SharedStore = Arc::new(KvStore::open(&path).unwrap());
        let mut popup = open(&store, &clock);
        popup.add_participant("Grace", "Hopper").unwrap();
        popup.toggle_participant(&ParticipantKey::new("Jane", "Doe"));
        popup.add_backlog_item("Release checklist").unwrap();
        popup.start_timer(10).unwrap();
        assert!(!popup.view().persistence_degraded);
    }

    clock.advance(60_000);
    let store: SharedStore = Arc::new(KvStore::open(&path).unwrap());
    let mut popup = open(&store, &clock);
    let update = popup.recover();

    assert_eq!(update.view.participants.len(), 6);
    assert_eq!(update.view.spoken_counter(), "1/6");
    assert_eq!(update.view.backlog.len(), 1);
    assert_eq!(update.view.backlog[0].text, "Release checklist");
    assert_eq!(update.view.timer.state, TimerState::Running);
    assert_eq!(update.view.timer.display, "09:00");
}

#[test]
fn test_stop_removes_timer_rows() {
    let store = Arc::new(KvStore::in_memory().unwrap());
    let shared: SharedStore = store.clone();
    let clock = Arc::new(ManualClock::new(T0));

    let mut popup = open(&shared, &clock);
    popup.start_timer(2).unwrap();
    popup.stop_timer();

    let keys = store.keys().unwrap();
    assert!(keys.contains(&"scrumUsers".to_string()));
    assert!(!keys.contains(&"scrumTimerEnd".to_string()));
    assert!(!keys.contains(&"scrumTimerDuration".to_string()));
}
