use baker_core::{LockedRound, PayloadHash};
use baker_watermark::{PersistedLevelState, PersistentLevelStateStore};

fn payload() -> PayloadHash {
    PayloadHash::of(b"payload-a")
}

#[tokio::test]
async fn writes_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = PersistentLevelStateStore::open(dir.path()).await.unwrap();
    let state = PersistedLevelState {
        level: 10,
        locked_round: Some(LockedRound {
            payload_hash: payload(),
            round: 1,
        }),
        endorsable_payload: None,
    };
    store.write_if_changed(state.clone()).await.unwrap();
    assert_eq!(store.current(), Some(state));
}

#[tokio::test]
async fn same_level_regression_to_none_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = PersistentLevelStateStore::open(dir.path()).await.unwrap();
    store
        .write_if_changed(PersistedLevelState {
            level: 10,
            locked_round: Some(LockedRound {
                payload_hash: payload(),
                round: 1,
            }),
            endorsable_payload: None,
        })
        .await
        .unwrap();

    let regressed = PersistedLevelState {
        level: 10,
        locked_round: None,
        endorsable_payload: None,
    };
    assert!(store.write_if_changed(regressed).await.is_err());
}

#[tokio::test]
async fn level_bump_clearing_locked_round_is_legitimate() {
    let dir = tempfile::tempdir().unwrap();
    let store = PersistentLevelStateStore::open(dir.path()).await.unwrap();
    store
        .write_if_changed(PersistedLevelState {
            level: 10,
            locked_round: Some(LockedRound {
                payload_hash: payload(),
                round: 1,
            }),
            endorsable_payload: None,
        })
        .await
        .unwrap();

    let bumped = PersistedLevelState {
        level: 11,
        locked_round: None,
        endorsable_payload: None,
    };
    store.write_if_changed(bumped.clone()).await.unwrap();
    assert_eq!(store.current(), Some(bumped));
}

#[tokio::test]
async fn restart_recovers_the_last_written_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = PersistedLevelState {
        level: 42,
        locked_round: None,
        endorsable_payload: None,
    };
    {
        let store = PersistentLevelStateStore::open(dir.path()).await.unwrap();
        store.write_if_changed(state.clone()).await.unwrap();
    }
    let store = PersistentLevelStateStore::open(dir.path()).await.unwrap();
    assert_eq!(store.current(), Some(state));
}
