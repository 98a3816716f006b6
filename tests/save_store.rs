//! Integration tests for the sled save store and save healing
//!
//! Tests:
//! - snapshot round trip across reopen
//! - legacy browser saves are migrated on load
//! - corrupt blobs produce a fresh character instead of an error

use afkrpg::idle::{Catalog, PlayerState, SaveStore, Tone, PLAYER_SCHEMA_VERSION};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

#[test]
fn snapshot_round_trips_through_disk() {
    let dir = TempDir::new().expect("tempdir");
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    let mut state = PlayerState::new(now);
    state.gold = 250;
    state.path = Some("angler".to_string());
    state.discover("pond");
    state.current_location = "pond".to_string();
    state.current_action = Some("fishing".to_string());
    state.log(Tone::Success, "You got some Fish");

    {
        let store = SaveStore::open(dir.path()).expect("open");
        store.save(&state).expect("save");
    }

    let store = SaveStore::open(dir.path()).expect("reopen");
    let restored = store
        .load(&Catalog::standard(), now)
        .expect("load")
        .expect("save present");
    assert!(!restored.fresh);
    assert!(restored.healed_fields.is_empty());
    assert_eq!(restored.state, state);
}

#[test]
fn legacy_save_is_upgraded_on_load() {
    let store = SaveStore::temporary().expect("store");
    let legacy = r#"{
        "xp": 50,
        "lastActive": "2024-01-02T03:00:00.000Z",
        "lastLogin": "2024-01-02T02:00:00.000Z",
        "exploredLocations": ["campsite", "mine"],
        "currentLocation": "mine",
        "currentAction": "mining",
        "inv": {"items": [{"id": "pickaxe", "amt": 1}, {"id": "metal", "amt": 3}]},
        "messages": ["success#You got some Metal", "You begin mining..."]
    }"#;
    store.save_raw(legacy.as_bytes()).expect("raw save");

    let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let restored = store
        .load(&Catalog::standard(), now)
        .expect("load")
        .expect("present");

    assert_eq!(restored.from_version, 0);
    let state = restored.state;
    assert_eq!(state.schema_version, PLAYER_SCHEMA_VERSION);
    assert_eq!(state.xp, 50);
    assert_eq!(state.current_action.as_deref(), Some("mining"));
    assert_eq!(state.current_location, "mine");
    assert_eq!(state.inventory.quantity("metal"), 3);
    assert_eq!(state.messages.latest().map(|l| l.tone), Some(Tone::Success));

    store.save(&state).expect("resave");
    let value: serde_json::Value =
        serde_json::from_slice(&store.load_raw().expect("raw").expect("present")).expect("json");
    assert_eq!(value["schema_version"], 1);
    assert_eq!(value["current_action"], "mining");
}

#[test]
fn corrupt_blob_yields_fresh_character() {
    let store = SaveStore::temporary().expect("store");
    store.save_raw(b"\x00\x01 definitely not json").expect("raw save");

    let now = Utc::now();
    let restored = store
        .load(&Catalog::standard(), now)
        .expect("load")
        .expect("present");
    assert!(restored.fresh);
    assert_eq!(restored.state.inventory.quantity("net"), 1);
    assert_eq!(restored.state.current_location, "campsite");
}

#[test]
fn delete_removes_the_save() {
    let store = SaveStore::temporary().expect("store");
    store.save(&PlayerState::new(Utc::now())).expect("save");
    assert!(store.delete().expect("delete"));
    assert!(store.load_raw().expect("raw").is_none());
}
