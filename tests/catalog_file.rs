//! Integration tests for loading a catalog from JSON

use afkrpg::idle::{replay, Catalog, FixedOracle, IdleError, PlayerState, ReplayConfig};
use chrono::{Duration, Utc};
use tempfile::TempDir;

#[test]
fn standard_catalog_survives_a_file_round_trip() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("catalog.json");
    let json = serde_json::to_string_pretty(&Catalog::standard()).expect("serialize");
    std::fs::write(&path, json).expect("write");

    let loaded = Catalog::load_json(&path).expect("load");
    assert_eq!(loaded, Catalog::standard());
}

#[test]
fn custom_catalog_drives_replay() {
    let json = r#"{
        "items": [
            {"id": "clay", "name": "Clay", "kind": "resource"}
        ],
        "locations": [
            {"id": "campsite", "label": "Campsite", "region": "camp"}
        ],
        "actions": [
            {
                "id": "digging",
                "label": "Digging",
                "xp_reward": 3,
                "item_reward": "clay",
                "gold_reward": 1,
                "energy_cost": null,
                "success_chance": 100.0,
                "valid_locations": "all",
                "required_tool": null,
                "on_success": {"effect": "message", "text": "Squelch."}
            }
        ]
    }"#;
    let catalog = Catalog::from_json_str(json).expect("catalog");

    let now = Utc::now();
    let mut state = PlayerState::new(now - Duration::minutes(1));
    state.current_action = Some("digging".to_string());
    let (next, summary) = replay(
        &state,
        now,
        &ReplayConfig {
            ticks_per_minute: 4,
            ..ReplayConfig::default()
        },
        &catalog,
        &mut FixedOracle(0.5),
    )
    .expect("replay");

    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.xp_gained, 12);
    assert_eq!(summary.gold_gained, 4);
    assert_eq!(next.inventory.quantity("clay"), 4);
    assert_eq!(next.messages.latest().map(|l| l.text.as_str()), Some("Squelch."));
}

#[test]
fn dangling_reference_is_rejected() {
    let json = r#"{
        "items": [],
        "locations": [{"id": "campsite", "label": "Campsite", "region": "camp"}],
        "actions": [{
            "id": "fishing", "label": "Fishing", "xp_reward": 1,
            "item_reward": "fish", "success_chance": 20.0,
            "valid_locations": "all"
        }]
    }"#;
    match Catalog::from_json_str(json) {
        Err(IdleError::MissingDefinition { kind, id }) => {
            assert_eq!(kind, "item");
            assert_eq!(id, "fish");
        }
        other => panic!("expected missing item, got {:?}", other.map(|_| ())),
    }
}
