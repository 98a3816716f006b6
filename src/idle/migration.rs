//! Versioned healing of persisted player saves.
//!
//! Loading a save never fails on content. The blob is read as loose JSON,
//! upgraded to the current schema, then every top-level field is checked on
//! its own: a field that is missing or does not parse falls back to the value
//! a fresh character would have, and list fields keep whichever elements do
//! parse. A blob that is not a JSON object at all yields a fresh character.
//!
//! Schema history:
//! - v0: the browser save (`lastActive`, `stats { energy, .. }`,
//!   `inv { items: [{ id, amt }] }`, `"success#..."` message strings,
//!   `currentAction: "none"`).
//! - v1: the current snake_case [`PlayerState`] layout.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::idle::catalog::Catalog;
use crate::idle::inventory::Inventory;
use crate::idle::types::{
    LocationProgress, LogLine, PlayerState, QuestProgress, Tone, DEFAULT_MAX_ENERGY,
    DEFAULT_MAX_HP, PLAYER_SCHEMA_VERSION, STARTING_LOCATION_ID,
};
use crate::logutil::{escape_log, preview_blob};

/// A healed save and what it took to get there.
#[derive(Debug, Clone)]
pub struct Restored {
    pub state: PlayerState,
    pub from_version: u8,
    /// Top-level fields replaced by their fresh-character default.
    pub healed_fields: Vec<String>,
    /// The blob was unusable and a fresh character was created instead.
    pub fresh: bool,
}

/// Turn a persisted blob into a usable [`PlayerState`].
pub fn restore_player_state(blob: &[u8], catalog: &Catalog, now: DateTime<Utc>) -> Restored {
    let mut object = match serde_json::from_slice::<Value>(blob) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            warn!(
                "save blob is JSON {} rather than an object; starting fresh: {}",
                json_kind(&other),
                preview_blob(blob)
            );
            return fresh(now);
        }
        Err(e) => {
            warn!("save blob is not JSON ({}); starting fresh: {}", e, preview_blob(blob));
            return fresh(now);
        }
    };

    let from_version = object
        .get("schema_version")
        .and_then(Value::as_u64)
        .map(|v| v.min(u8::MAX as u64) as u8)
        .unwrap_or(0);

    if from_version == 0 {
        info!("Migrating save from schema v0 to v{}", PLAYER_SCHEMA_VERSION);
        object = migrate_v0_to_v1(object);
    } else if from_version > PLAYER_SCHEMA_VERSION {
        warn!(
            "save has schema v{} newer than supported v{}; reading what we can",
            from_version, PLAYER_SCHEMA_VERSION
        );
    }

    let (state, healed_fields) = heal_fields(object, now);
    if !healed_fields.is_empty() {
        warn!("healed save fields to defaults: {}", healed_fields.join(", "));
    }
    let state = normalise(state, catalog, now);

    Restored {
        state,
        from_version,
        healed_fields,
        fresh: false,
    }
}

fn fresh(now: DateTime<Utc>) -> Restored {
    Restored {
        state: PlayerState::new(now),
        from_version: 0,
        healed_fields: Vec::new(),
        fresh: true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// v0 -> v1
// ============================================================================

fn migrate_v0_to_v1(mut old: Map<String, Value>) -> Map<String, Value> {
    let mut new = Map::new();
    new.insert("schema_version".into(), Value::from(1));

    for key in ["xp", "level", "gold", "age", "path"] {
        if let Some(value) = old.remove(key) {
            new.insert(key.into(), value);
        }
    }
    let blank_path = matches!(
        new.get("path"),
        Some(Value::String(p)) if p.is_empty() || p == "none"
    );
    if blank_path {
        new.remove("path");
    }

    for (from, to) in [
        ("lastActive", "last_active"),
        ("lastLogin", "last_login"),
        ("currentLocation", "current_location"),
    ] {
        if let Some(value) = old.remove(from) {
            new.insert(to.into(), value);
        }
    }

    match old.remove("currentAction") {
        Some(Value::String(action)) if action != "none" && !action.is_empty() => {
            new.insert("current_action".into(), Value::String(action));
        }
        _ => {
            new.insert("current_action".into(), Value::Null);
        }
    }

    if let Some(Value::Object(mut stats)) = old.remove("stats") {
        for (from, to) in [
            ("hp", "hp"),
            ("maxHp", "max_hp"),
            ("energy", "energy"),
            ("maxEnergy", "max_energy"),
        ] {
            if let Some(value) = stats.remove(from) {
                new.insert(to.into(), value);
            }
        }
    }

    if let Some(inv) = old.remove("inv") {
        let items = match inv {
            Value::Object(mut inv) => inv.remove("items").unwrap_or(Value::Null),
            other => other,
        };
        new.insert("inventory".into(), items);
    }

    let mut locations: Vec<Value> = Vec::new();
    if let Some(Value::Array(old_locations)) = old.remove("locations") {
        for location in old_locations {
            if let Value::Object(mut location) = location {
                let mut entry = Map::new();
                if let Some(name) = location.remove("name") {
                    entry.insert("location_id".into(), name);
                }
                if let Some(pct) = location.remove("explorationPercentage") {
                    entry.insert("exploration_percentage".into(), pct);
                }
                if let Some(explored) = location.remove("isExplored") {
                    entry.insert("is_explored".into(), explored);
                }
                locations.push(Value::Object(entry));
            }
        }
    }
    if let Some(Value::Array(explored)) = old.remove("exploredLocations") {
        for id in explored.into_iter().filter_map(|v| v.as_str().map(str::to_string)) {
            let known = locations
                .iter()
                .any(|l| l.get("location_id").and_then(Value::as_str) == Some(id.as_str()));
            if !known {
                locations.push(serde_json::json!({ "location_id": id }));
            }
        }
    }
    if !locations.is_empty() {
        new.insert("locations".into(), Value::Array(locations));
    }

    if let Some(Value::Array(messages)) = old.remove("messages") {
        let lines = messages
            .into_iter()
            .filter_map(|m| m.as_str().map(parse_legacy_line))
            .filter_map(|line| serde_json::to_value(line).ok())
            .collect();
        new.insert("messages".into(), Value::Array(lines));
    }

    if let Some(Value::Array(quests)) = old.remove("quests") {
        let quests = quests
            .into_iter()
            .filter_map(|q| match q {
                Value::Object(q) => Some(migrate_quest(q)),
                _ => None,
            })
            .collect();
        new.insert("quests".into(), Value::Array(quests));
    }

    new
}

fn migrate_quest(mut quest: Map<String, Value>) -> Value {
    let name = quest
        .remove("name")
        .and_then(|v| v.as_str().map(quest_id_from_name))
        .unwrap_or_default();
    serde_json::json!({
        "quest_id": name,
        "step": quest.remove("step").unwrap_or(Value::from(0)),
        "max_step": quest.remove("maxStep").unwrap_or(Value::from(1)),
        "is_complete": quest.remove("isComplete").unwrap_or(Value::Bool(false)),
    })
}

/// "Monster Hunter" -> "monster_hunter".
fn quest_id_from_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Parse a legacy `"tone#text"` message string.
pub fn parse_legacy_line(raw: &str) -> LogLine {
    match raw.split_once('#') {
        Some(("success", text)) => LogLine::new(Tone::Success, text),
        Some(("failure" | "fail" | "error", text)) => LogLine::new(Tone::Failure, text),
        Some(("info", text)) => LogLine::new(Tone::Info, text),
        _ => LogLine::new(Tone::Info, raw),
    }
}

// ============================================================================
// Field healing
// ============================================================================

fn heal_fields(mut blob: Map<String, Value>, now: DateTime<Utc>) -> (PlayerState, Vec<String>) {
    let defaults = PlayerState::new(now);
    let Ok(Value::Object(mut merged)) = serde_json::to_value(&defaults) else {
        return (defaults, vec!["*".to_string()]);
    };
    // A lost inventory heals to empty, never to the starter kit.
    merged.insert("inventory".into(), Value::Array(Vec::new()));

    if let Some(Value::Array(items)) = blob.remove("inventory") {
        blob.insert("inventory".into(), Value::Array(retain_valid::<Inventory>(items, true)));
    }
    if let Some(Value::Array(locations)) = blob.remove("locations") {
        blob.insert(
            "locations".into(),
            Value::Array(retain_valid::<LocationProgress>(locations, false)),
        );
    }
    if let Some(Value::Array(quests)) = blob.remove("quests") {
        blob.insert(
            "quests".into(),
            Value::Array(retain_valid::<QuestProgress>(quests, false)),
        );
    }
    if let Some(Value::Array(messages)) = blob.remove("messages") {
        let messages = messages
            .into_iter()
            .map(|m| match m {
                Value::String(raw) => {
                    serde_json::to_value(parse_legacy_line(&raw)).unwrap_or(Value::Null)
                }
                other => other,
            })
            .collect();
        blob.insert(
            "messages".into(),
            Value::Array(retain_valid::<LogLine>(messages, false)),
        );
    }

    let mut healed = Vec::new();
    let keys: Vec<String> = merged.keys().cloned().collect();
    for key in keys {
        let Some(value) = blob.remove(&key) else {
            healed.push(key);
            continue;
        };
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value.clone());
        if serde_json::from_value::<PlayerState>(Value::Object(candidate)).is_ok() {
            merged.insert(key, value);
        } else {
            healed.push(key);
        }
    }

    match serde_json::from_value::<PlayerState>(Value::Object(merged)) {
        Ok(state) => (state, healed),
        Err(e) => {
            warn!("healed save still failed to parse ({}); starting fresh", e);
            (defaults, vec!["*".to_string()])
        }
    }
}

/// Keep the elements of a JSON list that parse as `T` on their own.
///
/// With `wrap` set each element is tested as a one-element list, for types
/// that deserialize from a sequence.
fn retain_valid<T: DeserializeOwned>(items: Vec<Value>, wrap: bool) -> Vec<Value> {
    items
        .into_iter()
        .filter(|item| {
            let probe = if wrap {
                Value::Array(vec![item.clone()])
            } else {
                item.clone()
            };
            serde_json::from_value::<T>(probe).is_ok()
        })
        .collect()
}

// ============================================================================
// Normalisation
// ============================================================================

/// Bring a parsed state back inside the engine's invariants.
fn normalise(mut state: PlayerState, catalog: &Catalog, now: DateTime<Utc>) -> PlayerState {
    state.schema_version = PLAYER_SCHEMA_VERSION;
    state.level = state.level.max(1);

    if state.max_energy <= 0 {
        state.max_energy = DEFAULT_MAX_ENERGY;
    }
    state.energy = state.energy.clamp(0, state.max_energy);
    if state.max_hp <= 0 {
        state.max_hp = DEFAULT_MAX_HP;
    }
    state.hp = state.hp.clamp(0, state.max_hp);

    let mut seen = Vec::new();
    state.locations.retain(|l| {
        let keep = catalog.location(&l.location_id).is_ok() && !seen.contains(&l.location_id);
        if keep {
            seen.push(l.location_id.clone());
        } else {
            warn!(
                "dropping unknown or duplicate location '{}'",
                escape_log(&l.location_id)
            );
        }
        keep
    });
    for progress in &mut state.locations {
        progress.exploration_percentage = progress.exploration_percentage.min(100);
        if progress.is_explored || progress.exploration_percentage >= 100 {
            progress.is_explored = true;
            progress.exploration_percentage = 100;
        }
    }
    if !state.has_discovered(STARTING_LOCATION_ID) {
        state.locations.insert(0, LocationProgress::discovered(STARTING_LOCATION_ID));
    }
    if catalog.location(&state.current_location).is_err() {
        warn!(
            "current location '{}' unknown; moving to {}",
            escape_log(&state.current_location),
            STARTING_LOCATION_ID
        );
        state.current_location = STARTING_LOCATION_ID.to_string();
    }
    let here = state.current_location.clone();
    state.discover(&here);

    if let Some(action_id) = &state.current_action {
        if catalog.action(action_id).is_err() {
            warn!("current action '{}' unknown; going idle", escape_log(action_id));
            state.current_action = None;
        }
    }
    if let Some(path) = &state.path {
        match catalog.path(path) {
            Ok(def) => state.path = Some(def.id.clone()),
            Err(_) => {
                warn!("progression path '{}' unknown; clearing it", escape_log(path));
                state.path = None;
            }
        }
    }

    for quest in &mut state.quests {
        if let Ok(def) = catalog.quest(&quest.quest_id) {
            quest.max_step = def.max_step;
        }
        quest.max_step = quest.max_step.max(1);
        quest.step = quest.step.min(quest.max_step);
        quest.is_complete = quest.is_complete || quest.step >= quest.max_step;
    }

    if state.last_active > now {
        state.last_active = now;
    }
    if state.last_login > now {
        state.last_login = now;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn restore(json: &str) -> Restored {
        restore_player_state(json.as_bytes(), &Catalog::standard(), now())
    }

    #[test]
    fn current_save_round_trips_untouched() {
        let mut state = PlayerState::new(now());
        state.gold = 42;
        state.current_action = Some("exploring".to_string());
        let blob = serde_json::to_vec(&state).unwrap();

        let restored = restore_player_state(&blob, &Catalog::standard(), now());
        assert_eq!(restored.from_version, 1);
        assert!(restored.healed_fields.is_empty());
        assert!(!restored.fresh);
        assert_eq!(restored.state, state);
    }

    #[test]
    fn legacy_browser_save_is_migrated() {
        let restored = restore(
            r#"{
                "xp": 12, "level": 2, "gold": 3,
                "lastActive": "2024-03-01T11:30:00.000Z",
                "lastLogin": "2024-03-01T11:00:00.000Z",
                "exploredLocations": ["forest"],
                "currentLocation": "forest",
                "currentAction": "none",
                "stats": {"hp": 8, "maxHp": 10, "energy": 40, "maxEnergy": 100},
                "inv": {"items": [{"id": "axe", "amt": 1}, {"id": "wood", "amt": 14}]},
                "messages": ["success#You got some Wood", "You begin chopping..."]
            }"#,
        );
        let state = restored.state;

        assert_eq!(restored.from_version, 0);
        assert_eq!(state.schema_version, PLAYER_SCHEMA_VERSION);
        assert_eq!((state.xp, state.level, state.gold), (12, 2, 3));
        assert_eq!(state.energy, 40);
        assert_eq!(state.hp, 8);
        assert!(state.current_action.is_none());
        assert_eq!(state.current_location, "forest");
        assert!(state.has_discovered("campsite"));
        assert!(state.has_discovered("forest"));
        assert_eq!(state.inventory.quantity("wood"), 14);
        assert_eq!(state.inventory.quantity("axe"), 1);
        assert_eq!(
            state.last_active,
            Utc.with_ymd_and_hms(2024, 3, 1, 11, 30, 0).unwrap()
        );

        let first = state.messages.latest().unwrap();
        assert_eq!(first.tone, Tone::Success);
        assert_eq!(first.text, "You got some Wood");
    }

    #[test]
    fn missing_fields_take_fresh_defaults() {
        let restored = restore(r#"{"schema_version": 1, "gold": 9}"#);
        assert_eq!(restored.state.gold, 9);
        assert_eq!(restored.state.energy, DEFAULT_MAX_ENERGY);
        assert!(restored.state.inventory.is_empty());
        assert!(restored.healed_fields.contains(&"energy".to_string()));
        assert!(restored.healed_fields.contains(&"inventory".to_string()));
        assert!(!restored.healed_fields.contains(&"gold".to_string()));
    }

    #[test]
    fn legacy_save_without_inventory_starts_empty_handed() {
        let restored = restore(r#"{"xp": 3, "currentAction": "none"}"#);
        assert_eq!(restored.from_version, 0);
        assert_eq!(restored.state.xp, 3);
        assert!(restored.state.inventory.is_empty());

        let restored = restore(r#"{"schema_version": 1, "inventory": "lost"}"#);
        assert!(restored.state.inventory.is_empty());
        assert!(restored.healed_fields.contains(&"inventory".to_string()));
    }

    #[test]
    fn multi_line_unknown_ids_are_dropped() {
        let mut value = serde_json::to_value(PlayerState::new(now())).unwrap();
        value["current_action"] = Value::from("dancing\nat night");
        value["current_location"] = Value::from("moon\r\nbase");
        let restored = restore(&value.to_string());
        assert!(restored.state.current_action.is_none());
        assert_eq!(restored.state.current_location, STARTING_LOCATION_ID);
    }

    #[test]
    fn wrongly_typed_field_is_replaced_alone() {
        let mut value = serde_json::to_value(PlayerState::new(now())).unwrap();
        value["gold"] = Value::from(77);
        value["xp"] = Value::from("lots");
        let restored = restore(&value.to_string());
        assert_eq!(restored.state.gold, 77);
        assert_eq!(restored.state.xp, 0);
        assert_eq!(restored.healed_fields, vec!["xp".to_string()]);
    }

    #[test]
    fn bad_list_elements_are_dropped() {
        let mut value = serde_json::to_value(PlayerState::new(now())).unwrap();
        value["inventory"] = serde_json::json!([
            {"item_id": "wood", "quantity": 3},
            {"item_id": "metal"},
            {"id": "fish", "amt": -2},
            "junk"
        ]);
        let restored = restore(&value.to_string());
        assert_eq!(restored.state.inventory.quantity("wood"), 3);
        assert_eq!(restored.state.inventory.len(), 1);
    }

    #[test]
    fn garbage_blob_starts_fresh() {
        let restored = restore("{not json");
        assert!(restored.fresh);
        assert_eq!(restored.state, PlayerState::new(now()));

        let restored = restore("[1,2,3]");
        assert!(restored.fresh);
    }

    #[test]
    fn invariants_are_restored() {
        let mut state = PlayerState::new(now());
        state.energy = 500;
        state.level = 0;
        state.current_action = Some("juggling".to_string());
        state.current_location = "atlantis".to_string();
        state.locations[0].exploration_percentage = 250;
        state.last_active = now() + chrono::Duration::hours(5);
        let blob = serde_json::to_vec(&state).unwrap();

        let state = restore_player_state(&blob, &Catalog::standard(), now()).state;
        assert_eq!(state.energy, state.max_energy);
        assert_eq!(state.level, 1);
        assert!(state.current_action.is_none());
        assert_eq!(state.current_location, STARTING_LOCATION_ID);
        assert!(state.locations[0].is_explored);
        assert_eq!(state.locations[0].exploration_percentage, 100);
        assert_eq!(state.last_active, now());
    }

    #[test]
    fn legacy_quest_names_become_ids() {
        let restored = restore(
            r#"{"quests": [{"name": "Monster Hunter", "step": 3, "maxStep": 10, "isComplete": false}]}"#,
        );
        let quest = &restored.state.quests[0];
        assert_eq!(quest.quest_id, "monster_hunter");
        assert_eq!(quest.step, 3);
        assert!(!quest.is_complete);
    }
}
