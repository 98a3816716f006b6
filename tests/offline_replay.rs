//! Integration tests for offline progress replay
//!
//! Tests the load-time flow:
//! - elapsed time to tick count
//! - deterministic accumulation with a scripted oracle
//! - idempotent stamping of `last_active`
//! - early stop when exploration completes

use afkrpg::idle::{
    replay, Catalog, FixedOracle, PlayerState, ReplayConfig, ReplayJob, ScriptedOracle,
};
use chrono::{Duration, TimeZone, Utc};

fn chopper(minutes_away: i64) -> (PlayerState, chrono::DateTime<Utc>) {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    let mut state = PlayerState::new(now - Duration::minutes(minutes_away));
    state.inventory.add("axe", 1).expect("add axe");
    state.current_action = Some("chopping".to_string());
    (state, now)
}

#[test]
fn every_third_draw_succeeds_over_ten_minutes() {
    let (state, now) = chopper(10);
    let mut oracle = ScriptedOracle::new(vec![0.99, 0.99, 0.0]);

    let (next, summary) = replay(
        &state,
        now,
        &ReplayConfig::default(),
        &Catalog::standard(),
        &mut oracle,
    )
    .expect("replay");

    assert_eq!(summary.ticks, 300);
    assert_eq!(oracle.calls(), 300);
    assert_eq!(summary.successes, 100);
    assert_eq!(summary.xp_gained, 100);
    assert_eq!(summary.items_gained.quantity("wood"), 100);
    assert_eq!(summary.items_gained.len(), 1);
    assert_eq!(next.inventory.quantity("wood"), 110);
    assert_eq!(next.level, 2);
    assert_eq!(next.xp, 0);
    assert_eq!(summary.action_id.as_deref(), Some("chopping"));
    assert_eq!(summary.since, Some(now - Duration::minutes(10)));
}

#[test]
fn replay_is_idempotent_at_the_same_instant() {
    let (state, now) = chopper(30);
    let catalog = Catalog::standard();
    let config = ReplayConfig::default();

    let (first, summary) = replay(&state, now, &config, &catalog, &mut FixedOracle(0.0)).expect("first");
    assert_eq!(summary.ticks, 900);

    let (second, again) = replay(&first, now, &config, &catalog, &mut FixedOracle(0.0)).expect("second");
    assert!(again.is_empty());
    assert_eq!(second.inventory, first.inventory);
    assert_eq!(second.xp, first.xp);
}

#[test]
fn time_away_is_capped() {
    let (state, now) = chopper(60 * 24 * 30);
    let config = ReplayConfig {
        max_elapsed_minutes: 60,
        ..ReplayConfig::default()
    };
    let (_, summary) = replay(&state, now, &config, &Catalog::standard(), &mut FixedOracle(0.99))
        .expect("replay");
    assert_eq!(summary.elapsed_minutes, 60);
    assert_eq!(summary.ticks, 60 * 30);
}

#[test]
fn minimum_elapsed_policy_applies_to_short_absences() {
    let (state, now) = chopper(0);
    let config = ReplayConfig {
        min_elapsed_minutes: 5,
        ..ReplayConfig::default()
    };
    let (_, summary) = replay(&state, now, &config, &Catalog::standard(), &mut FixedOracle(0.99))
        .expect("replay");
    assert_eq!(summary.elapsed_minutes, 5);
    assert_eq!(summary.ticks, 150);
}

#[test]
fn exploration_ends_replay_on_completion() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    let mut state = PlayerState::new(now - Duration::hours(2));
    state.current_action = Some("exploring".to_string());

    // Main roll always succeeds, bonus roll always misses.
    let mut oracle = ScriptedOracle::new(vec![0.0, 0.99]);
    let (next, summary) = replay(
        &state,
        now,
        &ReplayConfig::default(),
        &Catalog::standard(),
        &mut oracle,
    )
    .expect("replay");

    assert_eq!(summary.ticks, 10);
    assert_eq!(summary.xp_gained, 10 + 25);
    assert!(next.current_action.is_none());
    let campsite = next
        .locations
        .iter()
        .find(|l| l.location_id == "campsite")
        .expect("campsite");
    assert!(campsite.is_explored);
    assert_eq!(next.locations.len(), 2, "completion discovers one new location");
}

#[test]
fn sleeping_restores_energy_while_away() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    let mut state = PlayerState::new(now - Duration::minutes(1));
    state.inventory.add("tent", 1).expect("add tent");
    state.energy = 10;
    state.current_action = Some("sleeping".to_string());

    let (next, summary) = replay(
        &state,
        now,
        &ReplayConfig::default(),
        &Catalog::standard(),
        &mut FixedOracle(0.99),
    )
    .expect("replay");

    assert_eq!(summary.ticks, 30);
    assert_eq!(next.energy, next.max_energy);
    assert_eq!(summary.energy_delta, 90);
}

#[test]
fn chunked_job_reports_progress() {
    let (mut state, now) = chopper(3);
    let catalog = Catalog::standard();
    let mut oracle = FixedOracle(0.0);
    let mut job = ReplayJob::plan(&state, now, &ReplayConfig::default());
    assert_eq!(job.planned_ticks(), 90);

    assert_eq!(job.advance(&mut state, &catalog, &mut oracle, 40).expect("chunk"), 40);
    assert_eq!(job.remaining(), 50);
    assert_eq!(job.advance(&mut state, &catalog, &mut oracle, 40).expect("chunk"), 40);
    assert_eq!(job.advance(&mut state, &catalog, &mut oracle, 40).expect("chunk"), 10);
    assert!(job.is_done());

    let summary = job.finish(&mut state);
    assert_eq!(summary.ticks, 90);
    assert_eq!(state.last_active, now);
}
