//! Offline progress: turn the time a player was away into simulated ticks.
//!
//! On load the engine measures how long the save sat idle, converts that into
//! a tick count and runs the current action that many times through the same
//! [`resolve_tick`] the live timer uses. The save is stamped with the replay
//! time afterwards, so loading twice only replays newly elapsed time.
//!
//! [`ReplayJob`] holds the loop state so a host can run the ticks in chunks
//! and yield in between; [`replay`] drives one to completion.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::idle::actions::resolve_tick;
use crate::idle::catalog::Catalog;
use crate::idle::chance::ChanceOracle;
use crate::idle::errors::IdleError;
use crate::idle::inventory::Inventory;
use crate::idle::types::PlayerState;

pub const DEFAULT_TICKS_PER_MINUTE: u64 = 30;
pub const DEFAULT_MAX_ELAPSED_MINUTES: u64 = 7 * 24 * 60;
pub const DEFAULT_MAX_TICKS_PER_CHUNK: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReplayConfig {
    /// Live ticks that fit in one minute (30 for a 2 second timer).
    pub ticks_per_minute: u64,
    /// Elapsed time is raised to at least this many minutes.
    pub min_elapsed_minutes: u64,
    /// Elapsed time is capped at this many minutes.
    pub max_elapsed_minutes: u64,
    /// Ticks a host runs before yielding.
    pub max_ticks_per_chunk: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            ticks_per_minute: DEFAULT_TICKS_PER_MINUTE,
            min_elapsed_minutes: 0,
            max_elapsed_minutes: DEFAULT_MAX_ELAPSED_MINUTES,
            max_ticks_per_chunk: DEFAULT_MAX_TICKS_PER_CHUNK,
        }
    }
}

impl ReplayConfig {
    /// Whole minutes between `last_active` and `now`, after the floor and cap.
    pub fn elapsed_minutes(&self, last_active: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        let measured = (now - last_active).num_minutes().max(0) as u64;
        measured
            .max(self.min_elapsed_minutes)
            .min(self.max_elapsed_minutes)
    }
}

/// What happened while the player was away. Shown once, never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AfkResultSummary {
    pub action_id: Option<String>,
    /// `last_active` before the replay.
    pub since: Option<DateTime<Utc>>,
    pub elapsed_minutes: u64,
    /// Ticks actually run, fewer than planned if the action finished itself.
    pub ticks: u64,
    pub successes: u64,
    pub xp_gained: u64,
    pub gold_gained: u64,
    pub energy_delta: i64,
    pub items_gained: Inventory,
    pub levels_gained: Vec<u32>,
}

impl AfkResultSummary {
    pub fn is_empty(&self) -> bool {
        self.ticks == 0
    }

    /// Player-facing lines for the results panel.
    pub fn report_lines(&self, catalog: &Catalog) -> Vec<String> {
        let mut lines = Vec::new();
        let label = self
            .action_id
            .as_deref()
            .map(|id| catalog.action(id).map(|a| a.label.as_str()).unwrap_or(id))
            .unwrap_or("Idling");
        lines.push(format!(
            "While you were away ({} min) you kept {}.",
            self.elapsed_minutes,
            label.to_lowercase()
        ));
        lines.push(format!(
            "{} ticks, {} successful",
            self.ticks, self.successes
        ));
        if self.xp_gained > 0 {
            lines.push(format!("+{} XP", self.xp_gained));
        }
        if self.gold_gained > 0 {
            lines.push(format!("+{} gold", self.gold_gained));
        }
        if self.energy_delta != 0 {
            lines.push(format!("{:+} energy", self.energy_delta));
        }
        for entry in self.items_gained.iter() {
            lines.push(format!(
                "+{} {}",
                entry.quantity,
                catalog.item_name(&entry.item_id)
            ));
        }
        for level in &self.levels_gained {
            lines.push(format!("Reached level {}", level));
        }
        lines
    }
}

/// Resumable offline replay.
#[derive(Debug, Clone)]
pub struct ReplayJob {
    now: DateTime<Utc>,
    planned_ticks: u64,
    finished_early: bool,
    summary: AfkResultSummary,
}

impl ReplayJob {
    /// Work out how many ticks `state` is owed at `now`.
    pub fn plan(state: &PlayerState, now: DateTime<Utc>, config: &ReplayConfig) -> Self {
        let mut summary = AfkResultSummary {
            action_id: state.current_action.clone(),
            since: Some(state.last_active),
            ..AfkResultSummary::default()
        };
        let planned_ticks = if state.current_action.is_some() {
            summary.elapsed_minutes = config.elapsed_minutes(state.last_active, now);
            summary.elapsed_minutes.saturating_mul(config.ticks_per_minute)
        } else {
            0
        };
        debug!(
            "replay planned: {:?} for {} min = {} ticks",
            summary.action_id, summary.elapsed_minutes, planned_ticks
        );
        Self {
            now,
            planned_ticks,
            finished_early: false,
            summary,
        }
    }

    pub fn planned_ticks(&self) -> u64 {
        self.planned_ticks
    }

    pub fn remaining(&self) -> u64 {
        if self.finished_early {
            0
        } else {
            self.planned_ticks - self.summary.ticks
        }
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Run up to `budget` ticks. Returns how many ran.
    pub fn advance(
        &mut self,
        state: &mut PlayerState,
        catalog: &Catalog,
        oracle: &mut dyn ChanceOracle,
        budget: u64,
    ) -> Result<u64, IdleError> {
        let Some(action_id) = self.summary.action_id.clone() else {
            return Ok(0);
        };
        let action = catalog.action(&action_id)?;

        let mut ran = 0;
        while ran < budget && !self.is_done() {
            let outcome = resolve_tick(action, state, catalog, oracle)?;
            ran += 1;

            let summary = &mut self.summary;
            summary.ticks += 1;
            summary.energy_delta += outcome.energy_delta;
            summary.xp_gained += outcome.xp_delta;
            summary.gold_gained += outcome.gold_delta;
            summary.levels_gained.extend(outcome.levels_gained);
            if outcome.success {
                summary.successes += 1;
            }
            summary.items_gained.merge(&outcome.items_gained);

            if outcome.action_finished || state.current_action.as_deref() != Some(action_id.as_str()) {
                self.finished_early = true;
            }
        }
        Ok(ran)
    }

    /// Stamp the state with the replay time and hand back the summary.
    pub fn finish(self, state: &mut PlayerState) -> AfkResultSummary {
        state.last_active = self.now;
        state.last_login = self.now;
        if !self.summary.is_empty() {
            info!(
                "offline replay of {} ran {}/{} ticks over {} min: +{} xp, +{} gold, {} item stacks",
                self.summary.action_id.as_deref().unwrap_or("none"),
                self.summary.ticks,
                self.planned_ticks,
                self.summary.elapsed_minutes,
                self.summary.xp_gained,
                self.summary.gold_gained,
                self.summary.items_gained.len()
            );
        }
        self.summary
    }
}

/// Replay the time since `state.last_active` in one go.
///
/// The input is left untouched; on error nothing is half applied from the
/// caller's point of view.
pub fn replay(
    state: &PlayerState,
    now: DateTime<Utc>,
    config: &ReplayConfig,
    catalog: &Catalog,
    oracle: &mut dyn ChanceOracle,
) -> Result<(PlayerState, AfkResultSummary), IdleError> {
    let mut next = state.clone();
    let mut job = ReplayJob::plan(&next, now, config);
    let budget = job.remaining();
    job.advance(&mut next, catalog, oracle, budget)?;
    let summary = job.finish(&mut next);
    Ok((next, summary))
}
