//! Resolution of a single action tick.
//!
//! [`resolve_tick`] is the one primitive shared by live ticking and offline
//! replay. It assumes the caller already checked the start preconditions
//! (location, tool, energy); see [`crate::idle::commands`].

use log::trace;

use crate::idle::catalog::Catalog;
use crate::idle::chance::{roll_index, roll_success, ChanceOracle};
use crate::idle::errors::IdleError;
use crate::idle::inventory::Inventory;
use crate::idle::progression::{apply_xp, level_up_message};
use crate::idle::types::{ActionDefinition, ActionEffect, LogLine, PlayerState, QuestProgress, Tone};

/// Everything one tick changed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutcome {
    pub success: bool,
    pub xp_delta: u64,
    /// Energy actually applied after clamping to the bar.
    pub energy_delta: i64,
    pub gold_delta: u64,
    /// Every item added to the inventory, reward and bonus finds alike.
    pub items_gained: Inventory,
    pub levels_gained: Vec<u32>,
    /// The action reached its own terminal condition and is no longer current.
    pub action_finished: bool,
    pub messages: Vec<LogLine>,
}

/// Writes to the player state and mirrors every change into the outcome.
struct Tick<'s> {
    state: &'s mut PlayerState,
    outcome: TickOutcome,
}

impl<'s> Tick<'s> {
    fn note(&mut self, tone: Tone, text: String) {
        let line = LogLine::new(tone, text);
        self.state.messages.push(line.clone());
        self.outcome.messages.push(line);
    }

    fn grant_xp(&mut self, amount: u64) {
        if amount == 0 {
            return;
        }
        self.outcome.xp_delta += amount;
        for level in apply_xp(self.state, amount) {
            self.outcome
                .messages
                .push(LogLine::new(Tone::Success, level_up_message(level)));
            self.outcome.levels_gained.push(level);
        }
    }

    fn grant_gold(&mut self, amount: u64) {
        self.state.gold = self.state.gold.saturating_add(amount);
        self.outcome.gold_delta += amount;
    }

    fn grant_item(&mut self, item_id: &str) -> Result<(), IdleError> {
        self.state.inventory.add(item_id, 1)?;
        self.outcome.items_gained.insert_unchecked(item_id, 1);
        Ok(())
    }

    fn finish_action(&mut self) {
        self.state.current_action = None;
        self.outcome.action_finished = true;
    }
}

/// Run one tick of `action` against `state`.
pub fn resolve_tick(
    action: &ActionDefinition,
    state: &mut PlayerState,
    catalog: &Catalog,
    oracle: &mut dyn ChanceOracle,
) -> Result<TickOutcome, IdleError> {
    // Lookups first so an unknown id cannot leave a half-applied tick.
    let reward = action
        .item_reward
        .as_deref()
        .map(|id| catalog.item(id))
        .transpose()?;
    if let Some(ActionEffect::QuestStep { quest_id }) = &action.on_success {
        catalog.quest(quest_id)?;
    }

    let multiplier = catalog.passive_multiplier(&action.id, state.path.as_deref());
    let chance = (action.success_chance * multiplier).min(100.0);

    let mut tick = Tick {
        state,
        outcome: TickOutcome::default(),
    };
    tick.outcome.energy_delta = tick.state.adjust_energy(action.energy_delta());

    let success = roll_success(oracle, chance)?;
    tick.outcome.success = success;
    if !success {
        tick.note(
            Tone::Failure,
            format!("{} turned up nothing this time.", action.label),
        );
        return Ok(tick.outcome);
    }

    tick.grant_xp((action.xp_reward as f64 * multiplier).round() as u64);
    tick.grant_gold(action.gold_reward);
    if let Some(item) = reward {
        tick.grant_item(&item.id)?;
        tick.note(Tone::Success, format!("You got some {}", item.name));
    }

    match &action.on_success {
        Some(ActionEffect::Message { text }) => tick.note(Tone::Success, text.clone()),
        Some(ActionEffect::QuestStep { quest_id }) => advance_quest(&mut tick, catalog, quest_id)?,
        Some(ActionEffect::Explore {
            step,
            completion_xp,
            bonus_chance,
            bonus_pool,
        }) => explore(
            &mut tick,
            catalog,
            oracle,
            *step,
            *completion_xp,
            *bonus_chance,
            bonus_pool,
        )?,
        None => {}
    }

    trace!(
        "tick {}: xp +{} energy {:+} gold +{}",
        action.id,
        tick.outcome.xp_delta,
        tick.outcome.energy_delta,
        tick.outcome.gold_delta
    );
    Ok(tick.outcome)
}

fn advance_quest(tick: &mut Tick<'_>, catalog: &Catalog, quest_id: &str) -> Result<(), IdleError> {
    let quest = catalog.quest(quest_id)?;

    let index = match tick.state.quests.iter().position(|q| q.quest_id == quest_id) {
        Some(index) => index,
        None => {
            tick.state.quests.push(QuestProgress {
                quest_id: quest.id.clone(),
                step: 0,
                max_step: quest.max_step,
                is_complete: false,
            });
            tick.note(Tone::Info, format!("Quest started: {}", quest.name));
            tick.state.quests.len() - 1
        }
    };

    let progress = &mut tick.state.quests[index];
    if progress.is_complete {
        return Ok(());
    }
    progress.step = (progress.step + 1).min(progress.max_step);
    let (step, max_step) = (progress.step, progress.max_step);

    if step >= max_step {
        tick.state.quests[index].is_complete = true;
        tick.note(
            Tone::Success,
            format!(
                "Quest complete: {}! (+{}XP, +{} gold)",
                quest.name, quest.reward_xp, quest.reward_gold
            ),
        );
        tick.grant_xp(quest.reward_xp);
        tick.grant_gold(quest.reward_gold);
    } else {
        tick.note(Tone::Info, format!("{}: {}/{}", quest.name, step, max_step));
    }
    Ok(())
}

fn explore(
    tick: &mut Tick<'_>,
    catalog: &Catalog,
    oracle: &mut dyn ChanceOracle,
    step: u8,
    completion_xp: u64,
    bonus_chance: f64,
    bonus_pool: &[String],
) -> Result<(), IdleError> {
    let location_id = tick.state.current_location.clone();
    let label = catalog.location_label(&location_id).to_string();
    tick.state.discover(&location_id);

    let Some(progress) = tick.state.location_progress_mut(&location_id) else {
        return Ok(());
    };
    if progress.is_explored {
        tick.note(
            Tone::Info,
            format!("There is nothing left to explore in the {}.", label),
        );
        tick.finish_action();
        return Ok(());
    }

    let percentage = (progress.exploration_percentage as u16 + step as u16).min(100) as u8;
    progress.exploration_percentage = percentage;
    let completed = percentage >= 100;
    if completed {
        progress.is_explored = true;
    }

    tick.note(
        Tone::Info,
        format!(
            "You manage to explore more of the {}. ({}%)",
            label, percentage
        ),
    );

    if completed {
        tick.note(
            Tone::Success,
            format!("You have fully explored the {}! (+{}XP)", label, completion_xp),
        );
        tick.grant_xp(completion_xp);
        tick.finish_action();
        discover_new_location(tick, catalog, oracle);
    } else if roll_success(oracle, bonus_chance)? {
        if let Some(index) = roll_index(oracle, bonus_pool.len()) {
            let item = catalog.item(&bonus_pool[index])?;
            tick.grant_item(&item.id)?;
            tick.note(
                Tone::Success,
                format!("While exploring you find a {}", item.name),
            );
        }
    }
    Ok(())
}

fn discover_new_location(tick: &mut Tick<'_>, catalog: &Catalog, oracle: &mut dyn ChanceOracle) {
    let undiscovered: Vec<_> = catalog
        .locations
        .iter()
        .filter(|l| !tick.state.has_discovered(&l.id))
        .collect();
    match roll_index(oracle, undiscovered.len()) {
        Some(index) => {
            let location = undiscovered[index];
            tick.state.discover(&location.id);
            tick.note(
                Tone::Success,
                format!("You have discovered a new location: {}!", location.label),
            );
        }
        None => tick.note(
            Tone::Success,
            "You have explored all available locations!".to_string(),
        ),
    }
}
