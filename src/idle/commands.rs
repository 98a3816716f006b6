//! Player commands and the pure transition function over [`PlayerState`].
//!
//! [`dispatch`] never mutates its input. It clones the state, applies one
//! command and hands back a [`Transition`]. A command the player is not
//! allowed to perform right now (wrong place, missing tool, too tired, not
//! enough materials) comes back as [`Outcome::Rejected`] with a line meant
//! for the player; only unknown ids and internal faults are `Err`.

use chrono::{DateTime, Utc};
use log::debug;

use crate::idle::actions::{resolve_tick, TickOutcome};
use crate::idle::catalog::Catalog;
use crate::idle::chance::ChanceOracle;
use crate::idle::crafting::{craft_item, CraftResult};
use crate::idle::errors::IdleError;
use crate::idle::types::{LogLine, PlayerState, Tone};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartAction(String),    // begin an action at the current location
    StopAction,             // go idle
    ChangeLocation(String), // travel to a discovered location
    Craft(String),          // craft one batch of an item from its recipe
    Tick,                   // one live tick of the current action
}

impl Command {
    /// Short verb for log lines.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::StartAction(_) => "start",
            Command::StopAction => "stop",
            Command::ChangeLocation(_) => "travel",
            Command::Craft(_) => "craft",
            Command::Tick => "tick",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected { reason: String },
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: PlayerState,
    /// Lines this command produced, oldest first.
    pub messages: Vec<LogLine>,
    pub outcome: Outcome,
    /// Set for an accepted [`Command::Tick`].
    pub tick: Option<TickOutcome>,
}

impl Transition {
    pub fn is_accepted(&self) -> bool {
        self.outcome == Outcome::Accepted
    }

    /// True when `before` had a running action and this transition left none.
    pub fn stopped_action(&self, before: &PlayerState) -> bool {
        before.current_action.is_some() && self.state.current_action.is_none()
    }
}

/// Builds a transition over a private copy of the state.
struct Step {
    state: PlayerState,
    messages: Vec<LogLine>,
}

impl Step {
    fn new(state: &PlayerState) -> Self {
        Self {
            state: state.clone(),
            messages: Vec::new(),
        }
    }

    fn note(&mut self, tone: Tone, text: String) {
        let line = LogLine::new(tone, text);
        self.state.messages.push(line.clone());
        self.messages.push(line);
    }

    fn accept(mut self, now: DateTime<Utc>) -> Transition {
        self.state.last_active = now;
        Transition {
            state: self.state,
            messages: self.messages,
            outcome: Outcome::Accepted,
            tick: None,
        }
    }

    /// Refusals are shown to the player but change nothing else.
    fn reject(mut self, reason: String) -> Transition {
        self.note(Tone::Failure, reason.clone());
        Transition {
            state: self.state,
            messages: self.messages,
            outcome: Outcome::Rejected { reason },
            tick: None,
        }
    }

    fn stop_current(&mut self, catalog: &Catalog) {
        if let Some(action_id) = self.state.current_action.take() {
            let label = catalog
                .action(&action_id)
                .map(|a| a.label.clone())
                .unwrap_or(action_id);
            self.note(Tone::Info, format!("You stop {}.", label.to_lowercase()));
        }
    }
}

/// Apply one command to a copy of `state`.
pub fn dispatch(
    state: &PlayerState,
    command: &Command,
    catalog: &Catalog,
    oracle: &mut dyn ChanceOracle,
    now: DateTime<Utc>,
) -> Result<Transition, IdleError> {
    debug!("dispatch {}: {:?}", command.verb(), command);
    match command {
        Command::StartAction(action_id) => start_action(state, action_id, catalog, now),
        Command::StopAction => stop_action(state, catalog, now),
        Command::ChangeLocation(location_id) => change_location(state, location_id, catalog, now),
        Command::Craft(item_id) => craft(state, item_id, catalog, now),
        Command::Tick => tick(state, catalog, oracle, now),
    }
}

fn start_action(
    state: &PlayerState,
    action_id: &str,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Result<Transition, IdleError> {
    let action = catalog.action(action_id)?;
    let step = Step::new(state);
    let label = action.label.to_lowercase();

    if state.current_action.as_deref() == Some(action.id.as_str()) {
        return Ok(step.reject(format!("You are already {}.", label)));
    }
    if !action.valid_locations.allows(&state.current_location) {
        return Ok(step.reject(format!(
            "You can't do {} at the {}.",
            label,
            catalog.location_label(&state.current_location)
        )));
    }
    if let Some(tool) = &action.required_tool {
        if !state.inventory.has(tool) {
            return Ok(step.reject(format!(
                "You need the {} to do {}.",
                catalog.item_name(tool),
                label
            )));
        }
    }
    if state.energy <= 0 && !action.is_energy_exempt() {
        return Ok(step.reject(format!("You are too tired to do {}.", label)));
    }

    let mut step = step;
    step.stop_current(catalog);
    step.state.current_action = Some(action.id.clone());
    step.note(Tone::Info, format!("You begin {}...", label));
    Ok(step.accept(now))
}

fn stop_action(
    state: &PlayerState,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Result<Transition, IdleError> {
    let mut step = Step::new(state);
    if state.is_idle() {
        return Ok(step.reject("You are not doing anything.".to_string()));
    }
    step.stop_current(catalog);
    Ok(step.accept(now))
}

fn change_location(
    state: &PlayerState,
    location_id: &str,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Result<Transition, IdleError> {
    let location = catalog.location(location_id)?;
    let mut step = Step::new(state);

    if state.current_location == location.id {
        return Ok(step.reject(format!("You are already at the {}.", location.label)));
    }
    if !state.has_discovered(&location.id) {
        return Ok(step.reject(format!(
            "You haven't discovered the {} yet.",
            location.label
        )));
    }

    step.stop_current(catalog);
    step.state.current_location = location.id.clone();
    step.note(Tone::Info, format!("You travel to the {}.", location.label));
    Ok(step.accept(now))
}

fn craft(
    state: &PlayerState,
    item_id: &str,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Result<Transition, IdleError> {
    let item = catalog.item(item_id)?;
    let recipe = catalog.recipe(&item.id)?;
    let mut step = Step::new(state);

    match craft_item(&mut step.state.inventory, recipe) {
        CraftResult::Rejected { shortfalls } => {
            debug!("craft {} short of {:?}", item.id, shortfalls);
            // `step.state.inventory` is untouched on rejection.
            Ok(step.reject(format!("Insufficient resources to craft {}", item.name)))
        }
        CraftResult::Crafted { .. } => {
            step.note(Tone::Success, format!("Crafted {}", item.name));
            Ok(step.accept(now))
        }
    }
}

fn tick(
    state: &PlayerState,
    catalog: &Catalog,
    oracle: &mut dyn ChanceOracle,
    now: DateTime<Utc>,
) -> Result<Transition, IdleError> {
    let Some(action_id) = state.current_action.as_deref() else {
        // A tick racing a stop is expected; do not log it to the player.
        return Ok(Transition {
            state: state.clone(),
            messages: Vec::new(),
            outcome: Outcome::Rejected {
                reason: "You are not doing anything.".to_string(),
            },
            tick: None,
        });
    };
    let action = catalog.action(action_id)?;

    let mut next = state.clone();
    let outcome = resolve_tick(action, &mut next, catalog, oracle)?;
    next.last_active = now;
    Ok(Transition {
        state: next,
        messages: outcome.messages.clone(),
        outcome: Outcome::Accepted,
        tick: Some(outcome),
    })
}

/// Build a fresh character, optionally on a progression path.
pub fn new_game(
    catalog: &Catalog,
    path: Option<&str>,
    now: DateTime<Utc>,
) -> Result<PlayerState, IdleError> {
    let mut state = PlayerState::new(now);
    if let Some(path) = path {
        let path = catalog.path(path)?;
        state.path = Some(path.id.clone());
        state.log(Tone::Info, format!("You walk the path of the {}.", path.label));
    }
    Ok(state)
}
