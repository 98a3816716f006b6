//! Catalog records and the persisted player state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::idle::inventory::Inventory;

pub const PLAYER_SCHEMA_VERSION: u8 = 1;
pub const MESSAGE_LOG_CAPACITY: usize = 10;
pub const STARTING_LOCATION_ID: &str = "campsite";
pub const DEFAULT_MAX_ENERGY: i64 = 100;
pub const DEFAULT_MAX_HP: i64 = 10;

// ============================================================================
// Catalog records
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Tool,
    Resource,
    Consumable,
    Loot,
    Key,
    Weapon,
    Armor,
    House,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: ItemKind,
}

impl ItemDefinition {
    pub fn new(id: &str, name: &str, kind: ItemKind, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            kind,
        }
    }

    pub fn is_tool(&self) -> bool {
        matches!(self.kind, ItemKind::Tool | ItemKind::House | ItemKind::Weapon)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Camp,
    Water,
    Land,
    Town,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationDefinition {
    pub id: String,
    pub label: String,
    pub region: Region,
}

impl LocationDefinition {
    pub fn new(id: &str, label: &str, region: Region) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            region,
        }
    }
}

/// Where an action may be performed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocationScope {
    All,
    Only(Vec<String>),
}

impl LocationScope {
    pub fn only(ids: &[&str]) -> Self {
        Self::Only(ids.iter().map(|id| id.to_string()).collect())
    }

    pub fn allows(&self, location_id: &str) -> bool {
        match self {
            LocationScope::All => true,
            LocationScope::Only(ids) => ids.iter().any(|id| id == location_id),
        }
    }
}

/// Side effect interpreted by action resolution after a successful roll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ActionEffect {
    /// Log a flavour line.
    Message { text: String },
    /// Advance one step of a quest.
    QuestStep { quest_id: String },
    /// Advance exploration of the current location.
    Explore {
        /// Percentage points gained per successful tick.
        step: u8,
        /// XP granted when the location reaches 100%.
        completion_xp: u64,
        /// Percent chance of a bonus find on a non-terminal tick.
        bonus_chance: f64,
        /// Flat, unweighted pool the bonus find is drawn from.
        bonus_pool: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionDefinition {
    pub id: String,
    pub label: String,
    pub xp_reward: u64,
    #[serde(default)]
    pub item_reward: Option<String>,
    #[serde(default)]
    pub gold_reward: u64,
    /// Positive or zero restores energy, negative drains it, absent drains
    /// [`ActionDefinition::DEFAULT_ENERGY_DRAIN`].
    #[serde(default)]
    pub energy_cost: Option<i32>,
    pub success_chance: f64,
    pub valid_locations: LocationScope,
    #[serde(default)]
    pub required_tool: Option<String>,
    #[serde(default)]
    pub on_success: Option<ActionEffect>,
}

impl ActionDefinition {
    pub const DEFAULT_ENERGY_DRAIN: i64 = 1;

    pub fn new(id: &str, label: &str, success_chance: f64, valid_locations: LocationScope) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            xp_reward: 0,
            item_reward: None,
            gold_reward: 0,
            energy_cost: None,
            success_chance,
            valid_locations,
            required_tool: None,
            on_success: None,
        }
    }

    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp_reward = xp;
        self
    }

    pub fn with_item(mut self, item_id: &str) -> Self {
        self.item_reward = Some(item_id.to_string());
        self
    }

    pub fn with_gold(mut self, gold: u64) -> Self {
        self.gold_reward = gold;
        self
    }

    pub fn with_energy_cost(mut self, cost: i32) -> Self {
        self.energy_cost = Some(cost);
        self
    }

    pub fn with_tool(mut self, item_id: &str) -> Self {
        self.required_tool = Some(item_id.to_string());
        self
    }

    pub fn with_effect(mut self, effect: ActionEffect) -> Self {
        self.on_success = Some(effect);
        self
    }

    /// Signed energy change applied on every tick of this action.
    pub fn energy_delta(&self) -> i64 {
        match self.energy_cost {
            Some(cost) if cost >= 0 => cost as i64,
            Some(cost) => -(cost as i64).abs(),
            None => -Self::DEFAULT_ENERGY_DRAIN,
        }
    }

    /// Restoring actions may be started with an empty energy bar.
    pub fn is_energy_exempt(&self) -> bool {
        matches!(self.energy_cost, Some(cost) if cost >= 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeComponent {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    pub output: String,
    #[serde(default = "default_recipe_quantity")]
    pub quantity: u32,
    pub components: Vec<RecipeComponent>,
}

fn default_recipe_quantity() -> u32 {
    1
}

impl Recipe {
    pub fn new(output: &str) -> Self {
        Self {
            output: output.to_string(),
            quantity: 1,
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, item_id: &str, quantity: u32) -> Self {
        self.components.push(RecipeComponent {
            item_id: item_id.to_string(),
            quantity,
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub max_step: u32,
    #[serde(default)]
    pub reward_xp: u64,
    #[serde(default)]
    pub reward_gold: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathDefinition {
    pub id: String,
    pub label: String,
}

/// Passive bonus a progression path grants to one action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassiveRule {
    pub action_id: String,
    pub path: String,
    /// Applied to both success chance and XP reward.
    pub multiplier: f64,
}

// ============================================================================
// Player state
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationProgress {
    pub location_id: String,
    #[serde(default)]
    pub exploration_percentage: u8,
    #[serde(default)]
    pub is_explored: bool,
}

impl LocationProgress {
    pub fn discovered(location_id: &str) -> Self {
        Self {
            location_id: location_id.to_string(),
            exploration_percentage: 0,
            is_explored: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestProgress {
    pub quest_id: String,
    pub step: u32,
    pub max_step: u32,
    #[serde(default)]
    pub is_complete: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Info,
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogLine {
    #[serde(default)]
    pub tone: Tone,
    pub text: String,
}

impl LogLine {
    pub fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

/// Bounded message log, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct MessageLog {
    lines: VecDeque<LogLine>,
}

impl MessageLog {
    pub fn push(&mut self, line: LogLine) {
        self.lines.push_front(line);
        self.lines.truncate(MESSAGE_LOG_CAPACITY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn latest(&self) -> Option<&LogLine> {
        self.lines.front()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Build a log from lines ordered newest first, dropping the overflow.
    pub fn from_newest_first(lines: impl IntoIterator<Item = LogLine>) -> Self {
        let mut lines: VecDeque<LogLine> = lines.into_iter().collect();
        lines.truncate(MESSAGE_LOG_CAPACITY);
        Self { lines }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    pub schema_version: u8,
    pub xp: u64,
    pub level: u32,
    pub gold: u64,
    pub energy: i64,
    pub max_energy: i64,
    pub hp: i64,
    pub max_hp: i64,
    pub age: u32,
    pub path: Option<String>,
    pub current_location: String,
    /// `None` is the idle state.
    pub current_action: Option<String>,
    /// Discovered locations and their exploration progress.
    pub locations: Vec<LocationProgress>,
    pub inventory: Inventory,
    pub messages: MessageLog,
    pub last_active: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub quests: Vec<QuestProgress>,
}

impl PlayerState {
    /// Fresh character at the campsite with the starter kit.
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut inventory = Inventory::default();
        inventory.insert_unchecked("net", 1);
        inventory.insert_unchecked("wood", 10);
        inventory.insert_unchecked("metal", 10);

        let mut messages = MessageLog::default();
        messages.push(LogLine::new(Tone::Info, "Welcome to AFKRPG!"));
        messages.push(LogLine::new(Tone::Info, "You find yourself in a campsite."));

        Self {
            schema_version: PLAYER_SCHEMA_VERSION,
            xp: 0,
            level: 1,
            gold: 0,
            energy: DEFAULT_MAX_ENERGY,
            max_energy: DEFAULT_MAX_ENERGY,
            hp: DEFAULT_MAX_HP,
            max_hp: DEFAULT_MAX_HP,
            age: 18,
            path: None,
            current_location: STARTING_LOCATION_ID.to_string(),
            current_action: None,
            locations: vec![LocationProgress::discovered(STARTING_LOCATION_ID)],
            inventory,
            messages,
            last_active: now,
            last_login: now,
            quests: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_action.is_none()
    }

    pub fn log(&mut self, tone: Tone, text: impl Into<String>) {
        self.messages.push(LogLine::new(tone, text));
    }

    pub fn has_discovered(&self, location_id: &str) -> bool {
        self.locations.iter().any(|l| l.location_id == location_id)
    }

    /// Record a newly discovered location. Returns false if already known.
    pub fn discover(&mut self, location_id: &str) -> bool {
        if self.has_discovered(location_id) {
            return false;
        }
        self.locations.push(LocationProgress::discovered(location_id));
        true
    }

    pub fn location_progress_mut(&mut self, location_id: &str) -> Option<&mut LocationProgress> {
        self.locations
            .iter_mut()
            .find(|l| l.location_id == location_id)
    }

    pub fn quest_mut(&mut self, quest_id: &str) -> Option<&mut QuestProgress> {
        self.quests.iter_mut().find(|q| q.quest_id == quest_id)
    }

    /// Add to energy, clamped to `[0, max_energy]`. Returns the applied change.
    pub fn adjust_energy(&mut self, delta: i64) -> i64 {
        let before = self.energy;
        self.energy = (self.energy + delta).clamp(0, self.max_energy.max(0));
        self.energy - before
    }
}
