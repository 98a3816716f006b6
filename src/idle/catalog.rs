//! Static lookup data: items, actions, locations, recipes, quests, paths.
//!
//! The engine only reads the catalog by id. Unknown ids surface as
//! [`IdleError::MissingDefinition`] rather than being skipped, and
//! [`Catalog::validate`] checks cross references once at construction so a
//! broken data file fails at load instead of mid-replay.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::idle::errors::IdleError;
use crate::idle::types::{
    ActionDefinition, ActionEffect, ItemDefinition, ItemKind, LocationDefinition, LocationScope,
    PassiveRule, PathDefinition, QuestDefinition, Recipe, Region, STARTING_LOCATION_ID,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub items: Vec<ItemDefinition>,
    pub actions: Vec<ActionDefinition>,
    pub locations: Vec<LocationDefinition>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub quests: Vec<QuestDefinition>,
    #[serde(default)]
    pub paths: Vec<PathDefinition>,
    #[serde(default)]
    pub passives: Vec<PassiveRule>,
}

impl Catalog {
    /// Load and validate a catalog from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, IdleError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&content)?;
        info!(
            "Loaded catalog from {} ({} actions, {} items)",
            path.as_ref().display(),
            catalog.actions.len(),
            catalog.items.len()
        );
        Ok(catalog)
    }

    pub fn from_json_str(content: &str) -> Result<Self, IdleError> {
        let catalog: Catalog = serde_json::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn item(&self, id: &str) -> Result<&ItemDefinition, IdleError> {
        self.items
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| IdleError::missing("item", id))
    }

    pub fn action(&self, id: &str) -> Result<&ActionDefinition, IdleError> {
        self.actions
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| IdleError::missing("action", id))
    }

    pub fn location(&self, id: &str) -> Result<&LocationDefinition, IdleError> {
        self.locations
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| IdleError::missing("location", id))
    }

    pub fn recipe(&self, output: &str) -> Result<&Recipe, IdleError> {
        self.recipes
            .iter()
            .find(|r| r.output == output)
            .ok_or_else(|| IdleError::missing("recipe", output))
    }

    pub fn quest(&self, id: &str) -> Result<&QuestDefinition, IdleError> {
        self.quests
            .iter()
            .find(|q| q.id == id)
            .ok_or_else(|| IdleError::missing("quest", id))
    }

    pub fn path(&self, id: &str) -> Result<&PathDefinition, IdleError> {
        self.paths
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| IdleError::missing("path", id))
    }

    /// Item display name, falling back to the raw id for log text.
    pub fn item_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.item(id).map(|i| i.name.as_str()).unwrap_or(id)
    }

    pub fn location_label<'a>(&'a self, id: &'a str) -> &'a str {
        self.location(id).map(|l| l.label.as_str()).unwrap_or(id)
    }

    /// Multiplier a progression path grants to an action; 1.0 when no rule
    /// matches.
    pub fn passive_multiplier(&self, action_id: &str, path: Option<&str>) -> f64 {
        let Some(path) = path else {
            return 1.0;
        };
        self.passives
            .iter()
            .filter(|rule| rule.action_id == action_id && rule.path.eq_ignore_ascii_case(path))
            .map(|rule| rule.multiplier)
            .product()
    }

    /// Actions that can be performed at `location_id`, in catalog order.
    pub fn actions_at<'a>(
        &'a self,
        location_id: &'a str,
    ) -> impl Iterator<Item = &'a ActionDefinition> + 'a {
        self.actions
            .iter()
            .filter(move |a| a.valid_locations.allows(location_id))
    }

    /// Check every cross reference and numeric bound.
    pub fn validate(&self) -> Result<(), IdleError> {
        self.location(STARTING_LOCATION_ID)?;

        for action in &self.actions {
            if !(0.0..=100.0).contains(&action.success_chance) {
                return Err(IdleError::invalid(format!(
                    "action '{}' has success chance {} outside 0..=100",
                    action.id, action.success_chance
                )));
            }
            if let Some(item) = &action.item_reward {
                self.item(item)?;
            }
            if let Some(tool) = &action.required_tool {
                self.item(tool)?;
            }
            if let LocationScope::Only(ids) = &action.valid_locations {
                for id in ids {
                    self.location(id)?;
                }
            }
            match &action.on_success {
                Some(ActionEffect::QuestStep { quest_id }) => {
                    self.quest(quest_id)?;
                }
                Some(ActionEffect::Explore {
                    step,
                    bonus_chance,
                    bonus_pool,
                    ..
                }) => {
                    if *step == 0 {
                        return Err(IdleError::invalid(format!(
                            "action '{}' explores in steps of zero",
                            action.id
                        )));
                    }
                    if !(0.0..=100.0).contains(bonus_chance) {
                        return Err(IdleError::invalid(format!(
                            "action '{}' has bonus chance {} outside 0..=100",
                            action.id, bonus_chance
                        )));
                    }
                    for item in bonus_pool {
                        self.item(item)?;
                    }
                }
                Some(ActionEffect::Message { .. }) | None => {}
            }
        }

        for recipe in &self.recipes {
            self.item(&recipe.output)?;
            if recipe.quantity == 0 || recipe.components.is_empty() {
                return Err(IdleError::invalid(format!(
                    "recipe for '{}' must produce something from something",
                    recipe.output
                )));
            }
            for (index, component) in recipe.components.iter().enumerate() {
                self.item(&component.item_id)?;
                if recipe.components[..index]
                    .iter()
                    .any(|earlier| earlier.item_id == component.item_id)
                {
                    return Err(IdleError::invalid(format!(
                        "recipe for '{}' lists '{}' more than once",
                        recipe.output, component.item_id
                    )));
                }
                if component.quantity == 0 {
                    return Err(IdleError::invalid(format!(
                        "recipe for '{}' lists zero '{}'",
                        recipe.output, component.item_id
                    )));
                }
            }
        }

        for quest in &self.quests {
            if quest.max_step == 0 {
                return Err(IdleError::invalid(format!(
                    "quest '{}' has no steps",
                    quest.id
                )));
            }
        }

        for rule in &self.passives {
            self.action(&rule.action_id)?;
            self.path(&rule.path)?;
            if !rule.multiplier.is_finite() || rule.multiplier <= 0.0 {
                return Err(IdleError::invalid(format!(
                    "passive for '{}' on path '{}' has multiplier {}",
                    rule.action_id, rule.path, rule.multiplier
                )));
            }
        }

        Ok(())
    }

    /// The built-in world.
    pub fn standard() -> Self {
        let items = vec![
            ItemDefinition::new("wood", "Wood", ItemKind::Resource, "A piece of wood."),
            ItemDefinition::new("metal", "Metal", ItemKind::Resource, "A piece of metal."),
            ItemDefinition::new("fish", "Fish", ItemKind::Resource, "A fish."),
            ItemDefinition::new("potion", "Potion", ItemKind::Consumable, "A potion."),
            ItemDefinition::new("chest", "Chest", ItemKind::Loot, "A chest with treasure inside!"),
            ItemDefinition::new("key", "Key", ItemKind::Key, "A key to open a chest."),
            ItemDefinition::new("sword", "Sword", ItemKind::Weapon, "Used to attack enemies."),
            ItemDefinition::new("shield", "Shield", ItemKind::Armor, "Used to block attacks."),
            ItemDefinition::new("net", "Net", ItemKind::Tool, "Used to catch fish in water."),
            ItemDefinition::new("axe", "Axe", ItemKind::Tool, "Used to chop down trees."),
            ItemDefinition::new("pickaxe", "Pickaxe", ItemKind::Tool, "Used to mine metal."),
            ItemDefinition::new("tent", "Tent", ItemKind::House, "Used to sleep in and restore energy."),
            ItemDefinition::new("shovel", "Shovel", ItemKind::Tool, "Used to dig up treasure."),
        ];

        let locations = vec![
            LocationDefinition::new("campsite", "Campsite", Region::Camp),
            LocationDefinition::new("pond", "Pond", Region::Water),
            LocationDefinition::new("river", "River", Region::Water),
            LocationDefinition::new("ocean", "Ocean", Region::Water),
            LocationDefinition::new("beach", "Beach", Region::Water),
            LocationDefinition::new("mine", "Mine", Region::Land),
            LocationDefinition::new("forest", "Forest", Region::Land),
            LocationDefinition::new("town", "Town", Region::Town),
            LocationDefinition::new("dungeon", "Dungeon", Region::Town),
            LocationDefinition::new("castle", "Castle", Region::Town),
        ];

        let actions = vec![
            ActionDefinition::new(
                "sleeping",
                "Sleeping",
                80.0,
                LocationScope::only(&[
                    "town", "campsite", "forest", "castle", "pond", "river", "beach",
                ]),
            )
            .with_energy_cost(5)
            .with_tool("tent")
            .with_effect(ActionEffect::Message {
                text: "You sleep well.".to_string(),
            }),
            ActionDefinition::new(
                "fishing",
                "Fishing",
                20.0,
                LocationScope::only(&["pond", "river", "beach", "ocean"]),
            )
            .with_xp(1)
            .with_item("fish")
            .with_tool("net"),
            ActionDefinition::new(
                "chopping",
                "Chopping",
                40.0,
                LocationScope::only(&["forest", "campsite"]),
            )
            .with_xp(1)
            .with_item("wood")
            .with_tool("axe"),
            ActionDefinition::new("mining", "Mining", 30.0, LocationScope::only(&["mine"]))
                .with_xp(1)
                .with_item("metal")
                .with_tool("pickaxe"),
            ActionDefinition::new(
                "fighting",
                "Fighting",
                50.0,
                LocationScope::only(&["dungeon", "castle"]),
            )
            .with_energy_cost(-2)
            .with_xp(2)
            .with_gold(2)
            .with_item("key")
            .with_tool("sword")
            .with_effect(ActionEffect::QuestStep {
                quest_id: "monster_hunter".to_string(),
            }),
            ActionDefinition::new("exploring", "Exploring", 30.0, LocationScope::All)
                .with_energy_cost(-5)
                .with_xp(1)
                .with_effect(ActionEffect::Explore {
                    step: 10,
                    completion_xp: 25,
                    bonus_chance: 50.0,
                    bonus_pool: ["key", "wood", "metal", "fish"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                }),
        ];

        let recipes = vec![
            Recipe::new("pickaxe")
                .with_component("metal", 5)
                .with_component("wood", 5),
            Recipe::new("axe")
                .with_component("metal", 5)
                .with_component("wood", 5),
            Recipe::new("chest")
                .with_component("wood", 100)
                .with_component("metal", 100),
            Recipe::new("sword")
                .with_component("metal", 50)
                .with_component("wood", 50),
            Recipe::new("tent").with_component("wood", 20),
        ];

        let quests = vec![QuestDefinition {
            id: "monster_hunter".to_string(),
            name: "Monster Hunter".to_string(),
            description: "Win ten fights in the dungeon or the castle.".to_string(),
            max_step: 10,
            reward_xp: 50,
            reward_gold: 25,
        }];

        let paths = vec![
            PathDefinition {
                id: "lumberjack".to_string(),
                label: "Lumberjack".to_string(),
            },
            PathDefinition {
                id: "angler".to_string(),
                label: "Angler".to_string(),
            },
            PathDefinition {
                id: "prospector".to_string(),
                label: "Prospector".to_string(),
            },
        ];

        let passives = vec![
            PassiveRule {
                action_id: "chopping".to_string(),
                path: "lumberjack".to_string(),
                multiplier: 2.0,
            },
            PassiveRule {
                action_id: "fishing".to_string(),
                path: "angler".to_string(),
                multiplier: 2.0,
            },
            PassiveRule {
                action_id: "mining".to_string(),
                path: "prospector".to_string(),
                multiplier: 2.0,
            },
        ];

        Self {
            items,
            actions,
            locations,
            recipes,
            quests,
            paths,
            passives,
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
