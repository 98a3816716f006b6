//! Recipe resolution against an inventory.

use log::warn;

use crate::idle::inventory::Inventory;
use crate::idle::types::Recipe;

/// A component the inventory does not hold enough of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    pub item_id: String,
    pub required: u32,
    pub available: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CraftResult {
    /// Components were consumed and `quantity` of `item_id` added.
    Crafted { item_id: String, quantity: u32 },
    /// Nothing changed.
    Rejected { shortfalls: Vec<Shortfall> },
}

impl CraftResult {
    pub fn is_crafted(&self) -> bool {
        matches!(self, CraftResult::Crafted { .. })
    }
}

/// Total quantity required per item id, in first-listed order.
///
/// A recipe loaded from a file may list the same item on several rows.
fn requirements(recipe: &Recipe) -> Vec<(&str, u32)> {
    let mut totals: Vec<(&str, u32)> = Vec::new();
    for component in &recipe.components {
        match totals.iter_mut().find(|(id, _)| *id == component.item_id) {
            Some((_, total)) => *total = total.saturating_add(component.quantity),
            None => totals.push((component.item_id.as_str(), component.quantity)),
        }
    }
    totals
}

/// Every component the inventory is short of, in recipe order.
pub fn shortfalls(inventory: &Inventory, recipe: &Recipe) -> Vec<Shortfall> {
    requirements(recipe)
        .into_iter()
        .filter_map(|(item_id, required)| {
            let available = inventory.quantity(item_id);
            (available < required).then(|| Shortfall {
                item_id: item_id.to_string(),
                required,
                available,
            })
        })
        .collect()
}

pub fn can_craft(inventory: &Inventory, recipe: &Recipe) -> bool {
    shortfalls(inventory, recipe).is_empty()
}

/// Consume the recipe's components and add its output, or change nothing.
pub fn craft_item(inventory: &mut Inventory, recipe: &Recipe) -> CraftResult {
    let missing = shortfalls(inventory, recipe);
    if !missing.is_empty() {
        return CraftResult::Rejected { shortfalls: missing };
    }

    // Deduct from a copy and only commit it once every component came out whole.
    let mut next = inventory.clone();
    for (item_id, required) in requirements(recipe) {
        if required == 0 {
            continue;
        }
        let available = next.quantity(item_id);
        let removed = next.remove(item_id, required).unwrap_or(0);
        if removed < required {
            warn!(
                "craft {} removed {} of {} {}; leaving inventory untouched",
                recipe.output, removed, required, item_id
            );
            return CraftResult::Rejected {
                shortfalls: vec![Shortfall {
                    item_id: item_id.to_string(),
                    required,
                    available,
                }],
            };
        }
    }
    next.insert_unchecked(&recipe.output, recipe.quantity);
    *inventory = next;

    CraftResult::Crafted {
        item_id: recipe.output.clone(),
        quantity: recipe.quantity,
    }
}
