//! Stackable item multiset owned by a player state or an AFK summary.

use serde::{Deserialize, Serialize};

use crate::idle::errors::IdleError;

/// Distinct stacks the inventory panel shows. Not enforced here.
pub const NOMINAL_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub item_id: String,
    pub quantity: u32,
}

/// Persisted shape of an entry. Accepts the legacy `id`/`amt` keys and signed
/// quantities so a damaged save can be healed instead of rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    #[serde(alias = "id")]
    item_id: String,
    #[serde(alias = "amt")]
    quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<StoredEntry>", into = "Vec<StoredEntry>")]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
}

impl From<Vec<StoredEntry>> for Inventory {
    fn from(stored: Vec<StoredEntry>) -> Self {
        Inventory::from_entries(stored.into_iter().map(|e| (e.item_id, e.quantity)))
    }
}

impl From<Inventory> for Vec<StoredEntry> {
    fn from(inventory: Inventory) -> Self {
        inventory
            .entries
            .into_iter()
            .map(|e| StoredEntry {
                item_id: e.item_id,
                quantity: e.quantity as i64,
            })
            .collect()
    }
}

// ============================================================================
// Inventory Operations
// ============================================================================

impl Inventory {
    /// Build an inventory from raw `(id, quantity)` pairs, coalescing duplicate
    /// ids and dropping non-positive quantities.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut inventory = Inventory::default();
        for (item_id, quantity) in entries {
            if quantity <= 0 {
                continue;
            }
            let item_id: String = item_id.into();
            let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            inventory.insert_unchecked(&item_id, quantity);
        }
        inventory
    }

    /// Add `amount` of an item, stacking onto an existing entry.
    pub fn add(&mut self, item_id: &str, amount: u32) -> Result<(), IdleError> {
        if amount == 0 {
            return Err(IdleError::invalid(format!(
                "cannot add zero of item '{}'",
                item_id
            )));
        }
        self.insert_unchecked(item_id, amount);
        Ok(())
    }

    pub(crate) fn insert_unchecked(&mut self, item_id: &str, amount: u32) {
        if amount == 0 {
            return;
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.item_id == item_id) {
            entry.quantity = entry.quantity.saturating_add(amount);
        } else {
            self.entries.push(InventoryEntry {
                item_id: item_id.to_string(),
                quantity: amount,
            });
        }
    }

    /// Remove up to `amount` of an item; the entry disappears when it reaches
    /// zero. Returns how many were actually removed (0 when absent).
    pub fn remove(&mut self, item_id: &str, amount: u32) -> Result<u32, IdleError> {
        if amount == 0 {
            return Err(IdleError::invalid(format!(
                "cannot remove zero of item '{}'",
                item_id
            )));
        }
        let Some(index) = self.entries.iter().position(|e| e.item_id == item_id) else {
            return Ok(0);
        };
        let entry = &mut self.entries[index];
        if amount >= entry.quantity {
            let removed = entry.quantity;
            self.entries.remove(index);
            Ok(removed)
        } else {
            entry.quantity -= amount;
            Ok(amount)
        }
    }

    pub fn quantity(&self, item_id: &str) -> u32 {
        self.entries
            .iter()
            .find(|e| e.item_id == item_id)
            .map(|e| e.quantity)
            .unwrap_or(0)
    }

    pub fn has(&self, item_id: &str) -> bool {
        self.entries.iter().any(|e| e.item_id == item_id)
    }

    /// Stack every entry of `other` into this inventory.
    pub fn merge(&mut self, other: &Inventory) {
        for entry in &other.entries {
            self.insert_unchecked(&entry.item_id, entry.quantity);
        }
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
