//! Idle RPG engine: catalog data, action resolution, crafting, commands and
//! offline-progress replay, plus the sled save store and a live tokio
//! session that ties them together.

pub mod actions;
pub mod catalog;
pub mod chance;
pub mod commands;
pub mod crafting;
pub mod errors;
pub mod inventory;
pub mod migration;
pub mod progression;
pub mod replay;
pub mod session;
pub mod storage;
pub mod types;

pub use actions::{resolve_tick, TickOutcome};
pub use catalog::Catalog;
pub use chance::{roll_index, roll_success, ChanceOracle, FixedOracle, RngOracle, ScriptedOracle};
pub use commands::{dispatch, new_game, Command, Outcome, Transition};
pub use crafting::{can_craft, craft_item, CraftResult, Shortfall};
pub use errors::IdleError;
pub use inventory::{Inventory, InventoryEntry, NOMINAL_CAPACITY};
pub use migration::{restore_player_state, Restored};
pub use progression::{apply_xp, xp_required_for_level};
pub use replay::{replay, AfkResultSummary, ReplayConfig, ReplayJob};
pub use session::{GameSession, SessionOptions, SharedOracle};
pub use storage::{SaveStore, SAVE_KEY};
pub use types::*;
