//! Persistence of the single save snapshot.
//!
//! The snapshot is stored as JSON in its own sled tree. Reads go through
//! [`restore_player_state`], so a damaged or legacy blob comes back healed
//! rather than as an error.

use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;

use crate::idle::catalog::Catalog;
use crate::idle::errors::IdleError;
use crate::idle::migration::{restore_player_state, Restored};
use crate::idle::types::{PlayerState, PLAYER_SCHEMA_VERSION};

/// Key the single save snapshot lives under.
pub const SAVE_KEY: &str = "afkrpg";
const TREE_SAVES: &str = "afkrpg_saves";

/// Sled-backed store for the player's JSON save blob.
pub struct SaveStore {
    _db: sled::Db,
    saves: sled::Tree,
}

impl SaveStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IdleError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        Self::from_db(db)
    }

    /// In-memory store that disappears when dropped.
    pub fn temporary() -> Result<Self, IdleError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, IdleError> {
        let saves = db.open_tree(TREE_SAVES)?;
        Ok(Self { _db: db, saves })
    }

    /// Raw blob as last written, if any.
    pub fn load_raw(&self) -> Result<Option<Vec<u8>>, IdleError> {
        Ok(self.saves.get(SAVE_KEY)?.map(|bytes| bytes.to_vec()))
    }

    /// Load and heal the save. `None` when no save exists yet.
    pub fn load(&self, catalog: &Catalog, now: DateTime<Utc>) -> Result<Option<Restored>, IdleError> {
        Ok(self
            .load_raw()?
            .map(|blob| restore_player_state(&blob, catalog, now)))
    }

    /// Write the snapshot and flush it to disk.
    pub fn save(&self, state: &PlayerState) -> Result<(), IdleError> {
        let mut snapshot = state.clone();
        snapshot.schema_version = PLAYER_SCHEMA_VERSION;
        let bytes = serde_json::to_vec(&snapshot)?;
        self.saves.insert(SAVE_KEY, bytes)?;
        self.saves.flush()?;
        debug!(
            "saved player state (level {}, action {:?})",
            state.level, state.current_action
        );
        Ok(())
    }

    /// Remove the save. Returns whether one existed.
    pub fn delete(&self) -> Result<bool, IdleError> {
        let existed = self.saves.remove(SAVE_KEY)?.is_some();
        self.saves.flush()?;
        Ok(existed)
    }

    /// Store arbitrary bytes under the save key, bypassing serialization.
    pub fn save_raw(&self, blob: &[u8]) -> Result<(), IdleError> {
        self.saves.insert(SAVE_KEY, blob)?;
        self.saves.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_store_has_no_save() {
        let store = SaveStore::temporary().unwrap();
        assert!(store.load(&Catalog::standard(), Utc::now()).unwrap().is_none());
        assert!(!store.delete().unwrap());
    }

    #[test]
    fn save_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let mut state = PlayerState::new(now);
        state.gold = 12;
        {
            let store = SaveStore::open(dir.path()).unwrap();
            store.save(&state).unwrap();
        }
        let store = SaveStore::open(dir.path()).unwrap();
        let restored = store.load(&Catalog::standard(), now).unwrap().unwrap();
        assert_eq!(restored.state.gold, 12);
        assert!(!restored.fresh);
    }

    #[test]
    fn snapshot_is_json_under_fixed_key() {
        let store = SaveStore::temporary().unwrap();
        store.save(&PlayerState::new(Utc::now())).unwrap();
        let raw = store.load_raw().unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["current_location"], "campsite");
        assert_eq!(value["inventory"][0]["item_id"], "net");
    }
}
