//! Live game session: offline catch-up at open, then a timer-driven ticker.
//!
//! One [`GameSession`] owns the only writable copy of the player state. The
//! state and the chance oracle sit behind a single `tokio::sync::Mutex`; the
//! ticker task and [`GameSession::dispatch`] both take it, run one command to
//! completion and persist before letting go, so the stored blob always holds
//! a fully resolved tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::idle::catalog::Catalog;
use crate::idle::chance::ChanceOracle;
use crate::idle::commands::{dispatch, new_game, Command, Transition};
use crate::idle::errors::IdleError;
use crate::idle::replay::{AfkResultSummary, ReplayConfig, ReplayJob};
use crate::idle::storage::SaveStore;
use crate::idle::types::PlayerState;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(2_000);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub tick_interval: Duration,
    pub replay: ReplayConfig,
    /// Progression path for a character created because no save existed.
    pub new_game_path: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            replay: ReplayConfig::default(),
            new_game_path: None,
        }
    }
}

pub type SharedOracle = Box<dyn ChanceOracle + Send>;

struct Shared {
    state: PlayerState,
    oracle: SharedOracle,
}

struct Ticker {
    action_id: String,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct GameSession {
    shared: Arc<Mutex<Shared>>,
    catalog: Arc<Catalog>,
    store: Arc<SaveStore>,
    tick_interval: Duration,
    ticker: Option<Ticker>,
}

impl GameSession {
    /// Load (or create) the save, replay the time away and start ticking if an
    /// action is running.
    pub async fn open(
        store: SaveStore,
        catalog: Catalog,
        options: SessionOptions,
        oracle: SharedOracle,
    ) -> Result<(Self, AfkResultSummary), IdleError> {
        Self::open_at(store, catalog, options, oracle, Utc::now()).await
    }

    pub async fn open_at(
        store: SaveStore,
        catalog: Catalog,
        options: SessionOptions,
        mut oracle: SharedOracle,
        now: DateTime<Utc>,
    ) -> Result<(Self, AfkResultSummary), IdleError> {
        let mut state = match store.load(&catalog, now)? {
            Some(restored) => {
                if restored.fresh {
                    warn!("stored save was unreadable; a new character was created");
                }
                restored.state
            }
            None => {
                info!("no save found; starting a new game");
                new_game(&catalog, options.new_game_path.as_deref(), now)?
            }
        };

        let mut job = ReplayJob::plan(&state, now, &options.replay);
        let chunk = options.replay.max_ticks_per_chunk.max(1);
        while !job.is_done() {
            let ran = job.advance(&mut state, &catalog, oracle.as_mut(), chunk)?;
            debug!("replay chunk: {} ticks, {} left", ran, job.remaining());
            tokio::task::yield_now().await;
        }
        let summary = job.finish(&mut state);
        store.save(&state)?;

        let mut session = Self {
            shared: Arc::new(Mutex::new(Shared { state, oracle })),
            catalog: Arc::new(catalog),
            store: Arc::new(store),
            tick_interval: options.tick_interval,
            ticker: None,
        };
        session.sync_ticker().await;
        Ok((session, summary))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> PlayerState {
        self.shared.lock().await.state.clone()
    }

    /// Whether a live ticker is still running.
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .as_ref()
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }

    /// Apply a command, persist its result and start or stop the ticker to
    /// match the new current action.
    pub async fn dispatch(&mut self, command: Command) -> Result<Transition, IdleError> {
        let transition = {
            let mut guard = self.shared.lock().await;
            let shared = &mut *guard;
            let transition = dispatch(
                &shared.state,
                &command,
                &self.catalog,
                shared.oracle.as_mut(),
                Utc::now(),
            )?;
            // A refusal changes only the message log, which is kept too.
            if transition.is_accepted() || !transition.messages.is_empty() {
                self.store.save(&transition.state)?;
                shared.state = transition.state.clone();
            }
            transition
        };
        self.sync_ticker().await;
        Ok(transition)
    }

    /// Stop ticking and write the final state.
    pub async fn shutdown(mut self) -> Result<PlayerState, IdleError> {
        self.stop_ticker().await;
        let guard = self.shared.lock().await;
        self.store.save(&guard.state)?;
        Ok(guard.state.clone())
    }

    async fn sync_ticker(&mut self) {
        let current = self.shared.lock().await.state.current_action.clone();
        match current {
            Some(action_id) => {
                let running = self
                    .ticker
                    .as_ref()
                    .map(|t| t.action_id == action_id && !t.handle.is_finished())
                    .unwrap_or(false);
                if !running {
                    self.stop_ticker().await;
                    self.start_ticker(action_id);
                }
            }
            None => self.stop_ticker().await,
        }
    }

    fn start_ticker(&mut self, action_id: String) {
        let (cancel, cancelled) = watch::channel(false);
        debug!("starting ticker for {} every {:?}", action_id, self.tick_interval);
        let handle = tokio::spawn(run_ticker(
            Arc::clone(&self.shared),
            Arc::clone(&self.catalog),
            Arc::clone(&self.store),
            self.tick_interval,
            cancelled,
        ));
        self.ticker = Some(Ticker {
            action_id,
            cancel,
            handle,
        });
    }

    async fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.cancel.send(true);
            if let Err(e) = ticker.handle.await {
                warn!("ticker task ended abnormally: {}", e);
            }
            debug!("stopped ticker for {}", ticker.action_id);
        }
    }
}

async fn run_ticker(
    shared: Arc<Mutex<Shared>>,
    catalog: Arc<Catalog>,
    store: Arc<SaveStore>,
    period: Duration,
    mut cancelled: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; a started action waits one period.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let mut guard = shared.lock().await;
                match tick_once(&mut guard, &catalog, &store) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        warn!("live tick failed: {}", e);
                        break;
                    }
                }
            }
            changed = cancelled.changed() => {
                if changed.is_err() || *cancelled.borrow() {
                    break;
                }
            }
        }
    }
}

/// One live tick under the lock. Returns whether an action is still running.
fn tick_once(shared: &mut Shared, catalog: &Catalog, store: &SaveStore) -> Result<bool, IdleError> {
    let transition = dispatch(
        &shared.state,
        &Command::Tick,
        catalog,
        shared.oracle.as_mut(),
        Utc::now(),
    )?;
    if !transition.is_accepted() {
        return Ok(false);
    }
    store.save(&transition.state)?;
    shared.state = transition.state;
    Ok(shared.state.current_action.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idle::chance::FixedOracle;

    fn store_with(state: &PlayerState) -> SaveStore {
        let store = SaveStore::temporary().unwrap();
        store.save(state).unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_drives_action_until_stopped() {
        let mut state = PlayerState::new(Utc::now());
        state.inventory.add("axe", 1).unwrap();
        let (mut session, summary) = GameSession::open(
            store_with(&state),
            Catalog::standard(),
            SessionOptions::default(),
            Box::new(FixedOracle(0.0)),
        )
        .await
        .unwrap();
        assert!(summary.is_empty());
        assert!(!session.is_ticking());

        let t = session
            .dispatch(Command::StartAction("chopping".to_string()))
            .await
            .unwrap();
        assert!(t.is_accepted());
        assert!(session.is_ticking());

        tokio::time::sleep(Duration::from_millis(6_500)).await;
        assert_eq!(session.snapshot().await.inventory.quantity("wood"), 13);

        session.dispatch(Command::StopAction).await.unwrap();
        assert!(!session.is_ticking());
        tokio::time::sleep(Duration::from_secs(20)).await;

        let final_state = session.shutdown().await.unwrap();
        assert_eq!(final_state.inventory.quantity("wood"), 13);
        assert!(final_state.current_action.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_command_does_not_start_ticker() {
        let (mut session, _) = GameSession::open(
            SaveStore::temporary().unwrap(),
            Catalog::standard(),
            SessionOptions::default(),
            Box::new(FixedOracle(0.0)),
        )
        .await
        .unwrap();

        // A new game has no axe.
        let t = session
            .dispatch(Command::StartAction("chopping".to_string()))
            .await
            .unwrap();
        assert!(!t.is_accepted());
        assert!(!session.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn refusal_line_reaches_the_saved_log() {
        let (mut session, _) = GameSession::open(
            SaveStore::temporary().unwrap(),
            Catalog::standard(),
            SessionOptions::default(),
            Box::new(FixedOracle(0.0)),
        )
        .await
        .unwrap();
        let before = session.snapshot().await;

        let t = session
            .dispatch(Command::Craft("chest".to_string()))
            .await
            .unwrap();
        assert!(!t.is_accepted());

        let live = session.snapshot().await;
        assert_eq!(live.messages.latest(), t.messages.last());
        assert_eq!(live.last_active, before.last_active);
        assert_eq!(live.inventory, before.inventory);

        let blob = session.store.load_raw().unwrap().unwrap();
        let saved: PlayerState = serde_json::from_slice(&blob).unwrap();
        assert_eq!(
            saved.messages.latest().map(|l| l.text.as_str()),
            Some("Insufficient resources to craft Chest")
        );
        assert_eq!(saved, live);
    }

    #[tokio::test(start_paused = true)]
    async fn exploration_ticker_stops_itself() {
        let (mut session, _) = GameSession::open(
            SaveStore::temporary().unwrap(),
            Catalog::standard(),
            SessionOptions::default(),
            Box::new(FixedOracle(0.0)),
        )
        .await
        .unwrap();
        session
            .dispatch(Command::StartAction("exploring".to_string()))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!session.is_ticking());
        let state = session.snapshot().await;
        assert!(state.current_action.is_none());
        assert!(state.locations[0].is_explored);
    }

    #[tokio::test]
    async fn open_replays_time_away_in_chunks() {
        let now = Utc::now();
        let mut state = PlayerState::new(now - chrono::Duration::minutes(10));
        state.inventory.add("axe", 1).unwrap();
        state.current_action = Some("chopping".to_string());
        let options = SessionOptions {
            replay: ReplayConfig {
                max_ticks_per_chunk: 64,
                ..ReplayConfig::default()
            },
            ..SessionOptions::default()
        };

        let (session, summary) = GameSession::open_at(
            store_with(&state),
            Catalog::standard(),
            options,
            Box::new(FixedOracle(0.99)),
            now,
        )
        .await
        .unwrap();

        assert_eq!(summary.ticks, 300);
        assert_eq!(summary.successes, 0);
        assert!(session.is_ticking());
        let stored = session.shutdown().await.unwrap();
        assert_eq!(stored.last_active.timestamp(), now.timestamp());
    }
}
