//! # afkrpg - idle RPG engine with offline progress
//!
//! The player picks an action (chopping, fishing, mining, fighting,
//! exploring, sleeping) and the game keeps resolving it on a fixed tick,
//! including while the player is away: on reload the elapsed time is replayed
//! as discrete ticks and the gains are reported once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use afkrpg::config::Config;
//! use afkrpg::idle::{Command, GameSession, RngOracle, SaveStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_or_default("config.toml").await?;
//!     let store = SaveStore::open(config.save_dir())?;
//!     let (mut session, summary) = GameSession::open(
//!         store,
//!         config.catalog()?,
//!         config.session_options(),
//!         Box::new(RngOracle::from_entropy()),
//!     )
//!     .await?;
//!     println!("{} ticks while away", summary.ticks);
//!
//!     session.dispatch(Command::StartAction("exploring".into())).await?;
//!     session.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`idle`] - game engine, save store and live session
//! - [`config`] - TOML configuration
//! - [`logutil`] - single-line log helpers

pub mod config;
pub mod idle;
pub mod logutil;
