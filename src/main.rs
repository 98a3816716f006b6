//! Binary entrypoint for the AFK RPG CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `new [--path <path>] [--force]` - create a new character
//! - `status` - show the character, catching up on time away first
//! - `start <action>` / `stop` - begin or end the current action
//! - `travel <location>` - move to a discovered location
//! - `craft <item>` - craft an item from its recipe
//! - `play [--seconds <n>]` - run the live ticker in the foreground
//! - `reset` - delete the save
//!
//! Every command that touches the save replays the time since it was last
//! active and prints the AFK results once when any ticks ran.
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use afkrpg::config::Config;
use afkrpg::logutil::escape_log;
use afkrpg::idle::{
    new_game, xp_required_for_level, AfkResultSummary, Catalog, Command, GameSession, LogLine,
    Outcome, PlayerState, RngOracle, SaveStore, Tone, NOMINAL_CAPACITY,
};

#[derive(Parser)]
#[command(name = "afkrpg")]
#[command(about = "An idle RPG that keeps playing while you are away")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Create a new character
    New {
        /// Progression path (lumberjack, angler, prospector)
        #[arg(short, long)]
        path: Option<String>,
        /// Replace an existing save
        #[arg(short, long)]
        force: bool,
    },
    /// Show character status
    Status,
    /// Start an action at the current location
    Start { action: String },
    /// Stop the current action
    Stop,
    /// Travel to a discovered location
    Travel { location: String },
    /// Craft an item
    Craft { item: String },
    /// Keep ticking in the foreground until Ctrl-C
    Play {
        /// Stop after this many seconds
        #[arg(short, long)]
        seconds: Option<u64>,
    },
    /// Delete the save
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        println!("Wrote {}", cli.config);
        return Ok(());
    }

    let config = Config::load_or_default(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);
    let catalog = config.catalog()?;

    match cli.command {
        Commands::Init => {}
        Commands::New { path, force } => {
            let store = SaveStore::open(config.save_dir())?;
            if store.load_raw()?.is_some() && !force {
                return Err(anyhow!(
                    "a save already exists; pass --force to replace it"
                ));
            }
            let state = new_game(&catalog, path.as_deref(), chrono::Utc::now())?;
            store.save(&state)?;
            info!("created new character (path {:?})", state.path);
            print_status(&state, &catalog);
        }
        Commands::Reset => {
            let store = SaveStore::open(config.save_dir())?;
            if store.delete()? {
                println!("Save deleted.");
            } else {
                println!("No save to delete.");
            }
        }
        Commands::Status => {
            let session = open_session(&config, catalog.clone()).await?;
            let state = session.shutdown().await?;
            print_status(&state, &catalog);
        }
        Commands::Start { action } => {
            run_command(&config, catalog, Command::StartAction(action)).await?
        }
        Commands::Stop => run_command(&config, catalog, Command::StopAction).await?,
        Commands::Travel { location } => {
            run_command(&config, catalog, Command::ChangeLocation(location)).await?
        }
        Commands::Craft { item } => run_command(&config, catalog, Command::Craft(item)).await?,
        Commands::Play { seconds } => play(&config, catalog, seconds).await?,
    }

    Ok(())
}

async fn open_session(config: &Config, catalog: Catalog) -> Result<GameSession> {
    let store = SaveStore::open(config.save_dir())?;
    let (session, summary) = GameSession::open(
        store,
        catalog,
        config.session_options(),
        Box::new(RngOracle::from_entropy()),
    )
    .await?;
    if !summary.is_empty() {
        print_summary(&summary, session.catalog());
    }
    Ok(session)
}

async fn run_command(config: &Config, catalog: Catalog, command: Command) -> Result<()> {
    let mut session = open_session(config, catalog).await?;
    let transition = session.dispatch(command).await?;
    for line in &transition.messages {
        print_line(line);
    }
    if let Outcome::Rejected { reason } = &transition.outcome {
        info!("command rejected: {}", escape_log(reason));
    }
    session.shutdown().await?;
    Ok(())
}

async fn play(config: &Config, catalog: Catalog, seconds: Option<u64>) -> Result<()> {
    let session = open_session(config, catalog).await?;
    let start = session.snapshot().await;
    if start.current_action.is_none() {
        println!("You are not doing anything. Use `afkrpg start <action>` first.");
        session.shutdown().await?;
        return Ok(());
    }

    let deadline = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut last_seen = start.messages.latest().cloned();
    let mut poll = tokio::time::interval(config.session_options().tick_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let state = session.snapshot().await;
                let fresh: Vec<&LogLine> = state
                    .messages
                    .iter()
                    .take_while(|line| Some(*line) != last_seen.as_ref())
                    .collect();
                for line in fresh.into_iter().rev() {
                    print_line(line);
                }
                last_seen = state.messages.latest().cloned();
                if !session.is_ticking() {
                    println!("Nothing left to do.");
                    break;
                }
            }
            _ = &mut deadline => break,
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!("ctrl-c handler failed: {}", e);
                }
                break;
            }
        }
    }

    let catalog = session.catalog().clone();
    let state = session.shutdown().await?;
    print_status(&state, &catalog);
    Ok(())
}

fn print_line(line: &LogLine) {
    let marker = match line.tone {
        Tone::Info => " ",
        Tone::Success => "+",
        Tone::Failure => "!",
    };
    println!("{} {}", marker, line.text);
}

fn print_summary(summary: &AfkResultSummary, catalog: &Catalog) {
    println!("== AFK results ==");
    for line in summary.report_lines(catalog) {
        println!("  {}", line);
    }
    println!();
}

fn print_status(state: &PlayerState, catalog: &Catalog) {
    println!(
        "Level {} ({}/{} XP)  Gold {}  Energy {}/{}  HP {}/{}",
        state.level,
        state.xp,
        xp_required_for_level(state.level),
        state.gold,
        state.energy,
        state.max_energy,
        state.hp,
        state.max_hp
    );
    if let Some(path) = &state.path {
        println!("Path: {}", catalog.path(path).map(|p| p.label.as_str()).unwrap_or(path));
    }
    println!(
        "Location: {}  Doing: {}",
        catalog.location_label(&state.current_location),
        state
            .current_action
            .as_deref()
            .map(|id| catalog.action(id).map(|a| a.label.as_str()).unwrap_or(id))
            .unwrap_or("nothing")
    );

    let actions: Vec<&str> = catalog
        .actions_at(&state.current_location)
        .map(|a| a.id.as_str())
        .collect();
    println!("Actions here: {}", actions.join(", "));

    let places: Vec<String> = state
        .locations
        .iter()
        .map(|l| {
            format!(
                "{} {}%",
                catalog.location_label(&l.location_id),
                l.exploration_percentage
            )
        })
        .collect();
    println!("Discovered: {}", places.join(", "));

    println!("Inventory ({}/{}):", state.inventory.len(), NOMINAL_CAPACITY);
    for entry in state.inventory.iter() {
        println!("  {} x{}", catalog.item_name(&entry.item_id), entry.quantity);
    }
    for quest in &state.quests {
        let name = catalog
            .quest(&quest.quest_id)
            .map(|q| q.name.as_str())
            .unwrap_or(&quest.quest_id);
        let status = if quest.is_complete { "done" } else { "active" };
        println!("Quest: {} {}/{} ({})", name, quest.step, quest.max_step, status);
    }

    println!("Messages:");
    let recent: Vec<&LogLine> = state.messages.iter().collect();
    for line in recent.into_iter().rev() {
        print_line(line);
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity raises the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Warn);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config.as_ref().and_then(|c| c.logging.file.clone());
    let opened = file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    if let Some(f) = opened {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when a person is watching
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
