use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use snake_agents::agent::{AgentKind, QLearningAgent, QTable};
use snake_agents::config::Config;
use snake_agents::persist::{FileStore, TableStore};
use snake_agents::train;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "window")]
use snake_agents::session::{Intent, Session};

#[cfg(feature = "window")]
mod draw;
#[cfg(feature = "window")]
mod window;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Windowed game; keyboard or any agent drives
    Play,
    /// Headless Q-learning, checkpointing the table
    Train,
    /// Headless parallel evaluation of one agent
    Eval,
}

#[derive(Debug, Parser)]
#[command(name = "snake-agents", version, about = "Snake driven by search, utility and Q-learning agents")]
struct Cli {
    #[arg(long, value_enum, default_value_t = Mode::Play)]
    mode: Mode,

    /// Agent in control at start (play) or under test (eval)
    #[arg(long, value_enum)]
    agent: Option<AgentKind>,

    #[arg(long)]
    episodes: Option<u32>,

    /// JSON config file; missing keys take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    q_table: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    width: Option<i32>,

    #[arg(long)]
    height: Option<i32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    let store = FileStore::new(config.training.q_table_path.clone());
    info!(mode = ?cli.mode, seed, grid = ?(config.game.width, config.game.height), "starting");

    match cli.mode {
        Mode::Play => play(config, store, cli.agent, seed),
        Mode::Train => {
            let episodes = cli.episodes.unwrap_or(config.training.episodes);
            let mut agent = QLearningAgent::load_or_new(&store, &config, seed);
            let report = train::train(&mut agent, &config, episodes, seed, Some(&store));
            info!(
                episodes = report.episodes,
                mean_reward = report.mean_reward,
                mean_score = report.mean_score,
                best = report.best_score,
                epsilon = report.epsilon,
                states = report.states,
                path = %store.path().display(),
                "training finished"
            );
            Ok(())
        }
        Mode::Eval => {
            let kind = cli.agent.unwrap_or(AgentKind::Utility);
            let episodes = cli.episodes.unwrap_or(100);
            let table = if kind == AgentKind::QLearning { Some(load_table(&store)) } else { None };
            let report = train::evaluate(kind, &config, table.as_ref(), episodes, seed);
            println!("agent:        {:?}", report.kind);
            println!("episodes:     {}", report.episodes);
            println!("mean score:   {:.2}", report.mean_score);
            println!("best score:   {}", report.best_score);
            println!("mean length:  {:.2}", report.mean_length);
            println!("wall hits:    {}", report.walls);
            println!("self hits:    {}", report.self_hits);
            println!("step capped:  {}", report.truncated);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(w) = cli.width {
        config.game.width = w;
    }
    if let Some(h) = cli.height {
        config.game.height = h;
    }
    if let Some(episodes) = cli.episodes {
        config.training.episodes = episodes;
    }
    if let Some(path) = &cli.q_table {
        config.training.q_table_path = path.clone();
    }
    config.validate().context("invalid configuration after command-line overrides")?;
    Ok(config)
}

fn load_table(store: &FileStore) -> QTable {
    match store.load() {
        Ok(Some(table)) => table,
        Ok(None) => {
            warn!(path = %store.path().display(), "no q-table found, evaluating an untrained agent");
            QTable::default()
        }
        Err(err) => {
            warn!(%err, "could not load q-table, evaluating an untrained agent");
            QTable::default()
        }
    }
}

#[cfg(feature = "window")]
fn play(config: Config, store: FileStore, agent: Option<AgentKind>, seed: u64) -> Result<()> {
    let mut session = Session::new(config, Some(store), seed);
    if agent.is_some() {
        session.handle(Intent::SwitchAgent(agent));
    }
    window::run(session)
}

#[cfg(not(feature = "window"))]
fn play(_config: Config, _store: FileStore, _agent: Option<AgentKind>, _seed: u64) -> Result<()> {
    anyhow::bail!("built without the `window` feature; use --mode train or --mode eval")
}
