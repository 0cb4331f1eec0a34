#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a headless Spellfall session.

mod autopilot;
mod summary_token;

use std::{collections::BTreeMap, fs, path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use spellfall_core::{Character, Command, Event, EventSink, GameState, GameSummary};
use spellfall_simulation::{Simulation, SimulationConfig};
use spellfall_world::query;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::autopilot::Autopilot;

/// Runs a seeded autopilot session and prints its outcome as JSON.
#[derive(Debug, Parser)]
#[command(name = "spellfall", version)]
struct Args {
    /// Master seed; overrides the seed in the configuration file.
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated seconds to play before stopping.
    #[arg(long, default_value_t = 120)]
    seconds: u64,
    /// Length of one tick in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// Character to start with.
    #[arg(long, value_enum, default_value_t = CharacterArg::Harry)]
    character: CharacterArg,
    /// JSON configuration file; omitted sections use defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Tracing filter directive written to stderr.
    #[arg(long, default_value = "info")]
    log_filter: String,
    /// Decodes a summary token instead of playing.
    #[arg(long, value_name = "TOKEN")]
    decode: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CharacterArg {
    Harry,
    Hermione,
    Ron,
}

impl From<CharacterArg> for Character {
    fn from(value: CharacterArg) -> Self {
        match value {
            CharacterArg::Harry => Self::Harry,
            CharacterArg::Hermione => Self::Hermione,
            CharacterArg::Ron => Self::Ron,
        }
    }
}

/// Counts published events per tag.
#[derive(Debug, Default)]
struct EventTally {
    counts: BTreeMap<&'static str, usize>,
}

impl EventSink for EventTally {
    fn publish(&mut self, event: &Event) {
        *self.counts.entry(event.tag()).or_default() += 1;
    }
}

#[derive(Debug, Serialize)]
struct Report {
    seed: u64,
    character: &'static str,
    elapsed_ms: u64,
    game_over: bool,
    score: u64,
    summary: Option<GameSummary>,
    token: Option<String>,
    events: BTreeMap<&'static str, usize>,
}

/// Entry point for the Spellfall command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_filter)?;

    if let Some(token) = &args.decode {
        let summary = summary_token::decode(token).context("failed to decode summary token")?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    ensure!(args.tick_ms > 0, "--tick-ms must be greater than zero");
    let mut config = load_config(args.config.as_ref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let seed = config.seed;

    let mut simulation = Simulation::new(config, EventTally::default())
        .context("simulation configuration is invalid")?;
    simulation.submit(Command::StartGame {
        character: args.character.into(),
    });

    let dt = Duration::from_millis(args.tick_ms);
    let ticks = args.seconds.saturating_mul(1_000) / args.tick_ms;
    let mut autopilot = Autopilot::new();
    let mut commands = Vec::new();
    for _ in 0..ticks {
        if query::state(simulation.world()) != GameState::Playing {
            break;
        }
        autopilot.plan(simulation.world(), &mut commands);
        for command in commands.drain(..) {
            simulation.submit(command);
        }
        simulation.step(dt);
    }

    let world = simulation.world();
    let summary = simulation.summary();
    let token = summary
        .as_ref()
        .map(summary_token::encode)
        .transpose()
        .context("failed to encode summary token")?;
    let report = Report {
        seed,
        character: query::character(world).name(),
        elapsed_ms: u64::try_from(query::elapsed(world).as_millis()).unwrap_or(u64::MAX),
        game_over: summary.is_some(),
        score: query::score(world),
        summary,
        token,
        events: std::mem::take(&mut simulation.sink_mut().counts),
    };
    info!(
        score = report.score,
        game_over = report.game_over,
        "session_finished"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log filter '{directive}'"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config '{}'", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse config '{}'", path.display()))
}
