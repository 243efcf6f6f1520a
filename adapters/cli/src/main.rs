#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Garden Defence session.

mod autopilot;
mod logging;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use garden_defence_core::{Command, Event, GameConfig};
use garden_defence_headless::HeadlessHost;
use garden_defence_world::{self as world, query, SessionSummary, World};
use log::{debug, info, warn};

use autopilot::Autopilot;

/// Runs a scripted Garden Defence session and prints its summary.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file overriding the default game configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Seed for burrow placement and spawn rolls.
    #[arg(short, long, default_value_t = 0x5eed)]
    seed: u64,
    /// Simulated seconds to run for.
    #[arg(long, default_value_t = 180.0)]
    seconds: f32,
    /// Length of one simulation frame in milliseconds.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    GameConfig::from_toml_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn run(config: GameConfig, args: &Args) -> SessionSummary {
    let mut world = World::new(config, args.seed, HeadlessHost::new());
    println!("{}", query::welcome_banner(&world));

    let dt = Duration::from_millis(args.tick_ms);
    let frames = (args.seconds.max(0.0) * 1_000.0 / args.tick_ms as f32).ceil() as u64;
    let mut pilot = Autopilot::new(query::farmer_position(&world), config.player.weapon.range);
    let mut commands = Vec::new();
    let mut events = Vec::new();

    for _ in 0..frames {
        events.clear();
        world::apply(&mut world, Command::Tick { dt }, &mut events);

        commands.clear();
        pilot.observe(&events);
        pilot.steer(&world, dt, &mut commands);
        for command in commands.drain(..) {
            world::apply(&mut world, command, &mut events);
        }

        for event in &events {
            match event {
                Event::TimeAdvanced { .. } | Event::WeaponCoolingDown => {}
                Event::FarmerDefeated => warn!("farmer defeated"),
                other => debug!("{other:?}"),
            }
        }
        if query::is_defeated(&world) {
            break;
        }
    }

    let summary = query::summary(&world);
    world.shutdown();
    summary
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = load_config(args.config.as_ref())?;
    info!(
        "running {}s at {}ms per frame with seed {:#x}",
        args.seconds, args.tick_ms, args.seed
    );
    let summary = run(config, &args);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to encode summary")?
        );
    } else {
        println!(
            "round {} ({:?}) after {:.1}s: {} rabbits spawned, {} shot, {} escaped; \
             {} crops stolen, {} lost, {} recovered, {} left; farmer health {:.0}{}",
            summary.round,
            summary.phase,
            summary.elapsed_secs,
            summary.rabbits_spawned,
            summary.rabbits_killed,
            summary.rabbits_escaped,
            summary.crops_stolen,
            summary.crops_lost,
            summary.drops_recovered,
            summary.crops_remaining,
            summary.farmer_health,
            if summary.defeated { " (defeated)" } else { "" },
        );
    }
    Ok(())
}
