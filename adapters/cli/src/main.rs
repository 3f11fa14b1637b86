#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a stagewalker level headlessly.
//!
//! The adapter plays the part of the surrounding game-state layer: it feeds
//! an autopilot's commands into the world every frame, answers screen-bound
//! crossings with stage transitions, and stops on a game-over request.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use serde::Deserialize;
use stagewalker_core::{Command, Directive, Event, StageCoord};
use stagewalker_world::{apply, query, LevelGrid, SimulationConfig, World};
use tracing_subscriber::EnvFilter;

/// Distance at which the autopilot stops closing in on its target.
const ENGAGE_DISTANCE: f32 = 80.0;

#[derive(Debug, Parser)]
#[command(name = "stagewalker", about = "Runs a stagewalker level headlessly", version)]
struct Cli {
    /// Level file with one row of tile symbols per line.
    level: PathBuf,

    /// TOML scenario with a `[config]` table and `[[directives]]` entries.
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(short, long, default_value_t = 600)]
    frames: u64,

    /// Overrides the configured random seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Stage to start in, as `x,y`.
    #[arg(long, default_value = "0,0", value_parser = parse_stage)]
    stage: StageCoord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Scenario {
    #[serde(default)]
    config: SimulationConfig,
    #[serde(default)]
    directives: Vec<Directive>,
}

/// Outcome printed once the run ends.
#[derive(Debug)]
struct Summary {
    frames: u64,
    stage: StageCoord,
    health: f32,
    ability: String,
    enemies: usize,
    game_over: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut world = build_world(&cli)?;
    println!("{}", query::welcome_banner(&world));

    let summary = run(&mut world, cli.stage, cli.frames)?;
    println!("frames: {}", summary.frames);
    println!("stage: {}", summary.stage);
    println!("health: {}", summary.health);
    println!("ability: {}", summary.ability);
    println!("enemies: {}", summary.enemies);
    if summary.game_over {
        println!("game over");
    }
    Ok(())
}

fn build_world(cli: &Cli) -> Result<World> {
    let scenario = match &cli.scenario {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read scenario {}", path.display()))?;
            toml::from_str::<Scenario>(&text)
                .with_context(|| format!("failed to parse scenario {}", path.display()))?
        }
        None => Scenario::default(),
    };

    let mut config = scenario.config;
    if let Some(seed) = cli.seed {
        config.rng_seed = seed;
    }

    let text = fs::read_to_string(&cli.level)
        .with_context(|| format!("failed to read level {}", cli.level.display()))?;
    let grid = LevelGrid::parse(&text, config.stage_size(), config.tile_size)
        .with_context(|| format!("invalid level {}", cli.level.display()))?;

    World::new(config, grid, scenario.directives).context("failed to create world")
}

fn run(world: &mut World, stage: StageCoord, frames: u64) -> Result<Summary> {
    let mut events = Vec::new();
    apply(world, Command::LoadStage { stage }, &mut events).context("failed to load the starting stage")?;

    let mut game_over = false;
    let mut simulated = 0;
    while simulated < frames && !game_over {
        for command in pilot(world) {
            apply(world, command, &mut events)?;
        }

        events.clear();
        apply(world, Command::Tick, &mut events)?;
        simulated += 1;

        let mut crossing = None;
        for event in &events {
            match event {
                Event::ScreenBoundCrossed { bound } => crossing = Some(*bound),
                Event::GameOverRequested => game_over = true,
                Event::AbilityInherited { ability, .. } => {
                    tracing::info!(%ability, frame = query::frame(world), "ability inherited");
                }
                other => tracing::trace!(?other, "event"),
            }
        }

        if let Some(bound) = crossing {
            events.clear();
            apply(world, Command::EnterStage { bound }, &mut events)
                .with_context(|| format!("no stage beyond the {bound:?} edge"))?;
        }
    }

    let player = query::player(world);
    Ok(Summary {
        frames: simulated,
        stage: query::stage(world),
        health: player.health.unwrap_or_default(),
        ability: query::player_ability(world).to_string(),
        enemies: query::enemies(world).len(),
        game_over,
    })
}

/// Chases the nearest enemy and keeps the ability trigger held while one is alive.
fn pilot(world: &World) -> Vec<Command> {
    let player = query::player(world).position;
    let target = query::enemies(world)
        .into_iter()
        .map(|enemy| enemy.position)
        .min_by(|a, b| a.distance_squared(player).total_cmp(&b.distance_squared(player)));

    match target {
        Some(target) => {
            let offset = target - player;
            let direction = if offset.length() > ENGAGE_DISTANCE {
                offset
            } else {
                Vec2::ZERO
            };
            vec![
                Command::AimPlayer { target },
                Command::SteerPlayer { direction },
                Command::SetPlayerAbilityActive { active: true },
            ]
        }
        None => vec![
            Command::SteerPlayer {
                direction: Vec2::ZERO,
            },
            Command::SetPlayerAbilityActive { active: false },
        ],
    }
}

fn parse_stage(value: &str) -> Result<StageCoord, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, found `{value}`"))?;
    let x = x.trim().parse::<i32>().map_err(|error| error.to_string())?;
    let y = y.trim().parse::<i32>().map_err(|error| error.to_string())?;
    Ok(StageCoord::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_argument_parses_pairs() {
        assert_eq!(parse_stage("1, -2"), Ok(StageCoord::new(1, -2)));
        assert!(parse_stage("3").is_err());
        assert!(parse_stage("a,b").is_err());
    }

    #[test]
    fn scenario_reads_config_and_directives() {
        let scenario: Scenario = toml::from_str(
            r#"
                [config]
                stage_columns = 6
                stage_rows = 4

                [[directives]]
                kind = "arrow_gun"
                stage = { x = 0, y = 0 }
                tile = { column = 4, row = 2 }
                direction = "west"
                firing_delay = 30
            "#,
        )
        .expect("valid scenario");

        assert_eq!(scenario.config.stage_columns, 6);
        assert_eq!(scenario.directives.len(), 1);
    }
}
