//! Tankwar Server
//!
//! Headless driver for the simulation core. Runs a scripted skirmish at a
//! fixed tick rate, then replays the recorded inputs to verify determinism.
//!
//! Environment:
//! - `TANKWAR_CONFIG`: path to a JSON config (defaults when unset)
//! - `TANKWAR_TICKS`: ticks to run (default 1800)
//! - `TANKWAR_SEED`: RNG seed (default 12345)
//! - `TANKWAR_REALTIME`: pace ticks at the configured rate when set
//! - `RUST_LOG`: log filter (default `info`)

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tankwar::{
    SimConfig, VERSION,
    game::{
        barrel::BarrelDefinition,
        entity::{EntityHandle, TankBody},
        events::GameEventData,
        input::{expand_recordings, InputFrame, TankInputBuffer},
        tick::{replay, tick},
        world::World,
    },
    FixedVec2,
};

const DEFAULT_TICKS: u32 = 1800;
const DEFAULT_SEED: u64 = 12345;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let config = SimConfig::from_env().context("failed to load simulation config")?;
    let ticks = env_or("TANKWAR_TICKS", DEFAULT_TICKS)?;
    let seed = env_or("TANKWAR_SEED", DEFAULT_SEED)?;
    let realtime = std::env::var_os("TANKWAR_REALTIME").is_some();

    info!("Tankwar Server v{}", VERSION);
    info!("Tick Rate: {} Hz", config.tick_rate);
    info!("Running {} ticks (seed {}, realtime: {})", ticks, seed, realtime);

    demo_skirmish(&config, ticks, seed, realtime).await;
    Ok(())
}

/// Parse an environment variable, falling back to `default` when unset.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Two teams, one tank per barrel type.
fn setup_world(config: &SimConfig, seed: u64) -> (World, Vec<EntityHandle>) {
    let mut world = World::with_config(seed, config);
    let tanks = vec![
        world.spawn_tank(
            TankBody::new(1, FixedVec2::from_ints(-60, -20)).with_barrel(BarrelDefinition::frozen()),
        ),
        world.spawn_tank(
            TankBody::new(1, FixedVec2::from_ints(-60, 20)).with_barrel(BarrelDefinition::drone_spawner(4)),
        ),
        world.spawn_tank(
            TankBody::new(2, FixedVec2::from_ints(60, -20)).with_barrel(BarrelDefinition::poison()),
        ),
        world.spawn_tank(
            TankBody::new(2, FixedVec2::from_ints(60, 20))
                .with_barrel(BarrelDefinition::splitter(config.split.defaults, 3))
                .with_barrel(BarrelDefinition::launcher(BarrelDefinition::basic())),
        ),
    ];
    (world, tanks)
}

/// Scripted pilot: strafe, aim at the nearest enemy, hold fire.
fn scripted_input(world: &World, tank: EntityHandle, index: usize, t: u32) -> Option<InputFrame> {
    let body = world.tank(tank)?;
    let aim = world
        .tanks()
        .into_iter()
        .filter_map(|h| world.tank(h))
        .filter(|other| other.team != body.team)
        .min_by_key(|other| other.position.distance_squared(body.position))
        .map_or(FixedVec2::ZERO, |enemy| enemy.position);

    let phase = (t as i32 * (index as i32 + 1) * 7) % 254;
    let strafe = (phase - 127) as i8;
    let mut frame = InputFrame::with_movement(0, strafe).aiming_at(aim).shooting();
    // Drone pilot lets the AI take over now and then
    if index == 1 && (t / 120) % 2 == 1 {
        frame.set_shoot(false);
    }
    Some(frame)
}

/// Run the skirmish, then replay it.
async fn demo_skirmish(config: &SimConfig, ticks: u32, seed: u64, realtime: bool) {
    info!("=== Starting Demo Skirmish ===");

    let (mut world, tanks) = setup_world(config, seed);
    let initial = world.clone();
    let mut recordings: Vec<TankInputBuffer> = tanks.iter().map(|&h| TankInputBuffer::new(h)).collect();

    let mut interval = tokio::time::interval(Duration::from_secs(1) / config.tick_rate.max(1));
    let mut total_events = 0;
    let mut kills = 0;

    for _ in 0..ticks {
        if realtime {
            interval.tick().await;
        }

        let next_tick = world.tick + 1;
        let mut inputs = BTreeMap::new();
        for (index, (&handle, recording)) in tanks.iter().zip(recordings.iter_mut()).enumerate() {
            let frame = scripted_input(&world, handle, index, next_tick).unwrap_or_default();
            recording.record(next_tick, frame);
            inputs.insert(handle, frame);
        }

        let result = tick(&mut world, &inputs, config);
        total_events += result.events.len();
        kills += result
            .events
            .iter()
            .filter(|e| matches!(e.data, GameEventData::EntityKilled { .. }))
            .count();

        // Report every 10 seconds
        if world.tick % (config.tick_rate * 10) == 0 {
            info!(
                "Tick {}: {} entities, {} effects, {} events so far",
                world.tick,
                world.entity_count(),
                world.effects.len(),
                total_events
            );
        }
    }

    // Print final results
    info!("=== Skirmish Results ===");
    let hash = world.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));
    info!("Kills: {}, total events: {}", kills, total_events);
    for (index, &handle) in tanks.iter().enumerate() {
        match world.tank(handle) {
            Some(tank) => info!("Tank {}: team {}, {} kills", index, tank.team, tank.kills),
            None => info!("Tank {}: destroyed", index),
        }
    }

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let frames = expand_recordings(&recordings, ticks);
    let (replayed, _) = replay(initial, &frames, ticks, config);
    let replay_hash = replayed.compute_hash();

    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
    } else {
        info!("DETERMINISM FAILURE: Hashes differ!");
    }
}
