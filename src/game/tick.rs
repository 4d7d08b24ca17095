//! Authoritative Simulation Tick
//!
//! The fixed-rate driver. Every duration in the simulation is counted in
//! these ticks, and one call advances every entity exactly once.

use std::collections::BTreeMap;

use tracing::warn;
#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::config::SimConfig;
use crate::core::fixed::fixed_clamp;
use crate::core::vec2::FixedVec2;
use crate::game::barrel::fire_barrels;
use crate::game::entity::{DestroyCause, EntityHandle};
use crate::game::events::GameEvent;
use crate::game::input::InputFrame;
use crate::game::projectile::tick_projectile;
use crate::game::status::process_effects;
use crate::game::world::World;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Entities removed by fault isolation
    pub faults: Vec<EntityHandle>,
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `world` - The world (will be mutated)
/// * `inputs` - Tank inputs for this tick (BTreeMap for deterministic order!)
/// * `config` - Simulation configuration
///
/// # Determinism
///
/// This function is 100% deterministic:
/// - Entities are visited in ascending handle order
/// - Uses fixed-point math only
/// - Uses deterministic RNG (world.rng)
/// - No system calls, no floating point
pub fn tick(
    world: &mut World,
    inputs: &BTreeMap<EntityHandle, InputFrame>,
    config: &SimConfig,
) -> TickResult {
    let mut result = TickResult::default();

    // 0. Advance tick counter
    world.tick += 1;

    // 1. Apply pilot inputs
    apply_inputs(world, inputs);

    // 2. Move tanks
    move_tanks(world, config);

    // 3. Rebuild broad phase
    world.rebuild_collision_index();

    // 4. Fire tank barrels
    for tank in world.tanks() {
        fire_barrels(world, tank, config);
    }

    // 5. Tick projectiles, isolating failures
    for handle in world.live_projectiles() {
        // Destroyed earlier this tick
        if !world.exists(handle) {
            continue;
        }
        if let Err(err) = tick_projectile(world, handle, config) {
            warn!(tick = world.tick, ?handle, %err, "projectile faulted, removing");
            let now = world.tick;
            world.push_event(GameEvent::entity_faulted(now, handle, err.to_string()));
            world.destroy(handle, DestroyCause::Faulted);
            result.faults.push(handle);
        }
    }

    // 6. Effects
    process_effects(world, &config.effects);

    #[cfg(feature = "debug-tracing")]
    trace!(
        tick = world.tick,
        entities = world.entity_count(),
        effects = world.effects.len(),
        "tick complete"
    );

    // Collect events
    result.events = world.take_events();

    result
}

/// Store inputs on their tanks and face the aim point.
fn apply_inputs(world: &mut World, inputs: &BTreeMap<EntityHandle, InputFrame>) {
    // BTreeMap iterates in sorted key order - DETERMINISTIC
    for (handle, input) in inputs {
        if let Some(tank) = world.tank_mut(*handle) {
            tank.input = *input;
            if tank.input.aim != tank.position {
                tank.heading = (tank.input.aim - tank.position).angle();
            }
        }
    }
}

/// Move every tank by its (possibly slowed) movement speed.
fn move_tanks(world: &mut World, config: &SimConfig) {
    let extent = config.world.arena_half_extent;
    for handle in world.tanks() {
        let Some(tank) = world.tank_mut(handle) else {
            continue;
        };
        tank.velocity = if tank.input.has_movement() {
            tank.input.move_direction().with_length(tank.movement_speed)
        } else {
            FixedVec2::ZERO
        };
        let next = tank.position + tank.velocity;
        tank.position = FixedVec2::new(
            fixed_clamp(next.x, -extent, extent),
            fixed_clamp(next.y, -extent, extent),
        );
    }
}

/// Replay recorded inputs from an initial world.
///
/// `inputs_per_tick[t]` feeds tick `t + 1`; missing entries mean no input.
/// Returns the final world and every event.
pub fn replay(
    initial: World,
    inputs_per_tick: &[BTreeMap<EntityHandle, InputFrame>],
    ticks: u32,
    config: &SimConfig,
) -> (World, Vec<GameEvent>) {
    let mut world = initial;
    let mut all_events = Vec::new();
    let empty = BTreeMap::new();

    for t in 0..ticks as usize {
        let inputs = inputs_per_tick.get(t).unwrap_or(&empty);
        let result = tick(&mut world, inputs, config);
        all_events.extend(result.events);
    }

    (world, all_events)
}
