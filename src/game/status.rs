//! Status Behaviors
//!
//! The two payload rules that act through the [`EffectRegistry`]:
//!
//! - **Slow** scales the target's movement-speed stat (tanks) or velocity
//!   magnitude (projectiles) by `1 - min(stacks × ratio, cap)`. The stat is
//!   written from the captured baseline on every tick, never compounded.
//! - **Poison** removes a fixed amount of health per tick per stack. The
//!   stack that brings health to zero gets the kill credit.
//!
//! Every step checks that the target still exists before touching it.
//!
//! [`EffectRegistry`]: crate::game::effect::EffectRegistry

use tracing::debug;

use crate::config::EffectsConfig;
use crate::core::fixed::{Fixed, FIXED_ONE, fixed_mul};
use crate::core::vec2::FixedVec2;
use crate::game::barrel::Payload;
use crate::game::effect::{ApplyOutcome, Baseline, EffectKind};
use crate::game::entity::{Damageable, Entity, EntityHandle, PilotInputSource, Positionable};
use crate::game::events::GameEvent;
use crate::game::world::World;

// =============================================================================
// APPLY
// =============================================================================

/// Apply a projectile's payload to `target`.
///
/// Returns None for payload-less projectiles.
pub fn apply_payload(
    world: &mut World,
    target: EntityHandle,
    source: EntityHandle,
    payload: &Payload,
    credit: Option<EntityHandle>,
    config: &EffectsConfig,
) -> Option<ApplyOutcome> {
    match *payload {
        Payload::None => None,
        Payload::Slow { ratio, duration } => {
            Some(apply_slow(world, target, source, ratio, duration, credit, config))
        }
        Payload::Poison { damage, duration } => {
            Some(apply_poison(world, target, source, damage, duration, credit))
        }
    }
}

/// Add or refresh a slow stack and write the slowed stat immediately.
pub fn apply_slow(
    world: &mut World,
    target: EntityHandle,
    source: EntityHandle,
    ratio: Fixed,
    duration: u32,
    credit: Option<EntityHandle>,
    config: &EffectsConfig,
) -> ApplyOutcome {
    let Some(entity) = world.get(target) else {
        debug!(?target, ?source, "slow skipped: stale target");
        return ApplyOutcome::StaleTarget;
    };

    let baseline = match entity {
        Entity::Tank(tank) => Baseline::MovementSpeed(tank.movement_speed),
        Entity::Projectile(projectile) => Baseline::VelocityMagnitude(projectile.velocity.length()),
    };
    world.effects.capture_baseline(target, EffectKind::Slow, baseline);

    let now = world.tick;
    let outcome = world
        .effects
        .apply(target, source, EffectKind::Slow, ratio, duration, now, credit);
    reassert_slow(world, target, config.max_slow);
    emit_outcome(world, target, source, EffectKind::Slow, outcome);
    outcome
}

/// Add or refresh a poison stack.
pub fn apply_poison(
    world: &mut World,
    target: EntityHandle,
    source: EntityHandle,
    damage: Fixed,
    duration: u32,
    credit: Option<EntityHandle>,
) -> ApplyOutcome {
    if !world.exists(target) {
        debug!(?target, ?source, "poison skipped: stale target");
        return ApplyOutcome::StaleTarget;
    }

    let now = world.tick;
    let outcome = world
        .effects
        .apply(target, source, EffectKind::Poison, damage, duration, now, credit);
    emit_outcome(world, target, source, EffectKind::Poison, outcome);
    outcome
}

fn emit_outcome(world: &mut World, target: EntityHandle, source: EntityHandle, kind: EffectKind, outcome: ApplyOutcome) {
    let now = world.tick;
    match outcome {
        ApplyOutcome::NewStack => {
            let stacks = world.effects.stack_count(target, kind);
            debug!(?target, ?source, ?kind, stacks, "effect applied");
            world.push_event(GameEvent::effect_applied(now, target, source, kind, stacks));
        }
        ApplyOutcome::Refreshed => {
            world.push_event(GameEvent::effect_refreshed(now, target, source, kind));
        }
        ApplyOutcome::StaleTarget => {}
    }
}

// =============================================================================
// SLOW
// =============================================================================

/// `1 - slow` as a multiplier.
#[inline]
fn slow_factor(slow: Fixed) -> Fixed {
    FIXED_ONE - slow
}

/// Write the slowed stat from the baseline.
///
/// Does nothing when the target is gone or carries no slow baseline.
pub fn reassert_slow(world: &mut World, target: EntityHandle, max_slow: Fixed) {
    let Some(baseline) = world.effects.baseline(target, EffectKind::Slow) else {
        return;
    };
    let slow = world.effects.composed_magnitude(target, EffectKind::Slow, max_slow);
    let factor = slow_factor(slow);

    let Some(entity) = world.get_mut(target) else {
        return;
    };
    match (entity, baseline) {
        (Entity::Tank(tank), Baseline::MovementSpeed(speed)) => {
            *tank.movement_speed_mut() = fixed_mul(speed, factor);
        }
        (Entity::Projectile(projectile), Baseline::VelocityMagnitude(speed)) => {
            let velocity = projectile.velocity();
            if velocity != FixedVec2::ZERO {
                projectile.set_velocity(velocity.with_length(fixed_mul(speed, factor)));
            }
        }
        _ => {}
    }
}

/// Write a captured baseline back onto an entity.
pub(crate) fn restore_baseline(entity: &mut Entity, baseline: Baseline) {
    match (entity, baseline) {
        (Entity::Tank(tank), Baseline::MovementSpeed(speed)) => {
            *tank.movement_speed_mut() = speed;
        }
        (Entity::Projectile(projectile), Baseline::VelocityMagnitude(speed)) => {
            let velocity = projectile.velocity();
            if velocity != FixedVec2::ZERO {
                projectile.set_velocity(velocity.with_length(speed));
            }
        }
        _ => {}
    }
}

// =============================================================================
// PER-TICK PROCESSING
// =============================================================================

/// Run the per-tick effect steps:
/// 1. Expire stacks, restoring baselines when the last stack of a kind goes
/// 2. Deal poison damage
/// 3. Re-assert slows on every remaining target
pub fn process_effects(world: &mut World, config: &EffectsConfig) {
    let now = world.tick;

    // 1. Expiry
    for expired in world.effects.sweep(now) {
        let effect = expired.effect;
        debug!(
            target = ?effect.target,
            source = ?effect.source,
            kind = ?effect.kind,
            remaining = expired.remaining_stacks,
            "effect expired"
        );
        if let (Some(baseline), Some(entity)) = (expired.restore, world.get_mut(effect.target)) {
            restore_baseline(entity, baseline);
        }
        world.push_event(GameEvent::effect_expired(
            now,
            effect.target,
            effect.source,
            effect.kind,
            expired.remaining_stacks,
        ));
    }

    // 2. Poison
    step_poison(world);

    // 3. Slow
    for target in world.effects.targets() {
        if world.exists(target) {
            reassert_slow(world, target, config.max_slow);
        }
    }
}

/// Deal one tick of poison from every stack.
///
/// A kill purges the target's remaining stacks, from every source, through
/// the world's destroy path.
fn step_poison(world: &mut World) {
    for target in world.effects.targets() {
        for effect in world.effects.effects_of_kind(target, EffectKind::Poison) {
            let Some(entity) = world.get_mut(target) else {
                break;
            };
            if entity.health() <= 0 {
                break;
            }
            let remaining = entity.apply_damage(effect.magnitude);
            if remaining <= 0 {
                world.kill(target, effect.credit, effect.source);
                break;
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
