//! Property tests for effect stacking, poison kills, splitting, the drone
//! oscillator, destroy/apply ordering and replay determinism.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

use tankwar::config::{SimConfig, MAX_SLOW};
use tankwar::core::fixed::{fixed_mul, wrap_angle, Fixed, FIXED_ONE};
use tankwar::game::ai::{AiController, AiMotionState, MotionContext};
use tankwar::game::barrel::{BarrelDefinition, BarrelRef, SplitParams, StatLevels};
use tankwar::game::effect::{ApplyOutcome, EffectKind};
use tankwar::game::entity::{DestroyCause, EntityHandle, TankBody};
use tankwar::game::events::GameEventData;
use tankwar::game::input::InputFrame;
use tankwar::game::projectile::{LaunchParams, Projectile};
use tankwar::game::status::{apply_poison, apply_slow, process_effects, reassert_slow};
use tankwar::game::tick::{replay, tick};
use tankwar::game::world::World;
use tankwar::FixedVec2;

fn spread_tanks(world: &mut World, n: usize) -> Vec<EntityHandle> {
    (0..n)
        .map(|i| world.spawn_tank(TankBody::new(i as u32, FixedVec2::from_ints(i as i32 * 40, 0))))
        .collect()
}

fn expected_speed(base: Fixed, stacks: i32, ratio: Fixed) -> Fixed {
    let slow = (stacks * ratio).min(MAX_SLOW);
    fixed_mul(base, FIXED_ONE - slow)
}

// =============================================================================
// SLOW STACKING
// =============================================================================

proptest! {
    #[test]
    fn prop_slow_composes_and_recomputes(
        sources in 2usize..7,
        ratio in 3_000i32..30_000,
        base in 20_000i32..200_000,
    ) {
        let config = SimConfig::default();
        let mut world = World::new(1);
        let tanks = spread_tanks(&mut world, sources + 1);
        let target = tanks[0];
        world.tank_mut(target).unwrap().movement_speed = base;

        for &source in &tanks[1..] {
            let outcome = apply_slow(&mut world, target, source, ratio, 100, None, &config.effects);
            prop_assert_eq!(outcome, ApplyOutcome::NewStack);
        }
        let n = sources as i32;
        prop_assert_eq!(world.tank(target).unwrap().movement_speed, expected_speed(base, n, ratio));

        // Dropping one source recomputes with n - 1 stacks
        let removed = world.effects.remove(target, tanks[1], EffectKind::Slow).unwrap();
        prop_assert_eq!(removed.remaining_stacks, sources - 1);
        prop_assert!(removed.restore.is_none());
        reassert_slow(&mut world, target, config.effects.max_slow);
        prop_assert_eq!(world.tank(target).unwrap().movement_speed, expected_speed(base, n - 1, ratio));
    }

    #[test]
    fn prop_refresh_never_adds_stacks(repeats in 1usize..10, ratio in 3_000i32..30_000) {
        let config = SimConfig::default();
        let mut world = World::new(2);
        let tanks = spread_tanks(&mut world, 2);

        for _ in 0..repeats {
            apply_slow(&mut world, tanks[0], tanks[1], ratio, 30, None, &config.effects);
        }
        prop_assert_eq!(world.effects.stack_count(tanks[0], EffectKind::Slow), 1);
        prop_assert_eq!(world.tank(tanks[0]).unwrap().movement_speed, expected_speed(FIXED_ONE, 1, ratio));
    }
}

// =============================================================================
// POISON
// =============================================================================

proptest! {
    #[test]
    fn prop_poison_kills_once_on_threshold_tick(
        health in 30_000i32..1_000_000,
        damage in 3_000i32..100_000,
        sources in 1usize..4,
    ) {
        let config = SimConfig::default();
        let mut world = World::new(3);
        let tanks = spread_tanks(&mut world, 1 + 2 * sources);
        let victim = tanks[0];
        world.tank_mut(victim).unwrap().health = health;

        // Each poison stack credits a different shooter
        let per_tick = damage as i64 * sources as i64;
        let death_tick = ((health as i64 + per_tick - 1) / per_tick) as u32;
        for i in 0..sources {
            let (shooter, bullet) = (tanks[1 + 2 * i], tanks[2 + 2 * i]);
            apply_poison(&mut world, victim, bullet, damage, death_tick + 10, Some(shooter));
        }
        world.take_events();

        let mut kill_events = 0;
        for t in 1..=death_tick + 5 {
            world.tick = t;
            process_effects(&mut world, &config.effects);
            kill_events += world
                .take_events()
                .iter()
                .filter(|e| matches!(e.data, GameEventData::EntityKilled { .. }))
                .count();
            prop_assert_eq!(world.exists(victim), t < death_tick, "tick {}", t);
        }

        prop_assert_eq!(kill_events, 1);
        let credits: u32 = tanks[1..].iter().filter_map(|&h| world.tank(h)).map(|t| t.kills).sum();
        prop_assert_eq!(credits, 1);
        prop_assert!(!world.effects.has_effects(victim));
    }
}

// =============================================================================
// SPLITTING
// =============================================================================

proptest! {
    #[test]
    fn prop_split_generations_are_bounded(max in 0u32..5, count in 1u32..5, seed in any::<u64>()) {
        let config = SimConfig::default();
        let mut world = World::with_config(seed, &config);
        let params = SplitParams {
            max_split_count: max,
            split_bullet_count: count,
            ..SplitParams::default()
        };
        let barrel = BarrelDefinition::splitter(params, 1);
        let tank = world.spawn_tank(TankBody::new(1, FixedVec2::ZERO).with_barrel(barrel.clone()));
        let launch = LaunchParams {
            owner: tank,
            barrel: BarrelRef { holder: tank, index: 0 },
            team: 1,
            position: FixedVec2::from_ints(30, 0),
            angle: 0,
            stat_levels: StatLevels::default(),
        };
        world.spawn_projectile(Projectile::launch(&barrel.projectile, launch, 0, &config));

        for generation in 1..=max + 1 {
            for handle in world.live_projectiles() {
                world.destroy(handle, DestroyCause::Killed);
            }
            let live = world.live_projectiles();
            let expected = if generation <= max { count.pow(generation) as usize } else { 0 };
            prop_assert_eq!(live.len(), expected, "generation {}", generation);
            for handle in live {
                let projectile = world.projectile(handle).unwrap();
                prop_assert_eq!(projectile.generation(), generation);
                prop_assert!(!projectile.counts_toward_drones);
            }
            prop_assert_eq!(world.tank(tank).unwrap().barrels[0].drone_count, 0);
        }
    }
}

#[test]
fn test_split_two_by_two() {
    let config = SimConfig::default();
    let mut world = World::with_config(9, &config);
    let barrel = BarrelDefinition::splitter(SplitParams::default(), 1);
    let tank = world.spawn_tank(TankBody::new(1, FixedVec2::ZERO).with_barrel(barrel.clone()));
    let launch = LaunchParams {
        owner: tank,
        barrel: BarrelRef { holder: tank, index: 0 },
        team: 1,
        position: FixedVec2::from_ints(30, 0),
        angle: 0,
        stat_levels: StatLevels::default(),
    };
    world.spawn_projectile(Projectile::launch(&barrel.projectile, launch, 0, &config));

    let mut counts = Vec::new();
    for _ in 0..3 {
        for handle in world.live_projectiles() {
            world.destroy(handle, DestroyCause::Expired);
        }
        counts.push(world.live_projectiles().len());
    }
    assert_eq!(counts, vec![2, 4, 0]);
}

// =============================================================================
// CLEAR
// =============================================================================

proptest! {
    #[test]
    fn prop_clear_twice_is_noop(base in 20_000i32..200_000, stacks in 1usize..5) {
        let config = SimConfig::default();
        let mut world = World::new(4);
        let tanks = spread_tanks(&mut world, stacks + 1);
        let target = tanks[0];
        world.tank_mut(target).unwrap().movement_speed = base;

        for &source in &tanks[1..] {
            apply_slow(&mut world, target, source, 16_384, 50, None, &config.effects);
        }
        apply_poison(&mut world, target, tanks[1], 100, 50, None);

        prop_assert_eq!(world.clear_effects(target), stacks + 1);
        prop_assert_eq!(world.tank(target).unwrap().movement_speed, base);
        prop_assert_eq!(world.clear_effects(target), 0);
        prop_assert_eq!(world.tank(target).unwrap().movement_speed, base);
        prop_assert!(world.effects.is_empty());
    }
}

// =============================================================================
// OSCILLATOR
// =============================================================================

proptest! {
    #[test]
    fn prop_resting_at_owner_never_diverges(ticks in 1usize..500, start in -200_000i32..200_000) {
        let config = SimConfig::default();
        let mut ai = AiController::new(true, config.drone.view_range);
        let mut heading = wrap_angle(start);

        for _ in 0..ticks {
            let ctx = MotionContext {
                position: FixedVec2::ZERO,
                heading,
                owner_position: FixedVec2::ZERO,
                owner_size: TankBody::DEFAULT_SIZE,
                owner_input: Some(InputFrame::new()),
                target_position: None,
            };
            let out = ai.update(&ctx, &config.drone);
            prop_assert_eq!(ai.state, AiMotionState::IdleResting);
            prop_assert!(ai.rest_cycle);
            prop_assert_eq!(out.accel_divisor, config.drone.rest_accel_divisor);
            // Advances by exactly the base drift, modulo a full turn
            prop_assert_eq!(out.heading, wrap_angle(heading + config.drone.rest_drift_base));
            heading = out.heading;
        }
    }
}

// =============================================================================
// DESTROY / APPLY ORDERING
// =============================================================================

proptest! {
    #[test]
    fn prop_destroy_apply_order_is_consistent(destroy_first in any::<bool>(), ratio in 3_000i32..50_000) {
        let config = SimConfig::default();
        let mut world = World::new(5);
        let tanks = spread_tanks(&mut world, 2);
        let (target, source) = (tanks[0], tanks[1]);

        if destroy_first {
            let removed = world.destroy(target, DestroyCause::Forced).unwrap();
            let outcome = apply_slow(&mut world, target, source, ratio, 20, None, &config.effects);
            prop_assert_eq!(outcome, ApplyOutcome::StaleTarget);
            prop_assert_eq!(removed.as_tank().unwrap().movement_speed, FIXED_ONE);
        } else {
            apply_slow(&mut world, target, source, ratio, 20, None, &config.effects);
            let removed = world.destroy(target, DestroyCause::Forced).unwrap();
            // Baseline written back before the entity left the arena
            prop_assert_eq!(removed.as_tank().unwrap().movement_speed, FIXED_ONE);
        }

        prop_assert!(world.effects.is_empty());
        world.tick += 25;
        process_effects(&mut world, &config.effects);
        prop_assert!(!world.exists(target));
        prop_assert_eq!(world.tank(source).unwrap().movement_speed, FIXED_ONE);
    }
}

// =============================================================================
// DETERMINISM
// =============================================================================

fn random_inputs(rng: &mut StdRng, tanks: &[EntityHandle]) -> BTreeMap<EntityHandle, InputFrame> {
    tanks
        .iter()
        .map(|&h| {
            let mut frame = InputFrame::with_movement(rng.gen_range(-127..=127), rng.gen_range(-127..=127))
                .aiming_at(FixedVec2::from_ints(rng.gen_range(-80..=80), rng.gen_range(-80..=80)));
            frame.set_shoot(rng.gen_bool(0.7));
            frame.set_repel(rng.gen_bool(0.1));
            (h, frame)
        })
        .collect()
}

fn arena(seed: u64) -> (World, Vec<EntityHandle>) {
    let config = SimConfig::default();
    let mut world = World::with_config(seed, &config);
    let tanks = vec![
        world.spawn_tank(
            TankBody::new(1, FixedVec2::from_ints(-40, 0))
                .with_barrel(BarrelDefinition::frozen())
                .with_barrel(BarrelDefinition::drone_spawner(3)),
        ),
        world.spawn_tank(
            TankBody::new(2, FixedVec2::from_ints(40, 0))
                .with_barrel(BarrelDefinition::poison())
                .with_barrel(BarrelDefinition::splitter(SplitParams::default(), 2)),
        ),
    ];
    (world, tanks)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_replay_matches_live_run(seed in any::<u64>(), input_seed in any::<u64>()) {
        let config = SimConfig::default();
        let (initial, tanks) = arena(seed);
        let mut rng = StdRng::seed_from_u64(input_seed);

        let mut live = initial.clone();
        let mut recorded = Vec::new();
        for _ in 0..240 {
            let inputs = random_inputs(&mut rng, &tanks);
            tick(&mut live, &inputs, &config);
            recorded.push(inputs);
        }

        let (replayed, _) = replay(initial, &recorded, 240, &config);
        prop_assert_eq!(replayed.compute_hash(), live.compute_hash());
    }
}
