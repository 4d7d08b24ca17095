//! Tick throughput on a crowded arena: many tanks firing bullets, drones
//! and splitters, with slow and poison stacks in play.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use tankwar::config::SimConfig;
use tankwar::game::barrel::{BarrelDefinition, SplitParams};
use tankwar::game::entity::{EntityHandle, TankBody};
use tankwar::game::input::InputFrame;
use tankwar::game::tick::tick;
use tankwar::game::world::World;
use tankwar::FixedVec2;

fn crowded_world(config: &SimConfig, tanks_per_team: i32) -> (World, BTreeMap<EntityHandle, InputFrame>) {
    let mut world = World::with_config(7, config);
    let mut inputs = BTreeMap::new();

    for i in 0..tanks_per_team {
        let y = (i - tanks_per_team / 2) * 15;
        let barrels = [
            BarrelDefinition::frozen(),
            BarrelDefinition::poison(),
            BarrelDefinition::drone_spawner(4),
            BarrelDefinition::splitter(SplitParams::default(), 2),
        ];
        let left = world.spawn_tank(
            TankBody::new(1, FixedVec2::from_ints(-50, y)).with_barrel(barrels[(i % 4) as usize].clone()),
        );
        let right = world.spawn_tank(
            TankBody::new(2, FixedVec2::from_ints(50, y)).with_barrel(barrels[((i + 2) % 4) as usize].clone()),
        );
        inputs.insert(left, InputFrame::new().aiming_at(FixedVec2::from_ints(50, y)).shooting());
        inputs.insert(right, InputFrame::new().aiming_at(FixedVec2::from_ints(-50, y)).shooting());
    }

    // Warm up so projectiles and effects are live
    for _ in 0..120 {
        tick(&mut world, &inputs, config);
    }
    (world, inputs)
}

fn bench_tick(c: &mut Criterion) {
    let config = SimConfig::default();

    for tanks_per_team in [8, 32] {
        let (world, inputs) = crowded_world(&config, tanks_per_team);
        c.bench_function(&format!("tick_{}_tanks", tanks_per_team * 2), |b| {
            b.iter_batched(
                || world.clone(),
                |mut w| {
                    let result = tick(&mut w, black_box(&inputs), &config);
                    black_box(result.events.len())
                },
                BatchSize::SmallInput,
            )
        });
    }

    let (world, _) = crowded_world(&config, 32);
    c.bench_function("compute_hash_64_tanks", |b| b.iter(|| black_box(world.compute_hash())));
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
