//! Simulation World
//!
//! Owns every entity, the effect registry, the collision grid and the
//! event queue. Uses slot order and BTreeMap for deterministic iteration.

use slotmap::SlotMap;
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::core::hash::{StateHash, compute_state_hash};
use crate::core::rng::DeterministicRng;
use crate::error::SimError;
use crate::game::barrel::{Barrel, BarrelRef};
use crate::game::collision::SpatialGrid;
use crate::game::effect::EffectRegistry;
use crate::game::entity::{DestroyCause, Entity, EntityHandle, Positionable, TankBody};
use crate::game::events::GameEvent;
use crate::game::projectile::{Projectile, ProjectilePhase};
use crate::game::split;
use crate::game::status::restore_baseline;

/// Complete simulation state.
#[derive(Clone, Debug)]
pub struct World {
    /// Current tick (0 until the first tick runs)
    pub tick: u32,

    /// Seed the RNG started from
    pub rng_seed: u64,

    /// Deterministic RNG (split jitter)
    pub rng: DeterministicRng,

    /// Active status effects
    pub effects: EffectRegistry,

    /// Broad-phase index, rebuilt once per tick
    pub grid: SpatialGrid,

    entities: SlotMap<EntityHandle, Entity>,

    pending_events: Vec<GameEvent>,
}

impl World {
    /// Empty world with default configuration.
    pub fn new(rng_seed: u64) -> Self {
        Self::with_config(rng_seed, &SimConfig::default())
    }

    /// Empty world sized for `config`.
    pub fn with_config(rng_seed: u64, config: &SimConfig) -> Self {
        Self {
            tick: 0,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            effects: EffectRegistry::new(),
            grid: SpatialGrid::new(config.world.grid_cell_size),
            entities: SlotMap::with_key(),
            pending_events: Vec::new(),
        }
    }

    // =========================================================================
    // SPAWNING
    // =========================================================================

    /// Add a tank.
    pub fn spawn_tank(&mut self, tank: TankBody) -> EntityHandle {
        let handle = self.entities.insert(Entity::Tank(tank));
        debug!(?handle, "tank spawned");
        handle
    }

    /// Add a projectile, charging the launching barrel's drone budget if it
    /// counts.
    pub fn spawn_projectile(&mut self, projectile: Projectile) -> EntityHandle {
        let (owner, barrel, counts, generation) = (
            projectile.owner,
            projectile.barrel,
            projectile.counts_toward_drones,
            projectile.generation(),
        );
        let handle = self.entities.insert(Entity::Projectile(projectile));

        if counts {
            if let Some(barrel) = self.barrel_mut(barrel) {
                barrel.drone_count += 1;
            }
        }
        self.push_event(GameEvent::projectile_spawned(self.tick, handle, owner, generation));
        handle
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Handle refers to a live entity.
    #[inline]
    pub fn exists(&self, handle: EntityHandle) -> bool {
        self.entities.contains_key(handle)
    }

    /// Live entity or a stale-target error.
    pub fn require(&self, handle: EntityHandle) -> Result<&Entity, SimError> {
        self.entities.get(handle).ok_or(SimError::StaleTarget(handle))
    }

    /// Entity by handle.
    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.get(handle)
    }

    /// Mutable entity by handle.
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(handle)
    }

    /// Tank by handle.
    pub fn tank(&self, handle: EntityHandle) -> Option<&TankBody> {
        self.get(handle)?.as_tank()
    }

    /// Mutable tank by handle.
    pub fn tank_mut(&mut self, handle: EntityHandle) -> Option<&mut TankBody> {
        self.get_mut(handle)?.as_tank_mut()
    }

    /// Projectile by handle.
    pub fn projectile(&self, handle: EntityHandle) -> Option<&Projectile> {
        self.get(handle)?.as_projectile()
    }

    /// Mutable projectile by handle.
    pub fn projectile_mut(&mut self, handle: EntityHandle) -> Option<&mut Projectile> {
        self.get_mut(handle)?.as_projectile_mut()
    }

    /// Barrel by address.
    pub fn barrel(&self, at: BarrelRef) -> Option<&Barrel> {
        match self.get(at.holder)? {
            Entity::Tank(tank) => tank.barrels.get(at.index),
            Entity::Projectile(projectile) => projectile.sub_barrels.get(at.index),
        }
    }

    /// Mutable barrel by address.
    pub fn barrel_mut(&mut self, at: BarrelRef) -> Option<&mut Barrel> {
        match self.get_mut(at.holder)? {
            Entity::Tank(tank) => tank.barrels.get_mut(at.index),
            Entity::Projectile(projectile) => projectile.sub_barrels.get_mut(at.index),
        }
    }

    /// Snapshot of live projectile handles, ascending.
    pub fn live_projectiles(&self) -> Vec<EntityHandle> {
        let mut handles: Vec<_> = self
            .entities
            .iter()
            .filter(|(_, entity)| entity.as_projectile().is_some())
            .map(|(handle, _)| handle)
            .collect();
        handles.sort();
        handles
    }

    /// Snapshot of live tank handles, ascending.
    pub fn tanks(&self) -> Vec<EntityHandle> {
        let mut handles: Vec<_> = self
            .entities
            .iter()
            .filter(|(_, entity)| entity.as_tank().is_some())
            .map(|(handle, _)| handle)
            .collect();
        handles.sort();
        handles
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Re-insert every live entity into the collision grid.
    pub fn rebuild_collision_index(&mut self) {
        self.grid.clear();
        for (handle, entity) in &self.entities {
            self.grid.insert(handle, entity.position(), entity.size());
        }
    }

    // =========================================================================
    // DESTRUCTION
    // =========================================================================

    /// Remove every effect on `target` and write its baselines back.
    ///
    /// Returns how many stacks were removed; a second call returns 0.
    pub fn clear_effects(&mut self, target: EntityHandle) -> usize {
        let Some(cleared) = self.effects.clear(target) else {
            return 0;
        };
        if let Some(entity) = self.entities.get_mut(target) {
            for (_, baseline) in &cleared.baselines {
                restore_baseline(entity, *baseline);
            }
        }
        let removed = cleared.removed.len();
        debug!(?target, removed, "effects cleared");
        self.push_event(GameEvent::effects_cleared(self.tick, target, removed));
        removed
    }

    /// Kill `victim`, crediting `killer`. Returns false if it was already gone.
    pub fn kill(&mut self, victim: EntityHandle, killer: Option<EntityHandle>, source: EntityHandle) -> bool {
        if !self.exists(victim) {
            return false;
        }

        if let Some(tank) = killer.and_then(|k| self.tank_mut(k)) {
            tank.kills += 1;
        }
        info!(tick = self.tick, ?victim, ?killer, ?source, "entity killed");
        self.push_event(GameEvent::entity_killed(self.tick, victim, killer, source));
        self.destroy(victim, DestroyCause::Killed);
        true
    }

    /// Remove an entity.
    ///
    /// In order: terminal destroys split, effects are cleared and baselines
    /// written back while the entity is still live, the entity leaves the
    /// arena, the launching barrel's drone budget is released.
    pub fn destroy(&mut self, handle: EntityHandle, cause: DestroyCause) -> Option<Entity> {
        let now = self.tick;
        match self.entities.get_mut(handle)? {
            Entity::Projectile(projectile) => projectile.phase = ProjectilePhase::Destroying,
            Entity::Tank(_) => {}
        }

        if cause.is_terminal() {
            split::spawn_children(self, handle);
        }

        self.clear_effects(handle);

        let mut entity = self.entities.remove(handle)?;
        if let Entity::Projectile(projectile) = &mut entity {
            projectile.phase = ProjectilePhase::Removed;
            if projectile.counts_toward_drones {
                if let Some(barrel) = self.barrel_mut(projectile.barrel) {
                    barrel.drone_count = barrel.drone_count.saturating_sub(1);
                }
            }
            self.push_event(GameEvent::projectile_destroyed(now, handle, cause));
        }
        debug!(?handle, ?cause, "entity destroyed");
        Some(entity)
    }

    // =========================================================================
    // HASHING & EVENTS
    // =========================================================================

    /// Compute state hash for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            self.rng.hash_into(hasher);

            // Slot order is identical across runs with the same history
            for (handle, entity) in &self.entities {
                hasher.field(handle);
                entity.hash_into(hasher);
            }

            self.effects.hash_into(hasher);
        })
    }

    /// Take all pending events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================
