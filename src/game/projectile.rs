//! Projectiles
//!
//! Bullets, drones and tank-shaped projectiles share one type. Each runs
//! the same lifecycle:
//!
//! ```text
//! Spawned ──► Active ──► Destroying ──► Removed
//! ```
//!
//! Per active tick, in order:
//! 1. Re-derive input and reload from the owner; orphans are destroyed
//! 2. Steer (AI controller or fixed launch angle) and integrate motion
//! 3. Resolve the first qualifying hit from the collision index
//! 4. Expire once the lifetime has elapsed
//! 5. Tick mounted sub-barrels

use tracing::debug;

use crate::config::SimConfig;
use crate::core::fixed::{Fixed, WideFixed, FIXED_SCALE};
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::error::SimError;
use crate::game::ai::{AiController, MotionContext};
use crate::game::barrel::{fire_barrels, Barrel, BarrelRef, Motion, Payload, ProjectileSpec, StatLevels};
use crate::game::collision::{circles_overlap, CollisionIndex};
use crate::game::entity::{
    AiControllable, Damageable, DestroyCause, EntityHandle, Positionable, TeamId,
};
use crate::game::input::InputFrame;
use crate::game::split::{SplitNode, SplitStats};
use crate::game::status::apply_payload;
use crate::game::world::World;

/// Lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectilePhase {
    /// Created, not yet ticked
    Spawned,
    /// Ticking normally
    Active,
    /// Being torn down; may still split
    Destroying,
    /// Gone from the arena
    Removed,
}

/// Where and for whom a barrel launches a projectile.
#[derive(Clone, Copy, Debug)]
pub struct LaunchParams {
    /// Tank credited with the projectile
    pub owner: EntityHandle,
    /// Launching barrel
    pub barrel: BarrelRef,
    /// Team
    pub team: TeamId,
    /// Muzzle position
    pub position: FixedVec2,
    /// Launch angle
    pub angle: Fixed,
    /// Owner stat levels at launch
    pub stat_levels: StatLevels,
}

/// A live projectile.
#[derive(Clone, Debug)]
pub struct Projectile {
    /// Owning tank
    pub owner: EntityHandle,
    /// Barrel that launched it (or the root's barrel, for split children)
    pub barrel: BarrelRef,
    /// Team
    pub team: TeamId,
    /// Position
    pub position: FixedVec2,
    /// Velocity (units/tick)
    pub velocity: FixedVec2,
    /// Steering heading
    pub heading: Fixed,
    /// Launch angle; ballistic projectiles keep it
    pub movement_angle: Fixed,
    /// Collision radius
    pub size: Fixed,
    /// Health
    pub health: Fixed,
    /// Maximum health
    pub max_health: Fixed,
    /// Contact damage per tick
    pub damage_per_tick: Fixed,
    /// Acceleration before divisors
    pub base_accel: Fixed,
    /// Launch impulse
    pub base_speed: Fixed,
    /// Tick it entered the world
    pub spawn_tick: u32,
    /// Ticks until expiry
    pub life_length: Option<u32>,
    /// Lifecycle phase
    pub phase: ProjectilePhase,
    /// Effect applied on hit
    pub payload: Payload,
    /// Steering model
    pub motion: Motion,
    /// Skip hit detection
    pub only_same_owner_collision: bool,
    /// Drone controller
    pub ai: Option<AiController>,
    /// Split bookkeeping
    pub split: Option<SplitNode>,
    /// Counts against the barrel's drone cap
    pub counts_toward_drones: bool,
    /// Barrels mounted on this projectile
    pub sub_barrels: Vec<Barrel>,
    /// Owner reload, copied every tick
    pub reload_ticks: u32,
    /// Owner input, copied every tick
    pub input: InputFrame,
}

impl Projectile {
    /// Build a projectile from an attached barrel's spec.
    ///
    /// The spec is used as is; clamping happened when the barrel was mounted.
    pub fn launch(spec: &ProjectileSpec, params: LaunchParams, now: u32, config: &SimConfig) -> Self {
        let payload = spec.payload.scaled(&params.stat_levels, config);

        let drone = matches!(spec.motion, Motion::Drone { .. });
        let ai = match spec.motion {
            Motion::Drone { can_control } => Some(AiController::new(can_control, config.drone.view_range)),
            Motion::Ballistic => None,
        };
        let split = spec.split.map(|params| {
            let stats = SplitStats {
                health: spec.health,
                damage: spec.damage,
                accel: spec.accel,
            };
            SplitNode::root(&params, stats, &config.split)
        });

        Self {
            owner: params.owner,
            barrel: params.barrel,
            team: params.team,
            position: params.position,
            velocity: FixedVec2::ZERO,
            heading: params.angle,
            movement_angle: params.angle,
            size: spec.size,
            health: spec.health,
            max_health: spec.health,
            damage_per_tick: spec.damage,
            base_accel: spec.accel,
            base_speed: spec.speed,
            spawn_tick: now,
            life_length: spec.life_length,
            phase: ProjectilePhase::Spawned,
            payload,
            motion: spec.motion,
            only_same_owner_collision: spec.only_same_owner_collision,
            ai,
            split,
            counts_toward_drones: drone,
            sub_barrels: spec.sub_barrels.iter().cloned().map(Barrel::from_sanitized).collect(),
            reload_ticks: 0,
            input: InputFrame::new(),
        }
    }

    /// Split generation (0 for roots).
    pub fn generation(&self) -> u32 {
        self.split.as_ref().map_or(0, |node| node.split_count)
    }

    /// Lifetime has run out at `now`.
    pub fn is_expired(&self, now: u32) -> bool {
        self.life_length
            .is_some_and(|life| now.saturating_sub(self.spawn_tick) >= life)
    }

    /// Hash for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher
            .field(self.owner)
            .field(self.team)
            .field(self.position)
            .field(self.velocity)
            .field(self.heading)
            .field(self.size)
            .field(self.health)
            .field(self.spawn_tick)
            .field(self.generation())
            .field(self.ai.as_ref().map(|ai| ai.state as u8))
            .field(self.ai.as_ref().map(|ai| ai.rest_cycle))
            .field(self.ai.as_ref().and_then(|ai| ai.target));
        for barrel in &self.sub_barrels {
            hasher.field(barrel.reload_timer);
        }
    }

    /// Steer and move one tick.
    fn integrate(
        &mut self,
        owner_position: FixedVec2,
        owner_size: Fixed,
        target_position: Option<FixedVec2>,
        config: &SimConfig,
    ) {
        let mut divisor = 1;
        if let Some(ai) = self.ai.as_mut() {
            let ctx = MotionContext {
                position: self.position,
                heading: self.heading,
                owner_position,
                owner_size,
                owner_input: Some(self.input),
                target_position,
            };
            let out = ai.update(&ctx, &config.drone);
            self.heading = out.heading;
            divisor = out.accel_divisor.max(1);
        }

        let accel = self.base_accel / divisor;
        self.velocity = self.velocity.scale(config.physics.friction)
            + FixedVec2::from_angle(self.heading).scale(accel);
        self.position = self.position + self.velocity;
    }
}

impl Positionable for Projectile {
    fn position(&self) -> FixedVec2 {
        self.position
    }
    fn velocity(&self) -> FixedVec2 {
        self.velocity
    }
    fn set_velocity(&mut self, velocity: FixedVec2) {
        self.velocity = velocity;
    }
    fn size(&self) -> Fixed {
        self.size
    }
    fn heading(&self) -> Fixed {
        self.heading
    }
}

impl Damageable for Projectile {
    fn health(&self) -> Fixed {
        self.health
    }
    fn max_health(&self) -> Fixed {
        self.max_health
    }
    fn contact_damage(&self) -> Fixed {
        self.damage_per_tick
    }
    fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        self.health = self.health.saturating_sub(amount);
        self.health
    }
}

impl AiControllable for Projectile {
    fn controller(&self) -> Option<&AiController> {
        self.ai.as_ref()
    }
    fn controller_mut(&mut self) -> Option<&mut AiController> {
        self.ai.as_mut()
    }
    fn base_accel(&self) -> Fixed {
        self.base_accel
    }
}

// =============================================================================
// TICK
// =============================================================================

/// Run one tick of the projectile at `handle`.
///
/// Errors are isolated by the driver, which force-destroys the projectile.
pub fn tick_projectile(world: &mut World, handle: EntityHandle, config: &SimConfig) -> Result<(), SimError> {
    let now = world.tick;

    // 1. Re-derive input and reload from the owner
    let (owner, barrel) = {
        let projectile = world.projectile(handle).ok_or(SimError::MissingEntity(handle))?;
        (projectile.owner, projectile.barrel)
    };
    let Some(owner_tank) = world.tank(owner) else {
        debug!(?handle, ?owner, "owner gone");
        world.destroy(handle, DestroyCause::OwnerLost);
        return Ok(());
    };
    let (owner_input, owner_reload, owner_position, owner_size) =
        (owner_tank.input, owner_tank.reload_ticks, owner_tank.position, owner_tank.size);
    if world.barrel(barrel).is_none() {
        debug!(?handle, ?barrel, "launching barrel gone");
        world.destroy(handle, DestroyCause::OwnerLost);
        return Ok(());
    }

    // 2. Steer and move
    let target = acquire_target(world, handle, owner_position);
    {
        let projectile = world.projectile_mut(handle).ok_or(SimError::MissingEntity(handle))?;
        projectile.input = owner_input;
        projectile.reload_ticks = owner_reload;
        if projectile.phase == ProjectilePhase::Spawned {
            projectile.phase = ProjectilePhase::Active;
            projectile.velocity = projectile.velocity
                + FixedVec2::from_angle(projectile.movement_angle).scale(projectile.base_speed);
        }
        if let Some(ai) = projectile.ai.as_mut() {
            ai.target = target.map(|(h, _)| h);
        }
        projectile.integrate(owner_position, owner_size, target.map(|(_, p)| p), config);

        let limit = config.world.position_limit;
        let p = projectile.position;
        if p.x.unsigned_abs() > limit.unsigned_abs() || p.y.unsigned_abs() > limit.unsigned_abs() {
            return Err(SimError::OutOfBounds { handle, x: p.x, y: p.y });
        }
    }

    // 3. Hits
    if resolve_hit(world, handle, config) {
        return Ok(());
    }

    // 4. Lifetime
    if world.projectile(handle).is_some_and(|p| p.is_expired(now)) {
        world.destroy(handle, DestroyCause::Expired);
        return Ok(());
    }

    // 5. Sub-barrels
    fire_barrels(world, handle, config);

    Ok(())
}

/// Nearest enemy tank within view range of the owner.
///
/// Skipped while the pilot is steering.
fn acquire_target(world: &World, handle: EntityHandle, owner_position: FixedVec2) -> Option<(EntityHandle, FixedVec2)> {
    let projectile = world.projectile(handle)?;
    let ai = projectile.ai.as_ref()?;
    if ai.pilot_active(world.tank(projectile.owner).map(|t| &t.input)) || ai.view_range <= 0 {
        return None;
    }

    let range = ai.view_range;
    let range_wide = range as WideFixed;
    let range_sq = (range_wide * range_wide) >> FIXED_SCALE;
    let candidates = world.grid.retrieve(
        owner_position.x.saturating_sub(range),
        owner_position.y.saturating_sub(range),
        range.saturating_mul(2),
        range.saturating_mul(2),
    );

    let mut best: Option<(EntityHandle, FixedVec2, WideFixed)> = None;
    for candidate in candidates {
        let Some(tank) = world.tank(candidate) else {
            continue;
        };
        if tank.team == projectile.team || !tank.is_alive() {
            continue;
        }
        if tank.position.distance_squared(owner_position) > range_sq {
            continue;
        }
        let dist = tank.position.distance_squared(projectile.position);
        match best {
            // Ties keep the lower handle
            Some((_, _, closest)) if dist >= closest => {}
            _ => best = Some((candidate, tank.position, dist)),
        }
    }

    best.map(|(h, p, _)| (h, p))
}

/// Resolve the first qualifying hit. Returns true if the projectile died.
fn resolve_hit(world: &mut World, handle: EntityHandle, config: &SimConfig) -> bool {
    let Some(projectile) = world.projectile(handle) else {
        return true;
    };
    if projectile.only_same_owner_collision {
        return false;
    }
    let (owner, team, position, size, damage, payload) = (
        projectile.owner,
        projectile.team,
        projectile.position,
        projectile.size,
        projectile.damage_per_tick,
        projectile.payload,
    );

    let candidates = world.grid.retrieve(
        position.x.saturating_sub(size),
        position.y.saturating_sub(size),
        size.saturating_mul(2),
        size.saturating_mul(2),
    );
    let hit = candidates.into_iter().find(|&candidate| {
        candidate != handle
            && candidate != owner
            && world.get(candidate).is_some_and(|entity| {
                entity.team() != team
                    && entity.is_alive()
                    && circles_overlap(position, size, entity.position(), entity.size())
            })
    });
    let Some(target) = hit else {
        return false;
    };

    // Exchange contact damage
    let (target_health, target_contact) = match world.get_mut(target) {
        Some(entity) => {
            let contact = entity.contact_damage();
            (entity.apply_damage(damage), contact)
        }
        None => return false,
    };
    let own_health = world
        .get_mut(handle)
        .map_or(0, |entity| entity.apply_damage(target_contact));

    if target_health <= 0 {
        world.kill(target, Some(owner), handle);
    } else {
        apply_payload(world, target, handle, &payload, Some(owner), &config.effects);
    }

    if own_health <= 0 {
        world.destroy(handle, DestroyCause::Killed);
        return true;
    }
    false
}

// =============================================================================
// TESTS
// =============================================================================
