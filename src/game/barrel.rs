//! Barrels and Projectile Definitions
//!
//! A barrel is a launcher mounted on a tank or on a tank-shaped projectile.
//! Its `BarrelDefinition` describes what it fires; the runtime `Barrel`
//! tracks reload and the drone budget.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::config::{fixed_serde, clamp_count, clamp_fixed, ConfigWarning, SimConfig,
    MAX_SLOW, MAX_SPLIT_BULLETS, MAX_SPLIT_DEPTH};
use crate::core::fixed::{
    Fixed, FIXED_ONE, FIXED_SIXTH_PI, fixed_mul, from_int, to_fixed, wrap_angle,
};
use crate::core::vec2::FixedVec2;
use crate::game::entity::{Entity, EntityHandle, TeamId};
use crate::game::projectile::{LaunchParams, Projectile};
use crate::game::world::World;

// =============================================================================
// STAT SCALING
// =============================================================================

/// Upgradeable tank stats that projectile properties scale with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatKind {
    /// Bullet damage level
    BulletDamage,
    /// Bullet penetration (bullet health) level
    BulletPenetration,
    /// Body damage level
    BodyDamage,
}

/// Stat levels of a tank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLevels {
    /// Bullet damage level
    pub bullet_damage: u8,
    /// Bullet penetration level
    pub bullet_penetration: u8,
    /// Body damage level
    pub body_damage: u8,
}

impl StatLevels {
    /// Level of one stat.
    pub fn level(&self, stat: StatKind) -> u32 {
        match stat {
            StatKind::BulletDamage => self.bullet_damage as u32,
            StatKind::BulletPenetration => self.bullet_penetration as u32,
            StatKind::BodyDamage => self.body_damage as u32,
        }
    }
}

/// Linear stat curve: `base × (1 + level × per_level)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatScaling {
    /// Stat whose level drives the curve
    pub stat: StatKind,
    /// Growth per level (0 disables the curve)
    #[serde(with = "fixed_serde")]
    pub per_level: Fixed,
}

impl StatScaling {
    /// Create a scaling curve.
    pub const fn new(stat: StatKind, per_level: Fixed) -> Self {
        Self { stat, per_level }
    }

    /// Multiplier for the given stat levels.
    pub fn factor(&self, levels: &StatLevels) -> Fixed {
        let level = from_int(levels.level(self.stat) as i32);
        FIXED_ONE.saturating_add(fixed_mul(level, self.per_level))
    }

    /// Scale a fixed-point base value.
    pub fn apply(&self, base: Fixed, levels: &StatLevels) -> Fixed {
        fixed_mul(base, self.factor(levels))
    }

    /// Scale a duration in ticks. Never returns less than one tick.
    pub fn apply_ticks(&self, base: u32, levels: &StatLevels) -> u32 {
        let scaled = (base as i64 * self.factor(levels) as i64) >> 16;
        scaled.clamp(1, u32::MAX as i64) as u32
    }
}

// =============================================================================
// PROJECTILE SPEC
// =============================================================================

/// Status effect carried by a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Plain bullet
    None,
    /// Frozen bullet: stacking movement slow
    Slow {
        /// Slow per stack (0.3 = 30%)
        #[serde(with = "fixed_serde")]
        ratio: Fixed,
        /// Ticks each stack lasts
        duration: u32,
    },
    /// Poison bullet: damage per tick
    Poison {
        /// Health removed per tick
        #[serde(with = "fixed_serde")]
        damage: Fixed,
        /// Ticks the poison lasts
        duration: u32,
    },
}

impl Payload {
    /// Scale by the firing tank's stat levels.
    pub fn scaled(self, levels: &StatLevels, config: &SimConfig) -> Self {
        let effects = &config.effects;
        match self {
            Payload::None => Payload::None,
            // Scaled values stay inside the sanitized bounds
            Payload::Slow { ratio, duration } => Payload::Slow {
                ratio: effects.slow_ratio.apply(ratio, levels).clamp(0, MAX_SLOW),
                duration: effects.slow_duration.apply_ticks(duration, levels),
            },
            Payload::Poison { damage, duration } => Payload::Poison {
                damage: effects.poison_damage.apply(damage, levels).max(0),
                duration: effects.poison_duration.apply_ticks(duration, levels),
            },
        }
    }

    /// Clamp into safe ranges.
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        match self {
            Payload::None => {}
            Payload::Slow { ratio, duration } => {
                clamp_fixed(&mut warnings, "payload.slow.ratio", ratio, 0, MAX_SLOW);
                clamp_count(&mut warnings, "payload.slow.duration", duration, 1, u32::MAX);
            }
            Payload::Poison { damage, duration } => {
                clamp_fixed(&mut warnings, "payload.poison.damage", damage, 0, Fixed::MAX);
                clamp_count(&mut warnings, "payload.poison.duration", duration, 1, u32::MAX);
            }
        }
        warnings
    }
}

/// How a projectile steers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Motion {
    /// Flies along its launch angle
    Ballistic,
    /// AI-steered, tethered to its owner
    Drone {
        /// Owner's shoot/repel input takes over steering
        can_control: bool,
    },
}

/// What a splitting projectile leaves behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitChild {
    /// Smaller copies of the parent, which may split again
    #[default]
    Same,
    /// Inert ballistic traps dropped where the parent died
    Trap {
        /// Share of the parent's lifetime
        #[serde(with = "fixed_serde")]
        life_factor: Fixed,
        /// Share of the parent's size
        #[serde(with = "fixed_serde")]
        size_factor: Fixed,
        /// Launch impulse (units/tick)
        #[serde(with = "fixed_serde")]
        impulse: Fixed,
    },
}

impl SplitChild {
    /// Traps with half the parent's lifetime and a fifth of its size.
    pub fn trap() -> Self {
        SplitChild::Trap {
            life_factor: to_fixed(0.5),
            size_factor: to_fixed(0.2),
            impulse: to_fixed(10.0),
        }
    }
}

/// Split behavior of a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitParams {
    /// Generations of splitting allowed
    pub max_split_count: u32,
    /// Children per split
    pub split_bullet_count: u32,
    /// Angle between sibling children
    #[serde(with = "fixed_serde")]
    pub split_angle: Fixed,
    /// Size (and stat) ratio between generations
    #[serde(with = "fixed_serde")]
    pub size_ratio: Fixed,
    /// Kind of child spawned
    pub child: SplitChild,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            max_split_count: 2,
            split_bullet_count: 2,
            split_angle: FIXED_SIXTH_PI,
            size_ratio: to_fixed(0.8),
            child: SplitChild::Same,
        }
    }
}

impl SplitParams {
    /// Clamp into the bounded recursion range.
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        clamp_count(&mut warnings, "split.max_split_count",
            &mut self.max_split_count, 0, MAX_SPLIT_DEPTH);
        clamp_count(&mut warnings, "split.split_bullet_count",
            &mut self.split_bullet_count, 1, MAX_SPLIT_BULLETS);
        clamp_fixed(&mut warnings, "split.size_ratio", &mut self.size_ratio, 1, FIXED_ONE);
        if let SplitChild::Trap { life_factor, size_factor, impulse } = &mut self.child {
            clamp_fixed(&mut warnings, "split.trap.life_factor", life_factor, 1, FIXED_ONE);
            clamp_fixed(&mut warnings, "split.trap.size_factor", size_factor, 1, FIXED_ONE);
            clamp_fixed(&mut warnings, "split.trap.impulse", impulse, 0, Fixed::MAX);
        }
        warnings
    }
}

/// Everything a barrel needs to build a projectile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// Effect applied on hit
    pub payload: Payload,
    /// Steering model
    pub motion: Motion,
    /// Split behavior, if any
    pub split: Option<SplitParams>,
    /// Launch impulse (units/tick)
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Acceleration per tick
    #[serde(with = "fixed_serde")]
    pub accel: Fixed,
    /// Starting health
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Contact damage per tick
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Collision radius
    #[serde(with = "fixed_serde")]
    pub size: Fixed,
    /// Ticks until expiry (None = lives until killed or orphaned)
    pub life_length: Option<u32>,
    /// Skip hit detection against other owners
    pub only_same_owner_collision: bool,
    /// Barrels mounted on the projectile itself
    pub sub_barrels: Vec<BarrelDefinition>,
}

impl ProjectileSpec {
    /// Clamp payload, split and mounted barrels into safe ranges.
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = self.payload.sanitize();
        if let Some(split) = self.split.as_mut() {
            warnings.extend(split.sanitize());
        }
        for sub_barrel in &mut self.sub_barrels {
            warnings.extend(sub_barrel.sanitize());
        }
        warnings
    }

    /// Plain bullet.
    pub fn bullet() -> Self {
        Self {
            payload: Payload::None,
            motion: Motion::Ballistic,
            split: None,
            speed: to_fixed(3.0),
            accel: to_fixed(0.3),
            health: to_fixed(2.0),
            damage: to_fixed(1.0),
            size: to_fixed(1.0),
            life_length: Some(72),
            only_same_owner_collision: false,
            sub_barrels: Vec::new(),
        }
    }

    /// Owner-tethered drone.
    pub fn drone(can_control: bool) -> Self {
        Self {
            motion: Motion::Drone { can_control },
            speed: to_fixed(1.0),
            accel: to_fixed(0.4),
            health: to_fixed(4.0),
            damage: to_fixed(0.7),
            size: to_fixed(1.2),
            life_length: None,
            ..Self::bullet()
        }
    }
}

// =============================================================================
// BARREL
// =============================================================================

/// Static description of a barrel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrelDefinition {
    /// Ticks between shots
    pub reload_ticks: u32,
    /// Angle relative to the holder's heading
    #[serde(with = "fixed_serde")]
    pub angle_offset: Fixed,
    /// What it fires
    pub projectile: ProjectileSpec,
    /// Cap on live root drones (None = unlimited)
    pub max_drones: Option<u32>,
}

impl BarrelDefinition {
    /// Standard bullet barrel.
    pub fn basic() -> Self {
        Self {
            reload_ticks: 15,
            angle_offset: 0,
            projectile: ProjectileSpec::bullet(),
            max_drones: None,
        }
    }

    /// Fires slowing ("frozen") bullets.
    pub fn frozen() -> Self {
        let mut barrel = Self::basic();
        barrel.projectile.payload = Payload::Slow { ratio: to_fixed(0.5), duration: 20 };
        barrel
    }

    /// Fires poison bullets.
    pub fn poison() -> Self {
        let mut barrel = Self::basic();
        barrel.projectile.payload = Payload::Poison { damage: to_fixed(0.1), duration: 20 };
        barrel
    }

    /// Spawns controllable drones.
    pub fn drone_spawner(max_drones: u32) -> Self {
        Self {
            reload_ticks: 30,
            angle_offset: 0,
            projectile: ProjectileSpec::drone(true),
            max_drones: Some(max_drones),
        }
    }

    /// Spawns drones that split on death.
    pub fn splitter(params: SplitParams, max_drones: u32) -> Self {
        let mut barrel = Self::drone_spawner(max_drones);
        barrel.projectile.motion = Motion::Drone { can_control: false };
        barrel.projectile.split = Some(params);
        barrel.projectile.life_length = Some(88 * 3);
        barrel
    }

    /// Fires heavy shells that burst into traps.
    pub fn trap_splitter() -> Self {
        let mut barrel = Self::basic();
        barrel.reload_ticks = 60;
        barrel.projectile.size = to_fixed(2.0);
        barrel.projectile.health = to_fixed(5.0);
        barrel.projectile.life_length = Some(88);
        barrel.projectile.split = Some(SplitParams {
            split_bullet_count: 3,
            size_ratio: to_fixed(0.3),
            child: SplitChild::trap(),
            ..SplitParams::default()
        });
        barrel
    }

    /// Launches tank-shaped projectiles that carry their own barrel.
    pub fn launcher(sub_barrel: BarrelDefinition) -> Self {
        let mut barrel = Self::basic();
        barrel.reload_ticks = 45;
        barrel.projectile.size = to_fixed(2.5);
        barrel.projectile.health = to_fixed(6.0);
        barrel.projectile.life_length = Some(180);
        barrel.projectile.sub_barrels = vec![sub_barrel];
        barrel
    }

    /// Clamp the projectile spec, sub-barrels included.
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        self.projectile.sanitize()
    }

    /// Whether projectiles from this barrel count against `max_drones`.
    pub fn fires_drones(&self) -> bool {
        matches!(self.projectile.motion, Motion::Drone { .. })
    }
}

/// Runtime barrel state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Barrel {
    /// Static definition
    pub definition: BarrelDefinition,
    /// Ticks until the next shot is allowed
    pub reload_timer: u32,
    /// Live root drones fired by this barrel
    pub drone_count: u32,
}

impl Barrel {
    /// Fresh, loaded barrel. The definition is sanitized here, once, so
    /// every shot fires from clamped values.
    pub fn new(mut definition: BarrelDefinition) -> Self {
        let warnings = definition.sanitize();
        if !warnings.is_empty() {
            warn!(clamped = warnings.len(), "barrel definition sanitized on attach");
        }
        Self::from_sanitized(definition)
    }

    /// Fresh barrel from a definition that already went through [`Barrel::new`].
    pub(crate) fn from_sanitized(definition: BarrelDefinition) -> Self {
        Self {
            definition,
            reload_timer: 0,
            drone_count: 0,
        }
    }

    /// Advance reload by one tick.
    #[inline]
    pub fn cool_down(&mut self) {
        self.reload_timer = self.reload_timer.saturating_sub(1);
    }

    /// Whether another drone may be fired.
    pub fn has_drone_capacity(&self) -> bool {
        match self.definition.max_drones {
            Some(max) if self.definition.fires_drones() => self.drone_count < max,
            _ => true,
        }
    }

    /// Loaded and under the drone cap.
    pub fn ready(&self) -> bool {
        self.reload_timer == 0 && self.has_drone_capacity()
    }

    /// Start the reload after a shot.
    pub fn mark_fired(&mut self) {
        self.reload_timer = self.definition.reload_ticks.max(1);
    }
}

/// Address of a barrel: holder entity plus index into its barrel list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BarrelRef {
    /// Tank or projectile carrying the barrel
    pub holder: EntityHandle,
    /// Index into the holder's barrels
    pub index: usize,
}

// =============================================================================
// FIRING
// =============================================================================

/// Firing context of a barrel holder.
struct HolderInfo {
    position: FixedVec2,
    heading: Fixed,
    size: Fixed,
    team: TeamId,
    owner: EntityHandle,
    stat_levels: StatLevels,
    wants_fire: bool,
    barrel_count: usize,
}

fn holder_info(world: &World, holder: EntityHandle) -> Option<HolderInfo> {
    match world.get(holder)? {
        Entity::Tank(tank) => Some(HolderInfo {
            position: tank.position,
            heading: tank.heading,
            size: tank.size,
            team: tank.team,
            owner: holder,
            stat_levels: tank.stat_levels,
            wants_fire: tank.input.shoot_pressed(),
            barrel_count: tank.barrels.len(),
        }),
        Entity::Projectile(projectile) => {
            // Mounted barrels open fire once the owner's reload has elapsed
            let elapsed = world.tick.saturating_sub(projectile.spawn_tick);
            let stat_levels = world
                .tank(projectile.owner)
                .map(|owner| owner.stat_levels)
                .unwrap_or_default();
            Some(HolderInfo {
                position: projectile.position,
                heading: projectile.heading,
                size: projectile.size,
                team: projectile.team,
                owner: projectile.owner,
                stat_levels,
                wants_fire: elapsed >= projectile.reload_ticks,
                barrel_count: projectile.sub_barrels.len(),
            })
        }
    }
}

/// Tick every barrel on `holder`, spawning projectiles for those that fire.
///
/// Returns the handles of the new projectiles in barrel order.
pub fn fire_barrels(world: &mut World, holder: EntityHandle, config: &SimConfig) -> Vec<EntityHandle> {
    let Some(info) = holder_info(world, holder) else {
        return Vec::new();
    };

    let now = world.tick;
    let mut spawned = Vec::new();

    for index in 0..info.barrel_count {
        let barrel_ref = BarrelRef { holder, index };
        let (spec, angle_offset) = {
            let Some(barrel) = world.barrel_mut(barrel_ref) else {
                continue;
            };
            barrel.cool_down();
            if !info.wants_fire || !barrel.ready() {
                continue;
            }
            barrel.mark_fired();
            (barrel.definition.projectile.clone(), barrel.definition.angle_offset)
        };

        let angle = wrap_angle(info.heading.wrapping_add(angle_offset));
        let muzzle = info.position + FixedVec2::from_angle(angle).scale(info.size);
        let params = LaunchParams {
            owner: info.owner,
            barrel: barrel_ref,
            team: info.team,
            position: muzzle,
            angle,
            stat_levels: info.stat_levels,
        };
        let projectile = Projectile::launch(&spec, params, now, config);
        let handle = world.spawn_projectile(projectile);
        debug!(?holder, index, ?handle, "barrel fired");
        spawned.push(handle);
    }

    spawned
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::TankBody;

    #[test]
    fn test_stat_scaling_curve() {
        let levels = StatLevels { bullet_damage: 7, bullet_penetration: 4, body_damage: 0 };
        let poison = StatScaling::new(StatKind::BulletDamage, to_fixed(0.5));
        // 1 + 7 × 0.5 = 4.5
        assert_eq!(poison.factor(&levels), to_fixed(4.5));
        assert_eq!(poison.apply(to_fixed(0.5), &levels), to_fixed(2.25));

        let duration = StatScaling::new(StatKind::BulletPenetration, to_fixed(0.75));
        // 20 × (1 + 4 × 0.75) = 80
        assert_eq!(duration.apply_ticks(20, &levels), 80);
    }

    #[test]
    fn test_disabled_curve_is_identity() {
        let levels = StatLevels { bullet_damage: 7, bullet_penetration: 7, body_damage: 7 };
        let disabled = StatScaling::new(StatKind::BulletDamage, 0);
        assert_eq!(disabled.apply(to_fixed(0.3), &levels), to_fixed(0.3));
        assert_eq!(disabled.apply_ticks(20, &levels), 20);
        assert_eq!(disabled.apply_ticks(0, &levels), 1);
    }

    #[test]
    fn test_split_params_clamped() {
        let mut params = SplitParams {
            max_split_count: 50,
            split_bullet_count: 0,
            split_angle: FIXED_SIXTH_PI,
            size_ratio: to_fixed(1.5),
            child: SplitChild::Same,
        };
        let warnings = params.sanitize();
        assert_eq!(warnings.len(), 3);
        assert_eq!(params.max_split_count, MAX_SPLIT_DEPTH);
        assert_eq!(params.split_bullet_count, 1);
        assert_eq!(params.size_ratio, FIXED_ONE);

        let mut ok = SplitParams::default();
        assert!(ok.sanitize().is_empty());
    }

    #[test]
    fn test_barrel_reload_and_drone_cap() {
        let mut barrel = Barrel::new(BarrelDefinition::drone_spawner(2));
        assert!(barrel.ready());
        barrel.mark_fired();
        assert!(!barrel.ready());
        for _ in 0..30 {
            barrel.cool_down();
        }
        assert!(barrel.ready());

        barrel.drone_count = 2;
        assert!(!barrel.ready());
    }

    #[test]
    fn test_bullet_barrel_ignores_drone_cap() {
        let mut definition = BarrelDefinition::basic();
        definition.max_drones = Some(0);
        let barrel = Barrel::new(definition);
        assert!(barrel.ready());
    }

    #[test]
    fn test_payload_sanitize() {
        let mut payload = Payload::Slow { ratio: to_fixed(3.0), duration: 0 };
        assert_eq!(payload.sanitize().len(), 2);
        assert_eq!(payload, Payload::Slow { ratio: MAX_SLOW, duration: 1 });
    }

    #[test]
    fn test_barrel_sanitized_on_attach() {
        let mut sub_barrel = BarrelDefinition::poison();
        sub_barrel.projectile.payload = Payload::Poison { damage: to_fixed(0.1), duration: 0 };
        let mut definition = BarrelDefinition::launcher(sub_barrel);
        definition.projectile.payload = Payload::Slow { ratio: to_fixed(3.0), duration: 20 };
        definition.projectile.split = Some(SplitParams {
            max_split_count: 50,
            child: SplitChild::Trap { life_factor: to_fixed(2.0), size_factor: 0, impulse: to_fixed(4.0) },
            ..SplitParams::default()
        });
        assert_eq!(definition.clone().sanitize().len(), 5);

        let barrel = Barrel::new(definition);
        let spec = &barrel.definition.projectile;
        assert_eq!(spec.payload, Payload::Slow { ratio: MAX_SLOW, duration: 20 });
        let split = spec.split.unwrap();
        assert_eq!(split.max_split_count, MAX_SPLIT_DEPTH);
        assert_eq!(split.child, SplitChild::Trap { life_factor: FIXED_ONE, size_factor: 1, impulse: to_fixed(4.0) });
        assert_eq!(
            spec.sub_barrels[0].projectile.payload,
            Payload::Poison { damage: to_fixed(0.1), duration: 1 }
        );
        // Already clamped; nothing left to report
        assert!(barrel.definition.clone().sanitize().is_empty());
    }

    #[test]
    fn test_launch_uses_attached_definition() {
        let config = SimConfig::default();
        let mut world = World::with_config(2, &config);
        let mut definition = BarrelDefinition::splitter(SplitParams::default(), 2);
        definition.projectile.split = Some(SplitParams { split_bullet_count: 40, ..SplitParams::default() });
        let tank = world.spawn_tank(TankBody::new(1, FixedVec2::ZERO).with_barrel(definition));

        let spec = world.tank(tank).unwrap().barrels[0].definition.projectile.clone();
        let params = LaunchParams {
            owner: tank,
            barrel: BarrelRef { holder: tank, index: 0 },
            team: 1,
            position: FixedVec2::from_ints(10, 0),
            angle: 0,
            stat_levels: StatLevels::default(),
        };
        let projectile = Projectile::launch(&spec, params, 0, &config);
        assert_eq!(projectile.split.unwrap().split_bullet_count, MAX_SPLIT_BULLETS);
    }

    #[test]
    fn test_scaled_slow_stays_under_cap() {
        let mut config = SimConfig::default();
        config.effects.slow_ratio = StatScaling::new(StatKind::BulletDamage, to_fixed(1.0));
        let levels = StatLevels { bullet_damage: 7, bullet_penetration: 0, body_damage: 0 };
        let scaled = Payload::Slow { ratio: to_fixed(0.5), duration: 20 }.scaled(&levels, &config);
        assert_eq!(scaled, Payload::Slow { ratio: MAX_SLOW, duration: 20 });
    }
}
