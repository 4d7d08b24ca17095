//! Entities and Capabilities
//!
//! Entities live in a generational arena owned by [`World`](crate::game::world::World).
//! A handle whose slot has been freed stays stale forever, even after the
//! slot is reused, so nothing keyed by handle can alias a newer entity.
//!
//! Behavior is shared through small capability traits rather than a class
//! hierarchy:
//! - [`Positionable`]: position, velocity, size, heading
//! - [`Damageable`]: health and contact damage
//! - [`PilotInputSource`]: input, movement-speed stat, reload, team
//! - [`AiControllable`]: motion controller and base acceleration

use serde::{Serialize, Deserialize};
use slotmap::new_key_type;

use crate::core::fixed::{Fixed, FIXED_ONE, to_fixed};
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::ai::AiController;
use crate::game::barrel::{Barrel, BarrelDefinition, StatLevels};
use crate::game::input::InputFrame;
use crate::game::projectile::Projectile;

new_key_type! {
    /// Generational handle into the entity arena.
    pub struct EntityHandle;
}

/// Team identifier. Entities on the same team never hit each other.
pub type TeamId = u32;

/// Why an entity left the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Lifetime ran out
    Expired,
    /// Health reached zero
    Killed,
    /// Owner tank or launching barrel is gone
    OwnerLost,
    /// Tick raised an error and the driver removed it
    Faulted,
    /// Removed by the host
    Forced,
}

impl DestroyCause {
    /// Terminal destroys run the split spawner.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, DestroyCause::Expired | DestroyCause::Killed)
    }
}

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Something with a place in the world.
pub trait Positionable {
    /// Current position
    fn position(&self) -> FixedVec2;
    /// Current velocity (units/tick)
    fn velocity(&self) -> FixedVec2;
    /// Overwrite velocity
    fn set_velocity(&mut self, velocity: FixedVec2);
    /// Collision radius
    fn size(&self) -> Fixed;
    /// Facing angle
    fn heading(&self) -> Fixed;
}

/// Something with health.
pub trait Damageable {
    /// Current health
    fn health(&self) -> Fixed;
    /// Maximum health
    fn max_health(&self) -> Fixed;
    /// Damage dealt to whatever touches it, per tick
    fn contact_damage(&self) -> Fixed;
    /// Subtract health; returns what is left.
    fn apply_damage(&mut self, amount: Fixed) -> Fixed;
    /// Health above zero.
    fn is_alive(&self) -> bool {
        self.health() > 0
    }
}

/// A pilot: supplies input and owns the movement-speed stat cell.
pub trait PilotInputSource {
    /// Input for the current tick
    fn input(&self) -> &InputFrame;
    /// Movement-speed stat; slow effects write here
    fn movement_speed_mut(&mut self) -> &mut Fixed;
    /// Reload time in ticks
    fn reload_ticks(&self) -> u32;
    /// Team
    fn team(&self) -> TeamId;
}

/// Something steered by an AI motion controller.
pub trait AiControllable {
    /// Controller, if this entity has one
    fn controller(&self) -> Option<&AiController>;
    /// Mutable controller
    fn controller_mut(&mut self) -> Option<&mut AiController>;
    /// Acceleration before divisors
    fn base_accel(&self) -> Fixed;
}

// =============================================================================
// TANK
// =============================================================================

/// A piloted tank body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TankBody {
    /// Team
    pub team: TeamId,
    /// Current position
    pub position: FixedVec2,
    /// Current velocity
    pub velocity: FixedVec2,
    /// Facing angle (toward the aim point)
    pub heading: Fixed,
    /// Collision radius
    pub size: Fixed,
    /// Current health
    pub health: Fixed,
    /// Maximum health
    pub max_health: Fixed,
    /// Body damage per tick on contact
    pub body_damage: Fixed,
    /// Movement speed stat cell (units/tick)
    pub movement_speed: Fixed,
    /// Reload time in ticks; drones copy this every tick
    pub reload_ticks: u32,
    /// Latest pilot input
    pub input: InputFrame,
    /// Mounted barrels
    pub barrels: Vec<Barrel>,
    /// Upgrade levels
    pub stat_levels: StatLevels,
    /// Kills credited to this tank
    pub kills: u32,
}

impl TankBody {
    /// Default tank size (50px)
    pub const DEFAULT_SIZE: Fixed = to_fixed(5.0);

    /// Create a barrel-less tank.
    pub fn new(team: TeamId, position: FixedVec2) -> Self {
        Self {
            team,
            position,
            velocity: FixedVec2::ZERO,
            heading: 0,
            size: Self::DEFAULT_SIZE,
            health: to_fixed(50.0),
            max_health: to_fixed(50.0),
            body_damage: to_fixed(2.0),
            movement_speed: FIXED_ONE,
            reload_ticks: 15,
            input: InputFrame::new(),
            barrels: Vec::new(),
            stat_levels: StatLevels::default(),
            kills: 0,
        }
    }

    /// Mount a barrel.
    pub fn with_barrel(mut self, definition: BarrelDefinition) -> Self {
        self.barrels.push(Barrel::new(definition));
        self
    }

    /// Set stat levels.
    pub fn with_stats(mut self, stat_levels: StatLevels) -> Self {
        self.stat_levels = stat_levels;
        self
    }

    /// Hash this tank's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher
            .field(self.team)
            .field(self.position)
            .field(self.velocity)
            .field(self.heading)
            .field(self.health)
            .field(self.movement_speed)
            .field(self.kills);
        for barrel in &self.barrels {
            hasher.field(barrel.reload_timer).field(barrel.drone_count);
        }
    }
}

impl Positionable for TankBody {
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

impl Damageable for TankBody {
    fn health(&self) -> Fixed {
        self.health
    }
    fn max_health(&self) -> Fixed {
        self.max_health
    }
    fn contact_damage(&self) -> Fixed {
        self.body_damage
    }
    fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        self.health = self.health.saturating_sub(amount);
        self.health
    }
}

impl PilotInputSource for TankBody {
    fn input(&self) -> &InputFrame {
        &self.input
    }
    fn movement_speed_mut(&mut self) -> &mut Fixed {
        &mut self.movement_speed
    }
    fn reload_ticks(&self) -> u32 {
        self.reload_ticks
    }
    fn team(&self) -> TeamId {
        self.team
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Everything the arena can hold.
#[derive(Clone, Debug)]
pub enum Entity {
    /// Piloted tank
    Tank(TankBody),
    /// Bullet, drone or tank-shaped projectile
    Projectile(Projectile),
}

impl Entity {
    /// Tank view.
    pub fn as_tank(&self) -> Option<&TankBody> {
        match self {
            Entity::Tank(tank) => Some(tank),
            Entity::Projectile(_) => None,
        }
    }

    /// Mutable tank view.
    pub fn as_tank_mut(&mut self) -> Option<&mut TankBody> {
        match self {
            Entity::Tank(tank) => Some(tank),
            Entity::Projectile(_) => None,
        }
    }

    /// Projectile view.
    pub fn as_projectile(&self) -> Option<&Projectile> {
        match self {
            Entity::Projectile(projectile) => Some(projectile),
            Entity::Tank(_) => None,
        }
    }

    /// Mutable projectile view.
    pub fn as_projectile_mut(&mut self) -> Option<&mut Projectile> {
        match self {
            Entity::Projectile(projectile) => Some(projectile),
            Entity::Tank(_) => None,
        }
    }

    /// Team of the entity.
    pub fn team(&self) -> TeamId {
        match self {
            Entity::Tank(tank) => tank.team,
            Entity::Projectile(projectile) => projectile.team,
        }
    }

    /// Hash for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        match self {
            Entity::Tank(tank) => {
                hasher.field(0u8);
                tank.hash_into(hasher);
            }
            Entity::Projectile(projectile) => {
                hasher.field(1u8);
                projectile.hash_into(hasher);
            }
        }
    }

    fn positionable(&self) -> &dyn Positionable {
        match self {
            Entity::Tank(tank) => tank,
            Entity::Projectile(projectile) => projectile,
        }
    }

    fn positionable_mut(&mut self) -> &mut dyn Positionable {
        match self {
            Entity::Tank(tank) => tank,
            Entity::Projectile(projectile) => projectile,
        }
    }

    fn damageable(&self) -> &dyn Damageable {
        match self {
            Entity::Tank(tank) => tank,
            Entity::Projectile(projectile) => projectile,
        }
    }

    fn damageable_mut(&mut self) -> &mut dyn Damageable {
        match self {
            Entity::Tank(tank) => tank,
            Entity::Projectile(projectile) => projectile,
        }
    }
}

impl Positionable for Entity {
    fn position(&self) -> FixedVec2 {
        self.positionable().position()
    }
    fn velocity(&self) -> FixedVec2 {
        self.positionable().velocity()
    }
    fn set_velocity(&mut self, velocity: FixedVec2) {
        self.positionable_mut().set_velocity(velocity);
    }
    fn size(&self) -> Fixed {
        self.positionable().size()
    }
    fn heading(&self) -> Fixed {
        self.positionable().heading()
    }
}

impl Damageable for Entity {
    fn health(&self) -> Fixed {
        self.damageable().health()
    }
    fn max_health(&self) -> Fixed {
        self.damageable().max_health()
    }
    fn contact_damage(&self) -> Fixed {
        self.damageable().contact_damage()
    }
    fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        self.damageable_mut().apply_damage(amount)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_stale_handle_never_aliases() {
        let mut arena: SlotMap<EntityHandle, u32> = SlotMap::with_key();
        let old = arena.insert(1);
        arena.remove(old);
        let new = arena.insert(2);

        assert!(!arena.contains_key(old));
        assert!(arena.contains_key(new));
        assert_ne!(old, new);
    }

    #[test]
    fn test_tank_damage() {
        let mut tank = TankBody::new(1, FixedVec2::ZERO);
        assert!(tank.is_alive());
        let left = tank.apply_damage(to_fixed(49.5));
        assert_eq!(left, to_fixed(0.5));
        tank.apply_damage(to_fixed(0.5));
        assert!(!tank.is_alive());
    }

    #[test]
    fn test_entity_dispatch() {
        let mut entity = Entity::Tank(TankBody::new(3, FixedVec2::from_ints(4, 5)));
        assert_eq!(entity.team(), 3);
        assert_eq!(entity.position(), FixedVec2::from_ints(4, 5));
        assert_eq!(entity.size(), TankBody::DEFAULT_SIZE);
        entity.set_velocity(FixedVec2::from_ints(1, 0));
        assert_eq!(entity.velocity(), FixedVec2::from_ints(1, 0));
        assert!(entity.as_projectile().is_none());
    }

    #[test]
    fn test_terminal_causes() {
        assert!(DestroyCause::Expired.is_terminal());
        assert!(DestroyCause::Killed.is_terminal());
        assert!(!DestroyCause::OwnerLost.is_terminal());
        assert!(!DestroyCause::Faulted.is_terminal());
        assert!(!DestroyCause::Forced.is_terminal());
    }
}
