//! Split Spawner
//!
//! A splitting projectile carries a [`SplitNode`]. On a terminal destroy
//! (killed or expired) the node spawns `split_bullet_count` children one
//! generation deeper, fanned around the parent's heading. The depth check
//! runs before any child is built, and depth is clamped at configuration
//! time, so a tree never grows past `MAX_SPLIT_DEPTH` generations.
//!
//! Children never count toward the launching barrel's drone cap; only the
//! root does.
//!
//! With [`SplitChild::Trap`] the children are inert ballistic traps dropped
//! at the parent's position. Traps carry no split node and never split.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::config::{fixed_serde, SplitConfig};
use crate::core::fixed::{Fixed, FIXED_SCALE, fixed_mul, fixed_pow, wrap_angle};
use crate::core::vec2::FixedVec2;
use crate::game::ai::AiController;
use crate::game::barrel::{Motion, SplitChild, SplitParams};
use crate::game::entity::EntityHandle;
use crate::game::events::GameEvent;
use crate::game::projectile::ProjectilePhase;
use crate::game::world::World;

/// Stats scaled per generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitStats {
    /// Health
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Contact damage per tick
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Acceleration
    #[serde(with = "fixed_serde")]
    pub accel: Fixed,
}

/// Split bookkeeping of one projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitNode {
    /// Generation of this projectile (root = 0)
    pub split_count: u32,
    /// Deepest generation allowed
    pub max_split_count: u32,
    /// Children per split
    pub split_bullet_count: u32,
    /// Angle between siblings
    pub split_angle: Fixed,
    /// Per-generation size and stat ratio
    pub size_ratio: Fixed,
    /// Root stats, scaled for each generation
    pub root_stats: SplitStats,
    /// Side of the jitter square
    pub jitter_extent: Fixed,
    /// Launch speed of children
    pub child_speed: Fixed,
    /// Kind of child spawned
    pub child: SplitChild,
}

impl SplitNode {
    /// Node for a freshly launched root. `params` must already be sanitized.
    pub fn root(params: &SplitParams, root_stats: SplitStats, config: &SplitConfig) -> Self {
        Self {
            split_count: 0,
            max_split_count: params.max_split_count,
            split_bullet_count: params.split_bullet_count,
            split_angle: params.split_angle,
            size_ratio: params.size_ratio,
            root_stats,
            jitter_extent: config.jitter_extent,
            child_speed: config.child_speed,
            child: params.child,
        }
    }

    /// Another generation is allowed.
    #[inline]
    pub fn can_split(&self) -> bool {
        self.split_count < self.max_split_count
    }

    /// Node for a child, or None at the depth limit.
    pub fn child(&self) -> Option<SplitNode> {
        if !self.can_split() {
            return None;
        }
        Some(SplitNode {
            split_count: self.split_count + 1,
            ..*self
        })
    }

    /// Launch angles of the children, fanned around `heading`.
    pub fn child_angles(&self, heading: Fixed) -> Vec<Fixed> {
        let n = self.split_bullet_count as i32;
        (0..n)
            .map(|i| {
                let step = i - n / 2;
                wrap_angle(heading.wrapping_add(self.split_angle.wrapping_mul(step)))
            })
            .collect()
    }

    /// Root stats scaled by `size_ratio ^ generation`.
    pub fn stats_at(&self, generation: u32) -> SplitStats {
        let factor = fixed_pow(self.size_ratio, generation);
        SplitStats {
            health: fixed_mul(self.root_stats.health, factor),
            damage: fixed_mul(self.root_stats.damage, factor),
            accel: fixed_mul(self.root_stats.accel, factor),
        }
    }
}

/// Spawn the children of `parent`, which must still be in the arena.
///
/// Returns the new handles; empty when the parent cannot split.
pub fn spawn_children(world: &mut World, parent: EntityHandle) -> Vec<EntityHandle> {
    let Some(template) = world.projectile(parent) else {
        return Vec::new();
    };
    let Some(node) = template.split else {
        return Vec::new();
    };
    let Some(child_node) = node.child() else {
        return Vec::new();
    };

    let template = template.clone();
    let stats = node.stats_at(child_node.split_count);
    let now = world.tick;
    let mut children = Vec::with_capacity(child_node.split_bullet_count as usize);

    for angle in node.child_angles(template.heading) {
        let mut child = template.clone();
        child.velocity = FixedVec2::ZERO;
        child.heading = angle;
        child.movement_angle = angle;
        child.health = stats.health;
        child.max_health = stats.health;
        child.damage_per_tick = stats.damage;
        child.base_accel = stats.accel;
        child.spawn_tick = now;
        child.phase = ProjectilePhase::Spawned;
        child.counts_toward_drones = false;
        child.sub_barrels = Vec::new();

        match child_node.child {
            SplitChild::Same => {
                child.position = template.position + world.rng.jitter(child_node.jitter_extent);
                child.size = fixed_mul(template.size, node.size_ratio);
                child.base_speed = child_node.child_speed;
                child.split = Some(child_node);
                child.ai = template
                    .ai
                    .as_ref()
                    .map(|ai| AiController::new(ai.can_control, ai.view_range));
            }
            SplitChild::Trap { life_factor, size_factor, impulse } => {
                child.size = fixed_mul(template.size, size_factor);
                child.base_speed = impulse;
                child.life_length = template.life_length.map(|life| scale_ticks(life, life_factor));
                child.motion = Motion::Ballistic;
                child.split = None;
                child.ai = None;
            }
        }

        children.push(world.spawn_projectile(child));
    }

    debug!(?parent, generation = child_node.split_count, count = children.len(), "projectile split");
    world.push_event(GameEvent::projectile_split(now, parent, children.clone(), child_node.split_count));
    children
}

/// `ticks × factor`, at least one tick.
fn scale_ticks(ticks: u32, factor: Fixed) -> u32 {
    let scaled = (ticks as i64 * factor as i64) >> FIXED_SCALE;
    scaled.clamp(1, u32::MAX as i64) as u32
}

// =============================================================================
// TESTS
// =============================================================================
