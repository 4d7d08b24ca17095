//! Game Events
//!
//! Events generated during simulation for replay and verification.

use serde::{Serialize, Deserialize};
use crate::game::effect::EffectKind;
use crate::game::entity::{DestroyCause, EntityHandle};

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Kills processed first
    Kill = 0,
    /// Then isolated faults
    Fault = 1,
    /// Then removals
    Destruction = 2,
    /// Then split spawns
    Split = 3,
    /// Then status effects
    Effect = 4,
    /// Lowest priority
    Spawn = 5,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Barrel or split produced a projectile
    ProjectileSpawned {
        handle: EntityHandle,
        owner: EntityHandle,
        generation: u32,
    },

    /// New effect stack
    EffectApplied {
        target: EntityHandle,
        source: EntityHandle,
        kind: EffectKind,
        stacks: usize,
    },

    /// Existing stack re-applied by the same source
    EffectRefreshed {
        target: EntityHandle,
        source: EntityHandle,
        kind: EffectKind,
    },

    /// Stack ran out
    EffectExpired {
        target: EntityHandle,
        source: EntityHandle,
        kind: EffectKind,
        remaining_stacks: usize,
    },

    /// Every effect purged from a destroyed target
    EffectsCleared {
        target: EntityHandle,
        removed: usize,
    },

    /// Entity brought to zero health
    EntityKilled {
        victim: EntityHandle,
        killer: Option<EntityHandle>,
        source: EntityHandle,
    },

    /// Projectile split on destruction
    ProjectileSplit {
        parent: EntityHandle,
        children: Vec<EntityHandle>,
        generation: u32,
    },

    /// Projectile left the world
    ProjectileDestroyed {
        handle: EntityHandle,
        cause: DestroyCause,
    },

    /// Entity tick failed and the driver removed it
    EntityFaulted {
        handle: EntityHandle,
        reason: String,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Entity involved (for tie-breaking)
    pub subject: Option<EntityHandle>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        let subject = match &data {
            GameEventData::ProjectileSpawned { handle, .. } => Some(*handle),
            GameEventData::EffectApplied { target, .. } => Some(*target),
            GameEventData::EffectRefreshed { target, .. } => Some(*target),
            GameEventData::EffectExpired { target, .. } => Some(*target),
            GameEventData::EffectsCleared { target, .. } => Some(*target),
            GameEventData::EntityKilled { victim, .. } => Some(*victim),
            GameEventData::ProjectileSplit { parent, .. } => Some(*parent),
            GameEventData::ProjectileDestroyed { handle, .. } => Some(*handle),
            GameEventData::EntityFaulted { handle, .. } => Some(*handle),
        };

        Self {
            tick,
            priority,
            subject,
            data,
        }
    }

    /// Create projectile spawned event.
    pub fn projectile_spawned(tick: u32, handle: EntityHandle, owner: EntityHandle, generation: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Spawn,
            GameEventData::ProjectileSpawned { handle, owner, generation },
        )
    }

    /// Create effect applied event.
    pub fn effect_applied(
        tick: u32,
        target: EntityHandle,
        source: EntityHandle,
        kind: EffectKind,
        stacks: usize,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::Effect,
            GameEventData::EffectApplied { target, source, kind, stacks },
        )
    }

    /// Create effect refreshed event.
    pub fn effect_refreshed(tick: u32, target: EntityHandle, source: EntityHandle, kind: EffectKind) -> Self {
        Self::new(
            tick,
            EventPriority::Effect,
            GameEventData::EffectRefreshed { target, source, kind },
        )
    }

    /// Create effect expired event.
    pub fn effect_expired(
        tick: u32,
        target: EntityHandle,
        source: EntityHandle,
        kind: EffectKind,
        remaining_stacks: usize,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::Effect,
            GameEventData::EffectExpired { target, source, kind, remaining_stacks },
        )
    }

    /// Create effects cleared event.
    pub fn effects_cleared(tick: u32, target: EntityHandle, removed: usize) -> Self {
        Self::new(
            tick,
            EventPriority::Effect,
            GameEventData::EffectsCleared { target, removed },
        )
    }

    /// Create entity killed event.
    pub fn entity_killed(
        tick: u32,
        victim: EntityHandle,
        killer: Option<EntityHandle>,
        source: EntityHandle,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::Kill,
            GameEventData::EntityKilled { victim, killer, source },
        )
    }

    /// Create projectile split event.
    pub fn projectile_split(tick: u32, parent: EntityHandle, children: Vec<EntityHandle>, generation: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Split,
            GameEventData::ProjectileSplit { parent, children, generation },
        )
    }

    /// Create projectile destroyed event.
    pub fn projectile_destroyed(tick: u32, handle: EntityHandle, cause: DestroyCause) -> Self {
        Self::new(
            tick,
            EventPriority::Destruction,
            GameEventData::ProjectileDestroyed { handle, cause },
        )
    }

    /// Create entity faulted event.
    pub fn entity_faulted(tick: u32, handle: EntityHandle, reason: String) -> Self {
        Self::new(
            tick,
            EventPriority::Fault,
            GameEventData::EntityFaulted { handle, reason },
        )
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.subject == other.subject
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then subject
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.subject.cmp(&other.subject))
    }
}
