//! Effect Registry
//!
//! Timed status effects live here, keyed by target handle, not on the
//! entities. Per target the registry holds:
//! - at most one [`StatusEffect`] per (kind, source) pair
//! - the baseline value of the stat a kind modifies, captured once before
//!   the first stack of that kind and dropped when the last stack goes
//!
//! All durations are simulation ticks. Mutation happens only on the driver
//! thread; sweeps work from key snapshots so removal during iteration is
//! safe.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, fixed_clamp};
use crate::core::hash::StateHasher;
use crate::game::entity::EntityHandle;

/// Kind of timed effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Movement slow
    Slow,
    /// Damage over time
    Poison,
}

/// One stack of an effect from one source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Affected entity
    pub target: EntityHandle,
    /// Projectile that applied it
    pub source: EntityHandle,
    /// Kind
    pub kind: EffectKind,
    /// Per-stack magnitude (slow ratio or poison damage per tick)
    pub magnitude: Fixed,
    /// First tick on which the stack is gone
    pub expiry_tick: u32,
    /// Tank credited if this effect kills
    pub credit: Option<EntityHandle>,
}

impl StatusEffect {
    /// Expired at `now`.
    #[inline]
    pub fn is_expired(&self, now: u32) -> bool {
        now >= self.expiry_tick
    }
}

/// Stat value captured before the first stack of a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Baseline {
    /// Pilot movement-speed stat
    MovementSpeed(Fixed),
    /// Speed of a freely moving entity
    VelocityMagnitude(Fixed),
}

/// Result of applying an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// New (target, source, kind) entry
    NewStack,
    /// Existing entry had its expiry and magnitude refreshed
    Refreshed,
    /// Target was gone; nothing changed
    StaleTarget,
}

impl ApplyOutcome {
    /// A stack was added.
    #[inline]
    pub fn is_new_stack(self) -> bool {
        matches!(self, ApplyOutcome::NewStack)
    }
}

/// What `clear` removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearedEffects {
    /// Every entry that was live
    pub removed: Vec<StatusEffect>,
    /// Baselines to write back, by kind
    pub baselines: Vec<(EffectKind, Baseline)>,
}

/// One entry removed by a sweep or explicit removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpiredEffect {
    /// The removed entry
    pub effect: StatusEffect,
    /// Stacks of the same kind still on the target
    pub remaining_stacks: usize,
    /// Baseline to restore when that was the last stack
    pub restore: Option<Baseline>,
}

#[derive(Clone, Debug, Default)]
struct TargetEffects {
    effects: BTreeMap<(EffectKind, EntityHandle), StatusEffect>,
    baselines: BTreeMap<EffectKind, Baseline>,
}

impl TargetEffects {
    fn stack_count(&self, kind: EffectKind) -> usize {
        self.effects.keys().filter(|(k, _)| *k == kind).count()
    }
}

/// Handle-keyed store of active effects.
#[derive(Clone, Debug, Default)]
pub struct EffectRegistry {
    targets: BTreeMap<EntityHandle, TargetEffects>,
}

impl EffectRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the baseline for `kind` unless one is already held.
    ///
    /// Returns true if this call recorded it.
    pub fn capture_baseline(&mut self, target: EntityHandle, kind: EffectKind, baseline: Baseline) -> bool {
        let entry = self.targets.entry(target).or_default();
        if entry.baselines.contains_key(&kind) {
            return false;
        }
        entry.baselines.insert(kind, baseline);
        true
    }

    /// Captured baseline for `kind`.
    pub fn baseline(&self, target: EntityHandle, kind: EffectKind) -> Option<Baseline> {
        self.targets.get(&target)?.baselines.get(&kind).copied()
    }

    /// Add a stack, or refresh the existing (target, source, kind) entry.
    ///
    /// A refresh moves expiry and magnitude in place and never adds a stack.
    /// Durations below one tick are raised to one.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &mut self,
        target: EntityHandle,
        source: EntityHandle,
        kind: EffectKind,
        magnitude: Fixed,
        duration: u32,
        now: u32,
        credit: Option<EntityHandle>,
    ) -> ApplyOutcome {
        let expiry_tick = now.saturating_add(duration.max(1));
        let entry = self.targets.entry(target).or_default();

        match entry.effects.get_mut(&(kind, source)) {
            Some(existing) => {
                existing.magnitude = magnitude;
                existing.expiry_tick = expiry_tick;
                existing.credit = credit;
                ApplyOutcome::Refreshed
            }
            None => {
                entry.effects.insert(
                    (kind, source),
                    StatusEffect { target, source, kind, magnitude, expiry_tick, credit },
                );
                ApplyOutcome::NewStack
            }
        }
    }

    /// Live entry for (target, source, kind).
    pub fn get(&self, target: EntityHandle, source: EntityHandle, kind: EffectKind) -> Option<&StatusEffect> {
        self.targets.get(&target)?.effects.get(&(kind, source))
    }

    /// Stacks of `kind` on `target`.
    pub fn stack_count(&self, target: EntityHandle, kind: EffectKind) -> usize {
        self.targets.get(&target).map_or(0, |t| t.stack_count(kind))
    }

    /// Sum of per-stack magnitudes of `kind`, clamped to `[0, cap]`.
    ///
    /// With a uniform per-stack ratio this is `min(stacks × ratio, cap)`.
    pub fn composed_magnitude(&self, target: EntityHandle, kind: EffectKind, cap: Fixed) -> Fixed {
        let Some(entry) = self.targets.get(&target) else {
            return 0;
        };
        let total = entry
            .effects
            .values()
            .filter(|e| e.kind == kind)
            .fold(0 as Fixed, |acc, e| acc.saturating_add(e.magnitude));
        fixed_clamp(total, 0, cap)
    }

    /// Snapshot of entries of `kind` on `target`, ordered by source.
    pub fn effects_of_kind(&self, target: EntityHandle, kind: EffectKind) -> Vec<StatusEffect> {
        self.targets.get(&target).map_or_else(Vec::new, |t| {
            t.effects.values().filter(|e| e.kind == kind).copied().collect()
        })
    }

    /// Whether anything is attached to `target`.
    pub fn has_effects(&self, target: EntityHandle) -> bool {
        self.targets.get(&target).is_some_and(|t| !t.effects.is_empty())
    }

    /// Snapshot of targets with entries, ascending.
    pub fn targets(&self) -> Vec<EntityHandle> {
        self.targets.keys().copied().collect()
    }

    /// Total live entries.
    pub fn len(&self) -> usize {
        self.targets.values().map(|t| t.effects.len()).sum()
    }

    /// Whether no entries are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove one stack.
    ///
    /// When it was the last stack of its kind the baseline is released and
    /// returned for restoration.
    pub fn remove(&mut self, target: EntityHandle, source: EntityHandle, kind: EffectKind) -> Option<ExpiredEffect> {
        let entry = self.targets.get_mut(&target)?;
        let effect = entry.effects.remove(&(kind, source))?;
        let remaining_stacks = entry.stack_count(kind);
        let restore = if remaining_stacks == 0 {
            entry.baselines.remove(&kind)
        } else {
            None
        };
        if entry.effects.is_empty() {
            self.targets.remove(&target);
        }
        Some(ExpiredEffect { effect, remaining_stacks, restore })
    }

    /// Force-remove everything on `target`.
    ///
    /// Returns None when nothing was attached, so a second call is a no-op.
    pub fn clear(&mut self, target: EntityHandle) -> Option<ClearedEffects> {
        let entry = self.targets.remove(&target)?;
        Some(ClearedEffects {
            removed: entry.effects.into_values().collect(),
            baselines: entry.baselines.into_iter().collect(),
        })
    }

    /// Remove every entry expired at `now`, in (target, kind, source) order.
    pub fn sweep(&mut self, now: u32) -> Vec<ExpiredEffect> {
        let expired: Vec<StatusEffect> = self
            .targets
            .values()
            .flat_map(|t| t.effects.values())
            .filter(|e| e.is_expired(now))
            .copied()
            .collect();

        expired
            .into_iter()
            .filter_map(|e| self.remove(e.target, e.source, e.kind))
            .collect()
    }

    /// Hash every entry for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        for (target, entry) in &self.targets {
            hasher.field(*target);
            for effect in entry.effects.values() {
                hasher
                    .field(effect.kind as u8)
                    .field(effect.source)
                    .field(effect.magnitude)
                    .field(effect.expiry_tick);
            }
            for (kind, baseline) in &entry.baselines {
                let value = match baseline {
                    Baseline::MovementSpeed(v) | Baseline::VelocityMagnitude(v) => *v,
                };
                hasher.field(*kind as u8).field(value);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
